//! Poll Configuration
//!
//! The poll data model: drafts submitted by the presenter, validated polls,
//! options, and the lifecycle state a poll is in.

use serde::{Deserialize, Serialize};

use super::error::PollError;

/// Identifier of a poll, allocated monotonically by the lifecycle.
pub type PollId = u64;

/// Lifecycle state of the session's poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LifecycleState {
    /// No poll is collecting votes or showing results
    #[default]
    Idle,
    /// Votes are being collected
    Voting,
    /// Voting closed; final tally on display
    ShowingResults,
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LifecycleState::Idle => "idle",
            LifecycleState::Voting => "voting",
            LifecycleState::ShowingResults => "showingResults",
        };
        f.write_str(s)
    }
}

/// Poll option/choice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollOption {
    /// Option text/label
    pub text: String,
    /// Marked as the correct answer. Display only; never affects the tally.
    #[serde(default)]
    pub is_correct: bool,
}

impl PollOption {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_correct: false,
        }
    }

    /// Mark as correct answer
    pub fn correct(mut self) -> Self {
        self.is_correct = true;
        self
    }
}

/// A poll as submitted by the presenter, before an id is assigned.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollDraft {
    pub question: String,
    pub options: Vec<PollOption>,
    /// Voting window; the configured default applies when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<u64>,
}

impl PollDraft {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            options: Vec::new(),
            duration_secs: None,
        }
    }

    pub fn with_options(mut self, options: Vec<PollOption>) -> Self {
        self.options = options;
        self
    }

    pub fn with_duration(mut self, seconds: u64) -> Self {
        self.duration_secs = Some(seconds);
        self
    }

    /// Validate against the session limits and resolve the duration.
    pub fn validate(&self, limits: &PollLimits) -> Result<u64, PollError> {
        if self.question.trim().is_empty() {
            return Err(PollError::InvalidPoll("question is required".to_string()));
        }
        if self.options.len() < 2 {
            return Err(PollError::InvalidPoll(
                "poll must have at least 2 options".to_string(),
            ));
        }
        if self.options.len() > limits.max_options {
            return Err(PollError::InvalidPoll(format!(
                "poll cannot have more than {} options",
                limits.max_options
            )));
        }
        if let Some(idx) = self.options.iter().position(|o| o.text.trim().is_empty()) {
            return Err(PollError::InvalidPoll(format!("option {} has no text", idx)));
        }

        let duration = self.duration_secs.unwrap_or(limits.default_duration_secs);
        if duration == 0 || duration > limits.max_duration_secs {
            return Err(PollError::InvalidPoll(format!(
                "duration must be between 1 and {} seconds",
                limits.max_duration_secs
            )));
        }
        Ok(duration)
    }
}

/// Bounds applied to every draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollLimits {
    pub default_duration_secs: u64,
    pub max_duration_secs: u64,
    pub max_options: usize,
}

impl Default for PollLimits {
    fn default() -> Self {
        Self {
            default_duration_secs: 60,
            max_duration_secs: 3600,
            max_options: 50,
        }
    }
}

/// A poll that has been accepted into the lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Poll {
    pub id: PollId,
    pub question: String,
    pub options: Vec<PollOption>,
    /// When the poll was created (Unix ms)
    pub created_at: i64,
    pub duration_secs: u64,
    /// When the duration timer is due (Unix ms)
    pub closes_at: i64,
    pub state: LifecycleState,
}

impl Poll {
    pub(crate) fn from_draft(id: PollId, draft: PollDraft, duration_secs: u64) -> Self {
        let created_at = now_millis();
        Self {
            id,
            question: draft.question.trim().to_string(),
            options: draft.options,
            created_at,
            duration_secs,
            closes_at: created_at + (duration_secs as i64 * 1000),
            state: LifecycleState::Voting,
        }
    }

    pub fn option_count(&self) -> usize {
        self.options.len()
    }
}

/// Current time in milliseconds since the Unix epoch
pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
