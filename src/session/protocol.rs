//! Wire protocol
//!
//! Closed set of inbound commands and outbound events exchanged over the
//! WebSocket. Every frame is a JSON object; commands are tagged by `type`,
//! events by `event`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ConnectionId;
use crate::polls::{ClosureReason, LifecycleState, Poll, PollDraft, PollId, TallySnapshot};

/// Inbound frame: an optional correlation id plus one command.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientFrame {
    /// Echoed back in the matching `response`
    #[serde(default)]
    pub id: Option<String>,
    #[serde(flatten)]
    pub command: ClientCommand,
}

impl ClientFrame {
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Best-effort `id` of a frame that failed typed parsing, so the error
    /// reply can still be correlated.
    pub fn salvage_id(text: &str) -> Option<String> {
        let value: Value = serde_json::from_str(text).ok()?;
        value.get("id")?.as_str().map(str::to_string)
    }
}

/// Commands issued by the presenter or a participant.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientCommand {
    /// Register the connection under a display name
    Join { name: String },
    /// Start a new poll
    CreatePoll(PollDraft),
    /// Vote on the live poll
    #[serde(rename_all = "camelCase")]
    Vote { poll_id: PollId, option_index: i64 },
    /// Remove the first participant registered under `name`
    Kick { name: String },
    /// Concluded polls, oldest first
    FetchHistory,
    /// Tally of one poll: live while it runs, final once closed
    #[serde(rename_all = "camelCase")]
    FetchResults { poll_id: PollId },
}

impl ClientCommand {
    pub fn name(&self) -> &'static str {
        match self {
            ClientCommand::Join { .. } => "join",
            ClientCommand::CreatePoll(_) => "createPoll",
            ClientCommand::Vote { .. } => "vote",
            ClientCommand::Kick { .. } => "kick",
            ClientCommand::FetchHistory => "fetchHistory",
            ClientCommand::FetchResults { .. } => "fetchResults",
        }
    }
}

/// Error payload of a failed command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorShape {
    pub code: String,
    pub message: String,
}

pub fn error_shape(code: &str, message: impl Into<String>) -> ErrorShape {
    ErrorShape {
        code: code.to_string(),
        message: message.into(),
    }
}

/// Events pushed to connections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum ServerEvent {
    /// First frame on every socket
    #[serde(rename_all = "camelCase")]
    Connected { connection_id: ConnectionId },
    /// Current poll for a joining connection; `poll` absent when none exists yet
    Snapshot {
        state: LifecycleState,
        #[serde(skip_serializing_if = "Option::is_none")]
        poll: Option<Poll>,
    },
    PollStarted { poll: Poll },
    TallyUpdated { tally: TallySnapshot },
    #[serde(rename_all = "camelCase")]
    VotingClosed {
        poll_id: PollId,
        tally: TallySnapshot,
        reason: ClosureReason,
    },
    #[serde(rename_all = "camelCase")]
    PollCleared { poll_id: PollId },
    ParticipantsChanged { names: Vec<String> },
    /// Sent only to a kicked connection
    RemovedFromSession,
    /// Reply to one inbound frame
    Response {
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        ok: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        result: Option<Value>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<ErrorShape>,
    },
}

impl ServerEvent {
    pub fn ok(id: Option<String>, result: Value) -> Self {
        ServerEvent::Response {
            id,
            ok: true,
            result: Some(result),
            error: None,
        }
    }

    pub fn err(id: Option<String>, error: ErrorShape) -> Self {
        ServerEvent::Response {
            id,
            ok: false,
            result: None,
            error: Some(error),
        }
    }

    /// Whether the connection should be closed once this event is written.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ServerEvent::RemovedFromSession)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_join_with_id() {
        let frame = ClientFrame::parse(r#"{"id":"r1","type":"join","name":"Ada"}"#).unwrap();
        assert_eq!(frame.id.as_deref(), Some("r1"));
        assert!(matches!(frame.command, ClientCommand::Join { ref name } if name == "Ada"));
    }

    #[test]
    fn test_parse_create_poll() {
        let frame = ClientFrame::parse(
            r#"{"type":"createPoll","question":"Q?","options":[{"text":"a"},{"text":"b","isCorrect":true}],"durationSecs":30}"#,
        )
        .unwrap();
        assert!(frame.id.is_none());
        match frame.command {
            ClientCommand::CreatePoll(draft) => {
                assert_eq!(draft.question, "Q?");
                assert_eq!(draft.options.len(), 2);
                assert_eq!(draft.duration_secs, Some(30));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_vote_and_history() {
        let vote = ClientFrame::parse(r#"{"type":"vote","pollId":3,"optionIndex":1}"#).unwrap();
        assert!(matches!(
            vote.command,
            ClientCommand::Vote {
                poll_id: 3,
                option_index: 1
            }
        ));

        let history = ClientFrame::parse(r#"{"type":"fetchHistory"}"#).unwrap();
        assert_eq!(history.command.name(), "fetchHistory");

        let results = ClientFrame::parse(r#"{"type":"fetchResults","pollId":4}"#).unwrap();
        assert!(matches!(
            results.command,
            ClientCommand::FetchResults { poll_id: 4 }
        ));
    }

    #[test]
    fn test_negative_option_index_parses() {
        let vote = ClientFrame::parse(r#"{"type":"vote","pollId":1,"optionIndex":-1}"#).unwrap();
        assert!(matches!(
            vote.command,
            ClientCommand::Vote {
                option_index: -1,
                ..
            }
        ));
    }

    #[test]
    fn test_salvage_id() {
        assert_eq!(
            ClientFrame::salvage_id(r#"{"id":"v","type":"vote","pollId":"nope"}"#).as_deref(),
            Some("v")
        );
        assert_eq!(ClientFrame::salvage_id(r#"{"id":5,"type":"join"}"#), None);
        assert_eq!(ClientFrame::salvage_id("{broken"), None);
    }

    #[test]
    fn test_parse_rejects_unknown_and_malformed() {
        assert!(ClientFrame::parse(r#"{"type":"chatMessage","text":"hi"}"#).is_err());
        assert!(ClientFrame::parse(r#"{"type":"vote","pollId":"x"}"#).is_err());
        assert!(ClientFrame::parse("not json").is_err());
    }

    #[test]
    fn test_event_tags() {
        let event = ServerEvent::ParticipantsChanged {
            names: vec!["Ada".into()],
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({ "event": "participantsChanged", "names": ["Ada"] })
        );

        let removed = serde_json::to_value(ServerEvent::RemovedFromSession).unwrap();
        assert_eq!(removed, json!({ "event": "removedFromSession" }));
        assert!(ServerEvent::RemovedFromSession.is_terminal());
    }

    #[test]
    fn test_snapshot_without_poll_omits_field() {
        let event = ServerEvent::Snapshot {
            state: LifecycleState::Idle,
            poll: None,
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({ "event": "snapshot", "state": "idle" })
        );
    }

    #[test]
    fn test_response_shapes() {
        let ok = ServerEvent::ok(Some("7".into()), json!({ "ok": true }));
        let value = serde_json::to_value(&ok).unwrap();
        assert_eq!(value["event"], "response");
        assert_eq!(value["id"], "7");
        assert_eq!(value["ok"], true);
        assert!(value.get("error").is_none());

        let err = ServerEvent::err(None, error_shape("DUPLICATE_VOTE", "already voted"));
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(value["ok"], false);
        assert_eq!(value["error"]["code"], "DUPLICATE_VOTE");
        assert!(value.get("id").is_none());
    }

    #[test]
    fn test_voting_closed_shape() {
        let event = ServerEvent::VotingClosed {
            poll_id: 2,
            tally: TallySnapshot {
                poll_id: 2,
                counts: vec![2, 1],
                total_votes: 3,
            },
            reason: ClosureReason::AllVoted,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "votingClosed");
        assert_eq!(value["pollId"], 2);
        assert_eq!(value["tally"]["counts"], json!([2, 1]));
        assert_eq!(value["reason"], "allVoted");
    }
}
