//! Configuration loading
//!
//! Reads an optional json5 file, applies `LIVEPOLL_*` environment overrides
//! and validates the result.

pub mod types;

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

pub use types::{Config, PollsConfig, ServerConfig, DEFAULT_PORT};

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "LIVEPOLL_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("invalid value for {key}: {value}")]
    InvalidEnv { key: String, value: String },

    #[error("invalid configuration: {}", format_issues(.0))]
    Invalid(Vec<ValidationIssue>),
}

/// One problem found by [`validate_config`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub path: String,
    pub message: String,
}

fn format_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|i| format!("{}: {}", i.path, i.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Resolve the config file: explicit path, else `LIVEPOLL_CONFIG`.
pub fn get_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    explicit
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from))
}

/// Load, apply environment overrides, and validate.
pub fn load_config(explicit: Option<&Path>) -> Result<Config, ConfigError> {
    let mut cfg = match get_config_path(explicit) {
        Some(path) => load_config_file(&path)?,
        None => Config::default(),
    };
    apply_env_overrides(&mut cfg, |key| std::env::var(key).ok())?;

    let issues = validate_config(&cfg);
    if !issues.is_empty() {
        return Err(ConfigError::Invalid(issues));
    }
    Ok(cfg)
}

/// Parse a json5 file without overrides or validation.
pub fn load_config_file(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "loading config");
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    json5::from_str(&raw).map_err(|err| ConfigError::Parse {
        path: path.to_path_buf(),
        message: err.to_string(),
    })
}

/// Apply `LIVEPOLL_HOST`, `LIVEPOLL_PORT` and `LIVEPOLL_LOG`.
pub fn apply_env_overrides(
    cfg: &mut Config,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(), ConfigError> {
    if let Some(host) = lookup("LIVEPOLL_HOST") {
        cfg.server.host = host;
    }
    if let Some(port) = lookup("LIVEPOLL_PORT") {
        cfg.server.port = port.trim().parse().map_err(|_| ConfigError::InvalidEnv {
            key: "LIVEPOLL_PORT".to_string(),
            value: port.clone(),
        })?;
    }
    if let Some(level) = lookup("LIVEPOLL_LOG") {
        cfg.logging.level = level;
    }
    Ok(())
}

/// Collect every problem with the configuration.
pub fn validate_config(cfg: &Config) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let mut push = |path: &str, message: &str| {
        issues.push(ValidationIssue {
            path: path.to_string(),
            message: message.to_string(),
        })
    };

    if cfg.server.host.trim().is_empty() {
        push("server.host", "must not be empty");
    }
    if cfg.server.connection_queue_size == 0 {
        push("server.connectionQueueSize", "must be at least 1");
    }

    let polls = &cfg.polls;
    if polls.max_duration_secs == 0 {
        push("polls.maxDurationSecs", "must be at least 1");
    }
    if polls.default_duration_secs == 0 || polls.default_duration_secs > polls.max_duration_secs {
        push(
            "polls.defaultDurationSecs",
            "must be between 1 and polls.maxDurationSecs",
        );
    }
    if polls.results_view_secs == 0 {
        push("polls.resultsViewSecs", "must be at least 1");
    }
    if polls.max_options < 2 {
        push("polls.maxOptions", "must allow at least 2 options");
    }

    if cfg.logging.level.trim().is_empty() {
        push("logging.level", "must not be empty");
    }
    issues
}
