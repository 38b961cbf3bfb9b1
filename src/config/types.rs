//! Typed configuration structures
//!
//! Strongly-typed access to configuration values with defaults. Every field
//! may be omitted from the file.

use serde::{Deserialize, Serialize};
use std::net::Ipv6Addr;
use std::time::Duration;

use crate::logging::{LogFormat, LoggingConfig};
use crate::polls::{LifecycleSettings, PollLimits};
use crate::session::hub::SessionSettings;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Listener configuration
    pub server: ServerConfig,

    /// Poll timing and limits
    pub polls: PollsConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Listener configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,

    /// Bind port
    pub port: u16,

    /// Events buffered per connection before new ones are dropped
    pub connection_queue_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            connection_queue_size: 100,
        }
    }
}

pub const DEFAULT_PORT: u16 = 5001;

/// Poll timing and limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PollsConfig {
    /// Voting window when a draft does not specify one
    pub default_duration_secs: u64,

    /// Longest voting window a presenter may request
    pub max_duration_secs: u64,

    /// How long final results stay up before the session goes idle
    pub results_view_secs: u64,

    /// Most options a poll may carry
    pub max_options: usize,
}

impl Default for PollsConfig {
    fn default() -> Self {
        Self {
            default_duration_secs: 60,
            max_duration_secs: 3600,
            results_view_secs: 25,
            max_options: 50,
        }
    }
}

impl Config {
    /// Settings handed to the session hub.
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            lifecycle: LifecycleSettings {
                limits: PollLimits {
                    default_duration_secs: self.polls.default_duration_secs,
                    max_duration_secs: self.polls.max_duration_secs,
                    max_options: self.polls.max_options,
                },
                results_view: Duration::from_secs(self.polls.results_view_secs),
            },
            connection_queue_size: self.server.connection_queue_size,
        }
    }

    /// `host:port`, with IPv6 literals bracketed.
    pub fn bind_address(&self) -> String {
        let host = self.server.host.trim_start_matches('[').trim_end_matches(']');
        if host.parse::<Ipv6Addr>().is_ok() {
            format!("[{}]:{}", host, self.server.port)
        } else {
            format!("{}:{}", host, self.server.port)
        }
    }

    pub fn log_format(&self) -> LogFormat {
        self.logging.format
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.server.port, 5001);
        assert_eq!(cfg.polls.results_view_secs, 25);
        assert_eq!(cfg.bind_address(), "0.0.0.0:5001");
    }

    #[test]
    fn test_bind_address_brackets_ipv6() {
        let mut cfg = Config::default();
        cfg.server.host = "::1".to_string();
        assert_eq!(cfg.bind_address(), "[::1]:5001");
        assert!(cfg.bind_address().parse::<std::net::SocketAddr>().is_ok());

        cfg.server.host = "[::]".to_string();
        assert_eq!(cfg.bind_address(), "[::]:5001");

        cfg.server.host = "localhost".to_string();
        assert_eq!(cfg.bind_address(), "localhost:5001");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let cfg: Config = json5::from_str("{ polls: { resultsViewSecs: 10 } }").unwrap();
        assert_eq!(cfg.polls.results_view_secs, 10);
        assert_eq!(cfg.polls.default_duration_secs, 60);
        assert_eq!(cfg.server, ServerConfig::default());
    }

    #[test]
    fn test_session_settings_mapping() {
        let mut cfg = Config::default();
        cfg.polls.results_view_secs = 5;
        cfg.polls.max_options = 4;
        cfg.server.connection_queue_size = 16;

        let settings = cfg.session_settings();
        assert_eq!(settings.lifecycle.results_view, Duration::from_secs(5));
        assert_eq!(settings.lifecycle.limits.max_options, 4);
        assert_eq!(settings.connection_queue_size, 16);
    }
}
