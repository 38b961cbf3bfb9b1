//! CLI subcommand definitions and handlers.
//!
//! Uses clap derive to define the subcommand hierarchy:
//! - `start` (default) -- start the poll server
//! - `config show|check` -- inspect configuration
//! - `version` -- print build/version info

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use crate::config::{self, Config};

/// Live poll server: one presenter, many participants.
#[derive(Parser, Debug)]
#[command(
    name = "livepoll",
    version = env!("CARGO_PKG_VERSION"),
    about = "Live classroom poll server over WebSocket"
)]
pub struct Cli {
    /// Path to a json5 config file (default: $LIVEPOLL_CONFIG).
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the poll server (default when no subcommand is given).
    Start {
        /// Override the bind host.
        #[arg(long)]
        host: Option<String>,

        /// Override the bind port.
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Inspect configuration.
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Print version, build date, and git commit information.
    Version,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the fully loaded configuration as JSON.
    Show,

    /// Validate the configuration and report every problem.
    Check,
}

// ---------------------------------------------------------------------------
// Subcommand handlers
// ---------------------------------------------------------------------------

/// Load configuration and apply `start` flag overrides.
pub fn resolve_start_config(
    path: Option<&Path>,
    host: Option<String>,
    port: Option<u16>,
) -> Result<Config, config::ConfigError> {
    let mut cfg = config::load_config(path)?;
    if let Some(host) = host {
        cfg.server.host = host;
    }
    if let Some(port) = port {
        cfg.server.port = port;
    }
    Ok(cfg)
}

/// Run the `config show` subcommand.
pub fn handle_config_show(path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let cfg = config::load_config(path)?;
    println!("{}", serde_json::to_string_pretty(&cfg)?);
    Ok(())
}

/// Run the `config check` subcommand. Returns whether the config is valid.
pub fn handle_config_check(path: Option<&Path>) -> Result<bool, Box<dyn std::error::Error>> {
    let mut cfg = match config::get_config_path(path) {
        Some(path) => config::load_config_file(&path)?,
        None => Config::default(),
    };
    config::apply_env_overrides(&mut cfg, |key| std::env::var(key).ok())?;

    let issues = config::validate_config(&cfg);
    if issues.is_empty() {
        println!("Configuration OK");
        return Ok(true);
    }
    for issue in &issues {
        eprintln!("  {}: {}", issue.path, issue.message);
    }
    eprintln!("{} problem(s) found", issues.len());
    Ok(false)
}

/// Run the `version` subcommand.
pub fn handle_version() {
    println!("livepoll {}", env!("CARGO_PKG_VERSION"));
    println!("  Build date: {}", env!("LIVEPOLL_BUILD_DATE"));
    println!("  Git commit: {}", env!("LIVEPOLL_GIT_HASH"));
    println!(
        "  Platform:   {} ({})",
        std::env::consts::OS,
        std::env::consts::ARCH
    );
}
