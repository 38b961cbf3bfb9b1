use clap::Parser;

use livepoll::cli::{self, Cli, Command, ConfigCommand};
use livepoll::{logging, server};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    match cli.command {
        None => run_server(config_path, None, None).await,
        Some(Command::Start { host, port }) => run_server(config_path, host, port).await,
        Some(Command::Config(ConfigCommand::Show)) => cli::handle_config_show(config_path),
        Some(Command::Config(ConfigCommand::Check)) => {
            if !cli::handle_config_check(config_path)? {
                std::process::exit(1);
            }
            Ok(())
        }
        Some(Command::Version) => {
            cli::handle_version();
            Ok(())
        }
    }
}

async fn run_server(
    config_path: Option<&std::path::Path>,
    host: Option<String>,
    port: Option<u16>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = cli::resolve_start_config(config_path, host, port)?;
    logging::init_logging(&config.logging)?;
    server::run(&config).await
}
