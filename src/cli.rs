use clap::{Parser, Subcommand};
use log::info;

use crate::config::Config;
use crate::db::Database;
use crate::error::TathyaError;

#[derive(Parser)]
#[command(
    name = "tathya",
    version,
    about = "Tathya: Fraud case management and investigation service"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the server (default if no command specified)
    Serve {
        /// Bind address, overrides the configured host
        #[arg(long)]
        host: Option<String>,

        /// Bind port, overrides the configured port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Print the effective configuration and exit
    Config,
}

impl Cli {
    pub fn handle_command_line() -> Result<(), TathyaError> {
        let args = Cli::parse();

        // Default to Serve if no command specified
        match args.command.unwrap_or(Command::Serve {
            host: None,
            port: None,
        }) {
            Command::Serve { host, port } => Self::start_server(host, port),
            Command::Config => Self::print_config(),
        }
    }

    fn start_server(host: Option<String>, port: Option<u16>) -> Result<(), TathyaError> {
        Database::initialize()?;

        let host = host.unwrap_or_else(Config::get_server_host);
        let port = port.unwrap_or_else(Config::get_server_port);

        info!("Starting server on {}:{}", host, port);

        let rt = tokio::runtime::Runtime::new()
            .map_err(|e| TathyaError::Error(format!("Failed to create runtime: {}", e)))?;

        rt.block_on(async {
            let web_server = crate::server::WebServer::new(host, port);
            web_server.start().await
        })
    }

    fn print_config() -> Result<(), TathyaError> {
        let config = Config::current();
        let rendered = toml::to_string_pretty(&config)
            .map_err(|e| TathyaError::Error(format!("Failed to render config: {}", e)))?;
        print!("{}", rendered);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_parsing_no_command_defaults_to_serve() {
        let result = Cli::try_parse_from(["tathya"]);
        assert!(result.is_ok(), "Should accept no command");

        let cli = result.unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_cli_parsing_serve_with_overrides() {
        let result = Cli::try_parse_from(["tathya", "serve", "--host", "0.0.0.0", "--port", "9000"]);
        assert!(result.is_ok(), "Should accept serve with overrides");

        let cli = result.unwrap();
        match cli.command {
            Some(Command::Serve { host, port }) => {
                assert_eq!(host.as_deref(), Some("0.0.0.0"));
                assert_eq!(port, Some(9000));
            }
            _ => panic!("Expected serve command"),
        }
    }

    #[test]
    fn test_cli_parsing_config_command() {
        let result = Cli::try_parse_from(["tathya", "config"]);
        assert!(result.is_ok(), "Should accept config command");

        let cli = result.unwrap();
        assert!(matches!(cli.command, Some(Command::Config)));
    }

    #[test]
    fn test_cli_parsing_invalid_arguments() {
        let result = Cli::try_parse_from(["tathya", "nonexistent-command"]);
        assert!(result.is_err(), "Should reject unknown commands");

        let result = Cli::try_parse_from(["tathya", "serve", "--invalid-flag"]);
        assert!(result.is_err(), "Should reject unknown flags on serve");
    }
}
