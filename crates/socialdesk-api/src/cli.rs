//! CLI definitions for the `socialdesk` binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use socialdesk_types::session::Provider;

/// Social media marketing assistant backend.
#[derive(Parser)]
#[command(name = "socialdesk", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Data directory holding `config.toml` and `socialdesk.db`.
    #[arg(long, global = true, env = "SOCIALDESK_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Detailed output (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server.
    Serve {
        /// Bind address (overrides `[server].host`).
        #[arg(long, env = "SOCIALDESK_HOST")]
        host: Option<String>,

        /// Port (overrides `[server].port`).
        #[arg(short, long, env = "SOCIALDESK_PORT")]
        port: Option<u16>,

        /// Export spans to stdout via OpenTelemetry.
        #[arg(long)]
        otel: bool,
    },

    /// Manage login sessions.
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },
}

#[derive(Subcommand)]
pub enum SessionAction {
    /// Create a session for a user and print its id (for local testing
    /// without the OAuth front end).
    Create {
        #[arg(long)]
        provider: Provider,

        /// The provider's own user id.
        #[arg(long)]
        provider_id: String,

        #[arg(long)]
        email: String,

        #[arg(long)]
        name: String,
    },
}

/// Default log directive for the given verbosity.
pub fn log_directive(verbose: u8) -> &'static str {
    match verbose {
        0 => "info",
        1 => "info,socialdesk_core=debug,socialdesk_infra=debug,socialdesk_api=debug",
        _ => "trace",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serve() {
        let cli = Cli::try_parse_from(["socialdesk", "serve", "--port", "9001"]).unwrap();
        match cli.command {
            Commands::Serve { port, host, otel } => {
                assert_eq!(port, Some(9001));
                assert!(host.is_none());
                assert!(!otel);
            }
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn test_parse_session_create() {
        let cli = Cli::try_parse_from([
            "socialdesk",
            "session",
            "create",
            "--provider",
            "google",
            "--provider-id",
            "1234",
            "--email",
            "ada@example.com",
            "--name",
            "Ada Lovelace",
        ])
        .unwrap();
        let Commands::Session {
            action: SessionAction::Create { provider, .. },
        } = cli.command
        else {
            panic!("expected session create");
        };
        assert_eq!(provider, Provider::Google);
    }

    #[test]
    fn test_log_directive() {
        assert_eq!(log_directive(0), "info");
        assert_eq!(log_directive(5), "trace");
    }
}
