use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "guardpost",
    about = "Restricted remote-diagnostics agent: whitelisted commands, sandboxed paths, screened log search.",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the HTTP gateway
    Serve {
        /// Bind host (overrides config)
        #[arg(long)]
        host: Option<String>,
        /// Bind port (overrides config)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Validate a command line against the sandbox policy and print the verdict
    Check {
        /// The command line to validate
        command: String,
        /// Working directory the command would run in
        #[arg(long)]
        cwd: Option<PathBuf>,
        /// Allowed root directory (repeatable; overrides config)
        #[arg(long = "root")]
        roots: Vec<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_parses_with_overrides() {
        let cli = Cli::parse_from(["guardpost", "serve", "--host", "0.0.0.0", "--port", "9000"]);
        match cli.command {
            Commands::Serve { host, port } => {
                assert_eq!(host.as_deref(), Some("0.0.0.0"));
                assert_eq!(port, Some(9000));
            }
            Commands::Check { .. } => panic!("expected serve"),
        }
    }

    #[test]
    fn check_parses_command_and_roots() {
        let cli = Cli::parse_from([
            "guardpost",
            "check",
            "ls -la /data",
            "--root",
            "/data",
            "--root",
            "/var/log",
        ]);
        match cli.command {
            Commands::Check { command, roots, cwd } => {
                assert_eq!(command, "ls -la /data");
                assert_eq!(roots.len(), 2);
                assert!(cwd.is_none());
            }
            Commands::Serve { .. } => panic!("expected check"),
        }
    }
}
