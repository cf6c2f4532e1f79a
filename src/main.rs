use anyhow::Result;
use clap::Parser;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use guardpost::cli::{Cli, Commands};
use guardpost::config::Config;
use guardpost::security::{SecurityPolicy, Verdict, default_allowed_commands};
use guardpost::gateway;

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let cli = Cli::parse();
    let mut config = Config::load_or_init()?;
    config.apply_env_overrides();

    match cli.command {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.gateway.host = host;
            }
            if let Some(port) = port {
                config.gateway.port = port;
            }
            gateway::run_gateway(&config).await?;
            Ok(())
        }
        Commands::Check { command, cwd, roots } => {
            let roots = if roots.is_empty() {
                config.sandbox.allowed_paths.clone()
            } else {
                roots
            };
            let commands = if config.sandbox.allowed_commands.is_empty() {
                default_allowed_commands()
            } else {
                config.sandbox.allowed_commands.clone()
            };
            let policy = SecurityPolicy::new(commands, roots)?;
            match policy.validate_command(&command, cwd.as_deref()) {
                Verdict::Permitted => {
                    println!("permitted");
                    Ok(())
                }
                Verdict::Denied(reason) => {
                    println!("denied: {reason}");
                    std::process::exit(1);
                }
            }
        }
    }
}
