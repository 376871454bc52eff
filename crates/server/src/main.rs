use clap::Parser;

use aquarisk_server::cli::{Cli, Command};
use aquarisk_server::startup;

fn load_config() -> aquarisk_core::Config {
    aquarisk_core::config::load_dotenv();
    aquarisk_core::Config::from_env()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = load_config();
    config.log_summary();

    match cli.command_or_default() {
        Command::Serve { port } => startup::serve(&config, port).await?,
        Command::Train { csv, out } => startup::train(&config, csv.as_deref(), out.as_deref())?,
        Command::Evaluate { csv, test_fraction } => {
            startup::run_evaluation(&config, csv.as_deref(), test_fraction)?
        }
    }

    Ok(())
}
