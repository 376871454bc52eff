//! Command-line interface.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Water-consumption risk scoring: train models, evaluate forecasts, serve the API.
#[derive(Parser, Debug)]
#[command(name = "aquarisk-server", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Start the HTTP server (default).
    Serve {
        /// Override the listen port.
        #[arg(long)]
        port: Option<u16>,
    },
    /// Fit one model per region, save the model set, and report detections.
    Train {
        /// Usage CSV (defaults to USAGE_CSV).
        #[arg(long)]
        csv: Option<PathBuf>,
        /// Output path for the model set (defaults to MODEL_PATH).
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Hold out the tail of each region and report forecast error.
    Evaluate {
        #[arg(long)]
        csv: Option<PathBuf>,
        /// Share of each region's rows held out (defaults to EVAL_TEST_FRACTION).
        #[arg(long)]
        test_fraction: Option<f64>,
    },
}

impl Cli {
    pub fn command_or_default(&self) -> Command {
        self.command.clone().unwrap_or(Command::Serve { port: None })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_means_serve() {
        let cli = Cli::parse_from(["aquarisk-server"]);
        assert_eq!(cli.command_or_default(), Command::Serve { port: None });
    }

    #[test]
    fn parses_train_overrides() {
        let cli = Cli::parse_from(["aquarisk-server", "train", "--csv", "in.csv", "--out", "m.msgpack"]);
        assert_eq!(
            cli.command,
            Some(Command::Train {
                csv: Some(PathBuf::from("in.csv")),
                out: Some(PathBuf::from("m.msgpack")),
            })
        );
    }

    #[test]
    fn parses_evaluate_fraction() {
        let cli = Cli::parse_from(["aquarisk-server", "evaluate", "--test-fraction", "0.3"]);
        assert!(matches!(cli.command, Some(Command::Evaluate { test_fraction: Some(f), .. }) if f == 0.3));
    }
}
