// GST vs Tally reconciliation CLI

mod exit_codes;
mod export;
mod logging;
mod recon;

use std::process::ExitCode;

use clap::Parser;

use exit_codes::{EXIT_SUCCESS, EXIT_USAGE};
use recon::ReconCommands;

#[derive(Parser)]
#[command(name = "gst-recon")]
#[command(author, version, about = "Reconcile GST portal exports against Tally ledger exports")]
#[command(after_help = "\
Examples:
  gst-recon run recon.toml
  gst-recon run recon.toml --json > report.json
  gst-recon -v run recon.toml --csv-dir out/
  gst-recon validate recon.toml

Set RUST_LOG (e.g. RUST_LOG=gst_recon=debug) for fine-grained logging.")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only print errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Option<ReconCommands>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_logging(logging::level_for(cli.verbose, cli.quiet));

    let result = match cli.command {
        None => Err(CliError::usage("no command given")
            .with_hint("try `gst-recon run <config.toml>` or `gst-recon --help`")),
        Some(cmd) => recon::cmd_recon(cmd, cli.quiet),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn usage(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
