//! `gst-recon run` / `gst-recon validate`: config-driven GST vs Tally reconciliation.

use std::path::{Path, PathBuf};

use clap::Subcommand;
use gst_recon::engine::load_csv_records;
use gst_recon::model::{Record, ReconReport};
use gst_recon::ReconConfig;

use crate::exit_codes::{EXIT_RECON_DIFFERENCES, EXIT_RECON_INVALID_CONFIG, EXIT_RECON_RUNTIME};
use crate::export::write_bucket_csvs;
use crate::CliError;

#[derive(Subcommand)]
pub enum ReconCommands {
    /// Reconcile a GST portal export against a Tally ledger export
    #[command(after_help = "\
Exit codes:
  0  every record matched exactly
  1  partial matches or source-only records found
  3  invalid config
  4  unreadable input or unwritable output

Examples:
  gst-recon run recon.toml
  gst-recon run recon.toml --json
  gst-recon run recon.toml --output report.json --csv-dir out/")]
    Run {
        /// Path to the recon TOML config file
        config: PathBuf,

        /// Output JSON to stdout instead of only the human summary
        #[arg(long)]
        json: bool,

        /// Write JSON report to file (overrides [output] json)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Write one CSV per bucket into this directory (overrides [output] csv_dir)
        #[arg(long)]
        csv_dir: Option<PathBuf>,
    },

    /// Validate a recon config without running
    #[command(after_help = "\
Examples:
  gst-recon validate recon.toml")]
    Validate {
        /// Path to the recon TOML config file
        config: PathBuf,
    },
}

pub fn cmd_recon(cmd: ReconCommands, quiet: bool) -> Result<(), CliError> {
    match cmd {
        ReconCommands::Run { config, json, output, csv_dir } => {
            cmd_recon_run(config, json, output, csv_dir, quiet)
        }
        ReconCommands::Validate { config } => cmd_recon_validate(config),
    }
}

fn recon_err(code: u8, msg: impl Into<String>) -> CliError {
    CliError { code, message: msg.into(), hint: None }
}

fn read_config(config_path: &Path) -> Result<ReconConfig, CliError> {
    let config_str = std::fs::read_to_string(config_path).map_err(|e| {
        recon_err(EXIT_RECON_RUNTIME, format!("cannot read config {}: {e}", config_path.display()))
    })?;
    ReconConfig::from_toml(&config_str).map_err(|e| {
        recon_err(EXIT_RECON_INVALID_CONFIG, e.to_string())
            .with_hint("run `gst-recon validate <config>` to check the file")
    })
}

fn load_side(base_dir: &Path, side: &str, file: &str) -> Result<Vec<Record>, CliError> {
    let csv_path = base_dir.join(file);
    let csv_data = std::fs::read_to_string(&csv_path).map_err(|e| {
        recon_err(EXIT_RECON_RUNTIME, format!("cannot read {}: {e}", csv_path.display()))
    })?;
    let records = load_csv_records(side, &csv_data)
        .map_err(|e| recon_err(EXIT_RECON_RUNTIME, e.to_string()))?;
    tracing::info!(side, path = %csv_path.display(), rows = records.len(), "loaded source");
    Ok(records)
}

fn cmd_recon_run(
    config_path: PathBuf,
    json_output: bool,
    output_file: Option<PathBuf>,
    csv_dir: Option<PathBuf>,
    quiet: bool,
) -> Result<(), CliError> {
    let config = read_config(&config_path)?;

    // Resolve file paths relative to config file's directory
    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));

    let gst = load_side(base_dir, "gst", &config.gst.file)?;
    let tally = load_side(base_dir, "tally", &config.tally.file)?;

    let report = gst_recon::reconcile_with(&gst, &tally, &config.column_mapping(), &config.options())
        .map_err(|e| recon_err(EXIT_RECON_INVALID_CONFIG, e.to_string()))?;

    // Flags win over [output]; config paths are relative to the config file
    let output_file = output_file.or_else(|| config.output.json.as_ref().map(|p| base_dir.join(p)));
    let csv_dir = csv_dir.or_else(|| config.output.csv_dir.as_ref().map(|p| base_dir.join(p)));

    let json_str = serde_json::to_string_pretty(&report)
        .map_err(|e| recon_err(EXIT_RECON_RUNTIME, format!("JSON serialization error: {e}")))?;

    if let Some(ref path) = output_file {
        std::fs::write(path, &json_str)
            .map_err(|e| recon_err(EXIT_RECON_RUNTIME, format!("cannot write output: {e}")))?;
        if !quiet {
            eprintln!("wrote {}", path.display());
        }
    }

    if let Some(ref dir) = csv_dir {
        let written = write_bucket_csvs(&report, dir)?;
        if !quiet {
            eprintln!("wrote {} bucket file(s) to {}", written.len(), dir.display());
        }
    }

    if json_output {
        println!("{json_str}");
    }

    if !quiet {
        print_summary(&report);
    }

    if !report.summary.is_clean() {
        return Err(recon_err(EXIT_RECON_DIFFERENCES, "differences found"));
    }

    Ok(())
}

/// Human summary to stderr.
fn print_summary(report: &ReconReport) {
    let s = &report.summary;
    eprintln!(
        "{}: {} GST / {} Tally records, {} mapped column(s)",
        report.meta.name, s.gst_records, s.tally_records, report.meta.mapped_columns,
    );
    eprintln!(
        "  {} exact, {} partial ({} minor, {} major), {} GST only, {} Tally only",
        s.exact_matches, s.partial_matches, s.minor_partials, s.major_partials, s.gst_only, s.tally_only,
    );
    if s.date_failures > 0 {
        eprintln!("  {} invoice date value(s) could not be converted", s.date_failures);
        for failure in report.date_failures.iter().take(5) {
            eprintln!("    {} {}: {:?}", failure.record_id, failure.column, failure.value);
        }
    }
}

fn cmd_recon_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = read_config(&config_path)?;
    let active = config.mapping.iter().filter(|p| p.is_valid()).count();
    eprintln!(
        "valid: recon '{}' with {} active mapping pair(s) of {}, partial budget {}",
        config.name,
        active,
        config.mapping.len(),
        config.partial.budget,
    );
    Ok(())
}
