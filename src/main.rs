mod builder;
mod frames;
mod manifest;
mod progress;
mod stages;
mod util;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use progress::{format_duration, BuildSummary, ProgressConfig, ProgressMode, VerifySummary};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "stagemap",
    version,
    about = "Scan per-run frame folders and phase annotations into one viewer manifest"
)]
struct Cli {
    #[command(subcommand)]
    cmd: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build manifest.json from the run folders under BASE_DIR (default command)
    Generate(GenerateArgs),

    /// Check an existing manifest against the folders and frames on disk
    Verify(VerifyArgs),
}

#[derive(Args)]
struct GenerateArgs {
    /// Directory holding one folder per run plus <run>_phases.csv files
    #[arg(default_value = builder::DEFAULT_BASE_DIR)]
    base_dir: PathBuf,

    /// Manifest destination. Default: BASE_DIR/manifest.json
    #[arg(long)]
    output: Option<PathBuf>,

    /// Emit frames as PREFIX/<run>/<file> (e.g. "/example") instead of bare file names
    #[arg(long)]
    frame_prefix: Option<String>,

    /// Only include the named run folder (repeatable)
    #[arg(long = "run", value_name = "NAME")]
    runs: Vec<String>,

    /// Progress display mode: auto (TTY-aware), rich, plain, quiet.
    #[arg(long, value_enum, default_value_t = ProgressMode::Auto)]
    progress: ProgressMode,
}

impl Default for GenerateArgs {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from(builder::DEFAULT_BASE_DIR),
            output: None,
            frame_prefix: None,
            runs: Vec::new(),
            progress: ProgressMode::Auto,
        }
    }
}

#[derive(Args)]
struct VerifyArgs {
    /// Directory holding the run folders
    #[arg(default_value = builder::DEFAULT_BASE_DIR)]
    base_dir: PathBuf,

    /// Manifest to check. Default: BASE_DIR/manifest.json
    #[arg(long)]
    manifest: Option<PathBuf>,

    /// Prefix the manifest was generated with, stripped before checking frames
    #[arg(long)]
    frame_prefix: Option<String>,

    /// Progress display mode: auto (TTY-aware), rich, plain, quiet.
    #[arg(long, value_enum, default_value_t = ProgressMode::Auto)]
    progress: ProgressMode,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.cmd.unwrap_or_else(|| Commands::Generate(GenerateArgs::default())) {
        Commands::Generate(args) => {
            let mut config = builder::BuildConfig::new(&args.base_dir);
            if let Some(output) = args.output {
                config.output = output;
            }
            config.frame_prefix = args.frame_prefix;
            config.only_runs = args.runs;

            let summary = builder::generate_manifest(&config, ProgressConfig::new(args.progress))?;
            print_build_summary(&summary);
        }

        Commands::Verify(args) => {
            let config = util::VerifyConfig {
                manifest_path: args
                    .manifest
                    .unwrap_or_else(|| args.base_dir.join(manifest::MANIFEST_FILE_NAME)),
                base_dir: args.base_dir,
                frame_prefix: args.frame_prefix,
            };
            let summary = util::verify_manifest(&config, ProgressConfig::new(args.progress))?;
            print_verify_summary(&summary);
        }
    }

    Ok(())
}

fn print_build_summary(summary: &BuildSummary) {
    println!(
        "Manifest summary: base={} output={} duration={} runs={} frames={} stages={} skipped_lines={} warnings={}",
        summary.base_dir.display(),
        summary.manifest_path.display(),
        format_duration(summary.elapsed),
        summary.run_count,
        summary.frame_count,
        summary.stage_count,
        summary.skipped_lines,
        summary.warning_count,
    );
    for warning in &summary.warnings {
        println!("  warning: {}", warning);
    }
}

fn print_verify_summary(summary: &VerifySummary) {
    println!(
        "Verify summary: manifest={} duration={} checked_runs={} checked_frames={} checked_stages={} warnings={}",
        summary.manifest_path.display(),
        format_duration(summary.elapsed),
        summary.checked_runs,
        summary.checked_frames,
        summary.checked_stages,
        summary.warning_count,
    );
    for warning in &summary.warnings {
        println!("  warning: {}", warning);
    }
}
