//
// cli.rs
// Dicom-Deid-rs
//
// Defines the CLI surface with Clap, loads the configuration and hands the run to the driver.
//
// Thales Matheus Mendonça Santos - November 2025

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::Level;

use crate::anonymize::DicomEditor;
use crate::config::{find_config, Config};
use crate::mount::LoopMounter;
use crate::run::{self, RunOptions, RunReport, Target};

/// Command-line interface glue code: defines the available verbs and dispatches to the run driver.
#[derive(Parser)]
#[command(name = "dicom-deid")]
#[command(
    about = "Clean DICOM files, disc images and directory trees into per-subject folders",
    long_about = None
)]
pub struct Cli {
    /// Echo progress to the console
    #[arg(short, long, global = true)]
    pub log: bool,
    /// Write a JSON sidecar with the final tags next to every cleaned file
    #[arg(short, long, global = true)]
    pub meta: bool,
    /// Use this subject id for every file instead of the identifier table
    #[arg(short = 's', long = "subid", global = true, value_name = "SUBJECT_ID")]
    pub subid: Option<String>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Clean one input path (file, .iso or directory) into an output directory
    Clean {
        input: PathBuf,
        output: PathBuf,
        /// Configuration file; the first config.yaml under the working directory otherwise
        config: Option<PathBuf>,
    },
    /// Clean every input/output pair listed in the configuration file
    Run { config: Option<PathBuf> },
}

pub fn run() -> anyhow::Result<()> {
    // Parse the raw CLI arguments once and dispatch to the run driver.
    let cli = Cli::parse();
    init_tracing(cli.log);

    let (config_path, target) = match cli.command {
        Commands::Clean {
            input,
            output,
            config,
        } => (config, Target::Paths { input, output }),
        Commands::Run { config } => (config, Target::Configured),
    };

    let config_path = match config_path {
        Some(path) => path,
        None => {
            let cwd = std::env::current_dir().context("Failed to read the working directory")?;
            find_config(&cwd)?
        }
    };
    let config = Config::load(&config_path)?;
    tracing::info!("Using configuration {:?}", config_path);

    let options = RunOptions {
        emit_sidecar: cli.meta,
        subject_override: cli.subid,
    };
    let mounter = LoopMounter::new(&config.mount);
    let report = run::execute(&config, &target, &options, &DicomEditor::new(), &mounter)
        .with_context(|| format!("Run aborted ({})", config_path.display()))?;

    print_report(&report, config.archive_dir.as_deref());
    Ok(())
}

fn init_tracing(verbose: bool) {
    let level = if verbose { Level::INFO } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();
}

fn print_report(report: &RunReport, archive_dir: Option<&Path>) {
    let summary = &report.summary;
    println!(
        "Processed {} files | saved: {} | failed: {} | unknown subject: {} | images mounted: {}",
        summary.visited, summary.saved, summary.failed, summary.unknown, summary.mounted
    );
    println!("Output folders: {}", report.outputs.len());

    if !report.unknown.is_empty() {
        println!("Subject ids missing from the identifier table:");
        for item in &report.unknown {
            println!("  {} ({})", item.path.display(), item.source_id);
        }
    }

    match (&report.archives, archive_dir) {
        (Some(archives), Some(dir)) => {
            println!("Archives moved to {}: {}", dir.display(), archives.archived.len());
            for (folder, reason) in &archives.failed {
                println!("  {} not archived: {}", folder.display(), reason);
            }
        }
        _ => println!("Archival skipped (no zip destination configured)"),
    }
}
