//
// main.rs
// Dicom-Deid-rs
//
// Entry point that hands off execution to the CLI layer.
//
// Thales Matheus Mendonça Santos - November 2025

use dicom_deid::cli;

fn main() -> anyhow::Result<()> {
    // Argument parsing, configuration loading and the run itself live in the CLI module.
    cli::run()
}
