// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Marginalia — highlight-to-region extraction for photographed pages.
//
// Entry point. Initialises logging, loads settings from the data directory,
// and runs one command:
//
//   marginalia extract <image> <annotation.json> [--out-dir <dir>]
//   marginalia config

mod extract;
mod services;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use marginalia_core::AppConfig;
use marginalia_core::error::Result;
use marginalia_core::human_errors::humanize_error;

use services::{config_store, data_dir};

#[derive(Parser)]
#[command(name = "marginalia")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Extract highlighted regions from a photographed page", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the region crops for a photo and its annotation
    Extract {
        /// Photo of the page
        image: PathBuf,

        /// Annotation JSON drawn over the photo
        annotation: PathBuf,

        /// Directory for the crops and report (defaults to the data directory)
        #[arg(long = "out-dir")]
        out_dir: Option<PathBuf>,
    },
    /// Show the effective settings, saving defaults when none exist
    Config,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    tracing::info!("Marginalia starting");

    let data_dir = data_dir::data_dir();
    let config = config_store::load_config(&data_dir);

    let result = match cli.command {
        Commands::Extract {
            image,
            annotation,
            out_dir,
        } => {
            let out_dir = out_dir.unwrap_or_else(|| data_dir::data_subdir("extractions"));
            extract_to(&image, &annotation, &out_dir, &config)
        }
        Commands::Config => show_config(&data_dir, &config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "Command failed");
            let human = humanize_error(&err);
            eprintln!("{}\n{}", human.message, human.suggestion);
            ExitCode::FAILURE
        }
    }
}

fn extract_to(image: &Path, annotation: &Path, out_dir: &Path, config: &AppConfig) -> Result<()> {
    let report = extract::run(image, annotation, out_dir, config)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Print the effective settings, writing them out when no file exists yet.
fn show_config(data_dir: &Path, config: &AppConfig) -> Result<()> {
    let path = config_store::config_path(data_dir);
    if !path.exists() {
        config_store::persist_config(data_dir, config)?;
        tracing::info!(path = %path.display(), "Default settings written");
    }
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}
