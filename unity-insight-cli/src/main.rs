//! Build-inspection CLI
//!
//! Runs the analysis pipeline over one or more APK/OBB archives and
//! prints the report.

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use unity_insight::{Analyzer, ContainerSet};

#[derive(Parser)]
#[command(name = "unity-insight")]
#[command(about = "Inspect shipped Android builds of Unity games")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a build and print the findings
    Analyze {
        /// Primary application archive first, expansion archives after it
        #[arg(required = true)]
        archives: Vec<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Directory receiving the persisted raw artifacts
        #[arg(long)]
        download_root: Option<PathBuf>,
    },

    /// List the entries of the given archives
    Entries {
        #[arg(required = true)]
        archives: Vec<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Analyze {
            archives,
            format,
            download_root,
        } => analyze_command(archives, format, download_root),
        Commands::Entries { archives } => entries_command(archives),
    }
}

fn analyze_command(
    archives: Vec<PathBuf>,
    format: OutputFormat,
    download_root: Option<PathBuf>,
) -> Result<()> {
    let analyzer = match download_root {
        Some(root) => Analyzer::with_download_root(root),
        None => Analyzer::new(),
    };
    let report = analyzer.analyze(&archives)?;
    match format {
        OutputFormat::Text => print!("{report}"),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(())
}

fn entries_command(archives: Vec<PathBuf>) -> Result<()> {
    let set = ContainerSet::open(&archives)?;
    println!("✓ Opened {} archive(s)", set.archive_count());
    for (archive, name) in set.entry_names() {
        println!("  [{}] {}", set.archive_label(archive), name);
    }
    Ok(())
}
