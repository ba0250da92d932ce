use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "fire-calc")]
#[command(about = "Sentinel-2 fire index compositor", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Worker threads (default: all CPUs)
    #[arg(long, global = true)]
    pub threads: Option<usize>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Composite a date window and export the stacked fire indices
    Run {
        /// JSON run configuration
        #[arg(short, long)]
        config: PathBuf,

        /// Scene manifest, overrides `catalog` in the configuration
        #[arg(short, long)]
        manifest: Option<PathBuf>,

        /// Compute the stack but skip the export
        #[arg(long)]
        dry_run: bool,

        /// Render the configured preview layers as PNG into this directory
        #[arg(long)]
        preview_dir: Option<PathBuf>,
    },

    /// List the stacked indices and their formulas
    Indices {
        /// Configuration whose custom indices should be listed too
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}
