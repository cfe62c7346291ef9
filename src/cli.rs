use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "tracktap")]
#[command(author, version, about = "Extract track metadata while a media file streams")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Play a media file through the extraction tap and list its tracks
    Probe {
        /// File to probe
        #[arg(required = true)]
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Bytes per read (overrides the config file)
        #[arg(long)]
        chunk_size: Option<usize>,
    },

    /// Detect the container format of a file
    Sniff {
        /// File to inspect
        #[arg(required = true)]
        file: PathBuf,
    },

    /// Validate the configuration file given with --config
    Validate,

    /// Display version information
    Version,
}
