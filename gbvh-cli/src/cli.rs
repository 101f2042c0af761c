use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "gbvh", about = "Extract and repack GBVH level containers", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write one JSON leaf unit per map found in a container
    Extract {
        /// Container file (.bvh)
        input: PathBuf,

        /// Directory for the units
        #[arg(long, short = 'o')]
        output: PathBuf,

        /// Write each unit on a single line
        #[arg(long)]
        compact: bool,
    },

    /// Rebuild a container from a directory of JSON leaf units
    Pack {
        /// Directory of <mapId>.json units
        input: PathBuf,

        /// Container file to write
        #[arg(long, short = 'o')]
        output: PathBuf,
    },

    /// Show the maps stored in a container
    Info {
        /// Container file (.bvh)
        input: PathBuf,
    },

    /// Dump the sections of a level file (.lvb) as JSON
    Sections {
        /// Level file (.lvb)
        input: PathBuf,

        /// Only print the section with this four-letter tag
        #[arg(long)]
        tag: Option<String>,

        /// Write the JSON on a single line
        #[arg(long)]
        compact: bool,
    },
}
