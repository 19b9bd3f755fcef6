//! Command line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "strelay",
    version,
    about = "Push a local video into a streaming origin and relay its HLS renditions from a local cache"
)]
pub struct Args {
    /// Path to the configuration file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only log errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run one streaming session: allocate, push, cache and serve.
    Stream {
        /// Local video file to push into the origin.
        #[arg(short, long)]
        input: PathBuf,

        /// Stream name registered with the origin; defaults to the configured name.
        #[arg(short, long)]
        name: Option<String>,

        /// Write the session report JSON to this file as well as stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Disable the local cache and content server for this run.
        #[arg(long)]
        no_cache: bool,
    },

    /// Inspect or reset the configuration file.
    Config {
        /// Print the active configuration.
        #[arg(long)]
        show: bool,

        /// Write the default configuration back to disk.
        #[arg(long)]
        reset: bool,
    },
}
