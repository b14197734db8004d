//! Command-line interface

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

/// Run analysis studies step by step and record how each run came about
#[derive(Parser, Debug)]
#[command(name = "studyrun", author, version, about, long_about = None)]
pub struct Cli {
    /// More console output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Project root (defaults to the current directory)
    #[arg(long, global = true, value_name = "DIR")]
    pub root: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the steps of a study in order
    Run(RunArgs),
    /// Print the run context for the current project
    Context(ContextArgs),
    /// Compute SHA-256 checksums of a file or directory
    Checksum(ChecksumArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Study name under the studies directory, or a path to a study directory
    pub study: String,

    /// Configuration file to record and pass to the steps
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Output root (defaults to <results_dir>/<study>)
    #[arg(short, long, value_name = "DIR")]
    pub out: Option<PathBuf>,

    /// Free text stored in the context's notes section
    #[arg(long)]
    pub notes: Option<String>,

    /// Do not echo the header and step output to stdout
    #[arg(short, long)]
    pub quiet: bool,

    /// Replace earlier context dumps and logs instead of numbering them
    #[arg(long)]
    pub overwrite: bool,

    /// Arguments appended to every step's command line
    #[arg(last = true, value_name = "STEP_ARGS")]
    pub extra: Vec<String>,
}

#[derive(Args, Debug)]
pub struct ContextArgs {
    /// Configuration file to embed
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Also dump the context under <DIR>/_context/<app-id>/
    #[arg(short, long, value_name = "DIR")]
    pub out: Option<PathBuf>,

    /// Name the dump is filed under
    #[arg(long, default_value = "context")]
    pub app_id: String,

    /// Free text stored in the notes section
    #[arg(long)]
    pub notes: Option<String>,

    /// Print JSON instead of the text header
    #[arg(long)]
    pub json: bool,

    /// Replace earlier dumps instead of numbering them
    #[arg(long)]
    pub overwrite: bool,
}

#[derive(Args, Debug)]
pub struct ChecksumArgs {
    /// File or directory to hash
    pub path: PathBuf,

    /// Glob selecting files inside a directory
    #[arg(short, long, default_value = "*")]
    pub pattern: String,

    /// Descend into subdirectories
    #[arg(short, long)]
    pub recursive: bool,

    /// Write the CSV manifest here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub out: Option<PathBuf>,

    /// Replace an existing manifest
    #[arg(short, long)]
    pub force: bool,
}
