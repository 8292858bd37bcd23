use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

use split_grade_core::config::CONFIG_FILENAME;

#[derive(Debug, Parser)]
#[command(name = "split-and-grade")]
#[command(
    about = "Split the corrected group submissions into per-student feedback files and fill in the Moodle gradesheet",
    long_about = None
)]
pub struct Cli {
    /// Configuration file. A commented template is written if it does not exist
    #[arg(long, default_value = CONFIG_FILENAME)]
    pub config: PathBuf,

    /// Show more detail (-v: parsing and extraction steps, -vv: everything)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Split the main PDF and grade the roster (default)
    Run,
    /// Print the effective configuration values
    PrintConfig,
}
