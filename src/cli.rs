use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "todostack", version, about = "Daily to-do stack with rollover")]
pub struct Cli {
    /// Task file to use (defaults to ./tasks.yaml)
    #[arg(long, global = true)]
    pub file: Option<PathBuf>,
    /// Day to work on in YYYY-MM-DD format (defaults to today)
    #[arg(long, global = true)]
    pub date: Option<String>,
    /// Increase log verbosity (repeatable)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create an empty task file if none exists
    Init,
    /// Print the day's completed and to-do lists
    List,
    /// Add a task to the top of the day's to-do list
    Add {
        /// Task text
        text: String,
    },
    /// Append the previous day's unfinished tasks to the day's list
    Rollover,
    /// Launch the interactive TUI
    Tui,
}
