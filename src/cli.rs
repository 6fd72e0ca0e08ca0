use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "calendario", version, about = "Terminal month calendar with local events")]
pub struct Cli {
    /// Events file to use instead of the project/global store
    #[arg(long, global = true)]
    pub file: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a project-local events store in the current directory
    Init,
    /// Add an event
    Add {
        /// Title of the event
        title: String,
        /// Day of the event (YYYY-MM-DD)
        #[arg(long, short = 'd')]
        date: String,
        /// Start time (HH:MM); omit for an all-day event
        #[arg(long, short = 't')]
        time: Option<String>,
        /// Where it happens
        #[arg(long, short = 'l')]
        location: Option<String>,
        /// Longer description
        #[arg(long)]
        description: Option<String>,
    },
    /// List the events of one day (defaults to today)
    Day {
        /// Day to list (YYYY-MM-DD)
        date: Option<String>,
    },
    /// Print the month grid (defaults to the current month)
    Month {
        /// Month to print (YYYY-MM)
        month: Option<String>,
    },
    /// Launch the interactive TUI
    Tui,
}
