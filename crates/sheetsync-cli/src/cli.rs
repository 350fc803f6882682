use clap::{Parser, Subcommand};
use sheetsync_core::config::JOURNAL_SHEET_NAME;

#[derive(Parser)]
#[command(name = "sheetsync")]
#[command(about = "Poll and manage the sheetsync edit journal")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Base URL of the sheetsync API
    #[arg(
        long,
        global = true,
        value_name = "URL",
        env = "SHEETSYNC_API_URL",
        default_value = "http://127.0.0.1:8080"
    )]
    pub api_url: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Ask whether the batch job may run now
    Poll,
    /// List pending journal records
    Journal {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove and print every pending journal record
    Drain {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Hide a sheet
    Hide {
        #[arg(long, value_name = "NAME", default_value = JOURNAL_SHEET_NAME)]
        sheet: String,
    },
    /// Show a hidden sheet
    Show {
        #[arg(long, value_name = "NAME", default_value = JOURNAL_SHEET_NAME)]
        sheet: String,
    },
}
