//! sheetsync CLI - poll the readiness gate and manage the edit journal
//! from the terminal or a scheduler.

mod cli;
mod client;
mod commands;
mod error;


use std::process::ExitCode;

use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::client::ApiClient;
use crate::commands::journal::{run_drain, run_journal};
use crate::commands::poll::run_poll;
use crate::commands::visibility::run_set_visibility;
use crate::error::CliError;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(error) => {
            eprintln!("Error: {error}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<ExitCode, CliError> {
    dotenvy::dotenv().ok();

    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    if let Ok(directive) = "sheetsync=info".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let client = ApiClient::new(cli.api_url)?;

    match cli.command {
        Commands::Poll => return run_poll(&client).await,
        Commands::Journal { json } => run_journal(&client, json).await?,
        Commands::Drain { json } => run_drain(&client, json).await?,
        Commands::Hide { sheet } => run_set_visibility(&client, &sheet, true).await?,
        Commands::Show { sheet } => run_set_visibility(&client, &sheet, false).await?,
    }

    Ok(ExitCode::SUCCESS)
}
