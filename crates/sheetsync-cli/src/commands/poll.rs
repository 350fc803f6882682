use std::process::ExitCode;

use sheetsync_core::models::Readiness;

use crate::client::ApiClient;
use crate::error::CliError;

/// Print the readiness literal and map it to the process exit status
pub async fn run_poll(client: &ApiClient) -> Result<ExitCode, CliError> {
    let readiness = client.poll().await?;
    println!("{readiness}");
    Ok(ExitCode::from(exit_status(readiness)))
}

pub fn exit_status(readiness: Readiness) -> u8 {
    match readiness {
        Readiness::Ready => 0,
        Readiness::NotReady(_) => 2,
        Readiness::Error(_) => 1,
    }
}
