use crate::client::ApiClient;
use crate::error::CliError;

pub async fn run_set_visibility(
    client: &ApiClient,
    sheet: &str,
    hidden: bool,
) -> Result<(), CliError> {
    client.set_visibility(sheet, hidden).await?;
    let state = if hidden { "hidden" } else { "visible" };
    println!("Sheet `{sheet}` is now {state}");
    Ok(())
}
