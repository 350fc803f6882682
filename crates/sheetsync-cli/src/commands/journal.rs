use sheetsync_core::ChangeRecord;

use crate::client::ApiClient;
use crate::error::CliError;

pub async fn run_journal(client: &ApiClient, as_json: bool) -> Result<(), CliError> {
    let records = client.journal().await?;
    print_records(&records, as_json, "No pending changes.")
}

pub async fn run_drain(client: &ApiClient, as_json: bool) -> Result<(), CliError> {
    let records = client.drain().await?;
    print_records(&records, as_json, "Journal was already empty.")
}

fn print_records(records: &[ChangeRecord], as_json: bool, empty: &str) -> Result<(), CliError> {
    if as_json {
        println!("{}", serde_json::to_string_pretty(records)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("{empty}");
        return Ok(());
    }

    for line in format_record_lines(records) {
        println!("{line}");
    }
    Ok(())
}

pub fn format_record_lines(records: &[ChangeRecord]) -> Vec<String> {
    records
        .iter()
        .map(|record| {
            let old_value = if record.old_value.is_empty() {
                "(blank)"
            } else {
                record.old_value.as_str()
            };
            format!(
                "{}  {}!{}  #{}  {} -> {}",
                record.timestamp,
                record.sheet_name,
                record.cell_address,
                record.record_id,
                old_value,
                record.new_value
            )
        })
        .collect()
}
