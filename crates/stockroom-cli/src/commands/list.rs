use serde::Serialize;
use stockroom_core::models::Record;

use crate::cli::ListArgs;
use crate::commands::common::{format_record_lines, Describe};
use crate::error::CliError;

pub fn run_list<E: Describe + Serialize>(
    records: Vec<Record<E>>,
    args: ListArgs,
) -> Result<(), CliError> {
    let records = filter_records(records, args);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("Nothing to show.");
        return Ok(());
    }

    for line in format_record_lines(&records) {
        println!("{line}");
    }
    Ok(())
}

pub fn filter_records<E>(records: Vec<Record<E>>, args: ListArgs) -> Vec<Record<E>> {
    if args.pending {
        records.into_iter().filter(|record| record.unsynced).collect()
    } else {
        records
    }
}
