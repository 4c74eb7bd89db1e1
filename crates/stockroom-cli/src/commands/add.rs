use stockroom_core::models::SyncEntity;
use stockroom_core::services::Synced;
use stockroom_core::sync::CreateHook;

use crate::commands::common::pending_note;
use crate::error::CliError;

pub async fn run_add<E, H>(sync: &Synced<E, H>, fields: E) -> Result<(), CliError>
where
    E: SyncEntity,
    H: CreateHook<E>,
{
    let record = sync.create(fields).await?;
    println!("{}{}", record.id, pending_note(&record));
    Ok(())
}
