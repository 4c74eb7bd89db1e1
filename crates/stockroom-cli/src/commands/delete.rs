use stockroom_core::models::{RecordId, SyncEntity};
use stockroom_core::services::Synced;
use stockroom_core::sync::CreateHook;

use crate::commands::common::resolve_id;
use crate::error::CliError;

pub async fn run_delete<E, H>(sync: &Synced<E, H>, query: &str) -> Result<RecordId, CliError>
where
    E: SyncEntity,
    H: CreateHook<E>,
{
    let id = resolve_id(query, &sync.items())?;
    sync.delete(&id).await?;
    println!("{id}");
    Ok(id)
}
