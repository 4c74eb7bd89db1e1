use stockroom_core::models::SyncEntity;
use stockroom_core::services::Synced;
use stockroom_core::sync::CreateHook;

use crate::commands::common::{pending_note, resolve_id};
use crate::error::CliError;

/// Apply `patch` to the record matching `query`; `None` means no field was given
pub async fn run_edit<E, H>(
    sync: &Synced<E, H>,
    query: &str,
    patch: Option<E::Patch>,
) -> Result<(), CliError>
where
    E: SyncEntity,
    H: CreateHook<E>,
{
    let Some(patch) = patch else {
        return Err(CliError::NothingToEdit);
    };
    let id = resolve_id(query, &sync.items())?;

    let updated = sync.edit(&id, &patch).await?;
    println!("{}{}", updated.id, pending_note(&updated));
    Ok(())
}
