//! Offline/online reconciliation engine.
//!
//! One generic [`EntitySynchronizer`] implements the local-first state machine
//! for every entity type:
//!
//! - writes land in the local table first (optimistic) and are pushed right
//!   away when online
//! - records the remote store has not confirmed carry `unsynced = true`;
//!   records created offline carry a provisional `temp-` id
//! - [`EntitySynchronizer::sweep`] replays pending creates, updates and
//!   deletes, remapping provisional ids to authoritative ones
//! - [`EntitySynchronizer::refresh`] replaces local contents with the
//!   authoritative snapshot, according to the configured [`RefreshPolicy`]
//!
//! The [`SyncOrchestrator`] drives sweeps on reconnect and on a fixed timer.

mod hooks;
mod orchestrator;
mod synchronizer;
#[cfg(test)]
pub(crate) mod testing;

pub use hooks::{CreateHook, NoHook, RestockProduct};
pub use orchestrator::{OrchestratorHandle, SyncOrchestrator};
pub use synchronizer::EntitySynchronizer;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// How a snapshot refresh treats local records not yet pushed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshPolicy {
    /// Clear and replace with the remote snapshot; pending local records are lost
    Replace,
    /// Attempt a sweep, then replace with the remote snapshot
    #[default]
    SweepFirst,
    /// Attempt a sweep, then replace while keeping records still pending
    PreservePending,
}

/// Outcome of one sweep over a local table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Pending records confirmed by the remote store
    pub pushed: usize,
    /// Pending records left for the next sweep
    pub failed: usize,
}

impl SweepReport {
    /// Whether nothing is left pending after this sweep
    pub const fn is_clean(&self) -> bool {
        self.failed == 0
    }

    /// Combine two reports
    #[must_use]
    pub const fn merge(self, other: Self) -> Self {
        Self {
            pushed: self.pushed + other.pushed,
            failed: self.failed + other.failed,
        }
    }
}

/// Type-erased view of a synchronizer, as driven by the orchestrator
#[async_trait]
pub trait SyncTarget: Send + Sync {
    /// Entity kind handled by this target
    fn kind(&self) -> &'static str;

    /// Push every pending mutation
    async fn sweep(&self) -> Result<SweepReport>;

    /// Reload from the authoritative snapshot
    async fn refresh(&self) -> Result<()>;

    /// Number of records still owed to the remote store
    async fn pending(&self) -> Result<usize>;
}
