//! Generic local-first synchronizer for one entity type.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::{watch, Mutex};

use super::{CreateHook, NoHook, RefreshPolicy, SweepReport, SyncTarget};
use crate::connectivity::Connectivity;
use crate::db::LocalTable;
use crate::error::{Error, Result};
use crate::models::{Record, RecordId, SyncEntity};
use crate::remote::RemoteClient;

/// Local-first mutations and reconciliation for entity `E`.
///
/// Local writes happen under the table lock and always complete before any
/// remote call. The lock is never held across network I/O; instead each
/// remote result is applied by re-reading the record and checking it was not
/// changed in the meantime.
pub struct EntitySynchronizer<E, T, R, H = NoHook> {
    table: T,
    remote: Option<R>,
    connectivity: Connectivity,
    hook: H,
    policy: RefreshPolicy,
    projection: watch::Sender<Vec<Record<E>>>,
    sweep_gate: Mutex<()>,
    /// Set when the remote store applied a push whose reply was unreadable
    stale: AtomicBool,
    _entity: PhantomData<fn() -> E>,
}

impl<E, T, R> EntitySynchronizer<E, T, R, NoHook>
where
    E: SyncEntity,
    T: LocalTable<E>,
    R: RemoteClient<E>,
{
    /// Create a synchronizer. Without a remote client it behaves as if
    /// permanently offline.
    pub fn new(table: T, remote: Option<R>, connectivity: Connectivity) -> Self {
        let (projection, _) = watch::channel(Vec::new());
        Self {
            table,
            remote,
            connectivity,
            hook: NoHook,
            policy: RefreshPolicy::default(),
            projection,
            sweep_gate: Mutex::new(()),
            stale: AtomicBool::new(false),
            _entity: PhantomData,
        }
    }
}

impl<E, T, R, H> EntitySynchronizer<E, T, R, H>
where
    E: SyncEntity,
    T: LocalTable<E>,
    R: RemoteClient<E>,
    H: CreateHook<E>,
{
    /// Run `hook` for every new record, right after it is written locally
    pub fn with_hook<H2: CreateHook<E>>(self, hook: H2) -> EntitySynchronizer<E, T, R, H2> {
        EntitySynchronizer {
            table: self.table,
            remote: self.remote,
            connectivity: self.connectivity,
            hook,
            policy: self.policy,
            projection: self.projection,
            sweep_gate: self.sweep_gate,
            stale: self.stale,
            _entity: PhantomData,
        }
    }

    #[must_use]
    pub fn with_refresh_policy(mut self, policy: RefreshPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Live records as of the last completed operation
    pub fn items(&self) -> Vec<Record<E>> {
        self.projection.borrow().clone()
    }

    /// Observe the live-record projection
    pub fn subscribe(&self) -> watch::Receiver<Vec<Record<E>>> {
        self.projection.subscribe()
    }

    /// Look up a live record in the local table
    pub async fn find(&self, id: &RecordId) -> Result<Option<Record<E>>> {
        Ok(self.table.get(id).await?.filter(Record::is_live))
    }

    /// Count of records (tombstones included) owed to the remote store
    pub async fn pending(&self) -> Result<usize> {
        let records = self.table.get_all().await?;
        Ok(records.iter().filter(|record| record.unsynced).count())
    }

    /// Re-publish the projection from the local table
    pub async fn load(&self) -> Result<()> {
        let live: Vec<Record<E>> = self
            .table
            .get_all()
            .await?
            .into_iter()
            .filter(Record::is_live)
            .collect();
        self.projection.send_replace(live);
        Ok(())
    }

    /// Create a record.
    ///
    /// Written locally first, then the create hook runs; if the hook fails the
    /// local write is undone. When offline the record keeps a provisional id
    /// and stays pending. When online it is pushed immediately.
    ///
    /// Online, the record is first written under a timestamp id. Its id can
    /// therefore change twice: a failed push re-keys it to the provisional
    /// form of that id so the next sweep creates it, and the sweep later moves
    /// it to the id the remote store assigns. A push the remote store applied
    /// but answered unreadably keeps the timestamp id, takes the record off
    /// the push path, and leaves the next sweep to reload the snapshot.
    pub async fn create(&self, fields: E) -> Result<Record<E>> {
        fields.validate()?;
        let remote = self.online_remote();

        let record = {
            let _lock = self.table.lock().await;
            if let Some(name) = fields.unique_name() {
                self.ensure_name_available(name, None).await?;
            }

            let record = if remote.is_some() {
                Record::confirmed(RecordId::timestamped(), fields)
            } else {
                Record::pending(RecordId::provisional(), fields)
            };
            self.table.put(&record).await?;
            if let Err(error) = self.hook.on_create(&record.fields).await {
                if let Err(undo) = self.table.delete(&record.id).await {
                    tracing::warn!(
                        "Could not undo local {} {} after a failed create: {}",
                        E::KIND,
                        record.id,
                        undo
                    );
                }
                return Err(error);
            }
            record
        };
        tracing::debug!("Created {} {} locally", E::KIND, record.id);

        let record = match remote {
            Some(remote) => match remote.create(&record.fields).await {
                Ok(confirmed) => self.settle_created(&record, confirmed).await?,
                Err(error) if error.is_unreadable_response() => {
                    self.settle_unreadable(&record, &error).await?
                }
                Err(error) => {
                    tracing::warn!(
                        "Could not push new {} {}, keeping it pending: {}",
                        E::KIND,
                        record.id,
                        error
                    );
                    self.demote_to_provisional(&record).await?
                }
            },
            None => record,
        };

        self.load().await?;
        Ok(record)
    }

    /// Apply a partial update to a live record.
    ///
    /// Provisional records are never sent as updates; their next sweep
    /// creates them with the merged fields.
    pub async fn edit(&self, id: &RecordId, patch: &E::Patch) -> Result<Record<E>> {
        let remote = self.online_remote().filter(|_| !id.is_provisional());

        let record = {
            let _lock = self.table.lock().await;
            let Some(mut record) = self.table.get(id).await?.filter(Record::is_live) else {
                return Err(Error::not_found(E::KIND, id));
            };
            record.fields.apply(patch);
            record.fields.validate()?;
            if let Some(name) = record.fields.unique_name() {
                self.ensure_name_available(name, Some(id)).await?;
            }
            record.unsynced = remote.is_none();
            self.table.put(&record).await?;
            record
        };

        let record = match remote {
            Some(remote) => match remote.update(&record.id, &record.fields).await {
                Ok(confirmed) => self.settle_updated(&record, confirmed).await?,
                Err(error) if error.is_unreadable_response() => {
                    self.settle_unreadable(&record, &error).await?
                }
                Err(error) => {
                    tracing::warn!(
                        "Could not push edit of {} {}, keeping it pending: {}",
                        E::KIND,
                        record.id,
                        error
                    );
                    self.mark_pending(&record).await?
                }
            },
            None => record,
        };

        self.load().await?;
        Ok(record)
    }

    /// Delete a record. Deleting an absent record is a no-op.
    ///
    /// Provisional records never reached the remote store and are purged
    /// directly. Otherwise the record is removed remotely when possible and
    /// tombstoned when not.
    pub async fn delete(&self, id: &RecordId) -> Result<()> {
        let Some(record) = self.table.get(id).await? else {
            return Ok(());
        };

        if record.id.is_provisional() {
            let _lock = self.table.lock().await;
            self.table.delete(id).await?;
        } else if let Some(remote) = self.online_remote() {
            match remote.delete(id).await {
                Ok(()) => self.purge(id).await?,
                Err(error) if is_already_gone(&error) => self.purge(id).await?,
                Err(error) => {
                    tracing::warn!(
                        "Could not delete {} {} remotely, leaving a tombstone: {}",
                        E::KIND,
                        id,
                        error
                    );
                    self.tombstone(id).await?;
                }
            }
        } else {
            self.tombstone(id).await?;
        }

        self.load().await
    }

    /// Push every pending mutation, in scan order.
    ///
    /// One record failing does not stop the rest. Concurrent sweeps of the
    /// same synchronizer collapse into one; the losers return an empty report.
    /// If an earlier push was applied remotely but answered unreadably, the
    /// sweep ends by reloading the snapshot, keeping records still pending.
    pub async fn sweep(&self) -> Result<SweepReport> {
        let Some(remote) = self.online_remote() else {
            tracing::debug!("Offline, skipping {} sweep", E::KIND);
            return Ok(SweepReport::default());
        };
        let Ok(_gate) = self.sweep_gate.try_lock() else {
            tracing::debug!("{} sweep already running", E::KIND);
            return Ok(SweepReport::default());
        };

        let report = self.sweep_with(remote).await?;
        self.reload_if_stale(remote).await?;
        self.load().await?;
        Ok(report)
    }

    /// Replace local contents with the authoritative snapshot.
    ///
    /// Offline, or when the snapshot cannot be fetched, the projection is
    /// reloaded from the local table instead.
    pub async fn refresh(&self) -> Result<()> {
        let Some(remote) = self.online_remote() else {
            return self.load().await;
        };
        let _gate = self.sweep_gate.lock().await;

        if self.policy != RefreshPolicy::Replace {
            self.sweep_with(remote).await?;
        }

        let snapshot = match remote.list_all().await {
            Ok(snapshot) => snapshot,
            Err(error) => {
                tracing::warn!(
                    "Could not fetch {}, showing local data: {}",
                    E::COLLECTION,
                    error
                );
                return self.load().await;
            }
        };

        self.stale.store(false, Ordering::SeqCst);
        self.apply_snapshot(snapshot, self.policy == RefreshPolicy::PreservePending)
            .await?;
        self.load().await
    }

    /// Caller must hold the sweep gate
    async fn reload_if_stale(&self, remote: &R) -> Result<()> {
        if !self.stale.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        match remote.list_all().await {
            Ok(snapshot) => {
                self.apply_snapshot(snapshot, true).await?;
                tracing::info!("Reloaded {} after an unreadable reply", E::COLLECTION);
            }
            Err(error) => {
                self.stale.store(true, Ordering::SeqCst);
                tracing::warn!(
                    "Could not reload {}, will retry on the next sweep: {}",
                    E::COLLECTION,
                    error
                );
            }
        }
        Ok(())
    }

    /// Replace the local table with `snapshot`, optionally keeping records
    /// still owed to the remote store on top of it
    async fn apply_snapshot(&self, snapshot: Vec<Record<E>>, keep_pending: bool) -> Result<()> {
        let _lock = self.table.lock().await;
        let mut records: Vec<Record<E>> = snapshot
            .into_iter()
            .map(|record| Record::confirmed(record.id, record.fields))
            .collect();

        if keep_pending {
            let positions: HashMap<RecordId, usize> = records
                .iter()
                .enumerate()
                .map(|(index, record)| (record.id.clone(), index))
                .collect();
            for local in self.table.get_all().await? {
                if !local.unsynced {
                    continue;
                }
                match positions.get(&local.id) {
                    Some(&index) => records[index] = local,
                    None => records.push(local),
                }
            }
        }

        self.table.replace_all(&records).await?;
        tracing::debug!("Refreshed {} {}", records.len(), E::COLLECTION);
        Ok(())
    }

    fn online_remote(&self) -> Option<&R> {
        self.remote
            .as_ref()
            .filter(|_| self.connectivity.is_online())
    }

    /// Caller must hold the table lock
    async fn ensure_name_available(&self, name: &str, except: Option<&RecordId>) -> Result<()> {
        let taken = self.table.get_all().await?.iter().any(|record| {
            record.is_live() && Some(&record.id) != except && record.has_name(name)
        });
        if taken {
            return Err(Error::DuplicateEntity {
                kind: E::KIND,
                name: name.to_string(),
            });
        }
        Ok(())
    }

    /// Caller must hold the sweep gate
    async fn sweep_with(&self, remote: &R) -> Result<SweepReport> {
        let mut report = SweepReport::default();

        for record in self.table.get_all().await? {
            if !record.unsynced {
                continue;
            }
            match self.push_pending(remote, &record).await {
                Ok(()) => report.pushed += 1,
                Err(error) => {
                    report.failed += 1;
                    tracing::warn!(
                        "Failed to sync {} {}, will retry: {}",
                        E::KIND,
                        record.id,
                        error
                    );
                }
            }
        }

        if report.pushed + report.failed > 0 {
            tracing::info!(
                "Synced {} pending {} ({} failed)",
                report.pushed,
                E::COLLECTION,
                report.failed
            );
        }
        Ok(report)
    }

    async fn push_pending(&self, remote: &R, record: &Record<E>) -> Result<()> {
        if record.deleted {
            if !record.id.is_provisional() {
                match remote.delete(&record.id).await {
                    Err(error) if !is_already_gone(&error) => return Err(error),
                    _ => {}
                }
            }
            return self.purge(&record.id).await;
        }

        let provisional = record.id.is_provisional();
        let reply = if provisional {
            remote.create(&record.fields).await
        } else {
            remote.update(&record.id, &record.fields).await
        };
        match reply {
            Ok(confirmed) if provisional => {
                self.settle_created(record, confirmed).await?;
            }
            Ok(confirmed) => {
                self.settle_updated(record, confirmed).await?;
            }
            Err(error) if error.is_unreadable_response() => {
                self.settle_unreadable(record, &error).await?;
            }
            Err(error) => return Err(error),
        }
        Ok(())
    }

    /// Move a pushed record under the id the remote store assigned
    async fn settle_created(&self, sent: &Record<E>, confirmed: Record<E>) -> Result<Record<E>> {
        let _lock = self.table.lock().await;
        let settled = match self.table.get(&sent.id).await? {
            Some(current) if current.fields == sent.fields && current.is_live() => {
                Record::confirmed(confirmed.id, confirmed.fields)
            }
            // Changed locally while the push was in flight: local state wins
            Some(current) => Record {
                id: confirmed.id,
                fields: current.fields,
                unsynced: true,
                deleted: current.deleted,
            },
            // Purged locally meanwhile: the remote copy has to go as well
            None => Record::pending(confirmed.id, confirmed.fields).into_tombstone(),
        };
        self.table.remap(&sent.id, &settled).await?;
        tracing::debug!("Confirmed {} {} as {}", E::KIND, sent.id, settled.id);
        Ok(settled)
    }

    async fn settle_updated(&self, sent: &Record<E>, confirmed: Record<E>) -> Result<Record<E>> {
        let _lock = self.table.lock().await;
        match self.table.get(&sent.id).await? {
            Some(current) if current.fields == sent.fields && current.is_live() => {
                let settled = Record::confirmed(confirmed.id, confirmed.fields);
                self.table.remap(&sent.id, &settled).await?;
                Ok(settled)
            }
            Some(current) => Ok(current),
            None => Ok(sent.clone()),
        }
    }

    /// The remote store applied `sent` but its reply could not be read.
    ///
    /// The record leaves the push path under a non-provisional id and the
    /// next sweep reloads the snapshot in its place. Local tombstones stay
    /// pending; a local edit made during the push gives way to the snapshot.
    async fn settle_unreadable(&self, sent: &Record<E>, error: &Error) -> Result<Record<E>> {
        tracing::warn!(
            "{} {} was accepted remotely but the reply was unreadable, reloading on next sweep: {}",
            E::KIND,
            sent.id,
            error
        );
        self.stale.store(true, Ordering::SeqCst);

        let _lock = self.table.lock().await;
        let Some(current) = self.table.get(&sent.id).await? else {
            return Ok(sent.clone());
        };
        let settled = Record {
            id: if sent.id.is_provisional() {
                RecordId::timestamped()
            } else {
                sent.id.clone()
            },
            unsynced: current.deleted,
            deleted: current.deleted,
            fields: current.fields,
        };
        self.table.remap(&sent.id, &settled).await?;
        Ok(settled)
    }

    /// After a failed online create: re-key under a provisional id so the
    /// next sweep creates it
    async fn demote_to_provisional(&self, sent: &Record<E>) -> Result<Record<E>> {
        let _lock = self.table.lock().await;
        let Some(mut current) = self.table.get(&sent.id).await? else {
            return Ok(sent.clone());
        };
        current.id = sent.id.to_provisional();
        current.unsynced = true;
        self.table.remap(&sent.id, &current).await?;
        Ok(current)
    }

    async fn mark_pending(&self, sent: &Record<E>) -> Result<Record<E>> {
        let _lock = self.table.lock().await;
        match self.table.get(&sent.id).await? {
            Some(mut current) if current.fields == sent.fields && !current.unsynced => {
                current.unsynced = true;
                self.table.put(&current).await?;
                Ok(current)
            }
            Some(current) => Ok(current),
            None => Ok(sent.clone()),
        }
    }

    async fn tombstone(&self, id: &RecordId) -> Result<()> {
        let _lock = self.table.lock().await;
        if let Some(current) = self.table.get(id).await? {
            self.table.put(&current.into_tombstone()).await?;
        }
        Ok(())
    }

    async fn purge(&self, id: &RecordId) -> Result<()> {
        let _lock = self.table.lock().await;
        self.table.delete(id).await
    }
}

/// A 404 on delete means the remote copy is already gone
const fn is_already_gone(error: &Error) -> bool {
    matches!(error, Error::RemoteRejected { status: 404, .. })
}

#[async_trait]
impl<E, T, R, H> SyncTarget for EntitySynchronizer<E, T, R, H>
where
    E: SyncEntity,
    T: LocalTable<E>,
    R: RemoteClient<E>,
    H: CreateHook<E>,
{
    fn kind(&self) -> &'static str {
        E::KIND
    }

    async fn sweep(&self) -> Result<SweepReport> {
        Self::sweep(self).await
    }

    async fn refresh(&self) -> Result<()> {
        Self::refresh(self).await
    }

    async fn pending(&self) -> Result<usize> {
        Self::pending(self).await
    }
}
