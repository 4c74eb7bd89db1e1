//! In-memory remote store for synchronizer tests.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::models::{Record, RecordId, SyncEntity};
use crate::remote::RemoteClient;

type RejectFn<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

struct FakeState<E> {
    records: Vec<Record<E>>,
    next_id: i64,
    unreachable: bool,
    garbled: bool,
    reject: Option<RejectFn<E>>,
    creates: usize,
    updates: usize,
    deletes: usize,
}

/// Authoritative store that lives in memory and can be told to fail
pub struct FakeRemote<E> {
    state: Arc<Mutex<FakeState<E>>>,
}

impl<E> Clone for FakeRemote<E> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<E: SyncEntity> FakeRemote<E> {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeState {
                records: Vec::new(),
                next_id: 1,
                unreachable: false,
                garbled: false,
                reject: None,
                creates: 0,
                updates: 0,
                deletes: 0,
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, FakeState<E>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fail every call as a transport error
    pub fn set_unreachable(&self, unreachable: bool) {
        self.state().unreachable = unreachable;
    }

    /// Apply creates and updates but answer with an undecodable body
    pub fn garble_replies(&self, garbled: bool) {
        self.state().garbled = garbled;
    }

    /// Refuse creates and updates whose fields match
    pub fn reject_when(&self, predicate: impl Fn(&E) -> bool + Send + Sync + 'static) {
        self.state().reject = Some(Arc::new(predicate));
    }

    /// Store a record directly, as if another client created it
    pub fn seed(&self, fields: E) -> Record<E> {
        let mut state = self.state();
        let record = Record::confirmed(RecordId::from(state.next_id), fields);
        state.next_id += 1;
        state.records.push(record.clone());
        record
    }

    pub fn records(&self) -> Vec<Record<E>> {
        self.state().records.clone()
    }

    pub fn creates(&self) -> usize {
        self.state().creates
    }

    pub fn updates(&self) -> usize {
        self.state().updates
    }

    pub fn deletes(&self) -> usize {
        self.state().deletes
    }

    fn check(state: &FakeState<E>, fields: Option<&E>) -> Result<()> {
        if state.unreachable {
            return Err(Error::RemoteUnavailable("connection refused".into()));
        }
        if let (Some(reject), Some(fields)) = (&state.reject, fields) {
            if reject(fields) {
                return Err(Error::RemoteRejected {
                    status: 422,
                    message: "rejected".into(),
                });
            }
        }
        Ok(())
    }
}

impl<E> FakeState<E> {
    fn reply(&self, record: Record<E>) -> Result<Record<E>> {
        if self.garbled {
            return Err(Error::UnreadableResponse {
                status: 200,
                message: "missing field `id`".into(),
            });
        }
        Ok(record)
    }
}

fn missing(id: &RecordId) -> Error {
    Error::RemoteRejected {
        status: 404,
        message: format!("{id} does not exist"),
    }
}

#[async_trait]
impl<E: SyncEntity> RemoteClient<E> for FakeRemote<E> {
    async fn create(&self, fields: &E) -> Result<Record<E>> {
        let mut state = self.state();
        Self::check(&state, Some(fields))?;
        let record = Record::confirmed(RecordId::from(state.next_id), fields.clone());
        state.next_id += 1;
        state.creates += 1;
        state.records.push(record.clone());
        state.reply(record)
    }

    async fn update(&self, id: &RecordId, fields: &E) -> Result<Record<E>> {
        let mut state = self.state();
        Self::check(&state, Some(fields))?;
        let stored = state
            .records
            .iter_mut()
            .find(|record| &record.id == id)
            .ok_or_else(|| missing(id))?;
        stored.fields = fields.clone();
        let record = stored.clone();
        state.updates += 1;
        state.reply(record)
    }

    async fn delete(&self, id: &RecordId) -> Result<()> {
        let mut state = self.state();
        Self::check(&state, None)?;
        let before = state.records.len();
        state.records.retain(|record| &record.id != id);
        if state.records.len() == before {
            return Err(missing(id));
        }
        state.deletes += 1;
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Record<E>>> {
        let state = self.state();
        Self::check(&state, None)?;
        Ok(state.records.clone())
    }
}
