//! Per-entity keyed tables over the local database

use std::collections::HashMap;
use std::marker::PhantomData;
use std::path::Path;
use std::sync::{Arc, PoisonError};

use async_trait::async_trait;
use libsql::Connection;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::Database;
use crate::error::Result;
use crate::models::{Record, RecordId, SyncEntity};

/// Exclusive write scope over one table.
///
/// Held for the duration of a read-modify-write; released when dropped, on
/// every exit path. Never held across a remote call.
#[must_use = "the table is unlocked as soon as the guard is dropped"]
pub struct TableLock {
    _guard: OwnedMutexGuard<()>,
}

/// Keyed storage for one entity collection
#[async_trait]
pub trait LocalTable<E: SyncEntity>: Send + Sync {
    /// Point lookup, tombstones included
    async fn get(&self, id: &RecordId) -> Result<Option<Record<E>>>;

    /// Full scan in insertion order, tombstones included
    async fn get_all(&self) -> Result<Vec<Record<E>>>;

    /// Insert or overwrite the record under its id
    async fn put(&self, record: &Record<E>) -> Result<()>;

    /// Remove the record; absent ids are ignored
    async fn delete(&self, id: &RecordId) -> Result<()>;

    /// Remove every record of this collection
    async fn clear(&self) -> Result<()>;

    /// Atomically drop `old_id` and store `record` under its own id
    async fn remap(&self, old_id: &RecordId, record: &Record<E>) -> Result<()>;

    /// Atomically replace the whole collection
    async fn replace_all(&self, records: &[Record<E>]) -> Result<()>;

    /// Acquire the table's write scope
    async fn lock(&self) -> TableLock;
}

/// Shared handle to the local database, handing out typed tables.
///
/// Every table of the same collection shares one write lock, so a
/// synchronizer and a side-effect hook touching the same collection
/// serialize their read-modify-writes.
#[derive(Clone)]
pub struct LocalStore {
    db: Arc<Mutex<Database>>,
    locks: Arc<std::sync::Mutex<HashMap<&'static str, Arc<Mutex<()>>>>>,
}

impl LocalStore {
    /// Open the store backed by a database file
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(Database::open(path).await?))
    }

    /// Open an in-memory store (primarily for tests)
    pub async fn open_in_memory() -> Result<Self> {
        Ok(Self::new(Database::open_in_memory().await?))
    }

    fn new(db: Database) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
            locks: Arc::default(),
        }
    }

    /// Typed table for entity `E`
    pub fn table<E: SyncEntity>(&self) -> LibSqlTable<E> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(E::COLLECTION).or_default())
        };
        LibSqlTable {
            db: Arc::clone(&self.db),
            lock,
            _entity: PhantomData,
        }
    }
}

/// libSQL implementation of `LocalTable`
pub struct LibSqlTable<E> {
    db: Arc<Mutex<Database>>,
    lock: Arc<Mutex<()>>,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for LibSqlTable<E> {
    fn clone(&self) -> Self {
        Self {
            db: Arc::clone(&self.db),
            lock: Arc::clone(&self.lock),
            _entity: PhantomData,
        }
    }
}

impl<E: SyncEntity> LibSqlTable<E> {
    /// Parse a record from a database row
    fn parse_record(row: &libsql::Row) -> Result<Record<E>> {
        let id: String = row.get(0)?;
        let fields: String = row.get(1)?;
        Ok(Record {
            id: RecordId::from(id.as_str()),
            fields: serde_json::from_str(&fields)?,
            unsynced: row.get::<i32>(2)? != 0,
            deleted: row.get::<i32>(3)? != 0,
        })
    }

    async fn upsert(conn: &Connection, record: &Record<E>) -> Result<()> {
        let fields = serde_json::to_string(&record.fields)?;
        let now = chrono::Utc::now().timestamp_millis();
        conn.execute(
            "INSERT INTO records (collection, id, fields, unsynced, deleted, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(collection, id) DO UPDATE SET
                fields = excluded.fields,
                unsynced = excluded.unsynced,
                deleted = excluded.deleted,
                updated_at = excluded.updated_at",
            libsql::params![
                E::COLLECTION,
                record.id.as_str(),
                fields,
                i32::from(record.unsynced),
                i32::from(record.deleted),
                now
            ],
        )
        .await?;
        Ok(())
    }

    async fn remove(conn: &Connection, id: &RecordId) -> Result<()> {
        conn.execute(
            "DELETE FROM records WHERE collection = ? AND id = ?",
            libsql::params![E::COLLECTION, id.as_str()],
        )
        .await?;
        Ok(())
    }
}

/// Commit on success, roll back on any failure
async fn finish_transaction(conn: &Connection, outcome: Result<()>) -> Result<()> {
    match outcome {
        Ok(()) => {
            if let Err(e) = conn.execute("COMMIT", ()).await {
                conn.execute("ROLLBACK", ()).await.ok();
                return Err(e.into());
            }
            Ok(())
        }
        Err(e) => {
            conn.execute("ROLLBACK", ()).await.ok();
            Err(e)
        }
    }
}

#[async_trait]
impl<E: SyncEntity> LocalTable<E> for LibSqlTable<E> {
    async fn get(&self, id: &RecordId) -> Result<Option<Record<E>>> {
        let db = self.db.lock().await;
        let mut rows = db
            .connection()
            .query(
                "SELECT id, fields, unsynced, deleted FROM records WHERE collection = ? AND id = ?",
                libsql::params![E::COLLECTION, id.as_str()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_record(&row)?)),
            None => Ok(None),
        }
    }

    async fn get_all(&self) -> Result<Vec<Record<E>>> {
        let db = self.db.lock().await;
        let mut rows = db
            .connection()
            .query(
                "SELECT id, fields, unsynced, deleted FROM records
                 WHERE collection = ?
                 ORDER BY rowid ASC",
                [E::COLLECTION],
            )
            .await?;

        let mut records = Vec::new();
        while let Some(row) = rows.next().await? {
            records.push(Self::parse_record(&row)?);
        }
        Ok(records)
    }

    async fn put(&self, record: &Record<E>) -> Result<()> {
        let db = self.db.lock().await;
        Self::upsert(db.connection(), record).await
    }

    async fn delete(&self, id: &RecordId) -> Result<()> {
        let db = self.db.lock().await;
        Self::remove(db.connection(), id).await
    }

    async fn clear(&self) -> Result<()> {
        let db = self.db.lock().await;
        db.connection()
            .execute("DELETE FROM records WHERE collection = ?", [E::COLLECTION])
            .await?;
        Ok(())
    }

    async fn remap(&self, old_id: &RecordId, record: &Record<E>) -> Result<()> {
        let db = self.db.lock().await;
        let conn = db.connection();

        conn.execute("BEGIN TRANSACTION", ()).await?;
        let outcome: Result<()> = async {
            if old_id != &record.id {
                Self::remove(conn, &record.id).await?;
                // Rename in place so the record keeps its scan position
                let fields = serde_json::to_string(&record.fields)?;
                let renamed = conn
                    .execute(
                        "UPDATE records
                         SET id = ?, fields = ?, unsynced = ?, deleted = ?, updated_at = ?
                         WHERE collection = ? AND id = ?",
                        libsql::params![
                            record.id.as_str(),
                            fields,
                            i32::from(record.unsynced),
                            i32::from(record.deleted),
                            chrono::Utc::now().timestamp_millis(),
                            E::COLLECTION,
                            old_id.as_str()
                        ],
                    )
                    .await?;
                if renamed > 0 {
                    return Ok(());
                }
            }
            Self::upsert(conn, record).await
        }
        .await;
        finish_transaction(conn, outcome).await
    }

    async fn replace_all(&self, records: &[Record<E>]) -> Result<()> {
        let db = self.db.lock().await;
        let conn = db.connection();

        conn.execute("BEGIN TRANSACTION", ()).await?;
        let outcome: Result<()> = async {
            conn.execute("DELETE FROM records WHERE collection = ?", [E::COLLECTION])
                .await?;
            for record in records {
                Self::upsert(conn, record).await?;
            }
            Ok(())
        }
        .await;
        finish_transaction(conn, outcome).await
    }

    async fn lock(&self) -> TableLock {
        TableLock {
            _guard: Arc::clone(&self.lock).lock_owned().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, Customer};
    use pretty_assertions::assert_eq;
    use std::time::Duration;
    use tempfile::tempdir;

    fn category(id: i64, name: &str) -> Record<Category> {
        Record::confirmed(RecordId::from(id), Category::new(name))
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_put_and_get() {
        let store = LocalStore::open_in_memory().await.unwrap();
        let table = store.table::<Category>();

        let record = category(1, "Spices");
        table.put(&record).await.unwrap();

        assert_eq!(table.get(&record.id).await.unwrap(), Some(record));
        assert_eq!(table.get(&RecordId::from(2)).await.unwrap(), None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_upsert_keeps_scan_order() {
        let store = LocalStore::open_in_memory().await.unwrap();
        let table = store.table::<Category>();

        table.put(&category(1, "A")).await.unwrap();
        table.put(&category(2, "B")).await.unwrap();
        table.put(&category(1, "A2")).await.unwrap();

        let names: Vec<String> = table
            .get_all()
            .await
            .unwrap()
            .into_iter()
            .map(|record| record.fields.name)
            .collect();
        assert_eq!(names, vec!["A2", "B"]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_collections_are_isolated() {
        let store = LocalStore::open_in_memory().await.unwrap();
        let categories = store.table::<Category>();
        let customers = store.table::<Customer>();

        categories.put(&category(1, "Spices")).await.unwrap();
        customers
            .put(&Record::confirmed(RecordId::from(1), Customer::new("Ada")))
            .await
            .unwrap();
        categories.clear().await.unwrap();

        assert!(categories.get_all().await.unwrap().is_empty());
        assert_eq!(customers.get_all().await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_remap_moves_record_to_new_key() {
        let store = LocalStore::open_in_memory().await.unwrap();
        let table = store.table::<Category>();

        let provisional = Record::pending(RecordId::provisional(), Category::new("Tea"));
        table.put(&provisional).await.unwrap();
        table.put(&category(2, "Coffee")).await.unwrap();

        let confirmed = category(77, "Tea");
        table.remap(&provisional.id, &confirmed).await.unwrap();

        assert_eq!(table.get(&provisional.id).await.unwrap(), None);
        assert_eq!(
            table.get_all().await.unwrap(),
            vec![confirmed, category(2, "Coffee")]
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_remap_onto_existing_key_replaces_it() {
        let store = LocalStore::open_in_memory().await.unwrap();
        let table = store.table::<Category>();

        table.put(&category(5, "Stale")).await.unwrap();
        let provisional = Record::pending(RecordId::provisional(), Category::new("Fresh"));
        table.put(&provisional).await.unwrap();

        table
            .remap(&provisional.id, &category(5, "Fresh"))
            .await
            .unwrap();

        assert_eq!(table.get_all().await.unwrap(), vec![category(5, "Fresh")]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_replace_all_swaps_contents() {
        let store = LocalStore::open_in_memory().await.unwrap();
        let table = store.table::<Category>();

        table.put(&category(1, "Old")).await.unwrap();
        table
            .replace_all(&[category(2, "New"), category(3, "Newer")])
            .await
            .unwrap();

        let ids: Vec<String> = table
            .get_all()
            .await
            .unwrap()
            .into_iter()
            .map(|record| record.id.to_string())
            .collect();
        assert_eq!(ids, vec!["2", "3"]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_records_survive_reopen() {
        let tmp = tempdir().unwrap();
        let db_path = tmp.path().join("stockroom.db");

        {
            let store = LocalStore::open(&db_path).await.unwrap();
            let table = store.table::<Category>();
            table
                .put(&Record::pending(RecordId::from("temp-1"), Category::new("Rice")).into_tombstone())
                .await
                .unwrap();
        }

        let store = LocalStore::open(&db_path).await.unwrap();
        let records = store.table::<Category>().get_all().await.unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].deleted);
        assert!(records[0].unsynced);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_tables_of_same_collection_share_lock() {
        let store = LocalStore::open_in_memory().await.unwrap();
        let first = store.table::<Category>();
        let second = store.table::<Category>();

        let guard = first.lock().await;
        let blocked = tokio::time::timeout(Duration::from_millis(50), second.lock()).await;
        assert!(blocked.is_err());

        drop(guard);
        let acquired = tokio::time::timeout(Duration::from_millis(50), second.lock()).await;
        assert!(acquired.is_ok());
    }
}
