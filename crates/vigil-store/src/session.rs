//! Async row operations over the catalog tables.
//!
//! A [`Session`] exposes single-row puts, gets and deletes plus partition
//! scans and partition deletes. There is no multi-row transaction: callers
//! that need several rows written issue several independent operations.
//! [`RedbSession`] is the production backend; every operation runs in its
//! own redb transaction on the blocking thread pool.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use redb::{Database, ReadableDatabase, ReadableTable};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::tables::Table;

/// Convert any `Display` error into a `StoreError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StoreError::$variant(e.to_string())
    };
}

/// A raw row as returned by a partition scan.
pub type Row = (String, Vec<u8>);

/// Handle to the row store. Cheap to clone and shared process-wide.
pub trait Session: Clone + Send + Sync + 'static {
    /// False once the session has been closed.
    fn is_open(&self) -> bool;

    /// Insert or overwrite one row.
    fn put(
        &self,
        table: Table,
        key: String,
        value: Vec<u8>,
    ) -> impl Future<Output = StoreResult<()>> + Send;

    fn get(&self, table: Table, key: String)
    -> impl Future<Output = StoreResult<Option<Vec<u8>>>> + Send;

    /// Delete one row. Returns true if it existed.
    fn delete(&self, table: Table, key: String) -> impl Future<Output = StoreResult<bool>> + Send;

    /// Delete every row of a partition. Returns the number of rows removed.
    fn delete_prefix(
        &self,
        table: Table,
        prefix: String,
    ) -> impl Future<Output = StoreResult<u32>> + Send;

    /// All rows of a partition in key order. An empty prefix scans the table.
    fn scan_prefix(
        &self,
        table: Table,
        prefix: String,
    ) -> impl Future<Output = StoreResult<Vec<Row>>> + Send;

    /// Serialize `value` as JSON and put it.
    fn put_json<T: Serialize + ?Sized>(
        &self,
        table: Table,
        key: String,
        value: &T,
    ) -> impl Future<Output = StoreResult<()>> + Send {
        let bytes = serde_json::to_vec(value).map_err(map_err!(Serialize));
        async move { self.put(table, key, bytes?).await }
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        table: Table,
        key: String,
    ) -> impl Future<Output = StoreResult<Option<T>>> + Send {
        async move {
            match self.get(table, key).await? {
                Some(bytes) => {
                    let value = serde_json::from_slice(&bytes).map_err(map_err!(Deserialize))?;
                    Ok(Some(value))
                }
                None => Ok(None),
            }
        }
    }

    /// Scan a partition and decode every row.
    fn scan_json<T: DeserializeOwned + Send>(
        &self,
        table: Table,
        prefix: String,
    ) -> impl Future<Output = StoreResult<Vec<T>>> + Send {
        async move {
            let rows = self.scan_prefix(table, prefix).await?;
            rows.iter()
                .map(|(_, bytes)| serde_json::from_slice(bytes).map_err(map_err!(Deserialize)))
                .collect()
        }
    }
}

/// Thread-safe row store backed by redb.
#[derive(Clone)]
pub struct RedbSession {
    db: Arc<Database>,
    open: Arc<AtomicBool>,
}

impl RedbSession {
    /// Open (or create) a persistent catalog at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let session = Self::from_database(db)?;
        debug!(?path, "catalog store opened");
        Ok(session)
    }

    /// Create an ephemeral in-memory catalog.
    pub fn open_in_memory() -> StoreResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let session = Self::from_database(db)?;
        debug!("in-memory catalog store opened");
        Ok(session)
    }

    fn from_database(db: Database) -> StoreResult<Self> {
        let session = Self {
            db: Arc::new(db),
            open: Arc::new(AtomicBool::new(true)),
        };
        session.ensure_tables()?;
        Ok(session)
    }

    /// Create all tables if they don't exist yet.
    fn ensure_tables(&self) -> StoreResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        for table in Table::ALL {
            txn.open_table(table.definition()).map_err(map_err!(Table))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    /// Refuse every further operation on this session and all of its clones.
    pub fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
        debug!("catalog store closed");
    }

    /// Run `f` on the blocking pool once the open check has passed.
    fn run<T, F>(&self, f: F) -> impl Future<Output = StoreResult<T>> + Send + use<T, F>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> StoreResult<T> + Send + 'static,
    {
        let db = self.db.clone();
        let open = self.is_open();
        async move {
            if !open {
                return Err(StoreError::Closed);
            }
            tokio::task::spawn_blocking(move || f(&db))
                .await
                .map_err(map_err!(Task))?
        }
    }
}

impl Session for RedbSession {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn put(
        &self,
        table: Table,
        key: String,
        value: Vec<u8>,
    ) -> impl Future<Output = StoreResult<()>> + Send {
        self.run(move |db| {
            let txn = db.begin_write().map_err(map_err!(Transaction))?;
            {
                let mut t = txn.open_table(table.definition()).map_err(map_err!(Table))?;
                t.insert(key.as_str(), value.as_slice())
                    .map_err(map_err!(Write))?;
            }
            txn.commit().map_err(map_err!(Transaction))?;
            Ok(())
        })
    }

    fn get(
        &self,
        table: Table,
        key: String,
    ) -> impl Future<Output = StoreResult<Option<Vec<u8>>>> + Send {
        self.run(move |db| {
            let txn = db.begin_read().map_err(map_err!(Transaction))?;
            let t = txn.open_table(table.definition()).map_err(map_err!(Table))?;
            let value = t
                .get(key.as_str())
                .map_err(map_err!(Read))?
                .map(|guard| guard.value().to_vec());
            Ok(value)
        })
    }

    fn delete(&self, table: Table, key: String) -> impl Future<Output = StoreResult<bool>> + Send {
        self.run(move |db| {
            let txn = db.begin_write().map_err(map_err!(Transaction))?;
            let existed;
            {
                let mut t = txn.open_table(table.definition()).map_err(map_err!(Table))?;
                existed = t.remove(key.as_str()).map_err(map_err!(Write))?.is_some();
            }
            txn.commit().map_err(map_err!(Transaction))?;
            Ok(existed)
        })
    }

    fn delete_prefix(
        &self,
        table: Table,
        prefix: String,
    ) -> impl Future<Output = StoreResult<u32>> + Send {
        self.run(move |db| {
            let txn = db.begin_write().map_err(map_err!(Transaction))?;
            let count;
            {
                let mut t = txn.open_table(table.definition()).map_err(map_err!(Table))?;
                let mut keys = Vec::new();
                for entry in t.range(prefix.as_str()..).map_err(map_err!(Read))? {
                    let (key, _) = entry.map_err(map_err!(Read))?;
                    let key = key.value();
                    if !key.starts_with(prefix.as_str()) {
                        break;
                    }
                    keys.push(key.to_string());
                }
                for key in &keys {
                    t.remove(key.as_str()).map_err(map_err!(Write))?;
                }
                count = keys.len() as u32;
            }
            txn.commit().map_err(map_err!(Transaction))?;
            Ok(count)
        })
    }

    fn scan_prefix(
        &self,
        table: Table,
        prefix: String,
    ) -> impl Future<Output = StoreResult<Vec<Row>>> + Send {
        self.run(move |db| {
            let txn = db.begin_read().map_err(map_err!(Transaction))?;
            let t = txn.open_table(table.definition()).map_err(map_err!(Table))?;
            let mut rows = Vec::new();
            for entry in t.range(prefix.as_str()..).map_err(map_err!(Read))? {
                let (key, value) = entry.map_err(map_err!(Read))?;
                let key = key.value();
                if !key.starts_with(prefix.as_str()) {
                    break;
                }
                rows.push((key.to_string(), value.value().to_vec()));
            }
            Ok(rows)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{partition, row_key};

    fn store() -> RedbSession {
        RedbSession::open_in_memory().unwrap()
    }

    #[tokio::test]
    async fn put_and_get() {
        let s = store();
        s.put(Table::Triggers, row_key(&["t", "a"]), b"one".to_vec())
            .await
            .unwrap();

        let got = s.get(Table::Triggers, row_key(&["t", "a"])).await.unwrap();
        assert_eq!(got.as_deref(), Some(&b"one"[..]));
    }

    #[tokio::test]
    async fn get_nonexistent_returns_none() {
        let s = store();
        assert!(s.get(Table::Tags, "nope".into()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn tables_are_independent() {
        let s = store();
        s.put(Table::Triggers, "k".into(), b"x".to_vec()).await.unwrap();
        assert!(s.get(Table::Conditions, "k".into()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn put_overwrites() {
        let s = store();
        s.put(Table::Actions, "k".into(), b"1".to_vec()).await.unwrap();
        s.put(Table::Actions, "k".into(), b"2".to_vec()).await.unwrap();
        let got = s.get(Table::Actions, "k".into()).await.unwrap().unwrap();
        assert_eq!(got, b"2");
    }

    #[tokio::test]
    async fn delete_reports_existence() {
        let s = store();
        s.put(Table::Tags, "k".into(), b"x".to_vec()).await.unwrap();
        assert!(s.delete(Table::Tags, "k".into()).await.unwrap());
        assert!(!s.delete(Table::Tags, "k".into()).await.unwrap());
    }

    #[tokio::test]
    async fn scan_and_delete_partition() {
        let s = store();
        for (trigger, idx) in [("a", "1"), ("a", "2"), ("ab", "1"), ("b", "1")] {
            s.put(Table::Conditions, row_key(&["t", trigger, idx]), idx.as_bytes().to_vec())
                .await
                .unwrap();
        }

        let rows = s.scan_prefix(Table::Conditions, partition(&["t", "a"])).await.unwrap();
        assert_eq!(rows.len(), 2);

        let removed = s
            .delete_prefix(Table::Conditions, partition(&["t", "a"]))
            .await
            .unwrap();
        assert_eq!(removed, 2);

        // "ab" and "b" untouched
        let rest = s.scan_prefix(Table::Conditions, String::new()).await.unwrap();
        assert_eq!(rest.len(), 2);
    }

    #[tokio::test]
    async fn json_helpers() {
        let s = store();
        let value = vec!["x".to_string(), "y".to_string()];
        s.put_json(Table::TagsTriggers, "k".into(), &value).await.unwrap();
        let back: Option<Vec<String>> = s.get_json(Table::TagsTriggers, "k".into()).await.unwrap();
        assert_eq!(back, Some(value));

        let all: Vec<Vec<String>> = s.scan_json(Table::TagsTriggers, String::new()).await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn closed_session_rejects_operations() {
        let s = store();
        let clone = s.clone();
        s.close();
        assert!(!clone.is_open());
        let err = clone.get(Table::Triggers, "k".into()).await.unwrap_err();
        assert!(matches!(err, StoreError::Closed));
    }

    #[tokio::test]
    async fn persistence_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("catalog.redb");

        {
            let s = RedbSession::open(&db_path).unwrap();
            s.put(Table::Triggers, "t".into(), b"kept".to_vec()).await.unwrap();
        }

        let s = RedbSession::open(&db_path).unwrap();
        let got = s.get(Table::Triggers, "t".into()).await.unwrap();
        assert_eq!(got.as_deref(), Some(&b"kept"[..]));
    }
}
