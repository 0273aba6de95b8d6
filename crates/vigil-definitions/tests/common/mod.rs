#![allow(dead_code)]

use std::future::Future;
use std::sync::{Arc, Mutex};

use vigil_definitions::{Definitions, DefinitionsEvent, DefinitionsListener, EventType};
use vigil_store::{RedbSession, Row, Session, StoreError, StoreResult, Table};

pub const TENANT: &str = "acme";

pub fn catalog() -> Definitions<RedbSession> {
    Definitions::new(RedbSession::open_in_memory().unwrap())
}

/// Records every event type it receives.
pub fn recorder() -> (Arc<Mutex<Vec<EventType>>>, Arc<dyn DefinitionsListener>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let listener: Arc<dyn DefinitionsListener> = Arc::new(move |e: &DefinitionsEvent| {
        sink.lock().unwrap().push(e.event_type);
    });
    (seen, listener)
}

type PutFilter = Arc<dyn Fn(Table, &str) -> bool + Send + Sync>;

/// Session that fails the puts selected by a filter and delegates everything else.
#[derive(Clone)]
pub struct FailingSession {
    inner: RedbSession,
    fail_put: PutFilter,
}

impl FailingSession {
    pub fn new(fail_put: impl Fn(Table, &str) -> bool + Send + Sync + 'static) -> Self {
        Self {
            inner: RedbSession::open_in_memory().unwrap(),
            fail_put: Arc::new(fail_put),
        }
    }
}

impl Session for FailingSession {
    fn is_open(&self) -> bool {
        self.inner.is_open()
    }

    fn put(
        &self,
        table: Table,
        key: String,
        value: Vec<u8>,
    ) -> impl Future<Output = StoreResult<()>> + Send {
        let fail = (self.fail_put)(table, &key);
        let inner = self.inner.clone();
        async move {
            if fail {
                Err(StoreError::Write(format!("injected failure for {}", table.name())))
            } else {
                inner.put(table, key, value).await
            }
        }
    }

    fn get(&self, table: Table, key: String) -> impl Future<Output = StoreResult<Option<Vec<u8>>>> + Send {
        self.inner.get(table, key)
    }

    fn delete(&self, table: Table, key: String) -> impl Future<Output = StoreResult<bool>> + Send {
        self.inner.delete(table, key)
    }

    fn delete_prefix(&self, table: Table, prefix: String) -> impl Future<Output = StoreResult<u32>> + Send {
        self.inner.delete_prefix(table, prefix)
    }

    fn scan_prefix(&self, table: Table, prefix: String) -> impl Future<Output = StoreResult<Vec<Row>>> + Send {
        self.inner.scan_prefix(table, prefix)
    }
}
