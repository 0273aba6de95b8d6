//! vigil-store: the row store underneath the Vigil catalog.
//!
//! Backed by [redb](https://docs.rs/redb), exposes a deliberately narrow
//! surface: single-row put/get/delete plus partition scans and partition
//! deletes. Nothing spans more than one partition atomically, so the
//! catalog above keeps its multi-table invariants by sequencing writes.
//!
//! # Architecture
//!
//! All rows are JSON-serialized into redb's `&[u8]` value columns.
//! Composite keys (`tenant \x1f trigger \x1f mode ...`) make a partition a key
//! prefix, so partition reads are range scans.
//!
//! `RedbSession` is `Clone` + `Send` + `Sync` (backed by `Arc<Database>`)
//! and is shared across async tasks.

pub mod error;
pub mod keys;
pub mod session;
pub mod tables;

pub use error::{StoreError, StoreResult};
pub use session::{RedbSession, Row, Session};
pub use tables::Table;
