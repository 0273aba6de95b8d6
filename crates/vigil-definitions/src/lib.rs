//! vigil-definitions: the alert definitions catalog.
//!
//! Persists triggers, their per-mode condition sets, dampening policies,
//! tags with an inverted tag index, action plugins and action instances on
//! top of a [`vigil_store::Session`].
//!
//! # Architecture
//!
//! ```text
//! Definitions<S: Session>
//!   ├── triggers      trigger rows + triggers_actions bindings
//!   ├── conditions    whole-set rewrites, denormalized rows (codec)
//!   ├── dampenings    one row per (trigger, mode)
//!   ├── tags          tag rows + tags_triggers index
//!   ├── actions       plugins (global) + actions (per tenant)
//!   └── notify        TriggerReloader + DefinitionsListener fan-out
//! ```
//!
//! The store has no multi-row transactions. Multi-row mutations are
//! sequenced, fan out their independent writes concurrently and report the
//! first failure once every write has settled. Nothing is rolled back.
//!
//! Every operation validates its arguments (`InvalidArgument`) and checks the
//! session (`NotReady`) before touching the store.

pub mod actions;
pub mod bootstrap;
pub mod codec;
mod conditions;
mod dampenings;
pub mod definitions;
pub mod error;
mod fanout;
pub mod notify;
mod tags;
mod triggers;

pub use bootstrap::{LoadSummary, load_dir};
pub use definitions::Definitions;
pub use error::{DefinitionsError, DefinitionsResult};
pub use notify::{DefinitionsEvent, DefinitionsListener, EventType, TriggerReloader};
