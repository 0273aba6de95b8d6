//! The `Definitions` facade.
//!
//! One value owns the store session and the notifier. Per-area operations
//! live in sibling modules as further `impl` blocks.

use std::sync::Arc;

use vigil_store::{RedbSession, Session};

use crate::error::{DefinitionsError, DefinitionsResult};
use crate::notify::{DefinitionsListener, EventType, Notifier, TriggerReloader};

/// Catalog of triggers, conditions, dampening, tags and actions.
pub struct Definitions<S: Session = RedbSession> {
    pub(crate) session: S,
    pub(crate) notifier: Notifier,
}

impl<S: Session> Definitions<S> {
    pub fn new(session: S) -> Self {
        Self {
            session,
            notifier: Notifier::default(),
        }
    }

    /// Attach the evaluation engine's reload hook.
    pub fn with_reloader(mut self, reloader: Arc<dyn TriggerReloader>) -> Self {
        self.notifier.set_reloader(reloader);
        self
    }

    pub fn register_listener(&self, listener: Arc<dyn DefinitionsListener>) {
        self.notifier.register(listener);
    }

    /// Enable trigger reloads. Called once bootstrap loading has finished.
    pub fn mark_initialized(&self) {
        self.notifier.mark_initialized();
    }

    pub fn is_initialized(&self) -> bool {
        self.notifier.is_initialized()
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub(crate) fn ensure_ready(&self) -> DefinitionsResult<()> {
        if self.session.is_open() {
            Ok(())
        } else {
            Err(DefinitionsError::NotReady)
        }
    }

    /// Reload plus broadcast after a successful mutation of one trigger.
    pub(crate) fn changed(&self, tenant_id: &str, trigger_id: &str, event_type: EventType) {
        self.notifier.reload(tenant_id, trigger_id);
        self.notifier.broadcast(event_type);
    }
}

/// The caller's tenant always wins over whatever the object carries.
pub(crate) fn assign_tenant(tenant_id: &str, slot: &mut String) {
    if slot != tenant_id {
        *slot = tenant_id.to_string();
    }
}
