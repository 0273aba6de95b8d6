//! Change notification: trigger reloads and catalog change listeners.
//!
//! ```text
//! Definitions mutation
//!   ├── TriggerReloader::reload_trigger   (only once marked initialized)
//!   └── Notifier::broadcast(EventType)    (every registered listener, in order)
//! ```
//!
//! A panicking listener is logged and skipped; the remaining listeners still
//! receive the event and the mutation result is unaffected.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use tracing::{debug, error};

/// Which part of the catalog changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    TriggerChange,
    ConditionChange,
    DampeningChange,
}

/// Payload delivered to every registered [`DefinitionsListener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefinitionsEvent {
    pub event_type: EventType,
}

impl DefinitionsEvent {
    pub fn new(event_type: EventType) -> Self {
        Self { event_type }
    }
}

/// Observer of catalog mutations.
pub trait DefinitionsListener: Send + Sync {
    fn on_change(&self, event: &DefinitionsEvent);
}

impl<F> DefinitionsListener for F
where
    F: Fn(&DefinitionsEvent) + Send + Sync,
{
    fn on_change(&self, event: &DefinitionsEvent) {
        self(event)
    }
}

/// The evaluation engine's hook for re-reading one trigger.
pub trait TriggerReloader: Send + Sync {
    fn reload_trigger(&self, tenant_id: &str, trigger_id: &str);
}

impl<F> TriggerReloader for F
where
    F: Fn(&str, &str) + Send + Sync,
{
    fn reload_trigger(&self, tenant_id: &str, trigger_id: &str) {
        self(tenant_id, trigger_id)
    }
}

/// Listener registry plus the optional reloader.
#[derive(Default)]
pub(crate) struct Notifier {
    listeners: RwLock<Vec<Arc<dyn DefinitionsListener>>>,
    reloader: Option<Arc<dyn TriggerReloader>>,
    initialized: AtomicBool,
}

impl Notifier {
    pub(crate) fn set_reloader(&mut self, reloader: Arc<dyn TriggerReloader>) {
        self.reloader = Some(reloader);
    }

    pub(crate) fn register(&self, listener: Arc<dyn DefinitionsListener>) {
        let mut listeners = self.listeners.write().unwrap_or_else(|p| p.into_inner());
        listeners.push(listener);
        debug!(total = listeners.len(), "definitions listener registered");
    }

    pub(crate) fn mark_initialized(&self) {
        self.initialized.store(true, Ordering::SeqCst);
    }

    pub(crate) fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// Ask the evaluation engine to reload a trigger. Suppressed until initialized.
    pub(crate) fn reload(&self, tenant_id: &str, trigger_id: &str) {
        if !self.is_initialized() {
            return;
        }
        if let Some(reloader) = &self.reloader {
            debug!(tenant_id, trigger_id, "reloading trigger");
            let outcome = catch_unwind(AssertUnwindSafe(|| {
                reloader.reload_trigger(tenant_id, trigger_id)
            }));
            if outcome.is_err() {
                error!(tenant_id, trigger_id, "trigger reloader panicked");
            }
        }
    }

    pub(crate) fn broadcast(&self, event_type: EventType) {
        // Snapshot so listeners may register further listeners.
        let listeners: Vec<_> = self
            .listeners
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clone();
        let event = DefinitionsEvent::new(event_type);
        for (index, listener) in listeners.iter().enumerate() {
            let outcome = catch_unwind(AssertUnwindSafe(|| listener.on_change(&event)));
            if outcome.is_err() {
                error!(index, ?event_type, "definitions listener panicked");
            }
        }
    }
}
