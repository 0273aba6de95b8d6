mod common;

use std::sync::{Arc, Mutex};

use common::{TENANT, recorder};
use vigil_core::{CompareOperator, Condition, Dampening, DampeningType, Mode, Trigger};
use vigil_definitions::{Definitions, DefinitionsEvent, DefinitionsListener, EventType};
use vigil_store::RedbSession;

struct Faulty;

impl DefinitionsListener for Faulty {
    fn on_change(&self, _event: &DefinitionsEvent) {
        panic!("listener bug");
    }
}

fn catalog_with_reloads() -> (Definitions<RedbSession>, Arc<Mutex<Vec<String>>>) {
    let reloads = Arc::new(Mutex::new(Vec::new()));
    let sink = reloads.clone();
    let defs = Definitions::new(RedbSession::open_in_memory().unwrap()).with_reloader(Arc::new(
        move |tenant: &str, trigger: &str| {
            sink.lock().unwrap().push(format!("{tenant}/{trigger}"));
        },
    ));
    (defs, reloads)
}

fn cpu(value: f64) -> Condition {
    Condition::threshold("t1", Mode::Firing, "cpu", CompareOperator::Gt, value)
}

#[tokio::test]
async fn listeners_see_each_kind_of_change() {
    let (defs, _) = catalog_with_reloads();
    let (seen, listener) = recorder();
    defs.register_listener(listener);

    defs.add_trigger(TENANT, Trigger::with_id("t1", "name")).await.unwrap();
    defs.update_trigger(TENANT, Trigger::with_id("t1", "renamed")).await.unwrap();
    defs.add_condition(TENANT, "t1", Mode::Firing, cpu(1.0)).await.unwrap();
    defs.add_dampening(
        TENANT,
        Dampening::new("t1", Mode::Firing, DampeningType::Strict, 2, 2, 0),
    )
    .await
    .unwrap();

    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            EventType::TriggerChange,
            EventType::ConditionChange,
            EventType::DampeningChange,
        ]
    );
}

#[tokio::test]
async fn no_reload_before_initialization() {
    let (defs, reloads) = catalog_with_reloads();
    defs.add_condition(TENANT, "t1", Mode::Firing, cpu(1.0)).await.unwrap();
    assert!(reloads.lock().unwrap().is_empty());

    defs.mark_initialized();
    defs.add_condition(TENANT, "t1", Mode::Firing, cpu(2.0)).await.unwrap();
    defs.update_trigger(TENANT, Trigger::with_id("t1", "name")).await.unwrap();
    assert_eq!(
        *reloads.lock().unwrap(),
        vec!["acme/t1".to_string(), "acme/t1".to_string()]
    );
}

#[tokio::test]
async fn events_broadcast_before_initialization() {
    let (defs, reloads) = catalog_with_reloads();
    let (seen, listener) = recorder();
    defs.register_listener(listener);

    defs.add_condition(TENANT, "t1", Mode::Firing, cpu(1.0)).await.unwrap();
    assert!(reloads.lock().unwrap().is_empty());
    assert_eq!(*seen.lock().unwrap(), vec![EventType::ConditionChange]);
}

#[tokio::test]
async fn panicking_listener_does_not_fail_the_mutation() {
    let (defs, _) = catalog_with_reloads();
    defs.register_listener(Arc::new(Faulty));
    let (seen, listener) = recorder();
    defs.register_listener(listener);

    let set = defs
        .add_condition(TENANT, "t1", Mode::Firing, cpu(1.0))
        .await
        .unwrap();
    assert_eq!(set.len(), 1);
    assert_eq!(*seen.lock().unwrap(), vec![EventType::ConditionChange]);
}

#[tokio::test]
async fn missing_dampening_removal_is_silent() {
    let (defs, _) = catalog_with_reloads();
    let (seen, listener) = recorder();
    defs.register_listener(listener);

    defs.remove_dampening(TENANT, "t1-FIRING").await.unwrap();
    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn update_dampening_writes_even_when_absent() {
    let (defs, _) = catalog_with_reloads();
    let d = Dampening::new("t1", Mode::Autoresolve, DampeningType::StrictTime, 0, 0, 30_000);
    defs.update_dampening(TENANT, d).await.unwrap();

    let stored = defs.get_dampening(TENANT, "t1-AUTORESOLVE").await.unwrap().unwrap();
    assert_eq!(stored.eval_time_setting, 30_000);
    assert_eq!(defs.get_dampenings(TENANT).await.unwrap().len(), 1);

    defs.remove_dampening(TENANT, "t1-AUTORESOLVE").await.unwrap();
    assert!(defs.get_all_dampenings().await.unwrap().is_empty());
}
