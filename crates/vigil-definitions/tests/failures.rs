mod common;

use common::{FailingSession, TENANT, catalog, recorder};
use vigil_core::{CompareOperator, Condition, Mode, Tag, Trigger};
use vigil_definitions::{Definitions, DefinitionsError};
use vigil_store::{Session, StoreError, Table};

fn threshold(data_id: &str) -> Condition {
    Condition::threshold("t1", Mode::Firing, data_id, CompareOperator::Gt, 1.0)
}

#[tokio::test]
async fn blank_arguments_are_rejected() {
    let defs = catalog();
    assert!(matches!(
        defs.add_trigger("", Trigger::with_id("t1", "n")).await,
        Err(DefinitionsError::InvalidArgument(_))
    ));
    assert!(defs.add_trigger(TENANT, Trigger::with_id(" ", "n")).await.is_err());
    assert!(defs.get_all_triggers().await.unwrap().is_empty());
    assert!(defs.get_trigger(TENANT, "").await.unwrap_err().is_invalid_argument());
    assert!(
        defs.set_conditions(TENANT, "", Mode::Firing, vec![])
            .await
            .unwrap_err()
            .is_invalid_argument()
    );
    assert!(
        defs.add_tag(TENANT, Tag::new("t1", "team", "", true))
            .await
            .unwrap_err()
            .is_invalid_argument()
    );
    assert!(
        defs.remove_dampening(TENANT, "")
            .await
            .unwrap_err()
            .is_invalid_argument()
    );
}

#[tokio::test]
async fn closed_session_is_not_ready() {
    let defs = catalog();
    defs.session().close();

    assert!(matches!(
        defs.get_all_triggers().await,
        Err(DefinitionsError::NotReady)
    ));
    assert!(matches!(
        defs.add_trigger(TENANT, Trigger::with_id("t1", "n")).await,
        Err(DefinitionsError::NotReady)
    ));
    // argument validation comes first
    assert!(matches!(
        defs.add_trigger("", Trigger::with_id("t1", "n")).await,
        Err(DefinitionsError::InvalidArgument(_))
    ));
}

#[tokio::test]
async fn failed_condition_write_keeps_old_set_deleted() {
    let session = FailingSession::new(|table, key| {
        table == Table::Conditions && key.ends_with("0000000002")
    });
    let defs = Definitions::new(session);

    defs.set_conditions(TENANT, "t1", Mode::Firing, vec![threshold("old")])
        .await
        .unwrap();

    let (seen, listener) = recorder();
    defs.register_listener(listener);

    let err = defs
        .set_conditions(
            TENANT,
            "t1",
            Mode::Firing,
            vec![threshold("a"), threshold("b"), threshold("c")],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DefinitionsError::Store(StoreError::Write(_))));

    let left = defs
        .get_trigger_conditions(TENANT, "t1", Some(Mode::Firing))
        .await
        .unwrap();
    let data_ids: Vec<_> = left.iter().map(|c| c.data_id()).collect();
    assert_eq!(data_ids, vec!["a", "c"]);
    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn failed_binding_write_surfaces_store_error() {
    let session = FailingSession::new(|table, _| table == Table::TriggersActions);
    assert!(session.is_open());
    let defs = Definitions::new(session);

    let mut trigger = Trigger::with_id("t1", "n");
    trigger.add_action("email", "ops");
    let err = defs.add_trigger(TENANT, trigger).await.unwrap_err();
    assert!(matches!(err, DefinitionsError::Store(_)));

    // primary record was written before the bindings
    let stored = defs.get_trigger(TENANT, "t1").await.unwrap().unwrap();
    assert!(stored.actions.is_empty());
}
