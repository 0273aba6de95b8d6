mod common;

use std::collections::BTreeSet;

use common::{TENANT, catalog};
use vigil_core::{ActionProperties, Tag};
use vigil_definitions::actions::{ACTION_ID_PROPERTY, ACTION_PLUGIN_PROPERTY, TENANT_ID_PROPERTY};

fn props(pairs: &[(&str, &str)]) -> ActionProperties {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[tokio::test]
async fn add_tag_is_idempotent_and_indexed() {
    let defs = catalog();
    let tag = Tag::new("t1", "team", "infra", true);
    defs.add_tag(TENANT, tag.clone()).await.unwrap();
    defs.add_tag(TENANT, tag).await.unwrap();
    defs.add_tag(TENANT, Tag::new("t2", "team", "infra", true))
        .await
        .unwrap();

    assert_eq!(defs.get_trigger_tags(TENANT, "t1", None).await.unwrap().len(), 1);
    let tagged = defs.get_tagged_triggers(TENANT, "team", "infra").await.unwrap();
    assert_eq!(tagged, BTreeSet::from(["t1".to_string(), "t2".to_string()]));
}

#[tokio::test]
async fn remove_tags_narrows_by_category_and_name() {
    let defs = catalog();
    for (category, name) in [("team", "infra"), ("team", "web"), ("env", "prod")] {
        defs.add_tag(TENANT, Tag::new("t1", category, name, true))
            .await
            .unwrap();
    }
    defs.add_tag(TENANT, Tag::new("t2", "team", "infra", true))
        .await
        .unwrap();

    defs.remove_tags(TENANT, "t1", Some("team"), Some("infra"))
        .await
        .unwrap();
    let names: Vec<_> = defs
        .get_trigger_tags(TENANT, "t1", None)
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.name)
        .collect();
    assert_eq!(names.len(), 2);
    assert!(!names.contains(&"infra".to_string()));
    // t2 still indexed under team/infra
    assert_eq!(
        defs.get_tagged_triggers(TENANT, "team", "infra").await.unwrap(),
        BTreeSet::from(["t2".to_string()])
    );

    defs.remove_tags(TENANT, "t1", None, Some("prod")).await.unwrap();
    assert!(defs.get_tagged_triggers(TENANT, "env", "prod").await.unwrap().is_empty());

    defs.remove_tags(TENANT, "t1", Some("team"), None).await.unwrap();
    assert!(defs.get_trigger_tags(TENANT, "t1", None).await.unwrap().is_empty());
}

#[tokio::test]
async fn tag_tenant_follows_caller() {
    let defs = catalog();
    let mut tag = Tag::new("t1", "team", "infra", false);
    tag.tenant_id = "other".into();
    let stored = defs.add_tag(TENANT, tag).await.unwrap();
    assert_eq!(stored.tenant_id, TENANT);
    assert!(defs.get_tagged_triggers("other", "team", "infra").await.unwrap().is_empty());
}

#[tokio::test]
async fn action_properties_carry_identity() {
    let defs = catalog();
    let stored = defs
        .add_action(TENANT, "email", "ops", props(&[("to", "ops@example.com")]))
        .await
        .unwrap();
    assert_eq!(stored[TENANT_ID_PROPERTY], TENANT);
    assert_eq!(stored[ACTION_PLUGIN_PROPERTY], "email");
    assert_eq!(stored[ACTION_ID_PROPERTY], "ops");

    let read = defs.get_action(TENANT, "email", "ops").await.unwrap().unwrap();
    assert_eq!(read, stored);

    let updated = defs
        .update_action(TENANT, "email", "ops", props(&[("to", "noc@example.com")]))
        .await
        .unwrap();
    assert_eq!(updated["to"], "noc@example.com");
    assert_eq!(updated[ACTION_ID_PROPERTY], "ops");
}

#[tokio::test]
async fn actions_group_by_plugin_and_tenant() {
    let defs = catalog();
    let p = props(&[("k", "v")]);
    defs.add_action(TENANT, "email", "ops", p.clone()).await.unwrap();
    defs.add_action(TENANT, "email", "dev", p.clone()).await.unwrap();
    defs.add_action(TENANT, "sms", "oncall", p.clone()).await.unwrap();
    defs.add_action("globex", "email", "ops", p).await.unwrap();

    let grouped = defs.get_actions(TENANT).await.unwrap();
    assert_eq!(grouped["email"].len(), 2);
    assert_eq!(grouped["sms"].len(), 1);
    assert_eq!(
        defs.get_plugin_actions(TENANT, "email").await.unwrap(),
        vec!["dev".to_string(), "ops".to_string()]
    );

    let all = defs.get_all_actions().await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all["globex"]["email"].len(), 1);

    defs.remove_action(TENANT, "email", "dev").await.unwrap();
    assert!(defs.get_action(TENANT, "email", "dev").await.unwrap().is_none());
}

#[tokio::test]
async fn action_without_properties_is_invalid() {
    let defs = catalog();
    let err = defs
        .add_action(TENANT, "email", "ops", ActionProperties::new())
        .await
        .unwrap_err();
    assert!(err.is_invalid_argument());
}

#[tokio::test]
async fn action_plugin_lifecycle() {
    let defs = catalog();
    let declared = BTreeSet::from(["to".to_string(), "cc".to_string()]);
    defs.add_action_plugin("email", declared.clone()).await.unwrap();
    defs.add_action_plugin("sms", BTreeSet::from(["phone".to_string()]))
        .await
        .unwrap();

    assert_eq!(
        defs.get_action_plugins().await.unwrap(),
        vec!["email".to_string(), "sms".to_string()]
    );
    assert_eq!(defs.get_action_plugin("email").await.unwrap(), Some(declared));

    defs.update_action_plugin("email", BTreeSet::from(["to".to_string()]))
        .await
        .unwrap();
    assert_eq!(defs.get_action_plugin("email").await.unwrap().unwrap().len(), 1);

    defs.remove_action_plugin("email").await.unwrap();
    assert!(defs.get_action_plugin("email").await.unwrap().is_none());
    assert!(
        defs.add_action_plugin("pager", BTreeSet::new())
            .await
            .unwrap_err()
            .is_invalid_argument()
    );
}
