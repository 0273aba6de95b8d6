//! Trigger records and their action bindings.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use vigil_core::{ActionBindings, Condition, Dampening, Mode, Trigger};
use vigil_store::keys::{partition, row_key};
use vigil_store::{Session, StoreResult, Table};

use crate::definitions::{Definitions, assign_tenant};
use crate::conditions::covers_exactly;
use crate::error::{DefinitionsError, DefinitionsResult, require, store_failure};
use crate::fanout::gather_all;
use crate::notify::EventType;

/// One `triggers_actions` row: the action ids bound for a single plugin.
#[derive(Debug, Serialize, Deserialize)]
struct ActionBindingRow {
    action_plugin: String,
    actions: BTreeSet<String>,
}

impl<S: Session> Definitions<S> {
    pub async fn add_trigger(&self, tenant_id: &str, mut trigger: Trigger) -> DefinitionsResult<Trigger> {
        require(tenant_id, "TenantId")?;
        require(&trigger.id, "TriggerId")?;
        assign_tenant(tenant_id, &mut trigger.tenant_id);
        self.ensure_ready()?;

        self.write_trigger(&trigger)
            .await
            .map_err(store_failure("add_trigger"))?;
        info!(tenant_id, trigger_id = %trigger.id, "trigger added");
        Ok(trigger)
    }

    pub async fn update_trigger(&self, tenant_id: &str, mut trigger: Trigger) -> DefinitionsResult<Trigger> {
        require(tenant_id, "TenantId")?;
        require(&trigger.id, "TriggerId")?;
        assign_tenant(tenant_id, &mut trigger.tenant_id);
        self.ensure_ready()?;

        self.write_trigger(&trigger)
            .await
            .map_err(store_failure("update_trigger"))?;
        self.changed(tenant_id, &trigger.id, EventType::TriggerChange);
        Ok(trigger)
    }

    /// Delete a trigger with its tags, conditions, dampening and action bindings.
    pub async fn remove_trigger(&self, tenant_id: &str, trigger_id: &str) -> DefinitionsResult<()> {
        require(tenant_id, "TenantId")?;
        require(trigger_id, "TriggerId")?;
        self.ensure_ready()?;

        let fail = || store_failure("remove_trigger");
        self.delete_tags(tenant_id, trigger_id, None, None)
            .await
            .map_err(fail())?;

        let (dampenings, conditions, bindings, record) = tokio::join!(
            self.session
                .delete_prefix(Table::Dampenings, partition(&[tenant_id, trigger_id])),
            self.session
                .delete_prefix(Table::Conditions, partition(&[tenant_id, trigger_id])),
            self.session
                .delete_prefix(Table::TriggersActions, partition(&[tenant_id, trigger_id])),
            self.session
                .delete(Table::Triggers, row_key(&[tenant_id, trigger_id])),
        );
        dampenings.map_err(fail())?;
        conditions.map_err(fail())?;
        bindings.map_err(fail())?;
        let existed = record.map_err(fail())?;

        info!(tenant_id, trigger_id, existed, "trigger removed");
        self.changed(tenant_id, trigger_id, EventType::TriggerChange);
        Ok(())
    }

    pub async fn get_trigger(&self, tenant_id: &str, trigger_id: &str) -> DefinitionsResult<Option<Trigger>> {
        require(tenant_id, "TenantId")?;
        require(trigger_id, "TriggerId")?;
        self.ensure_ready()?;

        let fail = || store_failure("get_trigger");
        let record: Option<Trigger> = self
            .session
            .get_json(Table::Triggers, row_key(&[tenant_id, trigger_id]))
            .await
            .map_err(fail())?;
        match record {
            Some(mut trigger) => {
                trigger.actions = self
                    .read_action_bindings(tenant_id, trigger_id)
                    .await
                    .map_err(fail())?;
                Ok(Some(trigger))
            }
            None => Ok(None),
        }
    }

    /// Every trigger of one tenant, each with its action bindings.
    pub async fn get_triggers(&self, tenant_id: &str) -> DefinitionsResult<Vec<Trigger>> {
        require(tenant_id, "TenantId")?;
        self.ensure_ready()?;

        self.read_triggers(partition(&[tenant_id]))
            .await
            .map_err(store_failure("get_triggers"))
    }

    /// Every trigger of every tenant.
    pub async fn get_all_triggers(&self) -> DefinitionsResult<Vec<Trigger>> {
        self.ensure_ready()?;

        self.read_triggers(String::new())
            .await
            .map_err(store_failure("get_all_triggers"))
    }

    /// Clone a trigger under a fresh id, rewriting data ids through `data_id_map`.
    ///
    /// The map keys must be exactly the data ids referenced by the source
    /// conditions. Name, description, severity, match policies and action
    /// bindings are copied; conditions and dampening are re-created for the
    /// new trigger.
    pub async fn copy_trigger(
        &self,
        tenant_id: &str,
        trigger_id: &str,
        data_id_map: &HashMap<String, String>,
    ) -> DefinitionsResult<Trigger> {
        require(tenant_id, "TenantId")?;
        require(trigger_id, "TriggerId")?;
        if data_id_map.is_empty() {
            return Err(DefinitionsError::InvalidArgument(
                "DataIdMap must be not empty".into(),
            ));
        }
        self.ensure_ready()?;

        let source = self.get_trigger(tenant_id, trigger_id).await?.ok_or_else(|| {
            DefinitionsError::InvalidArgument(format!("Trigger {trigger_id} does not exist"))
        })?;
        let conditions = self
            .get_trigger_conditions(tenant_id, trigger_id, None)
            .await?;
        if !covers_exactly(&conditions, data_id_map) {
            return Err(DefinitionsError::InvalidArgument(format!(
                "DataIdMap must map exactly the dataIds referenced by trigger {trigger_id}"
            )));
        }
        let dampenings = self
            .get_trigger_dampenings(tenant_id, trigger_id, None)
            .await?;

        let mut copy = Trigger::new(source.name.clone());
        copy.description = source.description.clone();
        copy.severity = source.severity;
        copy.firing_match = source.firing_match;
        copy.auto_resolve_match = source.auto_resolve_match;
        copy.actions = source.actions.clone();
        let copy = self.add_trigger(tenant_id, copy).await?;

        for mode in Mode::ALL {
            let set: Vec<Condition> = conditions
                .iter()
                .filter(|c| c.trigger_mode == *mode)
                .map(|c| {
                    let mut kind = c.kind.clone();
                    kind.substitute_data_ids(data_id_map);
                    Condition::new(copy.id.as_str(), *mode, kind)
                })
                .collect();
            if !set.is_empty() {
                self.set_conditions(tenant_id, &copy.id, *mode, set).await?;
            }
        }
        for d in &dampenings {
            let dampening = Dampening::new(
                copy.id.as_str(),
                d.trigger_mode,
                d.dampening_type,
                d.eval_true_setting,
                d.eval_total_setting,
                d.eval_time_setting,
            );
            self.add_dampening(tenant_id, dampening).await?;
        }

        info!(tenant_id, source = trigger_id, copy = %copy.id, "trigger copied");
        Ok(copy)
    }

    /// Primary record first, then replace the binding rows for the trigger.
    async fn write_trigger(&self, trigger: &Trigger) -> StoreResult<()> {
        let mut record = trigger.clone();
        record.actions.clear();
        self.session
            .put_json(Table::Triggers, row_key(&[&trigger.tenant_id, &trigger.id]), &record)
            .await?;

        self.session
            .delete_prefix(
                Table::TriggersActions,
                partition(&[&trigger.tenant_id, &trigger.id]),
            )
            .await?;
        gather_all(trigger.actions.iter().map(|(plugin, actions)| {
            let row = ActionBindingRow {
                action_plugin: plugin.clone(),
                actions: actions.clone(),
            };
            let key = row_key(&[&trigger.tenant_id, &trigger.id, plugin]);
            async move { self.session.put_json(Table::TriggersActions, key, &row).await }
        }))
        .await?;
        debug!(trigger_id = %trigger.id, plugins = trigger.actions.len(), "action bindings written");
        Ok(())
    }

    async fn read_action_bindings(&self, tenant_id: &str, trigger_id: &str) -> StoreResult<ActionBindings> {
        let rows: Vec<ActionBindingRow> = self
            .session
            .scan_json(Table::TriggersActions, partition(&[tenant_id, trigger_id]))
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| (row.action_plugin, row.actions))
            .collect())
    }

    async fn read_triggers(&self, prefix: String) -> StoreResult<Vec<Trigger>> {
        let records: Vec<Trigger> = self.session.scan_json(Table::Triggers, prefix).await?;
        let bindings = gather_all(
            records
                .iter()
                .map(|t| self.read_action_bindings(&t.tenant_id, &t.id)),
        )
        .await?;
        Ok(records
            .into_iter()
            .zip(bindings)
            .map(|(mut trigger, actions)| {
                trigger.actions = actions;
                trigger
            })
            .collect())
    }
}
