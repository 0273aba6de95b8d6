//! Action plugins and per-tenant action instances.
//!
//! Plugins are global and declare the property names their actions use.
//! An action's property bag always carries its own identity under
//! `tenantId`, `actionPlugin` and `actionId`.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use vigil_core::ActionProperties;
use vigil_store::keys::{partition, row_key};
use vigil_store::{Session, StoreResult, Table};

use crate::definitions::Definitions;
use crate::error::{DefinitionsError, DefinitionsResult, require, store_failure};

pub const TENANT_ID_PROPERTY: &str = "tenantId";
pub const ACTION_PLUGIN_PROPERTY: &str = "actionPlugin";
pub const ACTION_ID_PROPERTY: &str = "actionId";

#[derive(Debug, Serialize, Deserialize)]
struct PluginRow {
    action_plugin: String,
    properties: BTreeSet<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ActionRow {
    tenant_id: String,
    action_plugin: String,
    action_id: String,
    properties: ActionProperties,
}

fn require_properties(empty: bool) -> DefinitionsResult<()> {
    if empty {
        return Err(DefinitionsError::InvalidArgument(
            "Properties must be not empty".into(),
        ));
    }
    Ok(())
}

fn with_identity(
    tenant_id: &str,
    action_plugin: &str,
    action_id: &str,
    mut properties: ActionProperties,
) -> ActionProperties {
    properties.insert(TENANT_ID_PROPERTY.into(), tenant_id.into());
    properties.insert(ACTION_PLUGIN_PROPERTY.into(), action_plugin.into());
    properties.insert(ACTION_ID_PROPERTY.into(), action_id.into());
    properties
}

impl<S: Session> Definitions<S> {
    /// Register a plugin with the property names its actions declare.
    pub async fn add_action_plugin(&self, action_plugin: &str, properties: BTreeSet<String>) -> DefinitionsResult<()> {
        self.write_plugin(action_plugin, properties, "add_action_plugin").await
    }

    pub async fn update_action_plugin(&self, action_plugin: &str, properties: BTreeSet<String>) -> DefinitionsResult<()> {
        self.write_plugin(action_plugin, properties, "update_action_plugin").await
    }

    pub async fn remove_action_plugin(&self, action_plugin: &str) -> DefinitionsResult<()> {
        require(action_plugin, "ActionPlugin")?;
        self.ensure_ready()?;

        let existed = self
            .session
            .delete(Table::ActionPlugins, row_key(&[action_plugin]))
            .await
            .map_err(store_failure("remove_action_plugin"))?;
        debug!(action_plugin, existed, "action plugin removed");
        Ok(())
    }

    /// Registered plugin names.
    pub async fn get_action_plugins(&self) -> DefinitionsResult<Vec<String>> {
        self.ensure_ready()?;

        let rows: Vec<PluginRow> = self
            .session
            .scan_json(Table::ActionPlugins, String::new())
            .await
            .map_err(store_failure("get_action_plugins"))?;
        Ok(rows.into_iter().map(|r| r.action_plugin).collect())
    }

    /// Declared property names of one plugin.
    pub async fn get_action_plugin(&self, action_plugin: &str) -> DefinitionsResult<Option<BTreeSet<String>>> {
        require(action_plugin, "ActionPlugin")?;
        self.ensure_ready()?;

        let row: Option<PluginRow> = self
            .session
            .get_json(Table::ActionPlugins, row_key(&[action_plugin]))
            .await
            .map_err(store_failure("get_action_plugin"))?;
        Ok(row.map(|r| r.properties))
    }

    pub async fn add_action(
        &self,
        tenant_id: &str,
        action_plugin: &str,
        action_id: &str,
        properties: ActionProperties,
    ) -> DefinitionsResult<ActionProperties> {
        self.write_action(tenant_id, action_plugin, action_id, properties, "add_action")
            .await
    }

    pub async fn update_action(
        &self,
        tenant_id: &str,
        action_plugin: &str,
        action_id: &str,
        properties: ActionProperties,
    ) -> DefinitionsResult<ActionProperties> {
        self.write_action(tenant_id, action_plugin, action_id, properties, "update_action")
            .await
    }

    pub async fn remove_action(&self, tenant_id: &str, action_plugin: &str, action_id: &str) -> DefinitionsResult<()> {
        require(tenant_id, "TenantId")?;
        require(action_plugin, "ActionPlugin")?;
        require(action_id, "ActionId")?;
        self.ensure_ready()?;

        let existed = self
            .session
            .delete(Table::Actions, row_key(&[tenant_id, action_plugin, action_id]))
            .await
            .map_err(store_failure("remove_action"))?;
        debug!(tenant_id, action_plugin, action_id, existed, "action removed");
        Ok(())
    }

    pub async fn get_action(
        &self,
        tenant_id: &str,
        action_plugin: &str,
        action_id: &str,
    ) -> DefinitionsResult<Option<ActionProperties>> {
        require(tenant_id, "TenantId")?;
        require(action_plugin, "ActionPlugin")?;
        require(action_id, "ActionId")?;
        self.ensure_ready()?;

        let row: Option<ActionRow> = self
            .session
            .get_json(Table::Actions, row_key(&[tenant_id, action_plugin, action_id]))
            .await
            .map_err(store_failure("get_action"))?;
        Ok(row.map(|r| r.properties))
    }

    /// Action ids of one tenant grouped by plugin.
    pub async fn get_actions(&self, tenant_id: &str) -> DefinitionsResult<BTreeMap<String, BTreeSet<String>>> {
        require(tenant_id, "TenantId")?;
        self.ensure_ready()?;

        let rows = self
            .read_actions(partition(&[tenant_id]))
            .await
            .map_err(store_failure("get_actions"))?;
        let mut by_plugin: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for row in rows {
            by_plugin.entry(row.action_plugin).or_default().insert(row.action_id);
        }
        Ok(by_plugin)
    }

    /// Action ids of one tenant for a single plugin.
    pub async fn get_plugin_actions(&self, tenant_id: &str, action_plugin: &str) -> DefinitionsResult<Vec<String>> {
        require(tenant_id, "TenantId")?;
        require(action_plugin, "ActionPlugin")?;
        self.ensure_ready()?;

        let rows = self
            .read_actions(partition(&[tenant_id, action_plugin]))
            .await
            .map_err(store_failure("get_plugin_actions"))?;
        Ok(rows.into_iter().map(|r| r.action_id).collect())
    }

    /// Action ids of every tenant: tenant → plugin → ids.
    pub async fn get_all_actions(
        &self,
    ) -> DefinitionsResult<BTreeMap<String, BTreeMap<String, BTreeSet<String>>>> {
        self.ensure_ready()?;

        let rows = self
            .read_actions(String::new())
            .await
            .map_err(store_failure("get_all_actions"))?;
        let mut by_tenant: BTreeMap<String, BTreeMap<String, BTreeSet<String>>> = BTreeMap::new();
        for row in rows {
            by_tenant
                .entry(row.tenant_id)
                .or_default()
                .entry(row.action_plugin)
                .or_default()
                .insert(row.action_id);
        }
        Ok(by_tenant)
    }

    async fn write_plugin(
        &self,
        action_plugin: &str,
        properties: BTreeSet<String>,
        op: &'static str,
    ) -> DefinitionsResult<()> {
        require(action_plugin, "ActionPlugin")?;
        require_properties(properties.is_empty())?;
        self.ensure_ready()?;

        let row = PluginRow {
            action_plugin: action_plugin.to_string(),
            properties,
        };
        self.session
            .put_json(Table::ActionPlugins, row_key(&[action_plugin]), &row)
            .await
            .map_err(store_failure(op))?;
        info!(action_plugin, properties = row.properties.len(), "action plugin registered");
        Ok(())
    }

    async fn write_action(
        &self,
        tenant_id: &str,
        action_plugin: &str,
        action_id: &str,
        properties: ActionProperties,
        op: &'static str,
    ) -> DefinitionsResult<ActionProperties> {
        require(tenant_id, "TenantId")?;
        require(action_plugin, "ActionPlugin")?;
        require(action_id, "ActionId")?;
        require_properties(properties.is_empty())?;
        self.ensure_ready()?;

        let properties = with_identity(tenant_id, action_plugin, action_id, properties);
        let row = ActionRow {
            tenant_id: tenant_id.to_string(),
            action_plugin: action_plugin.to_string(),
            action_id: action_id.to_string(),
            properties,
        };
        self.session
            .put_json(Table::Actions, row_key(&[tenant_id, action_plugin, action_id]), &row)
            .await
            .map_err(store_failure(op))?;
        debug!(tenant_id, action_plugin, action_id, "action written");
        Ok(row.properties)
    }

    async fn read_actions(&self, prefix: String) -> StoreResult<Vec<ActionRow>> {
        self.session.scan_json(Table::Actions, prefix).await
    }
}
