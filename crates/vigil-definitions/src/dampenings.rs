//! Dampening records, one per (trigger, mode).

use tracing::debug;
use vigil_core::{Dampening, Mode};
use vigil_store::keys::{partition, row_key};
use vigil_store::{Session, StoreResult, Table};

use crate::definitions::{Definitions, assign_tenant};
use crate::error::{DefinitionsResult, require, store_failure};
use crate::notify::EventType;

fn dampening_key(d: &Dampening) -> String {
    row_key(&[
        &d.tenant_id,
        &d.trigger_id,
        d.trigger_mode.as_str(),
        &d.dampening_id,
    ])
}

fn validate(tenant_id: &str, dampening: &Dampening) -> DefinitionsResult<()> {
    require(tenant_id, "TenantId")?;
    require(&dampening.trigger_id, "TriggerId")?;
    require(&dampening.dampening_id, "DampeningId")
}

impl<S: Session> Definitions<S> {
    pub async fn add_dampening(&self, tenant_id: &str, mut dampening: Dampening) -> DefinitionsResult<Dampening> {
        validate(tenant_id, &dampening)?;
        assign_tenant(tenant_id, &mut dampening.tenant_id);
        self.ensure_ready()?;

        self.session
            .put_json(Table::Dampenings, dampening_key(&dampening), &dampening)
            .await
            .map_err(store_failure("add_dampening"))?;
        self.changed(tenant_id, &dampening.trigger_id, EventType::DampeningChange);
        Ok(dampening)
    }

    /// Overwrite a dampening. A missing record is logged and written anyway.
    pub async fn update_dampening(&self, tenant_id: &str, mut dampening: Dampening) -> DefinitionsResult<Dampening> {
        validate(tenant_id, &dampening)?;
        assign_tenant(tenant_id, &mut dampening.tenant_id);
        self.ensure_ready()?;

        let fail = || store_failure("update_dampening");
        if self
            .find_dampening(tenant_id, &dampening.dampening_id)
            .await
            .map_err(fail())?
            .is_none()
        {
            debug!(tenant_id, dampening_id = %dampening.dampening_id, "dampening not found, writing anyway");
        }
        self.session
            .put_json(Table::Dampenings, dampening_key(&dampening), &dampening)
            .await
            .map_err(fail())?;
        self.changed(tenant_id, &dampening.trigger_id, EventType::DampeningChange);
        Ok(dampening)
    }

    /// Delete a dampening by id. Unknown ids are a logged no-op.
    pub async fn remove_dampening(&self, tenant_id: &str, dampening_id: &str) -> DefinitionsResult<()> {
        require(tenant_id, "TenantId")?;
        require(dampening_id, "DampeningId")?;
        self.ensure_ready()?;

        let fail = || store_failure("remove_dampening");
        let Some(existing) = self.find_dampening(tenant_id, dampening_id).await.map_err(fail())? else {
            debug!(tenant_id, dampening_id, "dampening not found, nothing removed");
            return Ok(());
        };
        self.session
            .delete(Table::Dampenings, dampening_key(&existing))
            .await
            .map_err(fail())?;
        self.changed(tenant_id, &existing.trigger_id, EventType::DampeningChange);
        Ok(())
    }

    pub async fn get_dampening(&self, tenant_id: &str, dampening_id: &str) -> DefinitionsResult<Option<Dampening>> {
        require(tenant_id, "TenantId")?;
        require(dampening_id, "DampeningId")?;
        self.ensure_ready()?;

        self.find_dampening(tenant_id, dampening_id)
            .await
            .map_err(store_failure("get_dampening"))
    }

    /// Dampening of one trigger, optionally narrowed to one mode.
    pub async fn get_trigger_dampenings(
        &self,
        tenant_id: &str,
        trigger_id: &str,
        trigger_mode: Option<Mode>,
    ) -> DefinitionsResult<Vec<Dampening>> {
        require(tenant_id, "TenantId")?;
        require(trigger_id, "TriggerId")?;
        self.ensure_ready()?;

        let prefix = match trigger_mode {
            Some(mode) => partition(&[tenant_id, trigger_id, mode.as_str()]),
            None => partition(&[tenant_id, trigger_id]),
        };
        self.session
            .scan_json(Table::Dampenings, prefix)
            .await
            .map_err(store_failure("get_trigger_dampenings"))
    }

    pub async fn get_dampenings(&self, tenant_id: &str) -> DefinitionsResult<Vec<Dampening>> {
        require(tenant_id, "TenantId")?;
        self.ensure_ready()?;

        self.session
            .scan_json(Table::Dampenings, partition(&[tenant_id]))
            .await
            .map_err(store_failure("get_dampenings"))
    }

    pub async fn get_all_dampenings(&self) -> DefinitionsResult<Vec<Dampening>> {
        self.ensure_ready()?;

        self.session
            .scan_json(Table::Dampenings, String::new())
            .await
            .map_err(store_failure("get_all_dampenings"))
    }

    async fn find_dampening(&self, tenant_id: &str, dampening_id: &str) -> StoreResult<Option<Dampening>> {
        let all: Vec<Dampening> = self
            .session
            .scan_json(Table::Dampenings, partition(&[tenant_id]))
            .await?;
        Ok(all.into_iter().find(|d| d.dampening_id == dampening_id))
    }
}
