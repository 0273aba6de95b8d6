//! Tags and the inverted tag index.
//!
//! `tags` holds one row per (tenant, trigger, category, name); `tags_triggers`
//! maps (tenant, category, name) to the set of trigger ids carrying it. The
//! index entry is maintained with a read-modify-write that is not atomic, so
//! two concurrent inserts of the same (category, name) for different triggers
//! can lose one trigger id. The catalog accepts that race.

use std::collections::BTreeSet;

use tracing::debug;
use vigil_core::Tag;
use vigil_store::keys::{partition, row_key};
use vigil_store::{Session, StoreResult, Table};

use crate::definitions::{Definitions, assign_tenant};
use crate::error::{DefinitionsResult, require, store_failure};
use crate::fanout::gather_all;

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

impl<S: Session> Definitions<S> {
    /// Attach a tag to a trigger and record it in the index.
    pub async fn add_tag(&self, tenant_id: &str, mut tag: Tag) -> DefinitionsResult<Tag> {
        require(tenant_id, "TenantId")?;
        require(&tag.trigger_id, "TriggerId")?;
        require(&tag.name, "Name")?;
        assign_tenant(tenant_id, &mut tag.tenant_id);
        self.ensure_ready()?;

        self.insert_tag(&tag).await.map_err(store_failure("add_tag"))?;
        Ok(tag)
    }

    /// Remove a trigger's tags, narrowed by category and/or name when given.
    pub async fn remove_tags(
        &self,
        tenant_id: &str,
        trigger_id: &str,
        category: Option<&str>,
        name: Option<&str>,
    ) -> DefinitionsResult<()> {
        require(tenant_id, "TenantId")?;
        require(trigger_id, "TriggerId")?;
        self.ensure_ready()?;

        self.delete_tags(tenant_id, trigger_id, category, name)
            .await
            .map_err(store_failure("remove_tags"))
    }

    pub async fn get_trigger_tags(
        &self,
        tenant_id: &str,
        trigger_id: &str,
        category: Option<&str>,
    ) -> DefinitionsResult<Vec<Tag>> {
        require(tenant_id, "TenantId")?;
        require(trigger_id, "TriggerId")?;
        self.ensure_ready()?;

        self.find_tags(tenant_id, trigger_id, category, None)
            .await
            .map_err(store_failure("get_trigger_tags"))
    }

    /// Trigger ids carrying the tag (category, name).
    pub async fn get_tagged_triggers(
        &self,
        tenant_id: &str,
        category: &str,
        name: &str,
    ) -> DefinitionsResult<BTreeSet<String>> {
        require(tenant_id, "TenantId")?;
        require(name, "Name")?;
        self.ensure_ready()?;

        let triggers: Option<BTreeSet<String>> = self
            .session
            .get_json(Table::TagsTriggers, row_key(&[tenant_id, category, name]))
            .await
            .map_err(store_failure("get_tagged_triggers"))?;
        Ok(triggers.unwrap_or_default())
    }

    /// Idempotent insert of the tag row followed by the index update.
    pub(crate) async fn insert_tag(&self, tag: &Tag) -> StoreResult<()> {
        let key = row_key(&[&tag.tenant_id, &tag.trigger_id, &tag.category, &tag.name]);
        if self.session.get(Table::Tags, key.clone()).await?.is_some() {
            debug!(trigger_id = %tag.trigger_id, category = %tag.category, name = %tag.name, "tag already present");
            return Ok(());
        }
        self.session.put_json(Table::Tags, key, tag).await?;

        let index_key = row_key(&[&tag.tenant_id, &tag.category, &tag.name]);
        let existing: Option<BTreeSet<String>> =
            self.session.get_json(Table::TagsTriggers, index_key.clone()).await?;
        let triggers = match existing {
            None => BTreeSet::from([tag.trigger_id.clone()]),
            Some(set) if set.contains(&tag.trigger_id) => return Ok(()),
            Some(mut set) => {
                set.insert(tag.trigger_id.clone());
                set
            }
        };
        self.session
            .put_json(Table::TagsTriggers, index_key, &triggers)
            .await
    }

    pub(crate) async fn find_tags(
        &self,
        tenant_id: &str,
        trigger_id: &str,
        category: Option<&str>,
        name: Option<&str>,
    ) -> StoreResult<Vec<Tag>> {
        let prefix = match non_blank(category) {
            Some(category) => partition(&[tenant_id, trigger_id, category]),
            None => partition(&[tenant_id, trigger_id]),
        };
        let tags: Vec<Tag> = self.session.scan_json(Table::Tags, prefix).await?;
        Ok(match non_blank(name) {
            Some(name) => tags.into_iter().filter(|t| t.name == name).collect(),
            None => tags,
        })
    }

    /// Index entries first, tag rows last.
    pub(crate) async fn delete_tags(
        &self,
        tenant_id: &str,
        trigger_id: &str,
        category: Option<&str>,
        name: Option<&str>,
    ) -> StoreResult<()> {
        let tags = self.find_tags(tenant_id, trigger_id, category, name).await?;
        if tags.is_empty() {
            return Ok(());
        }

        for tag in &tags {
            let index_key = row_key(&[tenant_id, &tag.category, &tag.name]);
            let existing: Option<BTreeSet<String>> =
                self.session.get_json(Table::TagsTriggers, index_key.clone()).await?;
            let Some(mut triggers) = existing else {
                continue;
            };
            if !triggers.remove(trigger_id) {
                continue;
            }
            if triggers.is_empty() {
                self.session.delete(Table::TagsTriggers, index_key).await?;
            } else {
                self.session
                    .put_json(Table::TagsTriggers, index_key, &triggers)
                    .await?;
            }
        }

        gather_all(tags.iter().map(|tag| {
            self.session.delete(
                Table::Tags,
                row_key(&[tenant_id, trigger_id, &tag.category, &tag.name]),
            )
        }))
        .await?;
        debug!(tenant_id, trigger_id, removed = tags.len(), "tags removed");
        Ok(())
    }
}
