//! Condition sets.
//!
//! A trigger owns at most one ordered condition set per mode. Every mutation
//! rewrites the whole set: the old rows are deleted, the new ones renumbered
//! `1..=N` and written concurrently, and the trigger's `dataId` tags are
//! regenerated from every data id its conditions reference.

use std::collections::{BTreeSet, HashMap};

use tracing::{debug, info};
use vigil_core::{Condition, DATA_ID_CATEGORY, Mode, Tag};
use vigil_store::keys::{partition, row_key};
use vigil_store::{Row, Session, StoreError, StoreResult, Table};

use crate::codec::{CodecError, ConditionRow};
use crate::definitions::{Definitions, assign_tenant};
use crate::error::{DefinitionsError, DefinitionsResult, require, store_failure};
use crate::fanout::gather_all;
use crate::notify::EventType;

fn condition_key(condition: &Condition) -> String {
    row_key(&[
        &condition.tenant_id,
        &condition.trigger_id,
        condition.trigger_mode.as_str(),
        &format!("{:010}", condition.condition_set_index),
    ])
}

/// Decode scanned rows, skipping unknown variants, ordered by mode then index.
fn decode_rows(rows: Vec<Row>) -> StoreResult<Vec<Condition>> {
    let mut conditions = Vec::with_capacity(rows.len());
    for (key, bytes) in rows {
        let row: ConditionRow =
            serde_json::from_slice(&bytes).map_err(|e| StoreError::Deserialize(e.to_string()))?;
        match row.decode() {
            Ok(condition) => conditions.push(condition),
            Err(CodecError::UnknownType(ty)) => {
                debug!(key = %key.escape_debug(), condition_type = %ty, "skipping condition row of unknown type");
            }
            Err(e) => return Err(StoreError::Deserialize(e.to_string())),
        }
    }
    conditions.sort_by_key(|c| (c.trigger_mode, c.condition_set_index));
    Ok(conditions)
}

impl<S: Session> Definitions<S> {
    /// Append one condition to the (trigger, mode) set.
    pub async fn add_condition(
        &self,
        tenant_id: &str,
        trigger_id: &str,
        trigger_mode: Mode,
        condition: Condition,
    ) -> DefinitionsResult<Vec<Condition>> {
        require(tenant_id, "TenantId")?;
        require(trigger_id, "TriggerId")?;
        self.ensure_ready()?;

        let mut conditions = self
            .read_conditions(tenant_id, trigger_id, Some(trigger_mode))
            .await
            .map_err(store_failure("add_condition"))?;
        conditions.push(condition);
        self.set_conditions(tenant_id, trigger_id, trigger_mode, conditions)
            .await
    }

    /// Remove a condition by id. `None` when no such condition exists.
    pub async fn remove_condition(
        &self,
        tenant_id: &str,
        condition_id: &str,
    ) -> DefinitionsResult<Option<Vec<Condition>>> {
        require(tenant_id, "TenantId")?;
        require(condition_id, "ConditionId")?;
        self.ensure_ready()?;

        let fail = || store_failure("remove_condition");
        let Some(existing) = self
            .find_condition(tenant_id, condition_id)
            .await
            .map_err(fail())?
        else {
            debug!(tenant_id, condition_id, "condition not found, nothing removed");
            return Ok(None);
        };

        let remaining: Vec<Condition> = self
            .read_conditions(tenant_id, &existing.trigger_id, Some(existing.trigger_mode))
            .await
            .map_err(fail())?
            .into_iter()
            .filter(|c| c.condition_id() != condition_id)
            .collect();
        let conditions = self
            .set_conditions(tenant_id, &existing.trigger_id, existing.trigger_mode, remaining)
            .await?;
        Ok(Some(conditions))
    }

    /// Replace the condition whose id matches `condition.condition_id()`.
    pub async fn update_condition(
        &self,
        tenant_id: &str,
        condition: Condition,
    ) -> DefinitionsResult<Vec<Condition>> {
        require(tenant_id, "TenantId")?;
        require(&condition.trigger_id, "TriggerId")?;
        let condition_id = condition.condition_id();
        self.ensure_ready()?;

        let fail = || store_failure("update_condition");
        let Some(existing) = self
            .find_condition(tenant_id, &condition_id)
            .await
            .map_err(fail())?
        else {
            return Err(DefinitionsError::InvalidArgument(format!(
                "ConditionId {condition_id} does not exist"
            )));
        };

        let conditions: Vec<Condition> = self
            .read_conditions(tenant_id, &existing.trigger_id, Some(existing.trigger_mode))
            .await
            .map_err(fail())?
            .into_iter()
            .map(|c| {
                if c.condition_id() == condition_id {
                    condition.clone()
                } else {
                    c
                }
            })
            .collect();
        self.set_conditions(tenant_id, &existing.trigger_id, existing.trigger_mode, conditions)
            .await
    }

    /// Replace the whole (trigger, mode) set with `conditions`, in order.
    ///
    /// Row writes fan out concurrently. If any fails the first error is
    /// returned once all have finished, the previous set stays deleted and no
    /// change event is broadcast.
    pub async fn set_conditions(
        &self,
        tenant_id: &str,
        trigger_id: &str,
        trigger_mode: Mode,
        mut conditions: Vec<Condition>,
    ) -> DefinitionsResult<Vec<Condition>> {
        require(tenant_id, "TenantId")?;
        require(trigger_id, "TriggerId")?;
        self.ensure_ready()?;

        let size = conditions.len() as u32;
        for (i, condition) in conditions.iter_mut().enumerate() {
            assign_tenant(tenant_id, &mut condition.tenant_id);
            condition.trigger_id = trigger_id.to_string();
            condition.trigger_mode = trigger_mode;
            condition.condition_set_size = size;
            condition.condition_set_index = i as u32 + 1;
        }

        self.write_condition_set(tenant_id, trigger_id, trigger_mode, &conditions)
            .await
            .map_err(store_failure("set_conditions"))?;

        info!(tenant_id, trigger_id, mode = %trigger_mode, size, "condition set replaced");
        self.changed(tenant_id, trigger_id, EventType::ConditionChange);
        Ok(conditions)
    }

    /// Conditions of one trigger, optionally narrowed to one mode.
    pub async fn get_trigger_conditions(
        &self,
        tenant_id: &str,
        trigger_id: &str,
        trigger_mode: Option<Mode>,
    ) -> DefinitionsResult<Vec<Condition>> {
        require(tenant_id, "TenantId")?;
        require(trigger_id, "TriggerId")?;
        self.ensure_ready()?;

        self.read_conditions(tenant_id, trigger_id, trigger_mode)
            .await
            .map_err(store_failure("get_trigger_conditions"))
    }

    pub async fn get_condition(
        &self,
        tenant_id: &str,
        condition_id: &str,
    ) -> DefinitionsResult<Option<Condition>> {
        require(tenant_id, "TenantId")?;
        require(condition_id, "ConditionId")?;
        self.ensure_ready()?;

        self.find_condition(tenant_id, condition_id)
            .await
            .map_err(store_failure("get_condition"))
    }

    pub async fn get_conditions(&self, tenant_id: &str) -> DefinitionsResult<Vec<Condition>> {
        require(tenant_id, "TenantId")?;
        self.ensure_ready()?;

        let rows = self
            .session
            .scan_prefix(Table::Conditions, partition(&[tenant_id]))
            .await
            .map_err(store_failure("get_conditions"))?;
        decode_rows(rows).map_err(store_failure("get_conditions"))
    }

    pub async fn get_all_conditions(&self) -> DefinitionsResult<Vec<Condition>> {
        self.ensure_ready()?;

        let rows = self
            .session
            .scan_prefix(Table::Conditions, String::new())
            .await
            .map_err(store_failure("get_all_conditions"))?;
        decode_rows(rows).map_err(store_failure("get_all_conditions"))
    }

    pub(crate) async fn read_conditions(
        &self,
        tenant_id: &str,
        trigger_id: &str,
        trigger_mode: Option<Mode>,
    ) -> StoreResult<Vec<Condition>> {
        let prefix = match trigger_mode {
            Some(mode) => partition(&[tenant_id, trigger_id, mode.as_str()]),
            None => partition(&[tenant_id, trigger_id]),
        };
        decode_rows(self.session.scan_prefix(Table::Conditions, prefix).await?)
    }

    async fn find_condition(&self, tenant_id: &str, condition_id: &str) -> StoreResult<Option<Condition>> {
        let rows = self
            .session
            .scan_prefix(Table::Conditions, partition(&[tenant_id]))
            .await?;
        Ok(decode_rows(rows)?
            .into_iter()
            .find(|c| c.condition_id() == condition_id))
    }

    async fn write_condition_set(
        &self,
        tenant_id: &str,
        trigger_id: &str,
        trigger_mode: Mode,
        conditions: &[Condition],
    ) -> StoreResult<()> {
        let removed = self
            .session
            .delete_prefix(
                Table::Conditions,
                partition(&[tenant_id, trigger_id, trigger_mode.as_str()]),
            )
            .await?;
        self.delete_tags(tenant_id, trigger_id, Some(DATA_ID_CATEGORY), None)
            .await?;
        debug!(tenant_id, trigger_id, mode = %trigger_mode, removed, "previous condition set deleted");

        // dataId tags cover both modes, so the untouched set contributes too.
        let other_mode = match trigger_mode {
            Mode::Firing => Mode::Autoresolve,
            Mode::Autoresolve => Mode::Firing,
        };
        let untouched = self
            .read_conditions(tenant_id, trigger_id, Some(other_mode))
            .await?;
        let data_ids: BTreeSet<String> = conditions
            .iter()
            .chain(untouched.iter())
            .flat_map(|c| c.data_ids())
            .map(str::to_string)
            .collect();

        let rows = gather_all(conditions.iter().map(|condition| {
            let key = condition_key(condition);
            let row = ConditionRow::encode(condition);
            async move { self.session.put_json(Table::Conditions, key, &row).await }
        }));
        let tags = async {
            for data_id in &data_ids {
                let mut tag = Tag::new(trigger_id, DATA_ID_CATEGORY, data_id.as_str(), false);
                tag.tenant_id = tenant_id.to_string();
                self.insert_tag(&tag).await?;
            }
            Ok::<_, StoreError>(())
        };
        let (rows, tags) = tokio::join!(rows, tags);
        rows?;
        tags
    }
}

/// Data ids referenced anywhere in `conditions`.
pub(crate) fn referenced_data_ids(conditions: &[Condition]) -> BTreeSet<&str> {
    conditions.iter().flat_map(|c| c.data_ids()).collect()
}

/// True when `map` renames exactly the referenced data ids, no more, no fewer.
pub(crate) fn covers_exactly(conditions: &[Condition], map: &HashMap<String, String>) -> bool {
    let referenced = referenced_data_ids(conditions);
    referenced.len() == map.len() && referenced.iter().all(|id| map.contains_key(*id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_core::CompareOperator;

    #[test]
    fn condition_keys_sort_numerically() {
        let mut a = Condition::threshold("t", Mode::Firing, "x", CompareOperator::Gt, 1.0);
        a.tenant_id = "acme".into();
        let mut b = a.clone();
        a.condition_set_index = 2;
        b.condition_set_index = 10;
        assert!(condition_key(&a) < condition_key(&b));
    }

    #[test]
    fn decode_skips_unknown_rows_and_orders_by_mode() {
        let mut firing = Condition::threshold("t", Mode::Firing, "x", CompareOperator::Gt, 1.0);
        firing.condition_set_index = 2;
        let resolve = Condition::threshold("t", Mode::Autoresolve, "x", CompareOperator::Lt, 1.0);
        let mut unknown = ConditionRow::encode(&firing);
        unknown.condition_type = "EXTERNAL".into();

        let rows = [
            ConditionRow::encode(&resolve),
            unknown,
            ConditionRow::encode(&firing),
        ]
        .into_iter()
        .map(|r| (String::new(), serde_json::to_vec(&r).unwrap()))
        .collect();

        let decoded = decode_rows(rows).unwrap();
        assert_eq!(decoded, vec![firing, resolve]);
    }

    #[test]
    fn data_id_map_must_match_exactly() {
        let conditions = vec![
            Condition::compare("t", Mode::Firing, "a", CompareOperator::Gt, 1.0, "b"),
            Condition::threshold("t", Mode::Autoresolve, "a", CompareOperator::Lt, 5.0),
        ];
        let map = |pairs: &[(&str, &str)]| -> HashMap<String, String> {
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect()
        };

        assert!(covers_exactly(&conditions, &map(&[("a", "x"), ("b", "y")])));
        assert!(!covers_exactly(&conditions, &map(&[("a", "x")])));
        assert!(!covers_exactly(&conditions, &map(&[("a", "x"), ("b", "y"), ("c", "z")])));
        assert!(!covers_exactly(&conditions, &map(&[("a", "x"), ("c", "y")])));
    }
}
