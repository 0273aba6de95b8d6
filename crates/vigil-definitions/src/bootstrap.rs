//! Seed-file loader.
//!
//! Reads `triggers.data`, `conditions.data`, `dampening.data` and
//! `actions.data` from a directory and feeds every well-formed line through
//! the [`Definitions`] facade. Lines are comma-separated; blank lines and
//! lines starting with `#` are ignored; malformed lines are skipped with a
//! warning. Missing files are skipped as well.

use std::path::Path;

use tracing::{debug, info, warn};
use vigil_core::{
    ActionProperties, Condition, ConditionKind, Dampening, Mode, Trigger,
};
use vigil_store::Session;

use crate::definitions::Definitions;
use crate::error::DefinitionsResult;

pub const TRIGGERS_FILE: &str = "triggers.data";
pub const CONDITIONS_FILE: &str = "conditions.data";
pub const DAMPENING_FILE: &str = "dampening.data";
pub const ACTIONS_FILE: &str = "actions.data";

/// Counts of records loaded per seed file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub triggers: usize,
    pub conditions: usize,
    pub dampenings: usize,
    pub actions: usize,
    /// Non-comment lines that could not be parsed.
    pub skipped: usize,
}

impl LoadSummary {
    pub fn total(&self) -> usize {
        self.triggers + self.conditions + self.dampenings + self.actions
    }
}

/// Load every seed file found in `dir`.
///
/// Parse problems never fail the load; catalog errors do.
pub async fn load_dir<S: Session>(
    definitions: &Definitions<S>,
    dir: &Path,
) -> DefinitionsResult<LoadSummary> {
    let mut summary = LoadSummary::default();

    for fields in read_records(dir, TRIGGERS_FILE, &mut summary.skipped).await {
        match parse_trigger(&fields) {
            Some(trigger) => {
                let tenant_id = trigger.tenant_id.clone();
                definitions.add_trigger(&tenant_id, trigger).await?;
                summary.triggers += 1;
            }
            None => skip(TRIGGERS_FILE, &fields, &mut summary.skipped),
        }
    }

    for fields in read_records(dir, CONDITIONS_FILE, &mut summary.skipped).await {
        match parse_condition(&fields) {
            Some(condition) => {
                let tenant_id = condition.tenant_id.clone();
                let trigger_id = condition.trigger_id.clone();
                let mode = condition.trigger_mode;
                definitions
                    .add_condition(&tenant_id, &trigger_id, mode, condition)
                    .await?;
                summary.conditions += 1;
            }
            None => skip(CONDITIONS_FILE, &fields, &mut summary.skipped),
        }
    }

    for fields in read_records(dir, DAMPENING_FILE, &mut summary.skipped).await {
        match parse_dampening(&fields) {
            Some(dampening) => {
                let tenant_id = dampening.tenant_id.clone();
                definitions.add_dampening(&tenant_id, dampening).await?;
                summary.dampenings += 1;
            }
            None => skip(DAMPENING_FILE, &fields, &mut summary.skipped),
        }
    }

    for fields in read_records(dir, ACTIONS_FILE, &mut summary.skipped).await {
        match parse_action(&fields) {
            Some(action) => {
                definitions
                    .add_action(
                        &action.tenant_id,
                        &action.action_plugin,
                        &action.action_id,
                        action.properties,
                    )
                    .await?;
                summary.actions += 1;
            }
            None => skip(ACTIONS_FILE, &fields, &mut summary.skipped),
        }
    }

    info!(
        dir = %dir.display(),
        triggers = summary.triggers,
        conditions = summary.conditions,
        dampenings = summary.dampenings,
        actions = summary.actions,
        skipped = summary.skipped,
        "seed files loaded"
    );
    Ok(summary)
}

fn skip(file: &str, fields: &[String], skipped: &mut usize) {
    *skipped += 1;
    warn!(file, line = %fields.join(","), "skipping malformed seed line");
}

/// Split every meaningful line of one seed file into fields.
async fn read_records(dir: &Path, file: &str, skipped: &mut usize) -> Vec<Vec<String>> {
    let path = dir.join(file);
    let content = match tokio::fs::read_to_string(&path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "seed file not found");
            return Vec::new();
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not read seed file");
            *skipped += 1;
            return Vec::new();
        }
    };
    let records: Vec<Vec<String>> = content
        .lines()
        .filter(|line| !line.trim().is_empty() && !line.starts_with('#'))
        .map(|line| line.split(',').map(|f| f.trim().to_string()).collect())
        .collect();
    debug!(file, records = records.len(), "seed file read");
    records
}

fn flag(field: &str) -> bool {
    field.eq_ignore_ascii_case("true")
}

/// `tenant,id,enabled,name,description,auto_disable,auto_resolve,
/// auto_resolve_alerts,severity,firing_match,auto_resolve_match,plugin#id|plugin#id`
pub fn parse_trigger(fields: &[String]) -> Option<Trigger> {
    if fields.len() != 12 {
        return None;
    }
    let mut trigger = Trigger::with_id(fields[1].as_str(), fields[3].as_str());
    trigger.tenant_id = fields[0].clone();
    trigger.enabled = flag(&fields[2]);
    trigger.description = Some(fields[4].clone()).filter(|d| !d.is_empty());
    trigger.auto_disable = flag(&fields[5]);
    trigger.auto_resolve = flag(&fields[6]);
    trigger.auto_resolve_alerts = flag(&fields[7]);
    trigger.severity = fields[8].parse().ok()?;
    trigger.firing_match = fields[9].parse().ok()?;
    trigger.auto_resolve_match = fields[10].parse().ok()?;
    for binding in fields[11].split('|').filter(|b| !b.is_empty()) {
        let (plugin, action_id) = binding.split_once('#')?;
        trigger.add_action(plugin, action_id);
    }
    Some(trigger)
}

/// `tenant,trigger,mode,set_size,set_index,type,...` with the variant columns after `type`.
pub fn parse_condition(fields: &[String]) -> Option<Condition> {
    if fields.len() <= 5 {
        return None;
    }
    let trigger_mode: Mode = fields[2].parse().ok()?;
    let data_id = || fields.get(6).cloned();
    let kind = match (fields[5].as_str(), fields.len()) {
        ("threshold", 9) => ConditionKind::Threshold {
            data_id: data_id()?,
            operator: fields[7].parse().ok()?,
            threshold: fields[8].parse().ok()?,
        },
        ("range", 12) => ConditionKind::Range {
            data_id: data_id()?,
            operator_low: fields[7].parse().ok()?,
            operator_high: fields[8].parse().ok()?,
            threshold_low: fields[9].parse().ok()?,
            threshold_high: fields[10].parse().ok()?,
            in_range: flag(&fields[11]),
        },
        ("compare", 10) => ConditionKind::Compare {
            data_id: data_id()?,
            operator: fields[7].parse().ok()?,
            data2_multiplier: fields[8].parse().ok()?,
            data2_id: fields[9].clone(),
        },
        ("string", 10) => ConditionKind::String {
            data_id: data_id()?,
            operator: fields[7].parse().ok()?,
            pattern: fields[8].clone(),
            ignore_case: flag(&fields[9]),
        },
        ("availability", 8) => ConditionKind::Availability {
            data_id: data_id()?,
            operator: fields[7].parse().ok()?,
        },
        _ => return None,
    };
    let mut condition = Condition::new(fields[1].as_str(), trigger_mode, kind);
    condition.tenant_id = fields[0].clone();
    condition.condition_set_size = fields[3].parse().ok()?;
    condition.condition_set_index = fields[4].parse().ok()?;
    Some(condition)
}

/// `tenant,trigger,mode,type,eval_true,eval_total,eval_time`
pub fn parse_dampening(fields: &[String]) -> Option<Dampening> {
    if fields.len() != 7 {
        return None;
    }
    let mut dampening = Dampening::new(
        fields[1].as_str(),
        fields[2].parse().ok()?,
        fields[3].parse().ok()?,
        fields[4].parse().ok()?,
        fields[5].parse().ok()?,
        fields[6].parse().ok()?,
    );
    dampening.tenant_id = fields[0].clone();
    Some(dampening)
}

/// One parsed `actions.data` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedAction {
    pub tenant_id: String,
    pub action_plugin: String,
    pub action_id: String,
    pub properties: ActionProperties,
}

/// `tenant,plugin,action_id,key=value,...`; pairs without exactly one `=` are dropped.
pub fn parse_action(fields: &[String]) -> Option<SeedAction> {
    if fields.len() <= 3 {
        return None;
    }
    let properties: ActionProperties = fields[3..]
        .iter()
        .filter_map(|pair| {
            let mut parts = pair.split('=');
            match (parts.next(), parts.next(), parts.next()) {
                (Some(key), Some(value), None) => Some((key.to_string(), value.to_string())),
                _ => None,
            }
        })
        .collect();
    if properties.is_empty() {
        return None;
    }
    Some(SeedAction {
        tenant_id: fields[0].clone(),
        action_plugin: fields[1].clone(),
        action_id: fields[2].clone(),
        properties,
    })
}
