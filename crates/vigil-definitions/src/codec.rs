//! Denormalized row encoding for the polymorphic condition table.
//!
//! Every condition variant shares one row shape: the common set-membership
//! columns, a `type` discriminator, and a set of optional variant columns of
//! which only those belonging to the variant are populated.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use vigil_core::{Condition, ConditionKind, ConditionType, Mode, ParseTokenError};

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("unknown condition type: {0}")]
    UnknownType(String),

    #[error("{condition_type} row is missing column {column}")]
    MissingColumn {
        condition_type: ConditionType,
        column: &'static str,
    },

    #[error(transparent)]
    Token(#[from] ParseTokenError),
}

/// One stored condition row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConditionRow {
    pub tenant_id: String,
    pub trigger_id: String,
    pub trigger_mode: String,
    #[serde(rename = "type")]
    pub condition_type: String,
    pub condition_set_size: u32,
    pub condition_set_index: u32,
    pub condition_id: String,
    pub data_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data2_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data2_multiplier: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore_case: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator_low: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator_high: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold_low: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold_high: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_range: Option<bool>,
}

impl ConditionRow {
    pub fn encode(condition: &Condition) -> Self {
        let mut row = ConditionRow {
            tenant_id: condition.tenant_id.clone(),
            trigger_id: condition.trigger_id.clone(),
            trigger_mode: condition.trigger_mode.as_str().to_string(),
            condition_type: condition.kind.condition_type().as_str().to_string(),
            condition_set_size: condition.condition_set_size,
            condition_set_index: condition.condition_set_index,
            condition_id: condition.condition_id(),
            data_id: condition.data_id().to_string(),
            ..Default::default()
        };
        match &condition.kind {
            ConditionKind::Availability { operator, .. } => {
                row.operator = Some(operator.as_str().into());
            }
            ConditionKind::Compare {
                operator,
                data2_id,
                data2_multiplier,
                ..
            } => {
                row.operator = Some(operator.as_str().into());
                row.data2_id = Some(data2_id.clone());
                row.data2_multiplier = Some(*data2_multiplier);
            }
            ConditionKind::String {
                operator,
                pattern,
                ignore_case,
                ..
            } => {
                row.operator = Some(operator.as_str().into());
                row.pattern = Some(pattern.clone());
                row.ignore_case = Some(*ignore_case);
            }
            ConditionKind::Threshold {
                operator, threshold, ..
            } => {
                row.operator = Some(operator.as_str().into());
                row.threshold = Some(*threshold);
            }
            ConditionKind::Range {
                operator_low,
                operator_high,
                threshold_low,
                threshold_high,
                in_range,
                ..
            } => {
                row.operator_low = Some(operator_low.as_str().into());
                row.operator_high = Some(operator_high.as_str().into());
                row.threshold_low = Some(*threshold_low);
                row.threshold_high = Some(*threshold_high);
                row.in_range = Some(*in_range);
            }
        }
        row
    }

    pub fn decode(self) -> Result<Condition, CodecError> {
        let condition_type: ConditionType = self
            .condition_type
            .parse()
            .map_err(|_| CodecError::UnknownType(self.condition_type.clone()))?;
        let trigger_mode: Mode = self.trigger_mode.parse()?;

        let need = |column: &'static str| CodecError::MissingColumn {
            condition_type,
            column,
        };
        let operator = || self.operator.as_deref().ok_or_else(|| need("operator"));

        let kind = match condition_type {
            ConditionType::Availability => ConditionKind::Availability {
                data_id: self.data_id.clone(),
                operator: operator()?.parse()?,
            },
            ConditionType::Compare => ConditionKind::Compare {
                data_id: self.data_id.clone(),
                operator: operator()?.parse()?,
                data2_id: self.data2_id.clone().ok_or_else(|| need("data2_id"))?,
                data2_multiplier: self.data2_multiplier.ok_or_else(|| need("data2_multiplier"))?,
            },
            ConditionType::String => ConditionKind::String {
                data_id: self.data_id.clone(),
                operator: operator()?.parse()?,
                pattern: self.pattern.clone().ok_or_else(|| need("pattern"))?,
                ignore_case: self.ignore_case.unwrap_or(false),
            },
            ConditionType::Threshold => ConditionKind::Threshold {
                data_id: self.data_id.clone(),
                operator: operator()?.parse()?,
                threshold: self.threshold.ok_or_else(|| need("threshold"))?,
            },
            ConditionType::Range => ConditionKind::Range {
                data_id: self.data_id.clone(),
                operator_low: self
                    .operator_low
                    .as_deref()
                    .ok_or_else(|| need("operator_low"))?
                    .parse()?,
                operator_high: self
                    .operator_high
                    .as_deref()
                    .ok_or_else(|| need("operator_high"))?
                    .parse()?,
                threshold_low: self.threshold_low.ok_or_else(|| need("threshold_low"))?,
                threshold_high: self.threshold_high.ok_or_else(|| need("threshold_high"))?,
                in_range: self.in_range.unwrap_or(false),
            },
        };

        Ok(Condition {
            tenant_id: self.tenant_id,
            trigger_id: self.trigger_id,
            trigger_mode,
            condition_set_size: self.condition_set_size,
            condition_set_index: self.condition_set_index,
            kind,
        })
    }
}
