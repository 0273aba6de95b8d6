//! Shared catalog types used across Vigil crates.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reserved tag category for the automatic data-stream tags.
pub const DATA_ID_CATEGORY: &str = "dataId";

/// Action plugin name → set of action ids.
pub type ActionBindings = BTreeMap<String, BTreeSet<String>>;

/// Property bag of an action instance.
pub type ActionProperties = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} token: {token}")]
pub struct ParseTokenError {
    pub kind: &'static str,
    pub token: String,
}

/// Implements `as_str`, `Display` and `FromStr` over the upper-case wire tokens.
macro_rules! token_enum {
    ($ty:ident, $kind:literal, { $($variant:ident => $token:literal),+ $(,)? }) => {
        impl $ty {
            pub const ALL: &'static [$ty] = &[$($ty::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $token),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = ParseTokenError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim() {
                    $($token => Ok($ty::$variant),)+
                    other => Err(ParseTokenError {
                        kind: $kind,
                        token: other.to_string(),
                    }),
                }
            }
        }
    };
}

// ── Enumerations ───────────────────────────────────────────────────

/// Which condition set of a trigger is addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Mode {
    /// The trigger becoming active.
    Firing,
    /// An active alert clearing.
    Autoresolve,
}

token_enum!(Mode, "trigger mode", { Firing => "FIRING", Autoresolve => "AUTORESOLVE" });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

token_enum!(Severity, "severity", {
    Low => "LOW",
    Medium => "MEDIUM",
    High => "HIGH",
    Critical => "CRITICAL",
});

/// How a condition set's results are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Match {
    /// Every condition must hold.
    #[default]
    All,
    /// A single condition is enough.
    Any,
}

token_enum!(Match, "match", { All => "ALL", Any => "ANY" });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AvailabilityOperator {
    Down,
    NotUp,
    Up,
}

token_enum!(AvailabilityOperator, "availability operator", {
    Down => "DOWN",
    NotUp => "NOT_UP",
    Up => "UP",
});

/// Numeric comparison used by threshold and compare conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CompareOperator {
    Lt,
    Gt,
    Lte,
    Gte,
}

token_enum!(CompareOperator, "comparison operator", {
    Lt => "LT",
    Gt => "GT",
    Lte => "LTE",
    Gte => "GTE",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StringOperator {
    Equal,
    NotEqual,
    StartsWith,
    EndsWith,
    Contains,
    Match,
}

token_enum!(StringOperator, "string operator", {
    Equal => "EQUAL",
    NotEqual => "NOT_EQUAL",
    StartsWith => "STARTS_WITH",
    EndsWith => "ENDS_WITH",
    Contains => "CONTAINS",
    Match => "MATCH",
});

/// Bound semantics of a range condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RangeOperator {
    Inclusive,
    Exclusive,
}

token_enum!(RangeOperator, "range operator", {
    Inclusive => "INCLUSIVE",
    Exclusive => "EXCLUSIVE",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DampeningType {
    /// N consecutive true evaluations.
    Strict,
    /// N true evaluations out of M total.
    RelaxedCount,
    /// N true evaluations within a time window.
    RelaxedTime,
    /// Only true evaluations for at least a time window.
    StrictTime,
    /// Only true evaluations until a timeout fires.
    StrictTimeout,
}

token_enum!(DampeningType, "dampening type", {
    Strict => "STRICT",
    RelaxedCount => "RELAXED_COUNT",
    RelaxedTime => "RELAXED_TIME",
    StrictTime => "STRICT_TIME",
    StrictTimeout => "STRICT_TIMEOUT",
});

/// Discriminator stored in the denormalized condition row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConditionType {
    Availability,
    Compare,
    String,
    Threshold,
    Range,
}

token_enum!(ConditionType, "condition type", {
    Availability => "AVAILABILITY",
    Compare => "COMPARE",
    String => "STRING",
    Threshold => "THRESHOLD",
    Range => "RANGE",
});

// ── Trigger ────────────────────────────────────────────────────────

/// An alerting rule definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    pub tenant_id: String,
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub severity: Severity,
    pub enabled: bool,
    pub auto_disable: bool,
    pub auto_resolve: bool,
    pub auto_resolve_alerts: bool,
    pub firing_match: Match,
    pub auto_resolve_match: Match,
    #[serde(default)]
    pub actions: ActionBindings,
}

impl Trigger {
    /// A trigger with a freshly generated id.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string(), name)
    }

    pub fn with_id(id: impl Into<String>, name: impl Into<String>) -> Self {
        Trigger {
            tenant_id: String::new(),
            id: id.into(),
            name: name.into(),
            description: None,
            severity: Severity::default(),
            enabled: false,
            auto_disable: false,
            auto_resolve: false,
            auto_resolve_alerts: true,
            firing_match: Match::All,
            auto_resolve_match: Match::All,
            actions: ActionBindings::new(),
        }
    }

    /// Bind an action instance to this trigger.
    pub fn add_action(&mut self, action_plugin: impl Into<String>, action_id: impl Into<String>) {
        self.actions
            .entry(action_plugin.into())
            .or_default()
            .insert(action_id.into());
    }
}

// ── Condition ──────────────────────────────────────────────────────

/// Variant-specific part of a condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum ConditionKind {
    Availability {
        data_id: String,
        operator: AvailabilityOperator,
    },
    Compare {
        data_id: String,
        operator: CompareOperator,
        data2_id: String,
        data2_multiplier: f64,
    },
    String {
        data_id: String,
        operator: StringOperator,
        pattern: String,
        ignore_case: bool,
    },
    Threshold {
        data_id: String,
        operator: CompareOperator,
        threshold: f64,
    },
    Range {
        data_id: String,
        operator_low: RangeOperator,
        operator_high: RangeOperator,
        threshold_low: f64,
        threshold_high: f64,
        in_range: bool,
    },
}

impl ConditionKind {
    pub fn condition_type(&self) -> ConditionType {
        match self {
            ConditionKind::Availability { .. } => ConditionType::Availability,
            ConditionKind::Compare { .. } => ConditionType::Compare,
            ConditionKind::String { .. } => ConditionType::String,
            ConditionKind::Threshold { .. } => ConditionType::Threshold,
            ConditionKind::Range { .. } => ConditionType::Range,
        }
    }

    /// Primary data-stream identifier.
    pub fn data_id(&self) -> &str {
        match self {
            ConditionKind::Availability { data_id, .. }
            | ConditionKind::Compare { data_id, .. }
            | ConditionKind::String { data_id, .. }
            | ConditionKind::Threshold { data_id, .. }
            | ConditionKind::Range { data_id, .. } => data_id,
        }
    }

    /// Every data-stream identifier referenced, both legs for compare.
    pub fn data_ids(&self) -> Vec<&str> {
        match self {
            ConditionKind::Compare { data_id, data2_id, .. } => {
                vec![data_id.as_str(), data2_id.as_str()]
            }
            other => vec![other.data_id()],
        }
    }

    /// Rewrite every referenced data id through `map`; ids absent from the map are kept.
    pub fn substitute_data_ids(&mut self, map: &HashMap<String, String>) {
        let swap = |id: &mut String| {
            if let Some(new_id) = map.get(id.as_str()) {
                *id = new_id.clone();
            }
        };
        match self {
            ConditionKind::Compare { data_id, data2_id, .. } => {
                swap(data_id);
                swap(data2_id);
            }
            ConditionKind::Availability { data_id, .. }
            | ConditionKind::String { data_id, .. }
            | ConditionKind::Threshold { data_id, .. }
            | ConditionKind::Range { data_id, .. } => swap(data_id),
        }
    }
}

/// A single predicate within a trigger's condition set.
///
/// Set membership fields (`trigger_id`, `trigger_mode`, size and index) are
/// reassigned by the catalog whenever the owning set is rewritten.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub tenant_id: String,
    pub trigger_id: String,
    pub trigger_mode: Mode,
    pub condition_set_size: u32,
    pub condition_set_index: u32,
    #[serde(flatten)]
    pub kind: ConditionKind,
}

impl Condition {
    pub fn new(trigger_id: impl Into<String>, trigger_mode: Mode, kind: ConditionKind) -> Self {
        Condition {
            tenant_id: String::new(),
            trigger_id: trigger_id.into(),
            trigger_mode,
            condition_set_size: 1,
            condition_set_index: 1,
            kind,
        }
    }

    pub fn threshold(
        trigger_id: impl Into<String>,
        trigger_mode: Mode,
        data_id: impl Into<String>,
        operator: CompareOperator,
        threshold: f64,
    ) -> Self {
        Self::new(
            trigger_id,
            trigger_mode,
            ConditionKind::Threshold {
                data_id: data_id.into(),
                operator,
                threshold,
            },
        )
    }

    pub fn availability(
        trigger_id: impl Into<String>,
        trigger_mode: Mode,
        data_id: impl Into<String>,
        operator: AvailabilityOperator,
    ) -> Self {
        Self::new(
            trigger_id,
            trigger_mode,
            ConditionKind::Availability {
                data_id: data_id.into(),
                operator,
            },
        )
    }

    pub fn compare(
        trigger_id: impl Into<String>,
        trigger_mode: Mode,
        data_id: impl Into<String>,
        operator: CompareOperator,
        data2_multiplier: f64,
        data2_id: impl Into<String>,
    ) -> Self {
        Self::new(
            trigger_id,
            trigger_mode,
            ConditionKind::Compare {
                data_id: data_id.into(),
                operator,
                data2_id: data2_id.into(),
                data2_multiplier,
            },
        )
    }

    pub fn string(
        trigger_id: impl Into<String>,
        trigger_mode: Mode,
        data_id: impl Into<String>,
        operator: StringOperator,
        pattern: impl Into<String>,
        ignore_case: bool,
    ) -> Self {
        Self::new(
            trigger_id,
            trigger_mode,
            ConditionKind::String {
                data_id: data_id.into(),
                operator,
                pattern: pattern.into(),
                ignore_case,
            },
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub fn range(
        trigger_id: impl Into<String>,
        trigger_mode: Mode,
        data_id: impl Into<String>,
        operator_low: RangeOperator,
        operator_high: RangeOperator,
        threshold_low: f64,
        threshold_high: f64,
        in_range: bool,
    ) -> Self {
        Self::new(
            trigger_id,
            trigger_mode,
            ConditionKind::Range {
                data_id: data_id.into(),
                operator_low,
                operator_high,
                threshold_low,
                threshold_high,
                in_range,
            },
        )
    }

    /// `{trigger_id}-{MODE}-{condition_set_index}`.
    pub fn condition_id(&self) -> String {
        format!(
            "{}-{}-{}",
            self.trigger_id,
            self.trigger_mode.as_str(),
            self.condition_set_index
        )
    }

    pub fn data_id(&self) -> &str {
        self.kind.data_id()
    }

    pub fn data_ids(&self) -> Vec<&str> {
        self.kind.data_ids()
    }
}

// ── Dampening ──────────────────────────────────────────────────────

/// Flap-suppression policy for one (trigger, mode).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dampening {
    pub tenant_id: String,
    pub trigger_id: String,
    pub trigger_mode: Mode,
    pub dampening_type: DampeningType,
    pub eval_true_setting: u32,
    pub eval_total_setting: u32,
    /// Window in milliseconds.
    pub eval_time_setting: u64,
    pub dampening_id: String,
}

impl Dampening {
    pub fn new(
        trigger_id: impl Into<String>,
        trigger_mode: Mode,
        dampening_type: DampeningType,
        eval_true_setting: u32,
        eval_total_setting: u32,
        eval_time_setting: u64,
    ) -> Self {
        let trigger_id = trigger_id.into();
        let dampening_id = Self::dampening_id_for(&trigger_id, trigger_mode);
        Dampening {
            tenant_id: String::new(),
            trigger_id,
            trigger_mode,
            dampening_type,
            eval_true_setting,
            eval_total_setting,
            eval_time_setting,
            dampening_id,
        }
    }

    /// `{trigger_id}-{MODE}`.
    pub fn dampening_id_for(trigger_id: &str, trigger_mode: Mode) -> String {
        format!("{trigger_id}-{}", trigger_mode.as_str())
    }
}

// ── Tag ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    pub tenant_id: String,
    pub trigger_id: String,
    pub category: String,
    pub name: String,
    pub visible: bool,
}

impl Tag {
    pub fn new(
        trigger_id: impl Into<String>,
        category: impl Into<String>,
        name: impl Into<String>,
        visible: bool,
    ) -> Self {
        Tag {
            tenant_id: String::new(),
            trigger_id: trigger_id.into(),
            category: category.into(),
            name: name.into(),
            visible,
        }
    }
}
