//! redb table definitions for the Vigil catalog.
//!
//! Each table uses `&str` row keys and `&[u8]` values (JSON rows). Row keys
//! are built by [`crate::keys`] from partition columns followed by
//! clustering columns, so a partition is a key prefix.

use redb::TableDefinition;

type RowTable = TableDefinition<'static, &'static str, &'static [u8]>;

/// Trigger records keyed by `tenant/trigger`.
const TRIGGERS: RowTable = TableDefinition::new("triggers");

/// Action bindings keyed by `tenant/trigger/plugin`, value is the set of action ids.
const TRIGGERS_ACTIONS: RowTable = TableDefinition::new("triggers_actions");

/// Condition rows keyed by `tenant/trigger/mode/index`.
const CONDITIONS: RowTable = TableDefinition::new("conditions");

/// Dampening rows keyed by `tenant/trigger/mode/dampening`.
const DAMPENINGS: RowTable = TableDefinition::new("dampenings");

/// Tag rows keyed by `tenant/trigger/category/name`.
const TAGS: RowTable = TableDefinition::new("tags");

/// Inverted tag index keyed by `tenant/category/name`, value is the set of trigger ids.
const TAGS_TRIGGERS: RowTable = TableDefinition::new("tags_triggers");

/// Plugin registrations keyed by `plugin`, value is the declared property names.
const ACTION_PLUGINS: RowTable = TableDefinition::new("action_plugins");

/// Action instances keyed by `tenant/plugin/action`, value is the property map.
const ACTIONS: RowTable = TableDefinition::new("actions");

/// Catalog tables addressable through a [`crate::Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Triggers,
    TriggersActions,
    Conditions,
    Dampenings,
    Tags,
    TagsTriggers,
    ActionPlugins,
    Actions,
}

impl Table {
    pub const ALL: [Table; 8] = [
        Table::Triggers,
        Table::TriggersActions,
        Table::Conditions,
        Table::Dampenings,
        Table::Tags,
        Table::TagsTriggers,
        Table::ActionPlugins,
        Table::Actions,
    ];

    pub(crate) fn definition(self) -> RowTable {
        match self {
            Table::Triggers => TRIGGERS,
            Table::TriggersActions => TRIGGERS_ACTIONS,
            Table::Conditions => CONDITIONS,
            Table::Dampenings => DAMPENINGS,
            Table::Tags => TAGS,
            Table::TagsTriggers => TAGS_TRIGGERS,
            Table::ActionPlugins => ACTION_PLUGINS,
            Table::Actions => ACTIONS,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Table::Triggers => "triggers",
            Table::TriggersActions => "triggers_actions",
            Table::Conditions => "conditions",
            Table::Dampenings => "dampenings",
            Table::Tags => "tags",
            Table::TagsTriggers => "tags_triggers",
            Table::ActionPlugins => "action_plugins",
            Table::Actions => "actions",
        }
    }
}
