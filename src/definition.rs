//! Quest Definition Structures
//!
//! Raw rows as supplied by the host (or deserialized from TOML tables),
//! plus the resolved immutable definitions the state machine runs against.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// A batch of raw quest rows. One TOML file holds one table.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuestTable {
    #[serde(default)]
    pub quests: Vec<RawQuest>,
}

impl QuestTable {
    /// Parse a table from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| format!("Failed to parse quest table: {}", e))
    }
}

/// Raw quest row as supplied by the host
#[derive(Debug, Clone, Deserialize)]
pub struct RawQuest {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// How objectives progress: "sequential" (default) or "any_order"
    #[serde(default = "default_ordering")]
    pub ordering: String,
    #[serde(default)]
    pub objectives: Vec<RawObjective>,
}

/// Raw objective row
#[derive(Debug, Clone, Deserialize)]
pub struct RawObjective {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    /// Whether this objective must complete for the quest to complete
    #[serde(default = "default_mandatory")]
    pub mandatory: bool,
    /// How tasks progress: "sequential" (default) or "any_order"
    #[serde(default = "default_ordering")]
    pub ordering: String,
    #[serde(default)]
    pub tasks: Vec<RawTask>,
}

/// Raw task row
#[derive(Debug, Clone, Deserialize)]
pub struct RawTask {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    /// Whether this task must complete for the objective to complete
    #[serde(default = "default_mandatory")]
    pub mandatory: bool,
    /// Progress number required to complete the task
    #[serde(default = "default_target")]
    pub target: i32,
    /// Whether the task starts out hidden (excluded from evaluation)
    #[serde(default)]
    pub hidden: bool,
}

fn default_ordering() -> String {
    "sequential".to_string()
}

fn default_mandatory() -> bool {
    true
}

fn default_target() -> i32 {
    1
}

// ============================================================================
// Resolved Definition Structures (after parsing)
// ============================================================================

/// Ordering policy for the children of a quest or objective
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderingMode {
    /// Only the cursor child (first visible, non-terminal) may be acted upon
    #[default]
    Sequential,
    /// Any visible child may be acted upon at any time
    AnyOrder,
}

impl OrderingMode {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "sequential" | "ordered" => Some(OrderingMode::Sequential),
            "any_order" | "any" | "unordered" => Some(OrderingMode::AnyOrder),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderingMode::Sequential => "sequential",
            OrderingMode::AnyOrder => "any_order",
        }
    }
}

/// A resolved task definition
#[derive(Debug, Clone, Serialize)]
pub struct TaskDefinition {
    pub id: String,
    /// Display title, passed through untouched for presentation layers
    pub title: Option<String>,
    pub mandatory: bool,
    /// Progress number required to complete (1 for simple done/not-done tasks)
    pub target: i32,
    /// Whether the task starts hidden
    pub hidden: bool,
}

impl TaskDefinition {
    pub fn from_raw(raw: &RawTask) -> Self {
        let target = if raw.target < 0 {
            warn!(
                "Task '{}' has negative target {}, clamping to 0",
                raw.id, raw.target
            );
            0
        } else {
            raw.target
        };
        Self {
            id: raw.id.clone(),
            title: raw.title.clone(),
            mandatory: raw.mandatory,
            target,
            hidden: raw.hidden,
        }
    }
}

/// A resolved objective definition
#[derive(Debug, Clone, Serialize)]
pub struct ObjectiveDefinition {
    pub id: String,
    pub title: Option<String>,
    pub mandatory: bool,
    pub ordering: OrderingMode,
    pub tasks: Vec<TaskDefinition>,
}

impl ObjectiveDefinition {
    pub fn from_raw(raw: &RawObjective) -> Result<Self, String> {
        let ordering = OrderingMode::from_str(&raw.ordering)
            .ok_or_else(|| format!("Invalid ordering '{}' on objective '{}'", raw.ordering, raw.id))?;
        Ok(Self {
            id: raw.id.clone(),
            title: raw.title.clone(),
            mandatory: raw.mandatory,
            ordering,
            tasks: raw.tasks.iter().map(TaskDefinition::from_raw).collect(),
        })
    }
}

/// A fully resolved quest definition
#[derive(Debug, Clone, Serialize)]
pub struct QuestDefinition {
    pub id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    /// Ordering policy across objectives
    pub ordering: OrderingMode,
    pub objectives: Vec<ObjectiveDefinition>,
}

impl QuestDefinition {
    /// Create a definition from a raw row
    pub fn from_raw(raw: &RawQuest) -> Result<Self, String> {
        let ordering = OrderingMode::from_str(&raw.ordering)
            .ok_or_else(|| format!("Invalid ordering '{}' on quest '{}'", raw.ordering, raw.id))?;

        let objectives: Vec<ObjectiveDefinition> = raw
            .objectives
            .iter()
            .enumerate()
            .map(|(i, o)| {
                ObjectiveDefinition::from_raw(o)
                    .map_err(|e| format!("Quest '{}' objective at index {}: {}", raw.id, i, e))
            })
            .collect::<Result<Vec<_>, _>>()?;

        if objectives.is_empty() {
            return Err(format!("Quest '{}' has no objectives", raw.id));
        }

        Ok(Self {
            id: raw.id.clone(),
            title: raw.title.clone(),
            description: raw.description.clone(),
            ordering,
            objectives,
        })
    }

    /// Get objective definition by ID
    pub fn get_objective(&self, id: &str) -> Option<&ObjectiveDefinition> {
        self.objectives.iter().find(|o| o.id == id)
    }

    /// Iterate over every task definition in the quest tree
    pub fn all_tasks(&self) -> impl Iterator<Item = &TaskDefinition> {
        self.objectives.iter().flat_map(|o| o.tasks.iter())
    }
}
