//! Quest Notifications
//!
//! Change records emitted after every cascading status change. Listeners
//! receive them synchronously, after the full cascade has been applied,
//! so they always observe consistent post-mutation state.

use serde::{Deserialize, Serialize};

/// A single observable state change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuestNotification {
    /// Something about the quest changed (always emitted last in a cascade)
    QuestUpdated { quest_id: String },

    /// A task reached Completed
    TaskCompleted { quest_id: String, task_id: String },

    /// A task reached Failed
    TaskFailed { quest_id: String, task_id: String },

    /// An objective reached Completed
    ObjectiveCompleted {
        quest_id: String,
        objective_id: String,
    },

    /// An objective reached Failed
    ObjectiveFailed {
        quest_id: String,
        objective_id: String,
    },

    /// The whole quest reached Completed
    QuestCompleted { quest_id: String },

    /// The whole quest reached Failed
    QuestFailed { quest_id: String },
}

impl QuestNotification {
    /// Get the quest ID this notification concerns
    pub fn quest_id(&self) -> &str {
        match self {
            QuestNotification::QuestUpdated { quest_id }
            | QuestNotification::TaskCompleted { quest_id, .. }
            | QuestNotification::TaskFailed { quest_id, .. }
            | QuestNotification::ObjectiveCompleted { quest_id, .. }
            | QuestNotification::ObjectiveFailed { quest_id, .. }
            | QuestNotification::QuestCompleted { quest_id }
            | QuestNotification::QuestFailed { quest_id } => quest_id,
        }
    }

    /// Get the notification kind as a string (for logging/debugging)
    pub fn kind(&self) -> &'static str {
        match self {
            QuestNotification::QuestUpdated { .. } => "quest_updated",
            QuestNotification::TaskCompleted { .. } => "task_completed",
            QuestNotification::TaskFailed { .. } => "task_failed",
            QuestNotification::ObjectiveCompleted { .. } => "objective_completed",
            QuestNotification::ObjectiveFailed { .. } => "objective_failed",
            QuestNotification::QuestCompleted { .. } => "quest_completed",
            QuestNotification::QuestFailed { .. } => "quest_failed",
        }
    }
}
