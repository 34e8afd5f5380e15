//! Quest State
//!
//! Aggregates objective statuses into overall quest status using the same
//! completion policy objectives apply to tasks, and owns the active
//! objective cursor for sequential quests. Once a quest reaches Completed
//! or Failed it is frozen: no further mutation is accepted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::definition::{OrderingMode, QuestDefinition};
use crate::events::QuestNotification;
use crate::objective::{ObjectiveDelta, ObjectiveState};
use crate::task::{ProgressStatus, TaskState};

/// Overall status of a quest for a player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuestStatus {
    /// No instance exists (never accepted)
    Unavailable,
    /// Accepted and not yet resolved
    InProgress,
    /// All mandatory objectives completed
    Completed,
    /// Failed
    Failed,
}

impl QuestStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, QuestStatus::Completed | QuestStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QuestStatus::Unavailable => "unavailable",
            QuestStatus::InProgress => "in_progress",
            QuestStatus::Completed => "completed",
            QuestStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "unavailable" => Some(QuestStatus::Unavailable),
            "in_progress" => Some(QuestStatus::InProgress),
            "completed" => Some(QuestStatus::Completed),
            "failed" => Some(QuestStatus::Failed),
            _ => None,
        }
    }
}

/// Runtime state of one accepted quest
#[derive(Debug, Clone, Serialize)]
pub struct QuestState {
    quest_id: String,
    title: Option<String>,
    ordering: OrderingMode,
    status: QuestStatus,
    objectives: Vec<ObjectiveState>,
    /// Index of the currently active objective (Sequential ordering only)
    cursor: Option<usize>,
    /// When the quest was accepted
    accepted_at: DateTime<Utc>,
    /// When the quest reached a terminal status
    resolved_at: Option<DateTime<Utc>>,
}

impl QuestState {
    pub(crate) fn new(def: &QuestDefinition) -> Self {
        let mut quest = Self {
            quest_id: def.id.clone(),
            title: def.title.clone(),
            ordering: def.ordering,
            status: QuestStatus::InProgress,
            objectives: def.objectives.iter().map(ObjectiveState::new).collect(),
            cursor: None,
            accepted_at: Utc::now(),
            resolved_at: None,
        };
        quest.recompute();
        if quest.status.is_terminal() {
            quest.resolved_at = Some(Utc::now());
        }
        quest
    }

    pub(crate) fn fail_task(
        &mut self,
        task_id: &str,
        events: &mut Vec<QuestNotification>,
    ) -> bool {
        self.mutate_task(task_id, events, |obj, id| obj.fail_task(id))
    }

    pub(crate) fn complete_task(
        &mut self,
        task_id: &str,
        events: &mut Vec<QuestNotification>,
    ) -> bool {
        self.mutate_task(task_id, events, |obj, id| obj.complete_task(id))
    }

    pub(crate) fn progress_task(
        &mut self,
        task_id: &str,
        delta: i32,
        events: &mut Vec<QuestNotification>,
    ) -> bool {
        self.mutate_task(task_id, events, |obj, id| obj.progress_task(id, delta))
    }

    /// Hide or unhide a task. Bypasses cursor eligibility at both levels
    /// (hide/unhide drives branching), but not the terminal-quest guard.
    pub(crate) fn set_task_hidden(
        &mut self,
        task_id: &str,
        hidden: bool,
        events: &mut Vec<QuestNotification>,
    ) -> bool {
        if self.reject_if_terminal() {
            return false;
        }
        let Some(idx) = self.objective_index_for_task(task_id) else {
            warn!("Quest '{}' has no task '{}'", self.quest_id, task_id);
            return false;
        };
        let Some(delta) = self.objectives[idx].set_task_hidden(task_id, hidden) else {
            return false;
        };
        self.finish_mutation(idx, delta, events)
    }

    /// Manually fail the quest, marking every uncompleted task (and through
    /// aggregation, every uncompleted objective) as failed. Prefer failing
    /// a specific task when the cause is attributable.
    pub(crate) fn fail(&mut self, events: &mut Vec<QuestNotification>) -> bool {
        if self.reject_if_terminal() {
            return false;
        }

        let mut failed_tasks = Vec::new();
        let mut failed_objectives = Vec::new();
        for objective in &mut self.objectives {
            let (failed, before, after) = objective.fail_remaining();
            failed_tasks.extend(failed);
            if before != after && after == ProgressStatus::Failed {
                failed_objectives.push(objective.objective_id().to_string());
            }
        }

        self.recompute();
        // The caller's intent wins even if every mandatory task had
        // already completed and aggregation reads otherwise.
        self.status = QuestStatus::Failed;
        self.resolved_at = Some(Utc::now());

        for task_id in failed_tasks {
            events.push(QuestNotification::TaskFailed {
                quest_id: self.quest_id.clone(),
                task_id,
            });
        }
        for objective_id in failed_objectives {
            events.push(QuestNotification::ObjectiveFailed {
                quest_id: self.quest_id.clone(),
                objective_id,
            });
        }
        events.push(QuestNotification::QuestFailed {
            quest_id: self.quest_id.clone(),
        });
        events.push(QuestNotification::QuestUpdated {
            quest_id: self.quest_id.clone(),
        });
        true
    }

    /// Per-tick hook for time-based mechanics, invoked by the registry for
    /// every active quest. Nothing ticks yet; tasks have no timers.
    pub fn advance(&mut self, _delta_secs: f32) {}

    fn mutate_task<F>(
        &mut self,
        task_id: &str,
        events: &mut Vec<QuestNotification>,
        op: F,
    ) -> bool
    where
        F: FnOnce(&mut ObjectiveState, &str) -> Option<ObjectiveDelta>,
    {
        if self.reject_if_terminal() {
            return false;
        }

        let Some(idx) = self.objective_index_for_task(task_id) else {
            warn!("Quest '{}' has no task '{}'", self.quest_id, task_id);
            return false;
        };

        if self.ordering == OrderingMode::Sequential && Some(idx) != self.cursor {
            warn!(
                "Task '{}' belongs to objective '{}', which is not the active objective of sequential quest '{}', ignoring",
                task_id,
                self.objectives[idx].objective_id(),
                self.quest_id
            );
            return false;
        }

        let Some(delta) = op(&mut self.objectives[idx], task_id) else {
            return false;
        };
        self.finish_mutation(idx, delta, events)
    }

    /// Apply the quest-level consequences of an objective delta and emit
    /// notifications in cascade order: task, objective, quest, then the
    /// generic update.
    fn finish_mutation(
        &mut self,
        idx: usize,
        delta: ObjectiveDelta,
        events: &mut Vec<QuestNotification>,
    ) -> bool {
        if !delta.changed {
            return false;
        }

        let status_before = self.status;
        self.recompute();
        if self.status.is_terminal() && status_before != self.status {
            self.resolved_at = Some(Utc::now());
        }

        if let Some(task_id) = delta.task_completed {
            events.push(QuestNotification::TaskCompleted {
                quest_id: self.quest_id.clone(),
                task_id,
            });
        }
        if let Some(task_id) = delta.task_failed {
            events.push(QuestNotification::TaskFailed {
                quest_id: self.quest_id.clone(),
                task_id,
            });
        }

        if delta.before != delta.after {
            let objective_id = self.objectives[idx].objective_id().to_string();
            match delta.after {
                ProgressStatus::Completed => events.push(QuestNotification::ObjectiveCompleted {
                    quest_id: self.quest_id.clone(),
                    objective_id,
                }),
                ProgressStatus::Failed => events.push(QuestNotification::ObjectiveFailed {
                    quest_id: self.quest_id.clone(),
                    objective_id,
                }),
                _ => {}
            }
        }

        if status_before != self.status {
            match self.status {
                QuestStatus::Completed => events.push(QuestNotification::QuestCompleted {
                    quest_id: self.quest_id.clone(),
                }),
                QuestStatus::Failed => events.push(QuestNotification::QuestFailed {
                    quest_id: self.quest_id.clone(),
                }),
                _ => {}
            }
        }

        events.push(QuestNotification::QuestUpdated {
            quest_id: self.quest_id.clone(),
        });
        true
    }

    /// Re-evaluate status and cursor from the visible objective subset,
    /// using the same policy objectives apply to tasks. An accepted quest
    /// that is neither completed nor failed is InProgress.
    fn recompute(&mut self) {
        let visible = || self.objectives.iter().filter(|o| !o.is_hidden());

        self.status = if visible().any(|o| o.mandatory() && o.status() == ProgressStatus::Failed) {
            QuestStatus::Failed
        } else if visible()
            .filter(|o| o.mandatory())
            .all(|o| o.status() == ProgressStatus::Completed)
        {
            QuestStatus::Completed
        } else {
            QuestStatus::InProgress
        };

        self.cursor = match self.ordering {
            OrderingMode::Sequential => self
                .objectives
                .iter()
                .position(|o| !o.is_hidden() && !o.is_terminal()),
            OrderingMode::AnyOrder => None,
        };
    }

    fn reject_if_terminal(&self) -> bool {
        if self.status.is_terminal() {
            warn!(
                "Quest '{}' is already {}, ignoring mutation",
                self.quest_id,
                self.status.as_str()
            );
            return true;
        }
        false
    }

    fn objective_index_for_task(&self, task_id: &str) -> Option<usize> {
        self.objectives.iter().position(|o| o.contains_task(task_id))
    }

    pub fn quest_id(&self) -> &str {
        &self.quest_id
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn ordering(&self) -> OrderingMode {
        self.ordering
    }

    pub fn status(&self) -> QuestStatus {
        self.status
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn objectives(&self) -> &[ObjectiveState] {
        &self.objectives
    }

    pub fn objective(&self, objective_id: &str) -> Option<&ObjectiveState> {
        self.objectives.iter().find(|o| o.objective_id() == objective_id)
    }

    /// The currently active objective of a Sequential quest
    pub fn current_objective(&self) -> Option<&ObjectiveState> {
        self.cursor.map(|i| &self.objectives[i])
    }

    /// Find a task anywhere in the quest
    pub fn task(&self, task_id: &str) -> Option<&TaskState> {
        self.objectives.iter().find_map(|o| o.task(task_id))
    }

    pub fn accepted_at(&self) -> DateTime<Utc> {
        self.accepted_at
    }

    pub fn resolved_at(&self) -> Option<DateTime<Utc>> {
        self.resolved_at
    }

    /// Seconds between acceptance and resolution (or now, if unresolved)
    pub fn duration_secs(&self) -> i64 {
        let end = self.resolved_at.unwrap_or_else(Utc::now);
        (end - self.accepted_at).num_seconds()
    }
}
