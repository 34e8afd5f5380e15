//! Objective State
//!
//! Aggregates the statuses of its tasks into one objective status, using
//! the mandatory/optional flags of the visible (non-hidden) task subset.
//! Sequential objectives additionally keep a cursor to the one task that
//! is currently actionable.

use serde::Serialize;
use tracing::warn;

use crate::definition::{ObjectiveDefinition, OrderingMode};
use crate::task::{ProgressStatus, TaskEffect, TaskState};

/// Result of a task mutation within an objective, bubbled to the quest
#[derive(Debug, Clone)]
pub(crate) struct ObjectiveDelta {
    /// Whether any state changed
    pub changed: bool,
    /// ID of a task that newly completed
    pub task_completed: Option<String>,
    /// ID of a task that newly failed
    pub task_failed: Option<String>,
    /// Objective status before the mutation
    pub before: ProgressStatus,
    /// Objective status after re-evaluation
    pub after: ProgressStatus,
}

impl ObjectiveDelta {
    fn unchanged(status: ProgressStatus) -> Self {
        Self {
            changed: false,
            task_completed: None,
            task_failed: None,
            before: status,
            after: status,
        }
    }
}

/// Runtime state of one objective within an active quest instance
#[derive(Debug, Clone, Serialize)]
pub struct ObjectiveState {
    objective_id: String,
    title: Option<String>,
    mandatory: bool,
    ordering: OrderingMode,
    status: ProgressStatus,
    tasks: Vec<TaskState>,
    /// Index of the currently actionable task (Sequential ordering only)
    cursor: Option<usize>,
}

impl ObjectiveState {
    pub(crate) fn new(def: &ObjectiveDefinition) -> Self {
        let mut objective = Self {
            objective_id: def.id.clone(),
            title: def.title.clone(),
            mandatory: def.mandatory,
            ordering: def.ordering,
            status: ProgressStatus::Inactive,
            tasks: def.tasks.iter().map(TaskState::new).collect(),
            cursor: None,
        };
        objective.recompute();
        objective
    }

    pub(crate) fn fail_task(&mut self, task_id: &str) -> Option<ObjectiveDelta> {
        self.mutate_task(task_id, true, TaskState::fail)
    }

    pub(crate) fn complete_task(&mut self, task_id: &str) -> Option<ObjectiveDelta> {
        self.mutate_task(task_id, true, TaskState::complete)
    }

    pub(crate) fn progress_task(&mut self, task_id: &str, delta: i32) -> Option<ObjectiveDelta> {
        self.mutate_task(task_id, true, |t| t.progress(delta))
    }

    /// Hide or unhide a task. Not subject to the sequential cursor: hiding
    /// and unhiding is how definitions branch, and must be able to reach
    /// tasks the cursor has not arrived at yet.
    pub(crate) fn set_task_hidden(&mut self, task_id: &str, hidden: bool) -> Option<ObjectiveDelta> {
        self.mutate_task(task_id, false, |t| t.set_hidden(hidden))
    }

    /// Fail every task that has not already completed. Used when a whole
    /// quest is manually failed. Returns the IDs of tasks that newly
    /// failed plus the objective status transition.
    pub(crate) fn fail_remaining(&mut self) -> (Vec<String>, ProgressStatus, ProgressStatus) {
        let before = self.status;
        let mut failed = Vec::new();
        for task in &mut self.tasks {
            if task.fail().failed {
                failed.push(task.task_id().to_string());
            }
        }
        if !failed.is_empty() {
            self.recompute();
        }
        (failed, before, self.status)
    }

    fn mutate_task<F>(&mut self, task_id: &str, enforce_cursor: bool, op: F) -> Option<ObjectiveDelta>
    where
        F: FnOnce(&mut TaskState) -> TaskEffect,
    {
        let pos = self.tasks.iter().position(|t| t.task_id() == task_id)?;

        if enforce_cursor && self.ordering == OrderingMode::Sequential && Some(pos) != self.cursor {
            warn!(
                "Task '{}' is not the current task of sequential objective '{}', ignoring",
                task_id, self.objective_id
            );
            return Some(ObjectiveDelta::unchanged(self.status));
        }

        let effect = op(&mut self.tasks[pos]);
        if !effect.changed {
            return Some(ObjectiveDelta::unchanged(self.status));
        }

        let before = self.status;
        self.recompute();
        Some(ObjectiveDelta {
            changed: true,
            task_completed: effect.completed.then(|| task_id.to_string()),
            task_failed: effect.failed.then(|| task_id.to_string()),
            before,
            after: self.status,
        })
    }

    /// Re-evaluate status and cursor from the visible task subset.
    ///
    /// Failed if any mandatory visible task failed; Completed if every
    /// mandatory visible task completed (vacuously true when there are
    /// none); InProgress if any visible task has been touched; otherwise
    /// Inactive.
    fn recompute(&mut self) {
        let visible = || self.tasks.iter().filter(|t| !t.hidden());

        self.status = if visible().any(|t| t.mandatory() && t.status() == ProgressStatus::Failed) {
            ProgressStatus::Failed
        } else if visible()
            .filter(|t| t.mandatory())
            .all(|t| t.status() == ProgressStatus::Completed)
        {
            ProgressStatus::Completed
        } else if visible().any(|t| {
            matches!(t.status(), ProgressStatus::InProgress | ProgressStatus::Completed)
        }) {
            ProgressStatus::InProgress
        } else {
            ProgressStatus::Inactive
        };

        self.cursor = match self.ordering {
            OrderingMode::Sequential => self
                .tasks
                .iter()
                .position(|t| !t.hidden() && !t.is_terminal()),
            OrderingMode::AnyOrder => None,
        };
    }

    pub(crate) fn contains_task(&self, task_id: &str) -> bool {
        self.tasks.iter().any(|t| t.task_id() == task_id)
    }

    pub fn objective_id(&self) -> &str {
        &self.objective_id
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn mandatory(&self) -> bool {
        self.mandatory
    }

    pub fn ordering(&self) -> OrderingMode {
        self.ordering
    }

    pub fn status(&self) -> ProgressStatus {
        self.status
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// An objective is hidden when every one of its tasks is hidden
    pub fn is_hidden(&self) -> bool {
        self.tasks.iter().all(|t| t.hidden())
    }

    pub fn tasks(&self) -> &[TaskState] {
        &self.tasks
    }

    pub fn task(&self, task_id: &str) -> Option<&TaskState> {
        self.tasks.iter().find(|t| t.task_id() == task_id)
    }

    /// The currently actionable task of a Sequential objective
    pub fn current_task(&self) -> Option<&TaskState> {
        self.cursor.map(|i| &self.tasks[i])
    }
}
