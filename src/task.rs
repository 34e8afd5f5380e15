//! Task State
//!
//! Runtime status of a single task: progress counter, hidden flag, and
//! status. Tasks are the leaves of the quest tree; every mutation here is
//! reported upward so the owning objective can re-evaluate.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::definition::TaskDefinition;

/// Status of a task or objective
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgressStatus {
    /// Not yet started
    Inactive,
    /// Some progress has been made
    InProgress,
    /// Finished successfully
    Completed,
    /// Failed
    Failed,
}

impl ProgressStatus {
    /// Terminal statuses accept no further mutation
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProgressStatus::Completed | ProgressStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProgressStatus::Inactive => "inactive",
            ProgressStatus::InProgress => "in_progress",
            ProgressStatus::Completed => "completed",
            ProgressStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "inactive" => Some(ProgressStatus::Inactive),
            "in_progress" => Some(ProgressStatus::InProgress),
            "completed" => Some(ProgressStatus::Completed),
            "failed" => Some(ProgressStatus::Failed),
            _ => None,
        }
    }
}

/// What a single task mutation did, bubbled up for re-evaluation
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct TaskEffect {
    /// Whether anything actually changed
    pub changed: bool,
    /// Task newly reached Completed
    pub completed: bool,
    /// Task newly reached Failed
    pub failed: bool,
}

impl TaskEffect {
    pub(crate) fn none() -> Self {
        Self::default()
    }
}

/// Runtime state of one task within an active quest instance
#[derive(Debug, Clone, Serialize)]
pub struct TaskState {
    task_id: String,
    title: Option<String>,
    mandatory: bool,
    target: i32,
    progress: i32,
    hidden: bool,
    status: ProgressStatus,
}

impl TaskState {
    pub(crate) fn new(def: &TaskDefinition) -> Self {
        Self {
            task_id: def.id.clone(),
            title: def.title.clone(),
            mandatory: def.mandatory,
            target: def.target,
            progress: 0,
            hidden: def.hidden,
            status: ProgressStatus::Inactive,
        }
    }

    /// Mark the task failed. No-op if the task is already terminal.
    pub(crate) fn fail(&mut self) -> TaskEffect {
        if self.status.is_terminal() {
            debug!("Task '{}' is already {}, ignoring fail", self.task_id, self.status.as_str());
            return TaskEffect::none();
        }
        self.status = ProgressStatus::Failed;
        TaskEffect {
            changed: true,
            completed: false,
            failed: true,
        }
    }

    /// Fully complete the task, setting progress to the target.
    /// No-op if already completed; a failed task cannot be completed.
    pub(crate) fn complete(&mut self) -> TaskEffect {
        match self.status {
            ProgressStatus::Completed => TaskEffect::none(),
            ProgressStatus::Failed => {
                debug!("Task '{}' has failed, ignoring complete", self.task_id);
                TaskEffect::none()
            }
            _ => {
                self.progress = self.target;
                self.status = ProgressStatus::Completed;
                TaskEffect {
                    changed: true,
                    completed: true,
                    failed: false,
                }
            }
        }
    }

    /// Add (or subtract) progress, clamped to [0, target]. Reaching the
    /// target completes the task. No-op on terminal tasks.
    pub(crate) fn progress(&mut self, delta: i32) -> TaskEffect {
        if self.status.is_terminal() {
            debug!("Task '{}' is already {}, ignoring progress", self.task_id, self.status.as_str());
            return TaskEffect::none();
        }

        let next = self.progress.saturating_add(delta).clamp(0, self.target);
        if next >= self.target {
            return self.complete();
        }

        let changed = next != self.progress || self.status == ProgressStatus::Inactive;
        self.progress = next;
        if changed {
            self.status = ProgressStatus::InProgress;
        }
        TaskEffect {
            changed,
            completed: false,
            failed: false,
        }
    }

    /// Set the hidden flag. Hidden tasks are excluded from aggregation as
    /// if absent; the owning objective re-evaluates on any change.
    pub(crate) fn set_hidden(&mut self, hidden: bool) -> TaskEffect {
        if self.hidden == hidden {
            return TaskEffect::none();
        }
        self.hidden = hidden;
        TaskEffect {
            changed: true,
            completed: false,
            failed: false,
        }
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn mandatory(&self) -> bool {
        self.mandatory
    }

    pub fn target(&self) -> i32 {
        self.target
    }

    pub fn progress_number(&self) -> i32 {
        self.progress
    }

    pub fn hidden(&self) -> bool {
        self.hidden
    }

    pub fn status(&self) -> ProgressStatus {
        self.status
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(target: i32) -> TaskState {
        TaskState::new(&TaskDefinition {
            id: "t1".to_string(),
            title: None,
            mandatory: true,
            target,
            hidden: false,
        })
    }

    #[test]
    fn test_progress_clamps_and_completes() {
        let mut t = task(3);
        assert_eq!(t.status(), ProgressStatus::Inactive);

        let effect = t.progress(2);
        assert!(effect.changed);
        assert!(!effect.completed);
        assert_eq!(t.progress_number(), 2);
        assert_eq!(t.status(), ProgressStatus::InProgress);

        // Overshoot clamps to target and completes
        let effect = t.progress(5);
        assert!(effect.completed);
        assert_eq!(t.progress_number(), 3);
        assert_eq!(t.status(), ProgressStatus::Completed);
    }

    #[test]
    fn test_progress_never_goes_negative() {
        let mut t = task(3);
        t.progress(1);
        t.progress(-10);
        assert_eq!(t.progress_number(), 0);
        // Still in progress once started, even back at zero
        assert_eq!(t.status(), ProgressStatus::InProgress);
    }

    #[test]
    fn test_progress_on_terminal_task_is_noop() {
        let mut t = task(1);
        t.complete();
        assert!(!t.progress(1).changed);
        assert!(!t.progress(-1).changed);
        assert_eq!(t.progress_number(), 1);

        let mut t = task(1);
        t.fail();
        assert!(!t.progress(1).changed);
        assert_eq!(t.status(), ProgressStatus::Failed);
    }

    #[test]
    fn test_complete_sets_progress_to_target() {
        let mut t = task(10);
        let effect = t.complete();
        assert!(effect.completed);
        assert_eq!(t.progress_number(), 10);

        // Idempotent
        assert!(!t.complete().changed);
    }

    #[test]
    fn test_failed_task_cannot_complete() {
        let mut t = task(1);
        assert!(t.fail().failed);
        assert!(!t.complete().changed);
        assert_eq!(t.status(), ProgressStatus::Failed);

        // And a completed task cannot fail
        let mut t = task(1);
        t.complete();
        assert!(!t.fail().changed);
        assert_eq!(t.status(), ProgressStatus::Completed);
    }

    #[test]
    fn test_progress_at_target_iff_completed() {
        let mut t = task(2);
        t.progress(1);
        assert!(t.progress_number() < t.target());
        assert_ne!(t.status(), ProgressStatus::Completed);

        t.progress(1);
        assert_eq!(t.progress_number(), t.target());
        assert_eq!(t.status(), ProgressStatus::Completed);
    }

    #[test]
    fn test_set_hidden_reports_change_only_on_flip() {
        let mut t = task(1);
        assert!(!t.set_hidden(false).changed);
        assert!(t.set_hidden(true).changed);
        assert!(t.hidden());
        assert!(!t.set_hidden(true).changed);
    }

    #[test]
    fn test_zero_target_completes_on_first_progress() {
        let mut t = task(0);
        let effect = t.progress(1);
        assert!(effect.completed);
        assert_eq!(t.status(), ProgressStatus::Completed);
    }
}
