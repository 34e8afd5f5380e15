//! Play State
//!
//! Holder for all quest state belonging to a single player. Owns the
//! active and archived quest instances, routes commands to the right
//! quest, and republishes every cascaded status change to subscribed
//! listeners. Construct one per player or save context.

use std::collections::HashMap;
use tracing::{info, warn};

use crate::catalog::QuestCatalog;
use crate::definition::QuestTable;
use crate::events::QuestNotification;
use crate::quest::{QuestState, QuestStatus};

/// Handle returned by [`PlayState::subscribe`], used to unsubscribe
pub type ListenerId = u64;

type Listener = Box<dyn FnMut(&QuestNotification)>;

/// Registry of all quest state for one player
pub struct PlayState {
    /// Raw quest tables, resolved into the catalog on first use
    quest_tables: Vec<QuestTable>,
    definitions: QuestCatalog,
    /// Live quests, keyed by quest ID
    active: HashMap<String, QuestState>,
    /// Quests that reached a terminal status. A quest ID is never in
    /// both maps at once.
    archive: HashMap<String, QuestState>,
    listeners: Vec<(ListenerId, Listener)>,
    next_listener_id: ListenerId,
}

impl PlayState {
    /// Create a play state over raw quest tables. The catalog is built
    /// lazily, on first access.
    pub fn new(quest_tables: Vec<QuestTable>) -> Self {
        Self {
            quest_tables,
            definitions: QuestCatalog::new(),
            active: HashMap::new(),
            archive: HashMap::new(),
            listeners: Vec::new(),
            next_listener_id: 0,
        }
    }

    /// Create a play state over an already-built catalog
    pub fn with_catalog(catalog: QuestCatalog) -> Self {
        Self {
            quest_tables: Vec::new(),
            definitions: catalog,
            active: HashMap::new(),
            archive: HashMap::new(),
            listeners: Vec::new(),
            next_listener_id: 0,
        }
    }

    /// Register a listener for quest notifications. Listeners are invoked
    /// synchronously, after a mutation has fully cascaded and any archive
    /// move has happened.
    pub fn subscribe<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&QuestNotification) + 'static,
    {
        let id = self.next_listener_id;
        self.next_listener_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a previously registered listener
    pub fn unsubscribe(&mut self, id: ListenerId) {
        self.listeners.retain(|(lid, _)| *lid != id);
    }

    /// Accept a quest and start tracking its state.
    ///
    /// Fails (with a warning) when the quest is not in the catalog, or
    /// when an instance already exists and the matching reset flag is not
    /// set: `reset_if_in_progress` governs active instances,
    /// `reset_if_complete` governs archived ones (Completed or Failed).
    /// A reset discards the old instance and reinitializes every task to
    /// Inactive at zero progress with definition-initial hidden flags.
    pub fn accept_quest(
        &mut self,
        quest_id: &str,
        reset_if_complete: bool,
        reset_if_in_progress: bool,
    ) -> bool {
        self.ensure_definitions_built();

        if !self.definitions.contains(quest_id) {
            warn!("Attempted to accept a non-existent quest '{}'", quest_id);
            return false;
        }

        if self.active.contains_key(quest_id) {
            if !reset_if_in_progress {
                warn!("Quest '{}' is already in progress, not resetting", quest_id);
                return false;
            }
            info!("Quest '{}' is in progress, resetting", quest_id);
            self.active.remove(quest_id);
        } else if self.archive.contains_key(quest_id) {
            if !reset_if_complete {
                warn!("Quest '{}' has already been resolved, not resetting", quest_id);
                return false;
            }
            info!("Quest '{}' was archived, resetting", quest_id);
            self.archive.remove(quest_id);
        }

        // Lookup can't fail here, but don't panic if it somehow does
        let Some(def) = self.definitions.lookup(quest_id) else {
            return false;
        };
        let quest = QuestState::new(def);
        info!("Accepted quest '{}'", quest_id);
        self.active.insert(quest_id.to_string(), quest);

        self.finish(
            quest_id,
            vec![QuestNotification::QuestUpdated {
                quest_id: quest_id.to_string(),
            }],
        );
        true
    }

    /// Manually fail a quest. Prefer [`fail_task`](Self::fail_task) when a
    /// specific task is to blame; this marks all uncompleted tasks and
    /// objectives as failed.
    pub fn fail_quest(&mut self, quest_id: &str) -> bool {
        let mut events = Vec::new();
        let applied = match self.find_quest_mut(quest_id) {
            Some(q) => q.fail(&mut events),
            None => false,
        };
        self.finish(quest_id, events);
        applied
    }

    /// Mark a task as failed. A failed mandatory task fails its objective,
    /// and a failed mandatory objective fails the quest.
    pub fn fail_task(&mut self, quest_id: &str, task_id: &str) -> bool {
        let mut events = Vec::new();
        let applied = match self.find_quest_mut(quest_id) {
            Some(q) => q.fail_task(task_id, &mut events),
            None => false,
        };
        self.finish(quest_id, events);
        applied
    }

    /// Fully complete a task, cascading upward through the objective to
    /// the quest when it was the last mandatory piece.
    pub fn complete_task(&mut self, quest_id: &str, task_id: &str) -> bool {
        let mut events = Vec::new();
        let applied = match self.find_quest_mut(quest_id) {
            Some(q) => q.complete_task(task_id, &mut events),
            None => false,
        };
        self.finish(quest_id, events);
        applied
    }

    /// Increment (or decrement) task progress, clamped to the definition
    /// target. Reaching the target completes the task as per
    /// [`complete_task`](Self::complete_task).
    pub fn progress_task(&mut self, quest_id: &str, task_id: &str, delta: i32) -> bool {
        let mut events = Vec::new();
        let applied = match self.find_quest_mut(quest_id) {
            Some(q) => q.progress_task(task_id, delta, &mut events),
            None => false,
        };
        self.finish(quest_id, events);
        applied
    }

    /// Set whether a task is hidden. Hidden tasks are ignored as if they
    /// don't exist, and changing this re-evaluates objective and quest
    /// status, which for sequential containers can move the cursor.
    pub fn set_task_hidden(&mut self, quest_id: &str, task_id: &str, hidden: bool) -> bool {
        let mut events = Vec::new();
        let applied = match self.find_quest_mut(quest_id) {
            Some(q) => q.set_task_hidden(task_id, hidden, &mut events),
            None => false,
        };
        self.finish(quest_id, events);
        applied
    }

    /// Per-tick update hook; forwards elapsed time to every active quest
    pub fn advance(&mut self, delta_secs: f32) {
        for quest in self.active.values_mut() {
            quest.advance(delta_secs);
        }
    }

    /// Get the overall status of a named quest (Unavailable if never accepted)
    pub fn quest_status(&self, quest_id: &str) -> QuestStatus {
        self.quest(quest_id)
            .map(QuestState::status)
            .unwrap_or(QuestStatus::Unavailable)
    }

    /// Whether the quest is or has been accepted (including resolved)
    pub fn is_quest_accepted(&self, quest_id: &str) -> bool {
        self.quest_status(quest_id) != QuestStatus::Unavailable
    }

    pub fn is_quest_completed(&self, quest_id: &str) -> bool {
        self.quest_status(quest_id) == QuestStatus::Completed
    }

    pub fn is_quest_failed(&self, quest_id: &str) -> bool {
        self.quest_status(quest_id) == QuestStatus::Failed
    }

    /// Find a quest instance, active or archived
    pub fn quest(&self, quest_id: &str) -> Option<&QuestState> {
        self.active
            .get(quest_id)
            .or_else(|| self.archive.get(quest_id))
    }

    /// IDs of all live (accepted, unresolved) quests
    pub fn accepted_quest_ids(&self) -> Vec<&str> {
        self.active.keys().map(String::as_str).collect()
    }

    /// IDs of all archived (terminal) quests
    pub fn archived_quest_ids(&self) -> Vec<&str> {
        self.archive.keys().map(String::as_str).collect()
    }

    pub fn accepted_quests(&self) -> Vec<&QuestState> {
        self.active.values().collect()
    }

    pub fn archived_quests(&self) -> Vec<&QuestState> {
        self.archive.values().collect()
    }

    /// Access the quest definitions, building the catalog if needed
    pub fn definitions(&mut self) -> &QuestCatalog {
        self.ensure_definitions_built();
        &self.definitions
    }

    fn ensure_definitions_built(&mut self) {
        if self.definitions.is_empty() && !self.quest_tables.is_empty() {
            self.definitions.build(&self.quest_tables);
        }
    }

    fn find_quest_mut(&mut self, quest_id: &str) -> Option<&mut QuestState> {
        if let Some(q) = self.active.get_mut(quest_id) {
            return Some(q);
        }
        if let Some(q) = self.archive.get_mut(quest_id) {
            return Some(q);
        }
        warn!("Requested non-existent quest '{}'", quest_id);
        None
    }

    /// Move the quest to the archive if it just went terminal, then
    /// dispatch the collected notifications. Listeners always observe the
    /// final registry state.
    fn finish(&mut self, quest_id: &str, events: Vec<QuestNotification>) {
        if self
            .active
            .get(quest_id)
            .is_some_and(QuestState::is_terminal)
        {
            if let Some(quest) = self.active.remove(quest_id) {
                info!(
                    "Quest '{}' reached {}, moving to archive",
                    quest_id,
                    quest.status().as_str()
                );
                self.archive.insert(quest_id.to_string(), quest);
            }
        }

        for event in &events {
            for (_, listener) in self.listeners.iter_mut() {
                listener(event);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::ProgressStatus;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn init_logs() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("questline=debug")
            .try_init();
    }

    const TABLE: &str = r#"
[[quests]]
id = "hunt"
title = "The Hunt"

[[quests.objectives]]
id = "track"
ordering = "sequential"

[[quests.objectives.tasks]]
id = "find_tracks"

[[quests.objectives.tasks]]
id = "follow_tracks"
target = 3

[[quests]]
id = "deliver"

[[quests.objectives]]
id = "drop_off"
ordering = "any_order"

[[quests.objectives.tasks]]
id = "package"

[[quests.objectives.tasks]]
id = "tip"
mandatory = false
"#;

    fn play_state() -> PlayState {
        PlayState::new(vec![QuestTable::from_toml_str(TABLE).unwrap()])
    }

    #[test]
    fn test_accept_unknown_quest_fails() {
        let mut play = play_state();
        assert!(!play.accept_quest("nope", false, false));
        assert_eq!(play.quest_status("nope"), QuestStatus::Unavailable);
    }

    #[test]
    fn test_status_unavailable_then_in_progress() {
        let mut play = play_state();
        assert_eq!(play.quest_status("hunt"), QuestStatus::Unavailable);
        assert!(!play.is_quest_accepted("hunt"));

        assert!(play.accept_quest("hunt", false, false));
        assert_eq!(play.quest_status("hunt"), QuestStatus::InProgress);
        assert!(play.is_quest_accepted("hunt"));
        assert!(!play.is_quest_completed("hunt"));
        assert!(!play.is_quest_failed("hunt"));
    }

    #[test]
    fn test_full_walkthrough_moves_quest_to_archive() {
        init_logs();
        let mut play = play_state();
        play.accept_quest("hunt", false, false);

        assert!(play.complete_task("hunt", "find_tracks"));
        assert!(play.progress_task("hunt", "follow_tracks", 2));
        assert_eq!(
            play.quest("hunt").unwrap().task("follow_tracks").unwrap().progress_number(),
            2
        );

        // Overshoot clamps and completes everything
        assert!(play.progress_task("hunt", "follow_tracks", 5));
        assert_eq!(play.quest_status("hunt"), QuestStatus::Completed);
        assert!(play.accepted_quest_ids().is_empty());
        assert_eq!(play.archived_quest_ids(), vec!["hunt"]);

        // Terminal quests ignore further commands
        assert!(!play.complete_task("hunt", "find_tracks"));
        assert!(!play.fail_quest("hunt"));
        assert_eq!(play.quest_status("hunt"), QuestStatus::Completed);
    }

    #[test]
    fn test_failing_mandatory_task_fails_quest() {
        let mut play = play_state();
        play.accept_quest("deliver", false, false);

        // Failing the optional task does nothing drastic
        assert!(play.fail_task("deliver", "tip"));
        assert_eq!(play.quest_status("deliver"), QuestStatus::InProgress);

        assert!(play.fail_task("deliver", "package"));
        assert_eq!(play.quest_status("deliver"), QuestStatus::Failed);
        assert!(play.is_quest_failed("deliver"));
        assert!(play.archived_quest_ids().contains(&"deliver"));
    }

    #[test]
    fn test_commands_against_unknown_quest_are_noops() {
        let mut play = play_state();
        assert!(!play.fail_quest("hunt"));
        assert!(!play.fail_task("hunt", "find_tracks"));
        assert!(!play.complete_task("hunt", "find_tracks"));
        assert!(!play.progress_task("hunt", "find_tracks", 1));
        assert!(!play.set_task_hidden("hunt", "find_tracks", true));
    }

    #[test]
    fn test_accept_reset_flags() {
        let mut play = play_state();
        assert!(play.accept_quest("hunt", false, false));
        play.complete_task("hunt", "find_tracks");

        // Already active, no reset flag: rejected, progress kept
        assert!(!play.accept_quest("hunt", false, false));
        assert_eq!(
            play.quest("hunt").unwrap().task("find_tracks").unwrap().status(),
            ProgressStatus::Completed
        );

        // Reset-if-in-progress discards the old instance
        assert!(play.accept_quest("hunt", false, true));
        assert_eq!(
            play.quest("hunt").unwrap().task("find_tracks").unwrap().status(),
            ProgressStatus::Inactive
        );

        // Resolve it, then check the archived branch
        play.complete_task("hunt", "find_tracks");
        play.complete_task("hunt", "follow_tracks");
        assert_eq!(play.quest_status("hunt"), QuestStatus::Completed);

        assert!(!play.accept_quest("hunt", false, true));
        assert_eq!(play.quest_status("hunt"), QuestStatus::Completed);

        assert!(play.accept_quest("hunt", true, false));
        assert_eq!(play.quest_status("hunt"), QuestStatus::InProgress);
        assert!(play.archived_quest_ids().is_empty());
    }

    #[test]
    fn test_listener_sees_cascade_in_order_with_final_state() {
        let mut play = play_state();
        play.accept_quest("hunt", false, false);

        let seen: Rc<RefCell<Vec<QuestNotification>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let id = play.subscribe(move |n| sink.borrow_mut().push(n.clone()));

        play.complete_task("hunt", "find_tracks");
        play.progress_task("hunt", "follow_tracks", 3);

        let kinds: Vec<&str> = seen.borrow().iter().map(|e| e.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                "task_completed",
                "quest_updated",
                "task_completed",
                "objective_completed",
                "quest_completed",
                "quest_updated",
            ]
        );
        assert!(seen.borrow().iter().all(|e| e.quest_id() == "hunt"));

        // Archive move happens before dispatch, so by the time the
        // listener ran the quest was already archived
        assert_eq!(play.quest_status("hunt"), QuestStatus::Completed);

        play.unsubscribe(id);
        play.accept_quest("deliver", false, false);
        play.complete_task("deliver", "package");
        assert_eq!(seen.borrow().len(), 6);
    }

    #[test]
    fn test_hide_task_emits_update_and_advances() {
        let mut play = play_state();
        play.accept_quest("hunt", false, false);

        assert!(play.set_task_hidden("hunt", "find_tracks", true));
        let quest = play.quest("hunt").unwrap();
        let objective = quest.objective("track").unwrap();
        assert_eq!(objective.current_task().unwrap().task_id(), "follow_tracks");

        // Hiding again is a no-op
        assert!(!play.set_task_hidden("hunt", "find_tracks", true));
    }

    #[test]
    fn test_advance_forwards_to_active_quests() {
        let mut play = play_state();
        play.accept_quest("hunt", false, false);
        // Nothing observable yet; just must not disturb state
        play.advance(0.5);
        assert_eq!(play.quest_status("hunt"), QuestStatus::InProgress);
    }

    #[test]
    fn test_definitions_built_lazily_and_once() {
        let mut play = play_state();
        assert_eq!(play.definitions().len(), 2);
        // Accepting still works afterwards; build is a no-op the second time
        assert!(play.accept_quest("deliver", false, false));
    }
}
