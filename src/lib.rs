//! Questline
//!
//! Quest progression tracking for games: quests are made of objectives,
//! objectives are made of tasks, and leaf task events (complete, fail,
//! progress, hide) cascade upward through objective completion policies
//! into overall quest status. A [`PlayState`] holds everything for one
//! player and is the single entry point for commands and queries.

pub mod catalog;
pub mod definition;
pub mod events;
pub mod objective;
pub mod play;
pub mod quest;
pub mod task;

pub use catalog::QuestCatalog;
pub use definition::{
    ObjectiveDefinition, OrderingMode, QuestDefinition, QuestTable, RawObjective, RawQuest,
    RawTask, TaskDefinition,
};
pub use events::QuestNotification;
pub use objective::ObjectiveState;
pub use play::{ListenerId, PlayState};
pub use quest::{QuestState, QuestStatus};
pub use task::{ProgressStatus, TaskState};
