//! Quest Catalog
//!
//! Immutable store of quest definitions, combined from one or more quest
//! tables. Built once; identifier collisions are logged and resolved by
//! last-write-wins rather than failing the build.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::{info, warn};

use crate::definition::{QuestDefinition, QuestTable};

/// Store for all resolved quest definitions
#[derive(Debug, Default)]
pub struct QuestCatalog {
    quests: HashMap<String, QuestDefinition>,
}

impl QuestCatalog {
    pub fn new() -> Self {
        Self {
            quests: HashMap::new(),
        }
    }

    /// Build the catalog from raw quest tables.
    ///
    /// Idempotent: once the catalog is non-empty, further calls are no-ops
    /// (definitions are not hot-reloadable). Duplicate quest identifiers are
    /// logged and overwritten (last table wins); duplicate task identifiers
    /// within a quest tree are logged but do not block the build. Rows that
    /// fail to resolve are skipped with a warning.
    pub fn build(&mut self, tables: &[QuestTable]) {
        if !self.quests.is_empty() {
            return;
        }

        for table in tables {
            for raw in &table.quests {
                if self.quests.contains_key(&raw.id) {
                    warn!("Quest ID '{}' has been used more than once, overwriting", raw.id);
                }

                let quest = match QuestDefinition::from_raw(raw) {
                    Ok(q) => q,
                    Err(e) => {
                        warn!("Skipping quest '{}': {}", raw.id, e);
                        continue;
                    }
                };

                // Task IDs must be unique across the whole quest tree
                let mut seen = HashSet::new();
                for task in quest.all_tasks() {
                    if !seen.insert(task.id.as_str()) {
                        warn!(
                            "Task ID '{}' has been used more than once in quest '{}'",
                            task.id, quest.id
                        );
                    }
                }

                self.quests.insert(quest.id.clone(), quest);
            }
        }

        info!("Built quest catalog with {} definitions", self.quests.len());
    }

    /// Load every `*.toml` quest table in a directory and build the catalog
    pub fn load_from_directory(&mut self, dir: &Path) -> Result<(), String> {
        if !dir.exists() {
            warn!("Quest directory does not exist: {:?}", dir);
            return Ok(());
        }

        let entries = std::fs::read_dir(dir)
            .map_err(|e| format!("Failed to read quest directory {:?}: {}", dir, e))?;

        let mut tables = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| format!("Failed to read entry: {}", e))?;
            let path = entry.path();

            if path.extension().map_or(false, |ext| ext == "toml") {
                let content = std::fs::read_to_string(&path)
                    .map_err(|e| format!("Failed to read {:?}: {}", path, e))?;

                match QuestTable::from_toml_str(&content) {
                    Ok(table) => tables.push(table),
                    Err(e) => warn!("Failed to parse quest table {:?}: {}", path, e),
                }
            }
        }

        self.build(&tables);
        Ok(())
    }

    /// Get a quest definition by ID
    pub fn lookup(&self, quest_id: &str) -> Option<&QuestDefinition> {
        self.quests.get(quest_id)
    }

    /// Check if a quest is defined
    pub fn contains(&self, quest_id: &str) -> bool {
        self.quests.contains_key(quest_id)
    }

    /// Get all quest IDs
    pub fn ids(&self) -> impl Iterator<Item = &String> {
        self.quests.keys()
    }

    /// Get the number of definitions
    pub fn len(&self) -> usize {
        self.quests.len()
    }

    /// Check if the catalog has been built yet
    pub fn is_empty(&self) -> bool {
        self.quests.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn table(toml: &str) -> QuestTable {
        QuestTable::from_toml_str(toml).unwrap()
    }

    const SIMPLE_QUEST: &str = r#"
[[quests]]
id = "q1"

[[quests.objectives]]
id = "o1"

[[quests.objectives.tasks]]
id = "t1"
"#;

    #[test]
    fn test_build_is_idempotent() {
        let mut catalog = QuestCatalog::new();
        catalog.build(&[table(SIMPLE_QUEST)]);
        assert_eq!(catalog.len(), 1);

        // Second build with different content is a no-op
        let other = r#"
[[quests]]
id = "q2"

[[quests.objectives]]
id = "o1"

[[quests.objectives.tasks]]
id = "t1"
"#;
        catalog.build(&[table(other)]);
        assert_eq!(catalog.len(), 1);
        assert!(catalog.contains("q1"));
        assert!(!catalog.contains("q2"));
    }

    #[test]
    fn test_duplicate_quest_id_last_wins() {
        let toml = r#"
[[quests]]
id = "q1"
title = "First"

[[quests.objectives]]
id = "o1"

[[quests.objectives.tasks]]
id = "t1"

[[quests]]
id = "q1"
title = "Second"

[[quests.objectives]]
id = "o1"

[[quests.objectives.tasks]]
id = "t1"
"#;
        let mut catalog = QuestCatalog::new();
        catalog.build(&[table(toml)]);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.lookup("q1").unwrap().title.as_deref(), Some("Second"));
    }

    #[test]
    fn test_duplicate_task_id_is_non_fatal() {
        let toml = r#"
[[quests]]
id = "q1"

[[quests.objectives]]
id = "o1"

[[quests.objectives.tasks]]
id = "t1"

[[quests.objectives]]
id = "o2"

[[quests.objectives.tasks]]
id = "t1"
"#;
        let mut catalog = QuestCatalog::new();
        catalog.build(&[table(toml)]);
        // Warned, but the quest is still usable
        assert!(catalog.contains("q1"));
    }

    #[test]
    fn test_invalid_row_is_skipped() {
        let toml = r#"
[[quests]]
id = "broken"
ordering = "randomly"

[[quests.objectives]]
id = "o1"

[[quests.objectives.tasks]]
id = "t1"
"#;
        let mut catalog = QuestCatalog::new();
        catalog.build(&[table(toml), table(SIMPLE_QUEST)]);
        assert!(!catalog.contains("broken"));
        assert!(catalog.contains("q1"));
    }

    #[test]
    fn test_load_from_directory() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("main.toml"), SIMPLE_QUEST).unwrap();

        let mut catalog = QuestCatalog::new();
        catalog.load_from_directory(temp_dir.path()).unwrap();

        assert_eq!(catalog.len(), 1);
        let quest = catalog.lookup("q1").unwrap();
        assert_eq!(quest.objectives.len(), 1);
    }

    #[test]
    fn test_missing_directory_is_not_an_error() {
        let mut catalog = QuestCatalog::new();
        catalog
            .load_from_directory(Path::new("/nonexistent/quests"))
            .unwrap();
        assert!(catalog.is_empty());
    }
}
