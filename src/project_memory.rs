//! Project memories: a flat, project-scoped note list persisted as
//! `project_memories.json`. Not one of the seven core components — just
//! the remaining persisted layout enumerated alongside them — so its
//! surface is deliberately small: add, list, remove.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::instrument;
use uuid::Uuid;

use crate::persist;

/// A single project-scoped note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectMemory {
    pub id: Uuid,
    pub project_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

pub struct ProjectMemoryStore {
    entries: Arc<RwLock<Vec<ProjectMemory>>>,
    path: PathBuf,
}

impl ProjectMemoryStore {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        let entries: Vec<ProjectMemory> = persist::load_json(&path).unwrap_or_default();
        Self { entries: Arc::new(RwLock::new(entries)), path }
    }

    async fn persist(&self) {
        let entries = self.entries.read().await;
        persist::save_json(&self.path, &*entries);
    }

    #[instrument(skip(self, project_id, content))]
    pub async fn add(&self, project_id: impl Into<String>, content: impl Into<String>) -> Uuid {
        let memory = ProjectMemory { id: Uuid::new_v4(), project_id: project_id.into(), content: content.into(), created_at: Utc::now() };
        let id = memory.id;
        self.entries.write().await.push(memory);
        self.persist().await;
        id
    }

    pub async fn list(&self, project_id: &str) -> Vec<ProjectMemory> {
        self.entries.read().await.iter().filter(|m| m.project_id == project_id).cloned().collect()
    }

    pub async fn remove(&self, id: Uuid) {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|m| m.id != id);
        if entries.len() != before {
            drop(entries);
            self.persist().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn add_then_list_round_trips_by_project() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProjectMemoryStore::new(dir.path().join("project_memories.json"));
        store.add("atlas", "uses postgres for storage").await;
        store.add("other-project", "unrelated note").await;
        let results = store.list("atlas").await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].content, "uses postgres for storage");
    }

    #[tokio::test]
    async fn remove_drops_entry_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("project_memories.json");
        let id;
        {
            let store = ProjectMemoryStore::new(path.clone());
            id = store.add("atlas", "note").await;
            store.remove(id).await;
        }
        let reloaded = ProjectMemoryStore::new(path);
        assert!(reloaded.list("atlas").await.is_empty());
    }
}
