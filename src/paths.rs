//! App-support directory resolution for on-disk snapshots.

use std::path::PathBuf;

/// Where a `MemoryEngine` instance's snapshots live on disk: `<base>/<namespace>/...`.
///
/// `base` defaults to the OS app-support directory (`dirs::data_dir()`,
/// falling back to `dirs::home_dir()` joined with `.memory-engine`) but can
/// be pointed anywhere — tests point it at a `tempfile::TempDir`.
#[derive(Debug, Clone)]
pub struct AppPaths {
    base: PathBuf,
    namespace: String,
}

impl AppPaths {
    #[must_use]
    pub fn new(base: PathBuf, namespace: impl Into<String>) -> Self {
        Self { base, namespace: namespace.into() }
    }

    /// Resolve the default app-support directory for `namespace`.
    #[must_use]
    pub fn default_for(namespace: impl Into<String>) -> Self {
        let base = dirs::data_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."));
        Self::new(base, namespace)
    }

    fn namespace_dir(&self) -> PathBuf {
        self.base.join(&self.namespace)
    }

    #[must_use]
    pub fn memories_file(&self) -> PathBuf {
        self.namespace_dir().join("memories.json")
    }

    #[must_use]
    pub fn long_term_file(&self) -> PathBuf {
        self.namespace_dir().join("long_term.json")
    }

    #[must_use]
    pub fn graph_file(&self) -> PathBuf {
        self.namespace_dir().join("KnowledgeGraph").join("graph.json")
    }

    #[must_use]
    pub fn conversation_file(&self, key: &str) -> PathBuf {
        self.namespace_dir().join(format!("conversation_{key}.json"))
    }

    #[must_use]
    pub fn project_memories_file(&self) -> PathBuf {
        self.namespace_dir().join("project_memories.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layouts_match_the_documented_paths() {
        let paths = AppPaths::new(PathBuf::from("/tmp/app"), "ns");
        assert_eq!(paths.memories_file(), PathBuf::from("/tmp/app/ns/memories.json"));
        assert_eq!(
            paths.graph_file(),
            PathBuf::from("/tmp/app/ns/KnowledgeGraph/graph.json")
        );
        assert_eq!(
            paths.conversation_file("facts"),
            PathBuf::from("/tmp/app/ns/conversation_facts.json")
        );
    }
}
