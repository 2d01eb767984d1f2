//! Dev-server module graph seen by the invalidation controller.
//!
//! Hosts implement [`ModuleGraph`] over their own graph. The
//! [`InMemoryModuleGraph`] implementation backs tests and embedders that
//! have no graph of their own.

use indexmap::{IndexMap, IndexSet};
use parking_lot::RwLock;

/// One module known to the dev server
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleNode {
    /// Module id as handed out by the host (may carry a query suffix)
    pub id: String,
    /// Ids of modules importing this one
    pub importers: Vec<String>,
}

/// Module graph of a running dev server
pub trait ModuleGraph: Send + Sync {
    /// All module ids currently in the graph
    fn module_ids(&self) -> Vec<String>;

    fn lookup(&self, id: &str) -> Option<ModuleNode>;

    /// Drop the cached transform result of `id`; returns false if unknown
    fn invalidate(&self, id: &str) -> bool;
}

#[derive(Debug, Default)]
struct GraphState {
    /// id -> importer ids
    modules: IndexMap<String, IndexSet<String>>,
    invalidated: IndexMap<String, usize>,
}

/// Thread-safe in-memory [`ModuleGraph`]
#[derive(Debug, Default)]
pub struct InMemoryModuleGraph {
    state: RwLock<GraphState>,
}

impl InMemoryModuleGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_module(&self, id: impl Into<String>) {
        self.state.write().modules.entry(id.into()).or_default();
    }

    /// Record that `importer` imports `imported`, adding both modules
    pub fn add_import(&self, importer: impl Into<String>, imported: impl Into<String>) {
        let importer = importer.into();
        let mut state = self.state.write();
        state.modules.entry(importer.clone()).or_default();
        state.modules.entry(imported.into()).or_default().insert(importer);
    }

    pub fn is_invalidated(&self, id: &str) -> bool {
        self.state.read().invalidated.contains_key(id)
    }

    /// How many times `id` was invalidated
    pub fn invalidation_count(&self, id: &str) -> usize {
        self.state.read().invalidated.get(id).copied().unwrap_or(0)
    }

    /// Invalidated ids in first-invalidation order
    pub fn invalidated_ids(&self) -> Vec<String> {
        self.state.read().invalidated.keys().cloned().collect()
    }

    pub fn clear_invalidations(&self) {
        self.state.write().invalidated.clear();
    }
}

impl ModuleGraph for InMemoryModuleGraph {
    fn module_ids(&self) -> Vec<String> {
        self.state.read().modules.keys().cloned().collect()
    }

    fn lookup(&self, id: &str) -> Option<ModuleNode> {
        self.state.read().modules.get(id).map(|importers| ModuleNode {
            id: id.to_string(),
            importers: importers.iter().cloned().collect(),
        })
    }

    fn invalidate(&self, id: &str) -> bool {
        let mut state = self.state.write();
        if !state.modules.contains_key(id) {
            return false;
        }
        *state.invalidated.entry(id.to_string()).or_insert(0) += 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_import_tracks_importers() {
        let graph = InMemoryModuleGraph::new();
        graph.add_import("/app/src/Button.tsx", "/app/src/api.ts");
        graph.add_import("/app/src/Page.tsx", "/app/src/api.ts");

        let node = graph.lookup("/app/src/api.ts").unwrap();
        assert_eq!(node.importers, vec!["/app/src/Button.tsx", "/app/src/Page.tsx"]);
        assert_eq!(graph.module_ids().len(), 3);
    }

    #[test]
    fn test_invalidate_unknown_module() {
        let graph = InMemoryModuleGraph::new();
        assert!(!graph.invalidate("/missing.ts"));
        assert!(graph.invalidated_ids().is_empty());
    }

    #[test]
    fn test_invalidation_count() {
        let graph = InMemoryModuleGraph::new();
        graph.add_module("/a.ts");
        assert!(graph.invalidate("/a.ts"));
        assert!(graph.invalidate("/a.ts"));
        assert_eq!(graph.invalidation_count("/a.ts"), 2);

        graph.clear_invalidations();
        assert!(!graph.is_invalidated("/a.ts"));
    }
}
