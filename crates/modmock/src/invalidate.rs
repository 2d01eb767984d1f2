//! Module graph invalidation after a manifest change.
//!
//! When the mock configuration changes, every module whose mock status may
//! differ between the old and new manifest must be re-transformed: modules
//! still registered (their spy flag or manual mock may have changed),
//! modules no longer registered (they go back to their original source),
//! and the configuration module itself. Importers of those modules are
//! invalidated too, since they may hold bindings to the old stand-ins.

use indexmap::IndexSet;
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

use crate::graph::ModuleGraph;
use crate::manifest::{Manifest, MockCall};
use crate::paths::{clean_id, PathNormalizer};

/// Outcome of one invalidation pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvalidationReport {
    /// Graph ids that were invalidated, in invalidation order
    pub invalidated: Vec<String>,
    /// Modules registered before the change but not after
    pub removed: Vec<PathBuf>,
}

/// Collects and applies graph invalidations
pub struct Invalidator<'g> {
    graph: &'g dyn ModuleGraph,
    normalizer: PathNormalizer,
    /// Graph ids with their normalized form and clean id
    index: Vec<(String, String, String)>,
    /// Normalized forms computed during this pass
    normalized: FxHashMap<String, String>,
    pending: IndexSet<String>,
}

impl<'g> Invalidator<'g> {
    pub fn new(graph: &'g dyn ModuleGraph, normalizer: PathNormalizer) -> Self {
        let mut cache = FxHashMap::default();
        let index = graph
            .module_ids()
            .into_iter()
            .map(|id| {
                let normalized = normalizer.normalize_cached(&id, &mut cache);
                let clean = clean_id(&normalized);
                (id, normalized, clean)
            })
            .collect();

        Self {
            graph,
            normalizer,
            index,
            normalized: cache,
            pending: IndexSet::new(),
        }
    }

    fn normalize_path(&mut self, path: &Path) -> String {
        self.normalizer
            .normalize_cached(&path.to_string_lossy(), &mut self.normalized)
    }

    /// Queue every graph id that refers to `path`
    pub fn module_at(&mut self, path: &Path) {
        let target = self.normalize_path(path);
        let matches: Vec<String> = self
            .index
            .iter()
            .filter(|(_, normalized, _)| *normalized == target)
            .map(|(id, _, _)| id.clone())
            .collect();
        self.pending.extend(matches);
    }

    /// Queue every graph id that is a variant of a registered module,
    /// including pre-bundled copies matched by clean id
    pub fn mocked_module(&mut self, call: &MockCall) {
        let target = self.normalize_path(&call.absolute_path);
        let matches: Vec<String> = self
            .index
            .iter()
            .filter(|(_, normalized, clean)| *normalized == target || *clean == call.clean_id)
            .map(|(id, _, _)| id.clone())
            .collect();
        self.pending.extend(matches);
    }

    /// Invalidate queued ids and, transitively, their importers
    pub fn apply(self) -> Vec<String> {
        let mut queue: Vec<String> = self.pending.into_iter().collect();
        let mut visited = IndexSet::new();
        let mut invalidated = Vec::new();

        while let Some(id) = queue.pop() {
            if !visited.insert(id.clone()) {
                continue;
            }
            if self.graph.invalidate(&id) {
                trace!(id = %id, "invalidated module");
                invalidated.push(id.clone());
            }
            if let Some(node) = self.graph.lookup(&id) {
                queue.extend(
                    node.importers
                        .into_iter()
                        .filter(|importer| !visited.contains(importer)),
                );
            }
        }
        invalidated
    }
}

/// Invalidate everything affected by replacing `old` with `new`
pub fn invalidate_changes(
    graph: &dyn ModuleGraph,
    normalizer: PathNormalizer,
    config_file: &Path,
    old: &Manifest,
    new: &Manifest,
) -> InvalidationReport {
    let mut invalidator = Invalidator::new(graph, normalizer);

    invalidator.module_at(config_file);
    for call in new {
        invalidator.mocked_module(call);
    }
    let mut removed = Vec::new();
    for call in old.removed_in(new) {
        invalidator.mocked_module(call);
        removed.push(call.absolute_path.clone());
    }

    let invalidated = invalidator.apply();
    debug!(
        invalidated = invalidated.len(),
        removed = removed.len(),
        "invalidated modules after mock configuration change"
    );

    InvalidationReport {
        invalidated,
        removed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::InMemoryModuleGraph;

    fn manifest(calls: Vec<MockCall>) -> Manifest {
        Manifest::from_calls(calls).0
    }

    #[test]
    fn test_removed_and_kept_mocks_are_invalidated() {
        let graph = InMemoryModuleGraph::new();
        graph.add_module("/p/.storybook/preview.ts");
        graph.add_module("/p/src/a.ts");
        graph.add_module("/p/src/b.ts");
        graph.add_module("/p/src/c.ts");

        let old = manifest(vec![
            MockCall::new("../src/a", "/p/src/a.ts", false),
            MockCall::new("../src/b", "/p/src/b.ts", false),
        ]);
        let new = manifest(vec![MockCall::new("../src/b", "/p/src/b.ts", false)]);

        let report = invalidate_changes(
            &graph,
            PathNormalizer::new(true),
            Path::new("/p/.storybook/preview.ts"),
            &old,
            &new,
        );

        assert!(graph.is_invalidated("/p/src/a.ts"));
        assert!(graph.is_invalidated("/p/src/b.ts"));
        assert!(graph.is_invalidated("/p/.storybook/preview.ts"));
        assert!(!graph.is_invalidated("/p/src/c.ts"));
        assert_eq!(report.removed, vec![PathBuf::from("/p/src/a.ts")]);
        assert_eq!(report.invalidated.len(), 3);
    }

    #[test]
    fn test_optimized_dep_variants_are_invalidated() {
        let graph = InMemoryModuleGraph::new();
        graph.add_module("/app/node_modules/lodash/lodash.js");
        graph.add_module("/app/node_modules/.vite/deps/lodash.js?v=1a2b");
        graph.add_module("/app/node_modules/.vite/deps/react.js?v=1a2b");

        let new = manifest(vec![MockCall::new(
            "lodash",
            "/app/node_modules/lodash/lodash.js",
            true,
        )]);
        invalidate_changes(
            &graph,
            PathNormalizer::new(true),
            Path::new("/app/.storybook/preview.ts"),
            &Manifest::empty(),
            &new,
        );

        assert!(graph.is_invalidated("/app/node_modules/lodash/lodash.js"));
        assert!(graph.is_invalidated("/app/node_modules/.vite/deps/lodash.js?v=1a2b"));
        assert!(!graph.is_invalidated("/app/node_modules/.vite/deps/react.js?v=1a2b"));
    }

    #[test]
    fn test_importers_are_invalidated_once() {
        let graph = InMemoryModuleGraph::new();
        graph.add_import("/p/src/Button.tsx", "/p/src/api.ts");
        graph.add_import("/p/src/Page.tsx", "/p/src/Button.tsx");
        graph.add_import("/p/src/Page.tsx", "/p/src/api.ts");

        let new = manifest(vec![MockCall::new("./api", "/p/src/api.ts", false)]);
        let report = invalidate_changes(
            &graph,
            PathNormalizer::new(true),
            Path::new("/p/preview.ts"),
            &Manifest::empty(),
            &new,
        );

        assert_eq!(report.invalidated.len(), 3);
        assert_eq!(graph.invalidation_count("/p/src/Page.tsx"), 1);
    }

    #[test]
    fn test_query_variants_match_by_path() {
        let graph = InMemoryModuleGraph::new();
        graph.add_module("/p/src/api.ts?import");

        let new = manifest(vec![MockCall::new("./api", "/p/src/api.ts", false)]);
        invalidate_changes(
            &graph,
            PathNormalizer::new(true),
            Path::new("/p/preview.ts"),
            &Manifest::empty(),
            &new,
        );
        assert!(graph.is_invalidated("/p/src/api.ts?import"));
    }

    #[test]
    fn test_variants_share_one_normalization() {
        let graph = InMemoryModuleGraph::new();
        graph.add_module("/p/src/api.ts?import");
        graph.add_module("/p/src/api.ts?v=1a2b");
        graph.add_module("\0/p/src/api.ts");

        let mut invalidator = Invalidator::new(&graph, PathNormalizer::new(false));
        assert_eq!(invalidator.normalized.len(), 1);

        invalidator.module_at(Path::new("/p/src/api.ts"));
        assert_eq!(invalidator.normalized.len(), 1);
        assert_eq!(invalidator.apply().len(), 3);
    }
}
