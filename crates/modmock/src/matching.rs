//! Matching module ids against the manifest.
//!
//! Production builds see real file paths, so only exact path equality is
//! used. Dev servers also hand out ids of pre-bundled dependencies
//! (`node_modules/.vite/deps/lodash.js?v=1a2b`) that must still match a
//! registration of `lodash`.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::manifest::{Manifest, MockCall};
use crate::paths::{clean_id, PathNormalizer};

/// How the host runs the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostMode {
    /// One-shot production build
    Build,
    /// Long-running dev server
    Serve,
}

/// Strategy used to find the manifest entry for a module id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStrategy {
    /// Normalized id equals the resolved path
    ExactPath,
    /// Exact path, or the clean id of a pre-bundled dependency
    CleanIdentity,
}

impl MatchStrategy {
    pub fn for_mode(mode: HostMode) -> Self {
        match mode {
            HostMode::Build => Self::ExactPath,
            HostMode::Serve => Self::CleanIdentity,
        }
    }

    /// Find the registration matching `id`, if any
    pub fn find<'m>(
        &self,
        manifest: &'m Manifest,
        id: &str,
        normalizer: &PathNormalizer,
    ) -> Option<&'m MockCall> {
        if manifest.is_empty() {
            return None;
        }
        let normalized = normalizer.normalize(id);
        let by_path = manifest.by_absolute_path(Path::new(&normalized));

        match self {
            Self::ExactPath => by_path,
            Self::CleanIdentity => by_path.or_else(|| manifest.by_clean_id(&clean_id(&normalized))),
        }
    }
}
