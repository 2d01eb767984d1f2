//! Module id normalization.
//!
//! Hosts hand out module ids that carry more than a path: query strings
//! (`?v=1a2b3c`), the `\0` virtual-module marker, Windows separators, and
//! pre-bundled dependency locations (`node_modules/.vite/deps/lodash.js`).
//! Everything that compares ids against the manifest goes through here.

use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::FxHashMap;
use std::path::Path;

static DEPS_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^.*/deps/").expect("valid regex"));
static JS_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.js.*$").expect("valid regex"));

/// Strip the `\0` marker, query and hash suffixes, and normalize separators
pub fn strip_id(id: &str) -> String {
    let id = id.strip_prefix('\0').unwrap_or(id);
    let id = match id.find(['?', '#']) {
        Some(idx) => &id[..idx],
        None => id,
    };
    id.replace('\\', "/")
}

/// Identity of a module id as seen by serve-mode matching.
///
/// Pre-bundled dependency ids reduce to the bare specifier they were built
/// from: `/app/node_modules/.vite/deps/@scope_pkg.js?v=123` becomes
/// `@scope/pkg`. Any other id is only stripped.
pub fn clean_id(id: &str) -> String {
    let stripped = strip_id(id);
    if !stripped.contains("/deps/") {
        return stripped;
    }
    let without_prefix = DEPS_PREFIX.replace(&stripped, "");
    let without_ext = JS_SUFFIX.replace(&without_prefix, "");
    without_ext.replace('_', "/")
}

/// Normalizes ids and paths into comparable strings
#[derive(Debug, Clone, Copy, Default)]
pub struct PathNormalizer {
    preserve_symlinks: bool,
}

impl PathNormalizer {
    pub fn new(preserve_symlinks: bool) -> Self {
        Self { preserve_symlinks }
    }

    /// Normalize a module id.
    ///
    /// Unless symlinks are preserved, ids naming an existing file are
    /// canonicalized so a symlinked package and its target compare equal.
    pub fn normalize(&self, id: &str) -> String {
        self.resolve(strip_id(id))
    }

    /// Like [`PathNormalizer::normalize`], reusing results across calls.
    ///
    /// Entries are keyed by the stripped id, so query variants of one file
    /// share a single filesystem lookup.
    pub fn normalize_cached(&self, id: &str, cache: &mut FxHashMap<String, String>) -> String {
        let stripped = strip_id(id);
        if let Some(normalized) = cache.get(&stripped) {
            return normalized.clone();
        }
        let normalized = self.resolve(stripped.clone());
        cache.insert(stripped, normalized.clone());
        normalized
    }

    fn resolve(&self, stripped: String) -> String {
        if self.preserve_symlinks {
            return stripped;
        }
        match std::fs::canonicalize(&stripped) {
            Ok(real) => real.to_string_lossy().replace('\\', "/"),
            Err(_) => stripped,
        }
    }

    /// Normalize a filesystem path
    pub fn normalize_path(&self, path: &Path) -> String {
        self.normalize(&path.to_string_lossy())
    }
}

/// Whether a registration specifier names a package rather than a file
pub fn is_bare_specifier(specifier: &str) -> bool {
    !(specifier.starts_with('.')
        || specifier.starts_with('/')
        || specifier.starts_with('\0')
        || Path::new(specifier).is_absolute())
}
