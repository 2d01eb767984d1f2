//! Resolved mock registrations.
//!
//! A [`Manifest`] is an immutable snapshot produced by one extraction pass.
//! Sessions share it as `Arc<Manifest>` and replace the whole snapshot when
//! the configuration changes, so readers never observe a partially built
//! manifest.

use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};

/// One resolved mock registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCall {
    /// Module reference as written in the configuration source
    pub specifier: String,
    /// Specifier resolved from the configuration file's directory
    pub absolute_path: PathBuf,
    /// Manual mock file served instead of the module, if one exists
    pub redirect_path: Option<PathBuf>,
    /// Record arguments and results of mocked function exports
    pub spy: bool,
    /// Identity used by serve-mode matching
    pub clean_id: String,
}

impl MockCall {
    pub fn new(specifier: impl Into<String>, absolute_path: impl Into<PathBuf>, spy: bool) -> Self {
        let specifier = specifier.into();
        Self {
            clean_id: specifier.clone(),
            specifier,
            absolute_path: absolute_path.into(),
            redirect_path: None,
            spy,
        }
    }

    pub fn with_redirect(mut self, redirect: impl Into<PathBuf>) -> Self {
        self.redirect_path = Some(redirect.into());
        self
    }

    /// Whether a manual mock replaces this module
    pub fn is_redirected(&self) -> bool {
        self.redirect_path.is_some()
    }
}

/// Ordered, indexed snapshot of mock registrations.
///
/// Entries are unique by absolute path; [`Manifest::from_calls`] keeps the
/// first registration of a path and drops later ones.
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    calls: IndexMap<PathBuf, MockCall>,
    by_clean_id: FxHashMap<String, usize>,
}

impl Manifest {
    /// Empty manifest, the state before the first extraction
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a manifest, keeping the first call for each absolute path.
    ///
    /// Returns the manifest and the calls that were dropped as duplicates.
    pub fn from_calls(calls: impl IntoIterator<Item = MockCall>) -> (Self, Vec<MockCall>) {
        let mut manifest = Self::default();
        let mut duplicates = Vec::new();

        for call in calls {
            if manifest.calls.contains_key(&call.absolute_path) {
                duplicates.push(call);
                continue;
            }
            let index = manifest.calls.len();
            manifest.by_clean_id.entry(call.clean_id.clone()).or_insert(index);
            manifest.calls.insert(call.absolute_path.clone(), call);
        }

        (manifest, duplicates)
    }

    /// Calls in registration order
    pub fn iter(&self) -> impl Iterator<Item = &MockCall> {
        self.calls.values()
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    pub fn by_absolute_path(&self, path: &Path) -> Option<&MockCall> {
        self.calls.get(path)
    }

    pub fn by_clean_id(&self, clean_id: &str) -> Option<&MockCall> {
        self.by_clean_id
            .get(clean_id)
            .and_then(|&index| self.calls.get_index(index))
            .map(|(_, call)| call)
    }

    pub fn contains_path(&self, path: &Path) -> bool {
        self.calls.contains_key(path)
    }

    /// Calls of `self` whose absolute path is missing from `newer`
    pub fn removed_in<'a>(&'a self, newer: &'a Manifest) -> impl Iterator<Item = &'a MockCall> + 'a {
        self.iter()
            .filter(move |call| !newer.contains_path(&call.absolute_path))
    }
}

impl PartialEq for Manifest {
    fn eq(&self, other: &Self) -> bool {
        self.calls.len() == other.calls.len() && self.iter().eq(other.iter())
    }
}

impl Eq for Manifest {}

impl<'a> IntoIterator for &'a Manifest {
    type Item = &'a MockCall;
    type IntoIter = indexmap::map::Values<'a, PathBuf, MockCall>;

    fn into_iter(self) -> Self::IntoIter {
        self.calls.values()
    }
}
