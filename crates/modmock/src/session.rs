//! Mocking session: the object a host drives through its plugin hooks.
//!
//! A session owns the options, the current manifest snapshot and the
//! extractor. Hosts call [`MockSession::build_start`] before modules are
//! loaded, route `load`/`transform` hooks through [`MockSession::load`] and
//! [`MockSession::transform`], and on dev servers forward file events to
//! [`MockSession::handle_file_change`].
//!
//! ```text
//! build_start ──▶ Extractor ──▶ Arc<Manifest> ◀── load / transform
//!                     ▲               │
//! file change ────────┘               └──▶ invalidate graph ──▶ full reload
//! ```

use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::error::{MockError, Result};
use crate::extract::{Extraction, Extractor};
use crate::invalidate::{invalidate_changes, InvalidationReport};
use crate::loader::{Interceptor, LoadOutcome, TransformOutcome};
use crate::manifest::Manifest;
use crate::matching::{HostMode, MatchStrategy};
use crate::options::MockOptions;
use crate::paths::PathNormalizer;
use crate::server::{DevServer, HmrEvent};
use crate::watcher::{FileChange, FileWatcher, WatchTargets};

/// Observable state of the invalidation controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Idle,
    /// At least one extraction pass is running
    ReExtracting,
}

/// Counts running extraction passes for the lifetime of the guard
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Explicit per-host mocking session
pub struct MockSession {
    options: Arc<MockOptions>,
    root: PathBuf,
    mode: HostMode,
    normalizer: PathNormalizer,
    interceptor: Interceptor,
    extractor: Extractor,
    manifest: RwLock<Arc<Manifest>>,
    in_flight: AtomicUsize,
}

impl std::fmt::Debug for MockSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSession")
            .field("root", &self.root)
            .field("mode", &self.mode)
            .field("mocks", &self.manifest().len())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl MockSession {
    /// Create a session for the project at `root`.
    ///
    /// The manifest starts empty until [`MockSession::build_start`] runs.
    ///
    /// # Errors
    ///
    /// Returns [`MockError::Options`] when the options fail validation.
    pub fn new(options: MockOptions, mode: HostMode, root: impl Into<PathBuf>) -> Result<Self> {
        options.validate()?;
        let options = Arc::new(options);
        let normalizer = PathNormalizer::new(options.preserve_symlinks);

        Ok(Self {
            extractor: Extractor::new(Arc::clone(&options)),
            interceptor: Interceptor::new(MatchStrategy::for_mode(mode), normalizer),
            options,
            root: root.into(),
            mode,
            normalizer,
            manifest: RwLock::new(Arc::new(Manifest::empty())),
            in_flight: AtomicUsize::new(0),
        })
    }

    pub fn options(&self) -> &MockOptions {
        &self.options
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn mode(&self) -> HostMode {
        self.mode
    }

    /// Current manifest snapshot
    pub fn manifest(&self) -> Arc<Manifest> {
        Arc::clone(&self.manifest.read())
    }

    pub fn state(&self) -> ControllerState {
        if self.in_flight.load(Ordering::SeqCst) == 0 {
            ControllerState::Idle
        } else {
            ControllerState::ReExtracting
        }
    }

    fn swap_manifest(&self, manifest: Manifest) -> Arc<Manifest> {
        let new = Arc::new(manifest);
        *self.manifest.write() = Arc::clone(&new);
        new
    }

    async fn extract(&self) -> Result<Extraction> {
        let _guard = InFlight::enter(&self.in_flight);
        self.extractor.extract(&self.root).await
    }

    /// Rebuild the manifest from the configuration file.
    ///
    /// # Errors
    ///
    /// Fails only when the configuration file cannot be read; the previous
    /// manifest is kept in that case.
    pub async fn build_start(&self) -> Result<Extraction> {
        let extraction = self.extract().await?;
        self.swap_manifest(extraction.manifest.clone());
        info!(
            mocks = extraction.manifest.len(),
            diagnostics = extraction.diagnostics.len(),
            "mock manifest built"
        );
        Ok(extraction)
    }

    /// Paths a dev server must watch for this session
    pub fn configure_server(&self, server: &dyn DevServer) -> WatchTargets {
        debug!(
            modules = server.module_graph().module_ids().len(),
            "configuring dev server for mock invalidation"
        );
        self.watch_targets()
    }

    pub fn watch_targets(&self) -> WatchTargets {
        let mut dirs = vec![self.root.clone()];
        let config_dir = self.options.config_entry_dir();
        if !config_dir.starts_with(&self.root) {
            dirs.push(config_dir.to_path_buf());
        }
        WatchTargets {
            config_file: self.options.config_entry_path.clone(),
            dirs,
            mocks_dir_name: self.options.mocks_dir_name.clone(),
        }
    }

    /// Start a [`FileWatcher`] over [`MockSession::watch_targets`]
    pub fn watch(&self, debounce_ms: u64) -> Result<(FileWatcher, mpsc::Receiver<FileChange>)> {
        FileWatcher::new(self.watch_targets(), debounce_ms)
    }

    /// React to a file system change.
    ///
    /// Returns `Ok(None)` for paths that cannot affect the manifest. For the
    /// configuration file or anything inside a manual mock directory, the
    /// manifest is re-extracted, affected graph modules are invalidated and
    /// clients are told to reload.
    ///
    /// # Errors
    ///
    /// Returns [`MockError::WatchCallback`] when re-extraction fails. The
    /// current manifest stays in place and no reload is sent.
    pub async fn handle_file_change(
        &self,
        change: &FileChange,
        server: &dyn DevServer,
    ) -> Result<Option<InvalidationReport>> {
        let path = change.path();
        if !self.watch_targets().is_relevant(path) {
            return Ok(None);
        }
        debug!(path = %path.display(), "mock configuration changed");

        let old = self.manifest();
        let extraction = match self.extract().await {
            Ok(extraction) => extraction,
            Err(err) => {
                let err = MockError::WatchCallback {
                    path: path.to_path_buf(),
                    reason: err.to_string(),
                };
                error!("{}", err);
                return Err(err);
            }
        };

        let report = invalidate_changes(
            server.module_graph(),
            self.normalizer,
            &self.options.config_entry_path,
            &old,
            &extraction.manifest,
        );
        self.swap_manifest(extraction.manifest);

        server.hot().send(&HmrEvent::FullReload).await;
        info!(
            invalidated = report.invalidated.len(),
            removed = report.removed.len(),
            "mocks updated, full reload sent"
        );
        Ok(Some(report))
    }

    /// Feed watcher events into [`MockSession::handle_file_change`] until
    /// the channel closes
    pub async fn run_watch_loop(&self, mut changes: mpsc::Receiver<FileChange>, server: &dyn DevServer) {
        while let Some(change) = changes.recv().await {
            // Failures are already logged and leave the session usable
            let _ = self.handle_file_change(&change, server).await;
        }
    }

    /// Load hook: serve manual mocks of registered modules
    pub async fn load(&self, id: &str) -> LoadOutcome {
        let manifest = self.manifest();
        self.interceptor.load(&manifest, id).await
    }

    /// Transform hook: automock registered modules
    pub async fn transform(&self, code: &str, id: &str) -> TransformOutcome {
        let manifest = self.manifest();
        self.interceptor.transform(&manifest, code, id).await
    }
}
