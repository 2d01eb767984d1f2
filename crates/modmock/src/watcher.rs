//! File watching for mock configuration changes.
//!
//! Dev servers usually own a watcher already and forward its events to
//! [`MockSession::handle_file_change`](crate::MockSession::handle_file_change).
//! [`FileWatcher`] covers hosts that do not: it watches the directories in
//! [`WatchTargets`] and forwards relevant changes through a channel.

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Component, Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

use crate::error::{MockError, Result};

/// File change event type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileChange {
    Modified(PathBuf),
    Created(PathBuf),
    Removed(PathBuf),
}

impl FileChange {
    /// Get the path affected by this change
    pub fn path(&self) -> &Path {
        match self {
            FileChange::Modified(p) | FileChange::Created(p) | FileChange::Removed(p) => p,
        }
    }
}

/// Paths whose changes can alter the manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchTargets {
    /// Configuration entry file
    pub config_file: PathBuf,
    /// Directories to watch recursively
    pub dirs: Vec<PathBuf>,
    /// Manual mock directory name
    pub mocks_dir_name: String,
}

impl WatchTargets {
    /// Whether a change of `path` requires re-extraction
    pub fn is_relevant(&self, path: &Path) -> bool {
        if path == self.config_file {
            return true;
        }
        if is_dependency_path(path) {
            return false;
        }
        path.components().any(|component| match component {
            Component::Normal(name) => name == self.mocks_dir_name.as_str(),
            _ => false,
        })
    }
}

fn is_dependency_path(path: &Path) -> bool {
    path.components()
        .any(|component| matches!(component, Component::Normal(name) if name == "node_modules"))
}

/// Watcher forwarding relevant changes of [`WatchTargets`].
///
/// Repeated events for the same path within the debounce window are
/// dropped.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    targets: WatchTargets,
}

impl std::fmt::Debug for FileWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileWatcher")
            .field("targets", &self.targets)
            .finish_non_exhaustive()
    }
}

impl FileWatcher {
    /// Start watching.
    ///
    /// # Errors
    ///
    /// Returns an error if a watched directory is missing or the platform
    /// watcher cannot be created.
    pub fn new(
        targets: WatchTargets,
        debounce_ms: u64,
    ) -> Result<(Self, mpsc::Receiver<FileChange>)> {
        for dir in &targets.dirs {
            if !dir.is_dir() {
                return Err(MockError::Options(format!(
                    "watch directory does not exist: {}",
                    dir.display()
                )));
            }
        }

        let (tx, rx) = mpsc::channel(100);

        let debounce_duration = Duration::from_millis(debounce_ms);
        let mut last_event: Option<(PathBuf, Instant)> = None;
        let filter = targets.clone();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let Ok(event) = res else {
                return;
            };
            for path in &event.paths {
                if !filter.is_relevant(path) {
                    continue;
                }

                let now = Instant::now();
                if let Some((last_path, last_time)) = &last_event {
                    if last_path == path && now.duration_since(*last_time) < debounce_duration {
                        continue;
                    }
                }
                last_event = Some((path.clone(), now));

                let change = match event.kind {
                    notify::EventKind::Create(_) => FileChange::Created(path.clone()),
                    notify::EventKind::Modify(_) => FileChange::Modified(path.clone()),
                    notify::EventKind::Remove(_) => FileChange::Removed(path.clone()),
                    _ => continue,
                };

                // Receiver gone means the host stopped listening
                let _ = tx.blocking_send(change);
            }
        })?;

        for dir in &targets.dirs {
            watcher.watch(dir, RecursiveMode::Recursive)?;
        }

        Ok((
            Self {
                _watcher: watcher,
                targets,
            },
            rx,
        ))
    }

    pub fn targets(&self) -> &WatchTargets {
        &self.targets
    }
}
