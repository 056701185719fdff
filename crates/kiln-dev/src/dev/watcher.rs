//! File system watcher for the frontend tree.
//!
//! The tree is walked once at startup and each directory found is watched
//! non-recursively. Directories created afterwards are not picked up until
//! the watcher is restarted.

use crate::collab::TEMP_FILE_MARKER;
use crate::error::WatchError;
use kiln_graph::normalize_path;
use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use walkdir::WalkDir;

/// Capacity of the change channel between the notify thread and the engine.
const CHANNEL_CAPACITY: usize = 100;

/// Directory names never descended into.
const SKIPPED_DIRS: &[&str] = &["node_modules"];

/// File change event type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileChange {
    /// File was modified
    Modified(PathBuf),
    /// File was created
    Created(PathBuf),
    /// File was removed
    Removed(PathBuf),
}

impl FileChange {
    /// Get the path affected by this change.
    pub fn path(&self) -> &Path {
        match self {
            FileChange::Modified(p) | FileChange::Created(p) | FileChange::Removed(p) => p,
        }
    }

    /// Map a notify event kind onto a change, dropping reads and
    /// permission/attribute updates.
    fn from_event(kind: &EventKind, path: PathBuf) -> Option<Self> {
        match kind {
            EventKind::Create(_) => Some(FileChange::Created(path)),
            EventKind::Modify(ModifyKind::Metadata(_)) => None,
            EventKind::Modify(_) => Some(FileChange::Modified(path)),
            EventKind::Remove(_) => Some(FileChange::Removed(path)),
            _ => None,
        }
    }
}

/// Returns `true` for files written by kiln itself during a build.
pub fn is_generated_path(path: &Path) -> bool {
    path.to_string_lossy().contains(TEMP_FILE_MARKER)
}

/// Coalesces bursts of events per path.
///
/// Every event restarts its path's quiet window and replaces the pending
/// event for that path. A path is released once its window passes without a
/// new event, so the last change of a burst is always delivered.
#[derive(Debug)]
struct Debouncer {
    window: Duration,
    pending: FxHashMap<PathBuf, (FileChange, Instant)>,
}

impl Debouncer {
    fn new(window: Duration) -> Self {
        Self {
            window,
            pending: FxHashMap::default(),
        }
    }

    fn push(&mut self, change: FileChange, now: Instant) {
        let due = now + self.window;
        self.pending
            .insert(change.path().to_path_buf(), (change, due));
    }

    /// Earliest moment a pending path becomes due.
    fn next_due(&self) -> Option<Instant> {
        self.pending.values().map(|(_, due)| *due).min()
    }

    /// Remove and return every change whose window has passed.
    fn take_due(&mut self, now: Instant) -> Vec<FileChange> {
        let due: Vec<PathBuf> = self
            .pending
            .iter()
            .filter(|(_, (_, due))| *due <= now)
            .map(|(path, _)| path.clone())
            .collect();

        due.into_iter()
            .filter_map(|path| self.pending.remove(&path).map(|(change, _)| change))
            .collect()
    }

    fn drain(&mut self) -> Vec<FileChange> {
        self.pending.drain().map(|(_, (change, _))| change).collect()
    }
}

async fn sleep_until(due: Option<Instant>) {
    match due {
        Some(due) => tokio::time::sleep_until(due).await,
        None => std::future::pending().await,
    }
}

/// Coalesce `changes` per path over a quiet `window`.
///
/// A zero window returns `changes` unchanged. Otherwise a task forwards the
/// latest change for each path once no further event for it arrived within
/// `window`; pending changes are flushed when `changes` closes. Must be
/// called from within a tokio runtime.
pub fn debounce(
    mut changes: mpsc::Receiver<FileChange>,
    window: Duration,
) -> mpsc::Receiver<FileChange> {
    if window.is_zero() {
        return changes;
    }

    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    tokio::spawn(async move {
        let mut debouncer = Debouncer::new(window);
        loop {
            let ready = tokio::select! {
                change = changes.recv() => match change {
                    Some(change) => {
                        tracing::trace!("Debouncing {}", change.path().display());
                        debouncer.push(change, Instant::now());
                        continue;
                    }
                    None => {
                        for change in debouncer.drain() {
                            if tx.send(change).await.is_err() {
                                break;
                            }
                        }
                        return;
                    }
                },
                _ = sleep_until(debouncer.next_due()) => debouncer.take_due(Instant::now()),
            };

            for change in ready {
                // Receiver gone means the engine shut down
                if tx.send(change).await.is_err() {
                    return;
                }
            }
        }
    });
    rx
}

/// Watches the directories of a frontend tree and forwards relevant changes.
pub struct FileWatcher {
    /// Underlying notify watcher
    _watcher: RecommendedWatcher,
    /// Root directory being watched
    root: PathBuf,
    /// Directories registered at startup
    directories: Vec<PathBuf>,
}

impl std::fmt::Debug for FileWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileWatcher")
            .field("root", &self.root)
            .field("directories", &self.directories.len())
            .finish()
    }
}

impl FileWatcher {
    /// Start watching `root`.
    ///
    /// # Arguments
    ///
    /// * `root` - Frontend directory; it and every directory below it at this
    ///   moment are watched
    ///
    /// # Returns
    ///
    /// Tuple of (FileWatcher, receiver for change events)
    ///
    /// # Errors
    ///
    /// Returns error if the root is missing, the platform watcher cannot be
    /// created, or a directory cannot be registered
    pub fn new(root: PathBuf) -> Result<(Self, mpsc::Receiver<FileChange>), WatchError> {
        if !root.is_dir() {
            return Err(WatchError::RootNotFound(root));
        }
        let root = normalize_path(&root);

        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let event = match res {
                Ok(event) => event,
                Err(e) => {
                    tracing::error!("File watcher error: {}", e);
                    return;
                }
            };

            for path in event.paths {
                if is_generated_path(&path) {
                    continue;
                }

                let Some(change) = FileChange::from_event(&event.kind, normalize_path(&path))
                else {
                    continue;
                };

                // Receiver gone means the engine shut down
                if tx.blocking_send(change).is_err() {
                    return;
                }
            }
        })
        .map_err(WatchError::Init)?;

        let directories = Self::scan_directories(&root)?;
        for dir in &directories {
            watcher
                .watch(dir, RecursiveMode::NonRecursive)
                .map_err(|source| WatchError::AddDirectory {
                    path: dir.clone(),
                    source,
                })?;
        }

        tracing::debug!(
            "Watching {} directories under {}",
            directories.len(),
            root.display()
        );

        Ok((
            Self {
                _watcher: watcher,
                root,
                directories,
            },
            rx,
        ))
    }

    /// Every directory under `root` (inclusive), skipping hidden and dependency folders.
    fn scan_directories(root: &Path) -> Result<Vec<PathBuf>, WatchError> {
        let mut directories = Vec::new();
        let walker = WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !Self::is_skipped_dir(entry.path()));

        for entry in walker {
            let entry = entry.map_err(|source| WatchError::Scan {
                path: root.to_path_buf(),
                source,
            })?;
            if entry.file_type().is_dir() {
                directories.push(entry.into_path());
            }
        }

        Ok(directories)
    }

    fn is_skipped_dir(path: &Path) -> bool {
        path.file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with('.') || SKIPPED_DIRS.contains(&name))
    }

    /// Get the root directory being watched.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directories registered at startup.
    pub fn directories(&self) -> &[PathBuf] {
        &self.directories
    }
}
