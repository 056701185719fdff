//! Reverse-edge dependency graph.

use parking_lot::RwLock;
use rustc_hash::{FxHashMap as HashMap, FxHashSet as HashSet};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

/// Set of file identities returned by graph queries.
pub type FileSet = HashSet<PathBuf>;

#[derive(Debug, Default)]
struct GraphInner {
    /// child -> files whose build reads `child`
    parents: HashMap<PathBuf, HashSet<PathBuf>>,
    /// parent -> files it was built from, kept so a rebuild can drop stale edges
    children: HashMap<PathBuf, HashSet<PathBuf>>,
    /// Every route that has been registered as a build root
    routes: HashSet<PathBuf>,
}

/// Thread-safe file dependency graph.
///
/// Paths are treated as opaque identities; callers are expected to pass
/// normalized paths (see [`crate::normalize_path`]) so that `./a.tsx` and
/// `/abs/a.tsx` do not become distinct nodes.
///
/// The graph is type-agnostic about routes: [`ancestors_of`](Self::ancestors_of)
/// returns every dependent file, and deciding which of those are routes is
/// left to the owner of the route key space. [`record_route`](Self::record_route)
/// exists so that owner can publish its roots for
/// [`all_known_routes`](Self::all_known_routes).
#[derive(Debug, Default)]
pub struct DependencyGraph {
    inner: RwLock<GraphInner>,
}

impl DependencyGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register that `parent`'s build reads `child`.
    ///
    /// Idempotent: recording the same edge twice has no additional effect.
    pub fn record_dependency(&self, child: impl Into<PathBuf>, parent: impl Into<PathBuf>) {
        let child = child.into();
        let parent = parent.into();
        let mut inner = self.inner.write();

        inner
            .parents
            .entry(child.clone())
            .or_default()
            .insert(parent.clone());
        inner.children.entry(parent).or_default().insert(child);
    }

    /// Register a set of files read by `parent` in one lock acquisition.
    pub fn record_dependencies<I, P>(&self, parent: impl Into<PathBuf>, children: I)
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let parent = parent.into();
        let mut inner = self.inner.write();

        for child in children {
            let child = child.into();
            inner
                .parents
                .entry(child.clone())
                .or_default()
                .insert(parent.clone());
            inner
                .children
                .entry(parent.clone())
                .or_default()
                .insert(child);
        }
    }

    /// Drop every edge pointing into `parent`.
    ///
    /// Used before re-recording a fresh dependency set so imports removed since
    /// the previous build stop resolving to this parent.
    pub fn remove_parent(&self, parent: &Path) {
        let mut inner = self.inner.write();
        let Some(children) = inner.children.remove(parent) else {
            return;
        };

        for child in children {
            if let Some(parents) = inner.parents.get_mut(&child) {
                parents.remove(parent);
                if parents.is_empty() {
                    inner.parents.remove(&child);
                }
            }
        }
    }

    /// Mark `route` as a build root.
    pub fn record_route(&self, route: impl Into<PathBuf>) {
        self.inner.write().routes.insert(route.into());
    }

    /// Returns `true` if `file` was registered through [`record_route`](Self::record_route).
    pub fn is_route(&self, file: &Path) -> bool {
        self.inner.read().routes.contains(file)
    }

    /// Every route registered so far.
    ///
    /// This is a live read: routes registered after any earlier query are
    /// included.
    pub fn all_known_routes(&self) -> FileSet {
        self.inner.read().routes.clone()
    }

    /// Files that read `file` directly.
    pub fn direct_parents_of(&self, file: &Path) -> FileSet {
        self.inner
            .read()
            .parents
            .get(file)
            .cloned()
            .unwrap_or_default()
    }

    /// Every file that transitively depends on `file`.
    ///
    /// Breadth-first over parent edges with a visited set, so cycles in the
    /// import graph terminate. `file` itself is only part of the result when it
    /// is reachable through its own parent chain (for example a route that
    /// records itself as a dependency). A file with no recorded parents yields
    /// an empty set.
    pub fn ancestors_of(&self, file: &Path) -> FileSet {
        let inner = self.inner.read();
        let mut visited = FileSet::default();
        let mut queue: VecDeque<&Path> = VecDeque::new();
        queue.push_back(file);

        while let Some(current) = queue.pop_front() {
            let Some(parents) = inner.parents.get(current) else {
                continue;
            };
            for parent in parents {
                if visited.insert(parent.clone()) {
                    queue.push_back(parent.as_path());
                }
            }
        }

        visited
    }

    /// Returns `true` if `file` appears in the graph as a child, parent or route.
    pub fn contains(&self, file: &Path) -> bool {
        let inner = self.inner.read();
        inner.parents.contains_key(file)
            || inner.children.contains_key(file)
            || inner.routes.contains(file)
    }

    /// Number of distinct child -> parent edges.
    pub fn edge_count(&self) -> usize {
        self.inner.read().parents.values().map(|set| set.len()).sum()
    }

    /// Returns `true` if no edges and no routes have been recorded.
    pub fn is_empty(&self) -> bool {
        let inner = self.inner.read();
        inner.parents.is_empty() && inner.routes.is_empty()
    }

    /// Remove every edge and route.
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.parents.clear();
        inner.children.clear();
        inner.routes.clear();
    }
}
