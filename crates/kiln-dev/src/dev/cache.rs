//! Per-route build artifact cache.
//!
//! Each route maps to a shared once-cell. The first caller for a route runs
//! its build closure; every concurrent caller for the same route awaits the
//! same cell and observes the same result. Routes never wait on each other
//! since each has its own cell.
//!
//! Invalidation removes the map entry, not the cell. A build that is still
//! running when its route is invalidated finishes into a cell nobody can find
//! any more: its waiters get the result, later callers compile afresh.

use crate::collab::CompileOutput;
use crate::error::CompileError;
use dashmap::DashMap;
use kiln_graph::{DependencyGraph, FileSet};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::OnceCell;

/// Compiled artifacts for one route.
///
/// Entries are immutable. A stale entry is evicted whole, never patched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteBuild {
    /// Route entry file the build was produced from
    pub route: PathBuf,
    /// Server-side bundle
    pub server_code: String,
    /// Browser bundle
    pub client_code: String,
    /// Extracted stylesheet
    pub css: String,
    /// Files the build read, including the route itself
    pub dependencies: FileSet,
    /// Wall time spent in the compiler
    pub build_duration: Duration,
}

type BuildOutcome = Result<Arc<RouteBuild>, CompileError>;
type BuildCell = Arc<OnceCell<BuildOutcome>>;

/// Concurrent cache of route builds backed by the dependency graph.
#[derive(Debug)]
pub struct BuildCache {
    entries: DashMap<PathBuf, BuildCell>,
    graph: Arc<DependencyGraph>,
}

impl BuildCache {
    pub fn new(graph: Arc<DependencyGraph>) -> Self {
        Self {
            entries: DashMap::new(),
            graph,
        }
    }

    /// The graph that successful builds are recorded into.
    pub fn graph(&self) -> &Arc<DependencyGraph> {
        &self.graph
    }

    /// Return the cached build for `route`, compiling it with `build` if needed.
    ///
    /// `build` runs at most once across all concurrent callers for `route`; the
    /// closures of callers that find a build already cached or in flight are
    /// dropped unused. On success the reported dependency files and the route
    /// itself are recorded as dependencies of `route`, replacing any edges from
    /// an earlier build.
    ///
    /// A failure reaches every caller waiting on that attempt and is not
    /// cached; a caller arriving after the attempt finished compiles again.
    pub async fn get_or_build<F, Fut>(&self, route: &Path, build: F) -> BuildOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<CompileOutput, CompileError>>,
    {
        let cell = loop {
            let cell = Arc::clone(&self.entries.entry(route.to_path_buf()).or_default());
            match cell.get() {
                Some(Ok(build)) => {
                    tracing::debug!("Cache hit for {}", route.display());
                    return Ok(Arc::clone(build));
                }
                // A finished failure whose waiters have not evicted it yet
                Some(Err(_)) => {
                    self.entries
                        .remove_if(route, |_, current| Arc::ptr_eq(current, &cell));
                }
                None => break cell,
            }
        };

        let outcome = cell
            .get_or_init(|| async {
                tracing::debug!("Cache miss for {}, compiling", route.display());
                let started = Instant::now();
                let output = build().await?;
                let build = self.store(route, output, started.elapsed());
                tracing::info!(
                    "Built {} in {}ms",
                    route.display(),
                    build.build_duration.as_millis()
                );
                Ok(build)
            })
            .await
            .clone();

        if let Err(e) = &outcome {
            tracing::debug!("Build failed for {}: {}", route.display(), e);
            // Only drop our own attempt; a fresh cell may already be in place
            self.entries
                .remove_if(route, |_, current| Arc::ptr_eq(current, &cell));
        }

        outcome
    }

    fn store(
        &self,
        route: &Path,
        output: CompileOutput,
        build_duration: Duration,
    ) -> Arc<RouteBuild> {
        let mut dependencies: FileSet = output.dependency_files.into_iter().collect();
        dependencies.insert(route.to_path_buf());

        self.graph.remove_parent(route);
        self.graph.record_dependencies(route, dependencies.iter().cloned());
        self.graph.record_route(route);

        Arc::new(RouteBuild {
            route: route.to_path_buf(),
            server_code: output.server_code,
            client_code: output.client_code,
            css: output.css,
            dependencies,
            build_duration,
        })
    }

    /// Cached build for `route`, if one has completed successfully.
    pub fn get(&self, route: &Path) -> Option<Arc<RouteBuild>> {
        let cell = self.entries.get(route)?;
        match cell.get() {
            Some(Ok(build)) => Some(Arc::clone(build)),
            _ => None,
        }
    }

    pub fn contains(&self, route: &Path) -> bool {
        self.get(route).is_some()
    }

    /// Routes with a completed build in the cache.
    pub fn cached_routes(&self) -> FileSet {
        self.entries
            .iter()
            .filter(|entry| matches!(entry.value().get(), Some(Ok(_))))
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Number of completed builds in the cache.
    pub fn len(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| matches!(entry.value().get(), Some(Ok(_))))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Evict `route`. Returns `true` if an entry (cached or in flight) was removed.
    pub fn invalidate(&self, route: &Path) -> bool {
        let evicted = self.entries.remove(route).is_some();
        if evicted {
            tracing::debug!("Evicted {}", route.display());
        }
        evicted
    }

    /// Evict every path in `routes`, returning how many entries were removed.
    pub fn invalidate_many<'a, I>(&self, routes: I) -> usize
    where
        I: IntoIterator<Item = &'a PathBuf>,
    {
        routes
            .into_iter()
            .filter(|route| self.invalidate(route))
            .count()
    }

    /// Evict every entry, returning how many were removed.
    pub fn invalidate_all(&self) -> usize {
        let mut evicted = 0;
        self.entries.retain(|_, _| {
            evicted += 1;
            false
        });
        tracing::debug!("Evicted all {} cached routes", evicted);
        evicted
    }

    /// Routes whose output depends on `file`.
    ///
    /// The file's ancestors, plus the file itself, restricted to known routes.
    /// An untracked file affects nothing.
    pub fn affected_routes(&self, file: &Path) -> FileSet {
        let mut candidates = self.graph.ancestors_of(file);
        candidates.insert(file.to_path_buf());
        candidates.retain(|path| self.graph.is_route(path));
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn output(code: &str, deps: &[&str]) -> CompileOutput {
        CompileOutput {
            server_code: format!("server:{code}"),
            client_code: format!("client:{code}"),
            css: String::new(),
            dependency_files: deps.iter().map(PathBuf::from).collect(),
        }
    }

    fn cache() -> BuildCache {
        BuildCache::new(Arc::new(DependencyGraph::new()))
    }

    #[tokio::test]
    async fn test_cache_hit_skips_build() {
        let cache = cache();
        let route = Path::new("/app/Home.tsx");
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let build = cache
                .get_or_build(route, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(output("home", &[]))
                })
                .await
                .unwrap();
            assert_eq!(build.server_code, "server:home");
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(cache.contains(route));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_build_records_dependencies() {
        let cache = cache();
        let route = Path::new("/app/Home.tsx");

        let build = cache
            .get_or_build(route, || async {
                Ok(output("home", &["/app/Card.tsx", "/app/Button.tsx"]))
            })
            .await
            .unwrap();

        assert_eq!(build.dependencies.len(), 3);
        assert!(build.dependencies.contains(route));

        let graph = cache.graph();
        assert!(graph.is_route(route));
        assert!(
            graph
                .direct_parents_of(Path::new("/app/Button.tsx"))
                .contains(route)
        );
        assert_eq!(
            cache.affected_routes(Path::new("/app/Card.tsx")),
            [route.to_path_buf()].into_iter().collect::<FileSet>()
        );
        assert_eq!(
            cache.affected_routes(route),
            [route.to_path_buf()].into_iter().collect::<FileSet>()
        );
    }

    #[tokio::test]
    async fn test_rebuild_replaces_stale_edges() {
        let cache = cache();
        let route = Path::new("/app/Home.tsx");

        cache
            .get_or_build(route, || async { Ok(output("v1", &["/app/Old.tsx"])) })
            .await
            .unwrap();
        assert!(cache.invalidate(route));
        cache
            .get_or_build(route, || async { Ok(output("v2", &["/app/New.tsx"])) })
            .await
            .unwrap();

        assert!(cache.affected_routes(Path::new("/app/Old.tsx")).is_empty());
        assert_eq!(cache.affected_routes(Path::new("/app/New.tsx")).len(), 1);
    }

    #[tokio::test]
    async fn test_failure_is_not_cached() {
        let cache = cache();
        let route = Path::new("/app/Broken.tsx");

        let err = cache
            .get_or_build(route, || async {
                Err(CompileError::Failed {
                    entry: route.to_path_buf(),
                    message: "Unexpected token".to_string(),
                })
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Unexpected token"));
        assert!(!cache.contains(route));
        assert!(!cache.graph().is_route(route));

        let build = cache
            .get_or_build(route, || async { Ok(output("fixed", &[])) })
            .await
            .unwrap();
        assert_eq!(build.client_code, "client:fixed");
    }

    #[tokio::test]
    async fn test_finished_failure_is_never_handed_out() {
        let cache = cache();
        let route = Path::new("/app/Broken.tsx");

        // State between a failed attempt finishing and its eviction
        let failed = CompileError::Failed {
            entry: route.to_path_buf(),
            message: "Unexpected token".to_string(),
        };
        cache.entries.insert(
            route.to_path_buf(),
            Arc::new(OnceCell::new_with(Some(Err(failed)))),
        );

        let calls = AtomicUsize::new(0);
        let build = cache
            .get_or_build(route, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(output("fixed", &[]))
            })
            .await
            .unwrap();

        assert_eq!(build.server_code, "server:fixed");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(cache.contains(route));
    }

    #[tokio::test]
    async fn test_invalidate() {
        let cache = cache();
        let home = Path::new("/app/Home.tsx");
        let about = Path::new("/app/About.tsx");

        assert!(!cache.invalidate(home));

        for route in [home, about] {
            cache
                .get_or_build(route, || async { Ok(output("x", &[])) })
                .await
                .unwrap();
        }

        assert!(cache.invalidate(home));
        assert!(!cache.contains(home));
        assert!(cache.contains(about));
        // Still known to the graph after eviction
        assert!(cache.graph().is_route(home));

        assert_eq!(cache.invalidate_all(), 1);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_invalidate_during_build_is_not_stored() {
        let cache = Arc::new(cache());
        let route = PathBuf::from("/app/Home.tsx");
        let (started_tx, started_rx) = tokio::sync::oneshot::channel();
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();

        let in_flight = {
            let cache = Arc::clone(&cache);
            let route = route.clone();
            tokio::spawn(async move {
                cache
                    .get_or_build(&route, || async move {
                        let _ = started_tx.send(());
                        let _ = release_rx.await;
                        Ok(output("stale", &[]))
                    })
                    .await
            })
        };

        started_rx.await.unwrap();
        assert!(cache.invalidate(&route));
        release_tx.send(()).unwrap();

        let stale = in_flight.await.unwrap().unwrap();
        assert_eq!(stale.server_code, "server:stale");
        assert!(!cache.contains(&route));

        let fresh = cache
            .get_or_build(&route, || async { Ok(output("fresh", &[])) })
            .await
            .unwrap();
        assert_eq!(fresh.server_code, "server:fresh");
    }
}
