//! Hot reload engine.
//!
//! Owns the dependency graph, the build cache and the broadcaster for the
//! lifetime of development mode and wires them together:
//!
//! ```text
//! watcher ──► classifier ──► graph ──► cache eviction ──► broadcaster
//!                                                             │
//!   render request ◄── cache (compile on miss) ◄── reload ◄───┘
//! ```

use crate::collab::{
    CommandCompiler, CommandStyleBuilder, Compiler, NoopStyleBuilder, StyleBuilder,
};
use crate::dev::{
    BuildCache, ChangeClassifier, DevConfig, FileChange, FileWatcher, ReloadBroadcaster,
    ReloadScope, ReloadServer, RouteBuild, debounce,
};
use crate::error::{CompileError, Result};
use kiln_graph::{DependencyGraph, FileSet, normalize_path_from};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Background activities started by [`HotReloadEngine::start`].
#[derive(Debug)]
pub struct EngineTasks {
    /// Consumes watcher events until the watcher fails or shuts down
    pub watch: JoinHandle<()>,
    /// Accepts reload websocket connections
    pub server: JoinHandle<()>,
    /// Address the reload server is listening on
    pub reload_addr: SocketAddr,
}

/// Development-mode pipeline: cache, watcher and reload broadcast.
pub struct HotReloadEngine {
    config: DevConfig,
    graph: Arc<DependencyGraph>,
    cache: Arc<BuildCache>,
    broadcaster: Arc<ReloadBroadcaster>,
    classifier: ChangeClassifier,
    compiler: Arc<dyn Compiler>,
    styles: Arc<dyn StyleBuilder>,
}

impl std::fmt::Debug for HotReloadEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HotReloadEngine")
            .field("config", &self.config)
            .field("cached_routes", &self.cache.len())
            .field("clients", &self.broadcaster.client_count())
            .finish_non_exhaustive()
    }
}

impl HotReloadEngine {
    /// Create an engine around the given collaborators.
    pub fn new(
        config: DevConfig,
        compiler: Arc<dyn Compiler>,
        styles: Arc<dyn StyleBuilder>,
    ) -> Arc<Self> {
        let graph = Arc::new(DependencyGraph::new());
        Arc::new(Self {
            classifier: ChangeClassifier::from_config(&config),
            cache: Arc::new(BuildCache::new(Arc::clone(&graph))),
            broadcaster: Arc::new(ReloadBroadcaster::new()),
            graph,
            compiler,
            styles,
            config,
        })
    }

    /// Create an engine that shells out to the configured bundler and
    /// stylesheet commands.
    pub fn with_commands(config: DevConfig) -> Arc<Self> {
        let compiler = Arc::new(CommandCompiler::new(&config.compiler, &config.root));
        let styles: Arc<dyn StyleBuilder> = match (&config.stylesheet, &config.global_css_file) {
            (Some(stylesheet), Some(input)) => {
                Arc::new(CommandStyleBuilder::new(stylesheet, input, &config.root))
            }
            _ => Arc::new(NoopStyleBuilder),
        };
        Self::new(config, compiler, styles)
    }

    pub fn config(&self) -> &DevConfig {
        &self.config
    }

    pub fn graph(&self) -> &Arc<DependencyGraph> {
        &self.graph
    }

    pub fn cache(&self) -> &Arc<BuildCache> {
        &self.cache
    }

    pub fn broadcaster(&self) -> &Arc<ReloadBroadcaster> {
        &self.broadcaster
    }

    /// Normalized identity of a route entry given relative to the project root.
    pub fn route_path(&self, route: &Path) -> PathBuf {
        normalize_path_from(route, &self.config.root)
    }

    /// Return the build for `route`, compiling it on a cache miss.
    ///
    /// `props` is only used when a compile actually runs.
    pub async fn build_route(
        &self,
        route: &Path,
        props: &str,
    ) -> std::result::Result<Arc<RouteBuild>, CompileError> {
        let route = self.route_path(route);
        let entry = route.clone();
        let compiler = Arc::clone(&self.compiler);
        self.cache
            .get_or_build(&route, move || async move { compiler.compile(&entry, props).await })
            .await
    }

    /// Classify a change and evict every cache entry it makes stale.
    ///
    /// Returns the routes whose browsers should reload, or `None` if the
    /// event was aborted because the global stylesheet failed to rebuild.
    pub async fn process_change(&self, path: &Path) -> Option<FileSet> {
        let plan = self.classifier.classify(path);
        tracing::debug!("Classified {} as {:?}", path.display(), plan.kinds);

        if plan.rebuild_styles {
            if let Err(e) = self.styles.rebuild_global_stylesheet().await {
                tracing::error!("Failed to rebuild global stylesheet: {}", e);
                return None;
            }
        }

        let ancestors = self.graph.ancestors_of(path);
        let routes = match plan.scope {
            ReloadScope::AllRoutes => {
                self.cache.invalidate_all();
                self.graph.all_known_routes()
            }
            ReloadScope::Affected => {
                let routes = self.cache.affected_routes(path);
                self.cache.invalidate_many(ancestors.iter().chain(routes.iter()));
                routes
            }
        };

        Some(routes)
    }

    /// Handle one watcher event end to end.
    ///
    /// Broadcast happens on its own task so the watch loop never waits on
    /// slow connections. The handle is returned for callers that want to.
    pub async fn react_to_change(&self, change: &FileChange) -> Option<JoinHandle<usize>> {
        let path = change.path();
        tracing::info!("File changed: {}", path.display());

        let routes = self.process_change(path).await?;
        if routes.is_empty() {
            tracing::debug!("No cached route depends on {}", path.display());
            return None;
        }

        tracing::info!("Reloading {} route(s)", routes.len());
        let broadcaster = Arc::clone(&self.broadcaster);
        Some(tokio::spawn(async move { broadcaster.broadcast(&routes).await }))
    }

    /// Start the watch loop and the reload server.
    ///
    /// # Errors
    ///
    /// Returns error if the reload server cannot bind. Watcher failures are
    /// logged by the watch task and never fail startup.
    pub async fn start(self: &Arc<Self>) -> Result<EngineTasks> {
        let server = ReloadServer::bind(self.config.addr(), Arc::clone(&self.broadcaster)).await?;
        let reload_addr = server.local_addr()?;

        let server = tokio::spawn(async move {
            if let Err(e) = server.serve().await {
                tracing::error!("Reload server stopped: {}", e);
            }
        });

        Ok(EngineTasks {
            watch: self.spawn_watch_loop(),
            server,
            reload_addr,
        })
    }

    /// Spawn only the watch loop.
    pub fn spawn_watch_loop(self: &Arc<Self>) -> JoinHandle<()> {
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            let root = engine.config.frontend_dir.clone();
            let (watcher, changes) = match FileWatcher::new(root) {
                Ok(pair) => pair,
                Err(e) => {
                    tracing::error!("Hot reload disabled: {}", e);
                    return;
                }
            };
            let mut changes =
                debounce(changes, Duration::from_millis(engine.config.debounce_ms));

            tracing::info!("Watching for changes in {}", watcher.root().display());
            while let Some(change) = changes.recv().await {
                engine.react_to_change(&change).await;
            }
            tracing::debug!("Watch loop ended");
        })
    }
}
