//! Integration tests for the hot reload engine.
//!
//! A scripted compiler stands in for the bundler so that dependency lists
//! and failures are under the test's control.

use async_trait::async_trait;
use kiln_dev::collab::{CompileOutput, Compiler, NoopStyleBuilder};
use kiln_dev::config::CompilerConfig;
use kiln_dev::dev::{DevConfig, FileChange, HotReloadEngine};
use kiln_dev::error::CompileError;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;

#[derive(Default)]
struct ScriptedCompiler {
    deps: Mutex<HashMap<PathBuf, Vec<PathBuf>>>,
    failing: Mutex<Option<PathBuf>>,
    calls: AtomicUsize,
    delay: Duration,
}

impl ScriptedCompiler {
    fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    fn route(&self, route: &Path, deps: &[PathBuf]) {
        self.deps.lock().insert(route.to_path_buf(), deps.to_vec());
    }
}

#[async_trait]
impl Compiler for ScriptedCompiler {
    async fn compile(&self, entry: &Path, props: &str) -> Result<CompileOutput, CompileError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;

        if self.failing.lock().as_deref() == Some(entry) {
            return Err(CompileError::Failed {
                entry: entry.to_path_buf(),
                message: "Unexpected token".to_string(),
            });
        }

        Ok(CompileOutput {
            server_code: format!("render({})", props),
            client_code: format!("hydrate({})", entry.display()),
            css: ".a{}".to_string(),
            dependency_files: self.deps.lock().get(entry).cloned().unwrap_or_default(),
        })
    }
}

fn dev_config(root: &Path) -> DevConfig {
    DevConfig {
        root: root.to_path_buf(),
        frontend_dir: root.join("frontend"),
        layout_file: root.join("frontend/Layout.tsx"),
        global_css_file: None,
        tailwind_config: None,
        hot_reload_port: 0,
        debounce_ms: 0,
        compiler: CompilerConfig::default(),
        stylesheet: None,
    }
}

#[tokio::test]
async fn test_concurrent_requests_compile_once() {
    let compiler = Arc::new(ScriptedCompiler::slow(Duration::from_millis(50)));
    let engine = HotReloadEngine::new(
        dev_config(Path::new("/app")),
        compiler.clone(),
        Arc::new(NoopStyleBuilder),
    );

    let requests = (0..8).map(|_| {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move { engine.build_route(Path::new("frontend/Home.tsx"), "{}").await })
    });
    let builds = futures::future::join_all(requests).await;

    assert_eq!(compiler.calls.load(Ordering::SeqCst), 1);
    let first = builds[0].as_ref().unwrap().as_ref().unwrap();
    for build in &builds {
        let build = build.as_ref().unwrap().as_ref().unwrap();
        assert!(Arc::ptr_eq(first, build));
    }
}

#[tokio::test]
async fn test_concurrent_failure_reaches_every_waiter_and_is_not_cached() {
    let compiler = Arc::new(ScriptedCompiler::slow(Duration::from_millis(50)));
    *compiler.failing.lock() = Some(PathBuf::from("/app/frontend/Broken.tsx"));
    let engine = HotReloadEngine::new(
        dev_config(Path::new("/app")),
        compiler.clone(),
        Arc::new(NoopStyleBuilder),
    );

    let requests = (0..4).map(|_| {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move { engine.build_route(Path::new("frontend/Broken.tsx"), "{}").await })
    });
    for outcome in futures::future::join_all(requests).await {
        let err = outcome.unwrap().unwrap_err();
        assert!(err.to_string().contains("Unexpected token"));
    }
    assert_eq!(compiler.calls.load(Ordering::SeqCst), 1);
    assert!(!engine.cache().contains(Path::new("/app/frontend/Broken.tsx")));

    // Fixed source compiles on the next request
    *compiler.failing.lock() = None;
    engine
        .build_route(Path::new("frontend/Broken.tsx"), "{}")
        .await
        .unwrap();
    assert_eq!(compiler.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_props_only_matter_on_compile() {
    let compiler = Arc::new(ScriptedCompiler::default());
    let engine = HotReloadEngine::new(
        dev_config(Path::new("/app")),
        compiler.clone(),
        Arc::new(NoopStyleBuilder),
    );

    let first = engine
        .build_route(Path::new("frontend/Home.tsx"), r#"{"n":1}"#)
        .await
        .unwrap();
    let second = engine
        .build_route(Path::new("frontend/Home.tsx"), r#"{"n":2}"#)
        .await
        .unwrap();

    assert_eq!(second.server_code, r#"render({"n":1})"#);
    assert!(Arc::ptr_eq(&first, &second));
}

#[tokio::test]
async fn test_shared_component_change_reloads_both_routes() {
    let compiler = Arc::new(ScriptedCompiler::default());
    compiler.route(
        Path::new("/app/frontend/Home.tsx"),
        &[PathBuf::from("/app/frontend/Nav.tsx")],
    );
    compiler.route(
        Path::new("/app/frontend/About.tsx"),
        &[PathBuf::from("/app/frontend/Nav.tsx")],
    );
    compiler.route(Path::new("/app/frontend/Blog.tsx"), &[]);
    let engine = HotReloadEngine::new(
        dev_config(Path::new("/app")),
        compiler.clone(),
        Arc::new(NoopStyleBuilder),
    );
    for route in ["frontend/Home.tsx", "frontend/About.tsx", "frontend/Blog.tsx"] {
        engine.build_route(Path::new(route), "{}").await.unwrap();
    }

    let (_, mut home) = engine.broadcaster().subscribe("/app/frontend/Home.tsx");
    let (_, mut about) = engine.broadcaster().subscribe("/app/frontend/About.tsx");
    let (_, mut blog) = engine.broadcaster().subscribe("/app/frontend/Blog.tsx");

    let change = FileChange::Modified(PathBuf::from("/app/frontend/Nav.tsx"));
    let delivered = engine.react_to_change(&change).await.unwrap().await.unwrap();

    assert_eq!(delivered, 2);
    assert_eq!(home.recv().await, Some("reload"));
    assert_eq!(about.recv().await, Some("reload"));
    assert!(blog.try_recv().is_err());
    assert!(engine.cache().contains(Path::new("/app/frontend/Blog.tsx")));
    assert_eq!(engine.cache().len(), 1);

    // Rebuild after eviction compiles again
    engine
        .build_route(Path::new("frontend/Home.tsx"), "{}")
        .await
        .unwrap();
    assert_eq!(compiler.calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_watch_loop_reloads_route_after_edit() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().canonicalize().unwrap();
    let frontend = root.join("frontend");
    std::fs::create_dir_all(frontend.join("components")).unwrap();

    let route = frontend.join("Home.tsx");
    let button = frontend.join("components/Button.tsx");
    std::fs::write(&route, "export default () => <Button />").unwrap();
    std::fs::write(&button, "export const Button = () => null").unwrap();

    let compiler = Arc::new(ScriptedCompiler::default());
    compiler.route(&route, &[button.clone()]);
    let engine = HotReloadEngine::new(dev_config(&root), compiler, Arc::new(NoopStyleBuilder));
    engine.build_route(&route, "{}").await.unwrap();

    let (_, mut browser) = engine
        .broadcaster()
        .subscribe(route.to_string_lossy().into_owned());
    let watch = engine.spawn_watch_loop();
    // Let the watcher register its directories
    tokio::time::sleep(Duration::from_millis(200)).await;

    std::fs::write(&button, "export const Button = () => <button />").unwrap();

    let signal = tokio::time::timeout(Duration::from_secs(5), browser.recv())
        .await
        .expect("no reload within 5s");
    assert_eq!(signal, Some("reload"));
    assert!(!engine.cache().contains(&route));

    watch.abort();
}
