//! Development-mode pipeline.
//!
//! Keeps per-route build artifacts in sync with their sources:
//! - Build cache with single-flight compiles per route
//! - File watching with change classification
//! - Browser reload over websockets, scoped to affected routes

pub mod broadcast;
pub mod cache;
pub mod classify;
pub mod config;
pub mod engine;
pub mod server;
pub mod watcher;

// Re-exports
pub use broadcast::{CONNECTED, ClientId, RELOAD, ReloadBroadcaster, ReloadTransport, route_key};
pub use cache::{BuildCache, RouteBuild};
pub use classify::{ChangeClassifier, ChangeKind, ChangePlan, Flow, ReloadScope};
pub use config::DevConfig;
pub use engine::{EngineTasks, HotReloadEngine};
pub use server::{CLIENT_SCRIPT_PATH, ReloadServer, WS_PATH};
pub use watcher::{FileChange, FileWatcher, debounce, is_generated_path};
