//! # kiln-graph
//!
//! File dependency graph for the kiln development pipeline.
//!
//! This crate tracks which source files each compiled route was built from and
//! answers the question the watcher asks on every change: *which routes does
//! this file feed into?* It performs no I/O and holds no async state, so it can
//! be shared freely behind an `Arc`.
//!
//! ## Architecture
//!
//! ```text
//!   Button.tsx ──► Card.tsx ──► Home.tsx (route)
//!        │                         ▲
//!        └─────────────────────────┘
//!
//!   child ──► parent  means "parent's build reads child"
//! ```
//!
//! Edges are stored in reverse (child → parents) because every query walks
//! upwards from a changed file towards the routes that depend on it.
//!
//! ## Quick Start
//!
//! ```rust
//! use kiln_graph::DependencyGraph;
//! use std::path::Path;
//!
//! let graph = DependencyGraph::new();
//! graph.record_dependency("/app/Button.tsx", "/app/Card.tsx");
//! graph.record_dependency("/app/Card.tsx", "/app/Home.tsx");
//! graph.record_route("/app/Home.tsx");
//!
//! let ancestors = graph.ancestors_of(Path::new("/app/Button.tsx"));
//! assert!(ancestors.contains(Path::new("/app/Home.tsx")));
//! ```

mod graph;
mod path;

pub use graph::{DependencyGraph, FileSet};
pub use path::{normalize_path, normalize_path_from};
