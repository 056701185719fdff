//! Command implementations for the kiln CLI.
//!
//! - [`dev`] - Development mode with scoped browser reload
//! - [`build`] - One-off route compile with a dependency summary
//!
//! Each command exposes an `execute` function taking its parsed arguments.

pub mod build;
pub mod dev;
pub(crate) mod utils;

pub use build::execute as build_execute;
pub use dev::execute as dev_execute;
