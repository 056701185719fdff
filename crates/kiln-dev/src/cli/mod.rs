//! Command-line interface definition for kiln.
//!
//! # Command Structure
//!
//! - `kiln dev` - Watch the frontend and push reload signals to browsers
//! - `kiln build` - Compile one route through the build cache and report it


use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// kiln - development pipeline for server-rendered React pages
#[derive(Parser, Debug)]
#[command(
    name = "kiln",
    version,
    about = "Development pipeline for server-rendered React pages",
    long_about = "kiln compiles route entry files on demand, tracks which source files\n\
                  each route depends on, and reloads only the browsers viewing routes\n\
                  affected by a change."
)]
pub struct Cli {
    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available kiln subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start development mode
    ///
    /// Watches the frontend directory, evicts stale route builds and tells
    /// connected browsers to reload.
    Dev(DevArgs),

    /// Compile a single route and print a summary
    ///
    /// Useful for checking compiler configuration and inspecting which files
    /// a route depends on.
    Build(BuildArgs),
}

/// Arguments for the dev command
#[derive(Args, Debug)]
pub struct DevArgs {
    /// Port for the reload websocket server
    ///
    /// Overrides `hotReloadPort` from the config file.
    #[arg(short, long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Frontend directory to watch
    #[arg(long, value_name = "DIR")]
    pub frontend_dir: Option<PathBuf>,

    /// Path to kiln.config.json
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Working directory for the project
    #[arg(long, value_name = "DIR")]
    pub cwd: Option<PathBuf>,
}

/// Arguments for the build command
#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Route entry file, relative to the project root
    #[arg(value_name = "ROUTE")]
    pub route: PathBuf,

    /// Props passed to the route component, as JSON
    #[arg(long, default_value = "{}", value_name = "JSON")]
    pub props: String,

    /// Print the summary as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Path to kiln.config.json
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Working directory for the project
    #[arg(long, value_name = "DIR")]
    pub cwd: Option<PathBuf>,
}
