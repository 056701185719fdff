//! `kiln dev`: watch the frontend and reload affected browsers.
//!
//! Startup binds the reload server before anything is watched so that a
//! port conflict fails the command instead of silently disabling reload.

use crate::cli::DevArgs;
use crate::commands::utils;
use crate::config::ConfigOverrides;
use crate::dev::{CLIENT_SCRIPT_PATH, EngineTasks, HotReloadEngine};
use crate::error::{Result, ResultExt};
use crate::ui;
use std::sync::Arc;
use tokio::signal;

/// Execute the dev command.
///
/// # Errors
///
/// Returns errors for invalid configuration and for a reload port that
/// cannot be bound. Compile and watcher failures are reported but keep the
/// command running.
pub async fn execute(args: DevArgs) -> Result<()> {
    let cwd = utils::working_dir(args.cwd.as_deref())?;
    let overrides = ConfigOverrides {
        frontend_dir: args.frontend_dir,
        hot_reload_port: args.port,
        cwd: None,
    };
    let config = utils::load_dev_config(&overrides, args.config.as_deref(), &cwd)?;

    ui::info(&format!("Project root: {}", config.root.display()));
    ui::info(&format!("Frontend: {}", config.frontend_dir.display()));

    let engine = HotReloadEngine::with_commands(config);
    let mut tasks = start_engine(&engine).await?;

    ui::success(&format!(
        "Reload server on ws://{}/ws (client script: http://{}{})",
        tasks.reload_addr, tasks.reload_addr, CLIENT_SCRIPT_PATH
    ));
    ui::info("Press Ctrl+C to stop");

    tokio::select! {
        _ = signal::ctrl_c() => {
            ui::info("Shutting down...");
        }
        _ = &mut tasks.server => {
            ui::warning("Reload server stopped unexpectedly");
        }
        _ = &mut tasks.watch => {
            ui::warning("File watching stopped; restart kiln dev to resume hot reload");
            // Renders still work; wait for the user to stop us
            let _ = signal::ctrl_c().await;
        }
    }

    tasks.watch.abort();
    tasks.server.abort();
    ui::success("Development mode stopped");
    Ok(())
}

/// Start the engine, pointing at `--port` when the reload port is taken.
async fn start_engine(engine: &Arc<HotReloadEngine>) -> Result<EngineTasks> {
    let port = engine.config().hot_reload_port;
    engine.start().await.with_hint(format!(
        "Port {port} may already be in use; pass --port to pick another"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KilnConfig;
    use crate::dev::DevConfig;
    use std::path::Path;

    #[tokio::test]
    async fn test_taken_port_suggests_port_flag() {
        let taken = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = taken.local_addr().unwrap().port();

        let config = KilnConfig {
            hot_reload_port: port,
            ..KilnConfig::default_config()
        };
        let engine =
            HotReloadEngine::with_commands(DevConfig::from_config(&config, Path::new("/app")));

        let err = start_engine(&engine).await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Failed to bind"), "{message}");
        assert!(message.contains(&format!("Hint: Port {port} may already be in use")));
    }
}
