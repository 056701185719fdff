//! `kiln build`: compile one route through the build cache.

use crate::cli::BuildArgs;
use crate::commands::utils;
use crate::config::ConfigOverrides;
use crate::dev::{HotReloadEngine, RouteBuild};
use crate::error::Result;
use crate::ui;
use serde_json::json;
use std::path::Path;

/// Execute the build command.
///
/// # Errors
///
/// Returns errors for invalid configuration, a missing route file, invalid
/// props and compiler failures.
pub async fn execute(args: BuildArgs) -> Result<()> {
    let cwd = utils::working_dir(args.cwd.as_deref())?;
    let config =
        utils::load_dev_config(&ConfigOverrides::default(), args.config.as_deref(), &cwd)?;

    let engine = HotReloadEngine::with_commands(config);
    let route = engine.route_path(&args.route);
    utils::validate_route(&route)?;

    if !args.json {
        ui::info(&format!("Compiling {}", route.display()));
    }
    let build = engine.build_route(&route, &args.props).await?;

    if args.json {
        println!("{}", summary_json(&build, &engine.config().root));
    } else {
        ui::print_route_summary(&build, &engine.config().root);
        ui::success("Route compiled");
    }
    Ok(())
}

/// Machine-readable summary of a route build.
fn summary_json(build: &RouteBuild, root: &Path) -> serde_json::Value {
    let relative = |path: &Path| {
        path.strip_prefix(root)
            .unwrap_or(path)
            .to_string_lossy()
            .into_owned()
    };

    json!({
        "route": relative(&build.route),
        "serverBytes": build.server_code.len(),
        "clientBytes": build.client_code.len(),
        "cssBytes": build.css.len(),
        "durationMs": build.build_duration.as_millis() as u64,
        "dependencies": build.dependencies.iter().map(|p| relative(p)).collect::<Vec<_>>(),
    })
}
