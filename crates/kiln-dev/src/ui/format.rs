//! Formatting helpers for sizes, durations and route build summaries.

use super::colors_enabled;
use crate::dev::RouteBuild;
use console::Term;
use owo_colors::OwoColorize;
use std::path::Path;
use std::time::Duration;

/// Format a byte count with the most appropriate unit.
///
/// ```
/// use kiln_dev::ui::format_size;
///
/// assert_eq!(format_size(500), "500 B");
/// assert_eq!(format_size(1536), "1.50 KB");
/// ```
pub fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];

    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{} {}", size as u64, UNITS[unit_idx])
    } else {
        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}

/// Format a duration as `ms`, seconds or `Xm Ys`.
///
/// ```
/// use std::time::Duration;
/// use kiln_dev::ui::format_duration;
///
/// assert_eq!(format_duration(Duration::from_millis(50)), "50ms");
/// assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let total_ms = duration.as_millis();

    if total_ms < 1000 {
        format!("{}ms", total_ms)
    } else if total_ms < 60_000 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        let secs = duration.as_secs();
        format!("{}m {}s", secs / 60, secs % 60)
    }
}

/// Artifact rows shown for one route build.
fn summary_rows(build: &RouteBuild) -> [(&'static str, u64); 3] {
    [
        ("server", build.server_code.len() as u64),
        ("client", build.client_code.len() as u64),
        ("css", build.css.len() as u64),
    ]
}

/// Print a summary of a route build to stderr.
///
/// Dependency paths are shown relative to `root` when possible.
pub fn print_route_summary(build: &RouteBuild, root: &Path) {
    let width = (Term::stderr().size().1 as usize).min(80);
    let relative = |path: &Path| path.strip_prefix(root).unwrap_or(path).display().to_string();
    let color = colors_enabled();

    let title = relative(&build.route);
    if color {
        eprintln!("\n{}", title.bold().underline());
    } else {
        eprintln!("\n{}", title);
    }
    eprintln!("{}", "─".repeat(width));

    for (name, size) in summary_rows(build) {
        if color {
            eprintln!("  {} {:<8} {}", "▸".blue(), name, format_size(size).dimmed());
        } else {
            eprintln!("  ▸ {:<8} {}", name, format_size(size));
        }
    }

    eprintln!("{}", "─".repeat(width));
    eprintln!(
        "  {} dependencies, compiled in {}",
        build.dependencies.len(),
        format_duration(build.build_duration)
    );
    for dependency in &build.dependencies {
        eprintln!("    {}", relative(dependency));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_graph::FileSet;
    use std::path::PathBuf;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1023), "1023 B");
        assert_eq!(format_size(1024), "1.00 KB");
        assert_eq!(format_size(1_572_864), "1.50 MB");
        assert_eq!(format_size(2_147_483_648), "2.00 GB");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(0)), "0ms");
        assert_eq!(format_duration(Duration::from_millis(999)), "999ms");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
    }

    #[test]
    fn test_summary_rows_use_artifact_sizes() {
        let build = RouteBuild {
            route: PathBuf::from("/app/frontend/Home.tsx"),
            server_code: "x".repeat(10),
            client_code: "y".repeat(20),
            css: String::new(),
            dependencies: FileSet::default(),
            build_duration: Duration::from_millis(12),
        };

        assert_eq!(
            summary_rows(&build),
            [("server", 10), ("client", 20), ("css", 0)]
        );
        print_route_summary(&build, Path::new("/app"));
    }
}
