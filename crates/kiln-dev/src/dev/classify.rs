//! Classification of source changes.
//!
//! A change is run through an ordered rule list. Every matching rule adds its
//! effect to the plan and then either stops evaluation or lets the next rule
//! look at the same change:
//!
//! | # | Matches                                   | Effect                       | Flow     |
//! |---|-------------------------------------------|------------------------------|----------|
//! | 1 | the layout template                       | reload all known routes      | Stop     |
//! | 2 | the global stylesheet                     | rebuild styles, reload all   | Stop     |
//! | 3 | a script file while utility CSS is active | rebuild styles               | Continue |
//! | 4 | anything                                  | reload affected routes       | Stop     |

use crate::dev::DevConfig;
use std::path::{Path, PathBuf};

/// Extensions whose class names can feed a utility-CSS build.
const STYLE_SOURCE_EXTENSIONS: &[&str] = &["tsx", "ts", "jsx", "js"];

/// What a rule recognised a changed file as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// Shared layout wrapping every route
    Layout,
    /// Stylesheet included by every route
    GlobalStylesheet,
    /// Script that may add or remove utility classes
    StyleSource,
    /// Any other file
    Component,
}

/// Whether evaluation continues after a rule matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Stop,
    Continue,
}

/// Which routes a change reloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadScope {
    /// Every route known to the graph
    AllRoutes,
    /// Routes that transitively depend on the changed file
    Affected,
}

#[derive(Debug, Clone, Copy)]
struct Rule {
    kind: ChangeKind,
    rebuild_styles: bool,
    scope: Option<ReloadScope>,
    flow: Flow,
}

const RULES: &[Rule] = &[
    Rule {
        kind: ChangeKind::Layout,
        rebuild_styles: false,
        scope: Some(ReloadScope::AllRoutes),
        flow: Flow::Stop,
    },
    Rule {
        kind: ChangeKind::GlobalStylesheet,
        rebuild_styles: true,
        scope: Some(ReloadScope::AllRoutes),
        flow: Flow::Stop,
    },
    Rule {
        kind: ChangeKind::StyleSource,
        rebuild_styles: true,
        scope: None,
        flow: Flow::Continue,
    },
    Rule {
        kind: ChangeKind::Component,
        rebuild_styles: false,
        scope: Some(ReloadScope::Affected),
        flow: Flow::Stop,
    },
];

/// Outcome of classifying one change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangePlan {
    /// Rules that matched, in evaluation order
    pub kinds: Vec<ChangeKind>,
    /// Rebuild the global stylesheet before invalidating anything
    pub rebuild_styles: bool,
    /// Routes to evict and reload
    pub scope: ReloadScope,
}

/// Maps a changed path to a [`ChangePlan`].
#[derive(Debug, Clone)]
pub struct ChangeClassifier {
    layout_file: PathBuf,
    global_css_file: Option<PathBuf>,
    utility_css: bool,
}

impl ChangeClassifier {
    /// `utility_css` enables rule 3; it is set when a Tailwind config is present.
    pub fn new(layout_file: PathBuf, global_css_file: Option<PathBuf>, utility_css: bool) -> Self {
        Self {
            layout_file,
            global_css_file,
            utility_css,
        }
    }

    pub fn from_config(config: &DevConfig) -> Self {
        Self::new(
            config.layout_file.clone(),
            config.global_css_file.clone(),
            config.tailwind_config.is_some(),
        )
    }

    fn matches(&self, kind: ChangeKind, path: &Path) -> bool {
        match kind {
            ChangeKind::Layout => path == self.layout_file.as_path(),
            ChangeKind::GlobalStylesheet => self.global_css_file.as_deref() == Some(path),
            ChangeKind::StyleSource => {
                self.utility_css
                    && path
                        .extension()
                        .and_then(|ext| ext.to_str())
                        .is_some_and(|ext| STYLE_SOURCE_EXTENSIONS.contains(&ext))
            }
            ChangeKind::Component => true,
        }
    }

    /// Run `path` through the rule list.
    pub fn classify(&self, path: &Path) -> ChangePlan {
        let mut kinds = Vec::new();
        let mut rebuild_styles = false;
        let mut scope = ReloadScope::Affected;

        for rule in RULES.iter().filter(|rule| self.matches(rule.kind, path)) {
            kinds.push(rule.kind);
            rebuild_styles |= rule.rebuild_styles;
            if let Some(rule_scope) = rule.scope {
                scope = rule_scope;
            }
            if rule.flow == Flow::Stop {
                break;
            }
        }

        ChangePlan {
            kinds,
            rebuild_styles,
            scope,
        }
    }
}
