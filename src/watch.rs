//! Watch mode for the dev pipeline
//!
//! Watches the project root and sorts each debounced change into one of two
//! reactions: Sass sources trigger a style rebuild, while HTML, scripts and
//! compiled CSS trigger a browser reload. Rules are globs relative to the
//! project root, taken from the `[watch]` section or derived from the layout.

use crate::config::FrontpipeConfig;
use glob::{MatchOptions, Pattern};
use notify::RecursiveMode;
use notify_debouncer_mini::{new_debouncer, DebouncedEventKind};
use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;
use std::time::Duration;
use thiserror::Error;

/// Error during watch mode
#[derive(Debug, Error)]
pub enum WatchError {
    /// Failed to initialize file watcher
    #[error("Failed to initialize file watcher: {0}")]
    WatcherInit(notify::Error),
    /// Failed to add watch path
    #[error("Failed to watch path: {0}")]
    WatchPath(notify::Error),
    /// A watch rule is not a valid glob
    #[error("Invalid watch pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },
    /// Channel receive error
    #[error("Watch channel error: {0}")]
    Channel(String),
    /// Watched directory not found
    #[error("Watch root not found: {}", .0.display())]
    RootNotFound(PathBuf),
}

/// What a changed file asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchAction {
    /// Recompile the dev stylesheets
    RebuildStyles,
    /// Tell connected browsers that this project-relative path changed
    Reload(String),
    /// Not covered by any rule
    Ignore,
}

/// Reactions collected from one debounced batch of events.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct WatchBatch {
    pub rebuild_styles: bool,
    /// Changed paths, relative to the project root, without duplicates
    pub reload: Vec<String>,
}

impl WatchBatch {
    pub fn is_empty(&self) -> bool {
        !self.rebuild_styles && self.reload.is_empty()
    }
}

/// Callbacks invoked by [`watch_project`].
pub trait WatchHandler {
    /// Sass sources changed.
    fn rebuild_styles(&mut self);

    /// Files matched by the reload rules changed.
    fn reload(&mut self, paths: &[String]);
}

/// Compiled watch rules.
#[derive(Debug, Clone)]
pub struct WatchRules {
    root: PathBuf,
    canonical_root: Option<PathBuf>,
    styles: Vec<Pattern>,
    reload: Vec<Pattern>,
}

const MATCH_OPTIONS: MatchOptions =
    MatchOptions { case_sensitive: true, require_literal_separator: true, require_literal_leading_dot: false };

fn compile(patterns: &[String]) -> Result<Vec<Pattern>, WatchError> {
    patterns
        .iter()
        .map(|p| {
            Pattern::new(p).map_err(|e| WatchError::InvalidPattern {
                pattern: p.clone(),
                message: e.to_string(),
            })
        })
        .collect()
}

impl WatchRules {
    /// Compile the rules of `config` for a project rooted at `root`.
    pub fn new(root: &Path, config: &FrontpipeConfig) -> Result<Self, WatchError> {
        Ok(Self {
            root: root.to_path_buf(),
            canonical_root: root.canonicalize().ok(),
            styles: compile(&config.watch_styles())?,
            reload: compile(&config.watch_reload())?,
        })
    }

    /// Project root the rules are relative to.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path relative to the project root, `/`-separated.
    ///
    /// Returns `None` for paths outside the project.
    pub fn relative(&self, path: &Path) -> Option<String> {
        let rel = if path.is_absolute() {
            path.strip_prefix(&self.root)
                .ok()
                .or_else(|| self.canonical_root.as_ref().and_then(|r| path.strip_prefix(r).ok()))?
        } else {
            path
        };
        Some(rel.to_string_lossy().replace('\\', "/"))
    }

    /// Decide what a change to `path` asks for.
    ///
    /// Style rules win over reload rules when both match.
    pub fn classify(&self, path: &Path) -> WatchAction {
        let Some(rel) = self.relative(path) else {
            return WatchAction::Ignore;
        };

        if self.styles.iter().any(|p| p.matches_with(&rel, MATCH_OPTIONS)) {
            WatchAction::RebuildStyles
        } else if self.reload.iter().any(|p| p.matches_with(&rel, MATCH_OPTIONS)) {
            WatchAction::Reload(rel)
        } else {
            WatchAction::Ignore
        }
    }

    /// Classify a batch: at most one style rebuild, each reload path once.
    pub fn batch<'a, I>(&self, paths: I) -> WatchBatch
    where
        I: IntoIterator<Item = &'a Path>,
    {
        let mut batch = WatchBatch::default();
        for path in paths {
            match self.classify(path) {
                WatchAction::RebuildStyles => batch.rebuild_styles = true,
                WatchAction::Reload(rel) => {
                    if !batch.reload.contains(&rel) {
                        batch.reload.push(rel);
                    }
                }
                WatchAction::Ignore => {}
            }
        }
        batch
    }
}

/// Watch the project root and dispatch changes to `handler`.
///
/// Blocks until the process is terminated. Errors from the watcher itself
/// are logged and watching continues; only setup failures and a closed
/// event channel end the loop.
pub fn watch_project<H: WatchHandler>(
    rules: &WatchRules,
    debounce_ms: u32,
    handler: &mut H,
) -> Result<(), WatchError> {
    let root = rules.root();
    if !root.is_dir() {
        return Err(WatchError::RootNotFound(root.to_path_buf()));
    }

    let (tx, rx) = channel();
    let debounce = Duration::from_millis(u64::from(debounce_ms));
    let mut debouncer = new_debouncer(debounce, tx).map_err(WatchError::WatcherInit)?;
    debouncer.watcher().watch(root, RecursiveMode::Recursive).map_err(WatchError::WatchPath)?;

    tracing::info!("Watching {} for changes...", root.display());

    loop {
        match rx.recv() {
            Ok(Ok(events)) => {
                let batch = rules.batch(
                    events
                        .iter()
                        .filter(|e| matches!(e.kind, DebouncedEventKind::Any))
                        .map(|e| e.path.as_path()),
                );
                if batch.is_empty() {
                    continue;
                }

                if batch.rebuild_styles {
                    tracing::debug!("style sources changed");
                    handler.rebuild_styles();
                }
                if !batch.reload.is_empty() {
                    for path in &batch.reload {
                        tracing::info!("Changed: {}", path);
                    }
                    handler.reload(&batch.reload);
                }
            }
            Ok(Err(error)) => {
                tracing::warn!("Watch error: {:?}", error);
            }
            Err(e) => return Err(WatchError::Channel(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn rules() -> WatchRules {
        WatchRules::new(Path::new("/project"), &FrontpipeConfig::default()).unwrap()
    }

    #[test]
    fn test_classify_style_sources() {
        let rules = rules();
        assert_eq!(rules.classify(Path::new("/project/src/sass/main.scss")), WatchAction::RebuildStyles);
        assert_eq!(
            rules.classify(Path::new("/project/src/sass/partials/_grid.scss")),
            WatchAction::RebuildStyles
        );
    }

    #[test]
    fn test_classify_reload_targets() {
        let rules = rules();
        assert_eq!(
            rules.classify(Path::new("/project/src/index.html")),
            WatchAction::Reload("src/index.html".to_string())
        );
        assert_eq!(
            rules.classify(Path::new("/project/src/pages/about.html")),
            WatchAction::Reload("src/pages/about.html".to_string())
        );
        assert_eq!(
            rules.classify(Path::new("/project/src/js/app/nav.js")),
            WatchAction::Reload("src/js/app/nav.js".to_string())
        );
        assert_eq!(
            rules.classify(Path::new("/project/src/css/main.css")),
            WatchAction::Reload("src/css/main.css".to_string())
        );
    }

    #[test]
    fn test_classify_ignored() {
        let rules = rules();
        assert_eq!(rules.classify(Path::new("/project/src/css/vendor/x.css")), WatchAction::Ignore);
        assert_eq!(rules.classify(Path::new("/project/src/css/main.min.css.map")), WatchAction::Ignore);
        assert_eq!(rules.classify(Path::new("/project/build/intermediate/index.html")), WatchAction::Ignore);
        assert_eq!(rules.classify(Path::new("/elsewhere/src/index.html")), WatchAction::Ignore);
    }

    #[test]
    fn test_relative_paths_pass_through() {
        assert_eq!(
            rules().classify(Path::new("src/js/main.js")),
            WatchAction::Reload("src/js/main.js".to_string())
        );
    }

    #[test]
    fn test_batch_dedupes() {
        let rules = rules();
        let paths = [
            Path::new("/project/src/sass/a.scss"),
            Path::new("/project/src/sass/b.scss"),
            Path::new("/project/src/index.html"),
            Path::new("/project/src/index.html"),
            Path::new("/project/README.md"),
        ];

        let batch = rules.batch(paths);
        assert!(batch.rebuild_styles);
        assert_eq!(batch.reload, vec!["src/index.html"]);
        assert!(!batch.is_empty());
        assert!(rules.batch([Path::new("/project/README.md")]).is_empty());
    }

    #[test]
    fn test_rules_follow_custom_layout() {
        let mut config = FrontpipeConfig::default();
        config.project.src = PathBuf::from("web");
        config.styles.dir = PathBuf::from("scss");
        config.styles.dev_out = PathBuf::from("assets");
        let rules = WatchRules::new(Path::new("/project"), &config).unwrap();

        assert_eq!(rules.classify(Path::new("/project/web/scss/main.scss")), WatchAction::RebuildStyles);
        assert_eq!(
            rules.classify(Path::new("/project/web/js/app.js")),
            WatchAction::Reload("web/js/app.js".to_string())
        );
        assert_eq!(
            rules.classify(Path::new("/project/web/assets/main.css")),
            WatchAction::Reload("web/assets/main.css".to_string())
        );
        assert_eq!(rules.classify(Path::new("/project/src/sass/main.scss")), WatchAction::Ignore);
    }

    #[test]
    fn test_invalid_pattern() {
        let mut config = FrontpipeConfig::default();
        config.watch.styles = Some(vec!["src/[".to_string()]);
        let err = WatchRules::new(Path::new("/project"), &config).unwrap_err();
        assert!(matches!(err, WatchError::InvalidPattern { .. }));
    }

    #[test]
    fn test_watch_missing_root() {
        struct Noop;
        impl WatchHandler for Noop {
            fn rebuild_styles(&mut self) {}
            fn reload(&mut self, _paths: &[String]) {}
        }

        let temp = TempDir::new().unwrap();
        let rules = WatchRules::new(&temp.path().join("gone"), &FrontpipeConfig::default()).unwrap();
        let result = watch_project(&rules, 50, &mut Noop);
        assert!(matches!(result, Err(WatchError::RootNotFound(_))));
    }
}
