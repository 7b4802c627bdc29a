//! Configuration schema types for `frontpipe.toml`
//!
//! Defines the structure and validation rules for project configuration.
//! Every field has a default, so an empty file (or no file at all) yields
//! the stock layout: sources in `src/`, output in `build/`.

use crate::server::livereload::DEFAULT_PORT as DEFAULT_LIVERELOAD_PORT;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

/// Project layout section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project name
    #[serde(default = "default_name")]
    pub name: String,
    /// Source directory (served by the dev server)
    #[serde(default = "default_src")]
    pub src: PathBuf,
    /// Build output directory
    #[serde(default = "default_out")]
    pub out: PathBuf,
    /// Staging directory inside `out` that gets zipped
    #[serde(default = "default_intermediate")]
    pub intermediate: PathBuf,
    /// Archive file name inside `out`
    #[serde(default = "default_archive")]
    pub archive: String,
}

fn default_name() -> String {
    "frontpipe-project".to_string()
}

fn default_src() -> PathBuf {
    PathBuf::from("src")
}

fn default_out() -> PathBuf {
    PathBuf::from("build")
}

fn default_intermediate() -> PathBuf {
    PathBuf::from("intermediate")
}

fn default_archive() -> String {
    "deploy.zip".to_string()
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            src: default_src(),
            out: default_out(),
            intermediate: default_intermediate(),
            archive: default_archive(),
        }
    }
}

/// Style pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StylesConfig {
    /// Sass source directory, relative to `project.src`
    #[serde(default = "default_styles_dir")]
    pub dir: PathBuf,
    /// Dev output directory, relative to `project.src`
    #[serde(default = "default_css_dir")]
    pub dev_out: PathBuf,
    /// Prod output directory, relative to the intermediate directory
    #[serde(default = "default_css_dir")]
    pub prod_out: PathBuf,
    /// Stem of the stylesheet that receives the bare cache-busting name
    #[serde(default = "default_main_stylesheet")]
    pub main: String,
    /// Browserslist queries for vendor prefixing
    #[serde(default = "default_browsers")]
    pub browsers: Vec<String>,
    /// Emit sourcemaps for minified stylesheets
    #[serde(default = "default_true")]
    pub sourcemap: bool,
}

fn default_styles_dir() -> PathBuf {
    PathBuf::from("sass")
}

fn default_css_dir() -> PathBuf {
    PathBuf::from("css")
}

fn default_main_stylesheet() -> String {
    "main".to_string()
}

fn default_browsers() -> Vec<String> {
    vec!["last 2 versions".to_string(), "ie 8".to_string()]
}

fn default_true() -> bool {
    true
}

impl Default for StylesConfig {
    fn default() -> Self {
        Self {
            dir: default_styles_dir(),
            dev_out: default_css_dir(),
            prod_out: default_css_dir(),
            main: default_main_stylesheet(),
            browsers: default_browsers(),
            sourcemap: true,
        }
    }
}

/// Script pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptsConfig {
    /// Glob patterns for script sources, relative to `project.src`
    #[serde(default = "default_script_sources")]
    pub sources: Vec<String>,
    /// Name of the concatenated bundle before renaming
    #[serde(default = "default_bundle")]
    pub bundle: String,
    /// Prod output directory, relative to the intermediate directory
    #[serde(default = "default_js_dir")]
    pub prod_out: PathBuf,
    /// Emit sourcemaps for the minified bundle
    #[serde(default = "default_true")]
    pub sourcemap: bool,
}

fn default_script_sources() -> Vec<String> {
    vec!["js/**/*.js".to_string()]
}

fn default_bundle() -> String {
    "index.js".to_string()
}

fn default_js_dir() -> PathBuf {
    PathBuf::from("js")
}

impl Default for ScriptsConfig {
    fn default() -> Self {
        Self {
            sources: default_script_sources(),
            bundle: default_bundle(),
            prod_out: default_js_dir(),
            sourcemap: true,
        }
    }
}

/// HTML rewrite settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HtmlConfig {
    /// Template path, relative to `project.src`
    #[serde(default = "default_template")]
    pub template: PathBuf,
    /// Keep `build:*` blocks that have no replacement instead of dropping them
    #[serde(default)]
    pub keep_unassigned: bool,
}

fn default_template() -> PathBuf {
    PathBuf::from("index.html")
}

impl Default for HtmlConfig {
    fn default() -> Self {
        Self { template: default_template(), keep_unassigned: false }
    }
}

/// Static dev server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    #[serde(default = "default_host")]
    pub host: String,
    /// Bind port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    4000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: default_host(), port: default_port() }
    }
}

/// Live reload server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveReloadConfig {
    /// Port of the LiveReload protocol server
    #[serde(default = "default_livereload_port")]
    pub port: u16,
}

fn default_livereload_port() -> u16 {
    DEFAULT_LIVERELOAD_PORT
}

impl Default for LiveReloadConfig {
    fn default() -> Self {
        Self { port: default_livereload_port() }
    }
}

/// Watch mode configuration
///
/// Rules left unset follow the project layout, see
/// [`FrontpipeConfig::watch_styles`] and [`FrontpipeConfig::watch_reload`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Debounce delay in milliseconds
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u32,
    /// Globs (relative to the project root) that trigger a style rebuild
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub styles: Option<Vec<String>>,
    /// Globs (relative to the project root) that trigger a browser reload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reload: Option<Vec<String>>,
}

fn default_debounce_ms() -> u32 {
    100
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self { debounce_ms: default_debounce_ms(), styles: None, reload: None }
    }
}

/// Glob prefix for a directory below the project root, ending in `/`.
///
/// Components are escaped so directory names are matched literally.
fn layout_prefix(parts: &[&Path]) -> String {
    let mut prefix = String::new();
    for part in parts {
        for component in part.components() {
            if let Component::Normal(name) = component {
                prefix.push_str(&glob::Pattern::escape(&name.to_string_lossy()));
                prefix.push('/');
            }
        }
    }
    prefix
}

/// Task runner settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BuildConfig {
    /// Worker threads per wave (defaults to available parallelism)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jobs: Option<usize>,
    /// Stop after the first failing wave
    #[serde(default)]
    pub fail_fast: bool,
}

/// Complete frontpipe.toml configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FrontpipeConfig {
    #[serde(default)]
    pub project: ProjectConfig,
    #[serde(default)]
    pub styles: StylesConfig,
    #[serde(default)]
    pub scripts: ScriptsConfig,
    #[serde(default)]
    pub html: HtmlConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub livereload: LiveReloadConfig,
    #[serde(default)]
    pub watch: WatchConfig,
    #[serde(default)]
    pub build: BuildConfig,
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    /// Path to the invalid field (e.g., "styles.browsers")
    pub field: String,
    /// Error message
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "frontpipe.toml: '{}' {}", self.field, self.message)
    }
}

impl FrontpipeConfig {
    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();
        let mut push = |field: &str, message: &str| {
            errors.push(ConfigValidationError {
                field: field.to_string(),
                message: message.to_string(),
            });
        };

        if self.project.archive.is_empty() {
            push("project.archive", "must be a non-empty file name");
        }
        if self.styles.browsers.is_empty() {
            push("styles.browsers", "must contain at least one browserslist query");
        }
        if self.scripts.sources.is_empty() {
            push("scripts.sources", "must contain at least one glob pattern");
        }
        if !self.scripts.bundle.ends_with(".js") {
            push("scripts.bundle", "must be a .js file name");
        }
        if self.server.port != 0 && self.server.port == self.livereload.port {
            push("livereload.port", "must differ from server.port");
        }
        if self.build.jobs == Some(0) {
            push("build.jobs", "must be a positive integer");
        }

        let empty = Vec::new();
        for (field, patterns) in [
            ("scripts.sources", &self.scripts.sources),
            ("watch.styles", self.watch.styles.as_ref().unwrap_or(&empty)),
            ("watch.reload", self.watch.reload.as_ref().unwrap_or(&empty)),
        ] {
            for pattern in patterns {
                if let Err(e) = glob::Pattern::new(pattern) {
                    push(field, &format!("has an invalid glob '{}': {}", pattern, e));
                }
            }
        }

        errors
    }

    /// Check if validation passed
    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }

    /// Globs that trigger a style rebuild.
    ///
    /// Defaults to every Sass file below `project.src`/`styles.dir`.
    pub fn watch_styles(&self) -> Vec<String> {
        if let Some(patterns) = &self.watch.styles {
            return patterns.clone();
        }
        let dir = layout_prefix(&[&self.project.src, &self.styles.dir]);
        vec![format!("{}**/*.scss", dir), format!("{}**/*.sass", dir)]
    }

    /// Globs that trigger a browser reload.
    ///
    /// Defaults to HTML anywhere below `project.src`, the script sources and
    /// the compiled CSS in `styles.dev_out`.
    pub fn watch_reload(&self) -> Vec<String> {
        if let Some(patterns) = &self.watch.reload {
            return patterns.clone();
        }
        let src = layout_prefix(&[&self.project.src]);
        let mut patterns = vec![format!("{}**/*.html", src)];
        patterns.extend(self.scripts.sources.iter().map(|source| format!("{}{}", src, source)));
        patterns.push(format!("{}*.css", layout_prefix(&[&self.project.src, &self.styles.dev_out])));
        patterns
    }
}
