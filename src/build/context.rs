//! Build context containing configuration and state for a build.

use crate::config::FrontpipeConfig;
use crate::naming::{BuildMode, OutputName, SessionNames};
use crate::scripts::ScriptOptions;
use crate::styles::StyleOptions;
use std::path::{Path, PathBuf};

/// Build context containing configuration and paths for a build operation.
///
/// The context owns the session's random names, so every target that reads
/// them through the same context agrees on them.
#[derive(Debug, Clone)]
pub struct BuildContext {
    /// The loaded configuration
    config: FrontpipeConfig,
    /// Project root directory (where frontpipe.toml is located)
    project_root: PathBuf,
    /// Cache-busting names for this invocation
    names: SessionNames,
}

impl BuildContext {
    /// Create a new build context with freshly generated session names.
    pub fn new(config: FrontpipeConfig, project_root: PathBuf) -> Self {
        Self { config, project_root, names: SessionNames::generate() }
    }

    /// Get the configuration.
    pub fn config(&self) -> &FrontpipeConfig {
        &self.config
    }

    /// Get the project root directory.
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Session names shared by the prod targets.
    pub fn names(&self) -> &SessionNames {
        &self.names
    }

    /// Replace the session names.
    pub fn with_names(mut self, names: SessionNames) -> Self {
        self.names = names;
        self
    }

    /// Resolve a path relative to the project root.
    ///
    /// If the path is absolute, returns it unchanged.
    /// If relative, joins it with the project root.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        crate::config::loader::resolve_path(&self.project_root, path)
    }

    /// Get the source directory (resolved to absolute path).
    pub fn src_dir(&self) -> PathBuf {
        self.resolve_path(&self.config.project.src)
    }

    /// Get the output directory (resolved to absolute path).
    pub fn out_dir(&self) -> PathBuf {
        self.resolve_path(&self.config.project.out)
    }

    /// Staging directory that gets zipped.
    pub fn intermediate_dir(&self) -> PathBuf {
        self.out_dir().join(&self.config.project.intermediate)
    }

    /// Path of the deployment archive.
    pub fn archive_path(&self) -> PathBuf {
        self.out_dir().join(&self.config.project.archive)
    }

    /// Sass source directory.
    pub fn styles_src_dir(&self) -> PathBuf {
        self.src_dir().join(&self.config.styles.dir)
    }

    /// Style output directory for the given mode.
    pub fn styles_out_dir(&self, mode: BuildMode) -> PathBuf {
        match mode {
            BuildMode::Dev => self.src_dir().join(&self.config.styles.dev_out),
            BuildMode::Prod => self.intermediate_dir().join(&self.config.styles.prod_out),
        }
    }

    /// Script bundle directory. Only prod bundles; dev serves sources as-is.
    pub fn scripts_out_dir(&self) -> PathBuf {
        self.intermediate_dir().join(&self.config.scripts.prod_out)
    }

    /// HTML template read by the rewrite.
    pub fn html_template(&self) -> PathBuf {
        self.src_dir().join(&self.config.html.template)
    }

    /// Rewritten HTML written into the staging directory.
    pub fn html_dest(&self) -> PathBuf {
        let file = self.config.html.template.file_name().map(PathBuf::from).unwrap_or_default();
        self.intermediate_dir().join(file)
    }

    /// Rename rule for the given mode and session name.
    fn output_name(mode: BuildMode, name: &str) -> OutputName {
        match mode {
            BuildMode::Dev => OutputName::dev(),
            BuildMode::Prod => OutputName::prod(name),
        }
    }

    /// Style pipeline options for the given mode.
    pub fn style_options(&self, mode: BuildMode) -> StyleOptions {
        let styles = &self.config.styles;
        StyleOptions {
            browsers: styles.browsers.clone(),
            sourcemap: styles.sourcemap,
            main: styles.main.clone(),
            name: Self::output_name(mode, &self.names.css),
        }
    }

    /// Script pipeline options for the given mode.
    pub fn script_options(&self, mode: BuildMode) -> ScriptOptions {
        let scripts = &self.config.scripts;
        ScriptOptions {
            sources: scripts.sources.clone(),
            bundle: scripts.bundle.clone(),
            sourcemap: scripts.sourcemap,
            name: Self::output_name(mode, &self.names.js),
        }
    }

    /// Worker threads per wave.
    pub fn jobs(&self) -> usize {
        self.config
            .build
            .jobs
            .unwrap_or_else(|| std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> BuildContext {
        BuildContext::new(FrontpipeConfig::default(), PathBuf::from("/project"))
    }

    #[test]
    fn test_build_context_new() {
        let ctx = context();
        assert_eq!(ctx.project_root(), Path::new("/project"));
        assert_eq!(ctx.names().css.len(), 5);
    }

    #[test]
    fn test_default_layout() {
        let ctx = context();
        assert_eq!(ctx.src_dir(), PathBuf::from("/project/src"));
        assert_eq!(ctx.intermediate_dir(), PathBuf::from("/project/build/intermediate"));
        assert_eq!(ctx.archive_path(), PathBuf::from("/project/build/deploy.zip"));
        assert_eq!(ctx.styles_src_dir(), PathBuf::from("/project/src/sass"));
        assert_eq!(ctx.styles_out_dir(BuildMode::Dev), PathBuf::from("/project/src/css"));
        assert_eq!(
            ctx.styles_out_dir(BuildMode::Prod),
            PathBuf::from("/project/build/intermediate/css")
        );
        assert_eq!(ctx.scripts_out_dir(), PathBuf::from("/project/build/intermediate/js"));
        assert_eq!(ctx.html_template(), PathBuf::from("/project/src/index.html"));
        assert_eq!(ctx.html_dest(), PathBuf::from("/project/build/intermediate/index.html"));
    }

    #[test]
    fn test_absolute_paths_untouched() {
        let mut config = FrontpipeConfig::default();
        config.project.out = PathBuf::from("/tmp/dist");
        let ctx = BuildContext::new(config, PathBuf::from("/project"));
        assert_eq!(ctx.archive_path(), PathBuf::from("/tmp/dist/deploy.zip"));
    }

    #[test]
    fn test_options_use_session_names() {
        let names = SessionNames { css: "Css01".to_string(), js: "Js002".to_string() };
        let ctx = context().with_names(names);

        assert_eq!(ctx.style_options(BuildMode::Prod).name, OutputName::prod("Css01"));
        assert_eq!(ctx.script_options(BuildMode::Prod).name, OutputName::prod("Js002"));
        assert_eq!(ctx.style_options(BuildMode::Dev).name, OutputName::dev());
    }

    #[test]
    fn test_jobs_from_config() {
        let mut config = FrontpipeConfig::default();
        config.build.jobs = Some(3);
        assert_eq!(BuildContext::new(config, PathBuf::from("/p")).jobs(), 3);
        assert!(context().jobs() >= 1);
    }
}
