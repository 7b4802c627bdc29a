//! Build target definitions.
//!
//! A build target is one task of a pipeline: a cleanup, a style or script
//! build, the HTML rewrite, or the final archive. Targets name the targets
//! that must finish before they start; together they form a [`BuildPlan`].

use crate::naming::BuildMode;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use thiserror::Error;

/// Type of build target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    /// Remove a previous output
    Clean,
    /// Compile, prefix and minify stylesheets
    Styles,
    /// Concatenate and minify scripts
    Scripts,
    /// Rewrite asset references in the HTML template
    Html,
    /// Zip the staging directory
    Package,
}

impl std::fmt::Display for TargetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetKind::Clean => write!(f, "clean"),
            TargetKind::Styles => write!(f, "styles"),
            TargetKind::Scripts => write!(f, "scripts"),
            TargetKind::Html => write!(f, "html"),
            TargetKind::Package => write!(f, "package"),
        }
    }
}

/// A build target representing work to be done.
#[derive(Debug, Clone)]
pub struct BuildTarget {
    /// Unique identifier for this target (e.g., "styles:prod")
    pub id: String,
    /// What kind of target this is
    pub kind: TargetKind,
    /// Human-readable name
    pub name: String,
    /// Which pipeline the target belongs to
    pub mode: BuildMode,
    /// Inputs (directories or files) the target reads
    pub sources: Vec<PathBuf>,
    /// Path the target writes (or removes, for cleanups)
    pub output: PathBuf,
    /// Dependencies (other target IDs that must be built first)
    pub dependencies: Vec<String>,
}

impl BuildTarget {
    fn new(
        kind: TargetKind,
        name: &str,
        mode: BuildMode,
        sources: Vec<PathBuf>,
        output: PathBuf,
    ) -> Self {
        Self {
            id: format!("{}:{}", kind, name),
            kind,
            name: name.to_string(),
            mode,
            sources,
            output,
            dependencies: vec![],
        }
    }

    /// Create a cleanup target removing `path`.
    pub fn clean(name: &str, path: PathBuf) -> Self {
        Self::new(TargetKind::Clean, name, BuildMode::Prod, vec![], path)
    }

    /// Create a style target compiling `src_dir` into `out_dir`.
    pub fn styles(mode: BuildMode, src_dir: PathBuf, out_dir: PathBuf) -> Self {
        Self::new(TargetKind::Styles, &mode.to_string(), mode, vec![src_dir], out_dir)
    }

    /// Create a script target bundling sources below `src_dir` into `out_dir`.
    pub fn scripts(mode: BuildMode, src_dir: PathBuf, out_dir: PathBuf) -> Self {
        Self::new(TargetKind::Scripts, &mode.to_string(), mode, vec![src_dir], out_dir)
    }

    /// Create the HTML rewrite target.
    pub fn html(template: PathBuf, output: PathBuf) -> Self {
        Self::new(TargetKind::Html, "replace", BuildMode::Prod, vec![template], output)
    }

    /// Create the archive target.
    pub fn package(staging: PathBuf, archive: PathBuf) -> Self {
        Self::new(TargetKind::Package, "zip", BuildMode::Prod, vec![staging], archive)
    }

    /// Add a dependency to this target.
    pub fn with_dependency(mut self, dep: impl Into<String>) -> Self {
        self.dependencies.push(dep.into());
        self
    }

    /// Add multiple dependencies to this target.
    pub fn with_dependencies<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies.extend(deps.into_iter().map(Into::into));
        self
    }
}

/// A collection of build targets with dependency information.
#[derive(Debug, Default)]
pub struct BuildPlan {
    targets: Vec<BuildTarget>,
}

impl BuildPlan {
    /// Create a new empty build plan.
    pub fn new() -> Self {
        Self { targets: vec![] }
    }

    /// Add a target to the plan.
    pub fn add_target(&mut self, target: BuildTarget) {
        self.targets.push(target);
    }

    /// Get all targets in the plan.
    pub fn targets(&self) -> &[BuildTarget] {
        &self.targets
    }

    /// Look up a target by ID.
    pub fn get(&self, id: &str) -> Option<&BuildTarget> {
        self.targets.iter().find(|t| t.id == id)
    }

    /// Get the number of targets in the plan.
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Check if the plan is empty.
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Check that every dependency names a target in the plan.
    pub fn check_dependencies(&self) -> Result<(), BuildOrderError> {
        for target in &self.targets {
            for dep in &target.dependencies {
                if self.get(dep).is_none() {
                    return Err(BuildOrderError::UnknownDependency {
                        target: target.id.clone(),
                        dependency: dep.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Get targets in build order (respecting dependencies).
    ///
    /// Returns targets sorted so that dependencies come before dependents.
    /// Returns an error if there are circular or unknown dependencies.
    pub fn build_order(&self) -> Result<Vec<&BuildTarget>, BuildOrderError> {
        self.check_dependencies()?;

        let mut result = Vec::new();
        let mut visited = HashSet::new();
        let mut visiting = HashSet::new();

        for target in &self.targets {
            self.visit_target(target, &mut visited, &mut visiting, &mut result)?;
        }

        Ok(result)
    }

    fn visit_target<'a>(
        &'a self,
        target: &'a BuildTarget,
        visited: &mut HashSet<String>,
        visiting: &mut HashSet<String>,
        result: &mut Vec<&'a BuildTarget>,
    ) -> Result<(), BuildOrderError> {
        if visited.contains(&target.id) {
            return Ok(());
        }

        if visiting.contains(&target.id) {
            return Err(BuildOrderError::CyclicDependency(target.id.clone()));
        }

        visiting.insert(target.id.clone());

        for dep_id in &target.dependencies {
            if let Some(dep) = self.get(dep_id) {
                self.visit_target(dep, visited, visiting, result)?;
            }
        }

        visiting.remove(&target.id);
        visited.insert(target.id.clone());
        result.push(target);

        Ok(())
    }

    /// Group targets into waves.
    ///
    /// Every dependency of a target in wave `n` lives in a wave before `n`,
    /// so the targets of one wave may run concurrently. Within a wave,
    /// targets keep their plan order.
    pub fn levels(&self) -> Result<Vec<Vec<&BuildTarget>>, BuildOrderError> {
        let ordered = self.build_order()?;
        let mut depth: HashMap<&str, usize> = HashMap::new();

        // build_order puts dependencies first, so one pass suffices.
        for target in &ordered {
            let level = target
                .dependencies
                .iter()
                .filter_map(|d| depth.get(d.as_str()))
                .map(|d| d + 1)
                .max()
                .unwrap_or(0);
            depth.insert(target.id.as_str(), level);
        }

        let count = depth.values().copied().max().map(|m| m + 1).unwrap_or(0);
        let mut levels: Vec<Vec<&BuildTarget>> = vec![Vec::new(); count];
        for target in &self.targets {
            if let Some(&level) = depth.get(target.id.as_str()) {
                levels[level].push(target);
            }
        }

        Ok(levels)
    }
}

/// Error during build order calculation.
#[derive(Debug, Error)]
pub enum BuildOrderError {
    /// Circular dependency detected
    #[error("Circular dependency detected involving target '{0}'")]
    CyclicDependency(String),
    /// Dependency names a target that is not in the plan
    #[error("Target '{target}' depends on unknown target '{dependency}'")]
    UnknownDependency { target: String, dependency: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clean(name: &str) -> BuildTarget {
        BuildTarget::clean(name, PathBuf::from(format!("build/{}", name)))
    }

    #[test]
    fn test_target_kind_display() {
        assert_eq!(TargetKind::Clean.to_string(), "clean");
        assert_eq!(TargetKind::Styles.to_string(), "styles");
        assert_eq!(TargetKind::Scripts.to_string(), "scripts");
        assert_eq!(TargetKind::Html.to_string(), "html");
        assert_eq!(TargetKind::Package.to_string(), "package");
    }

    #[test]
    fn test_target_ids() {
        let styles =
            BuildTarget::styles(BuildMode::Prod, PathBuf::from("src/sass"), PathBuf::from("css"));
        assert_eq!(styles.id, "styles:prod");
        assert_eq!(styles.mode, BuildMode::Prod);
        assert_eq!(clean("archive").id, "clean:archive");
        assert_eq!(
            BuildTarget::html(PathBuf::from("src/index.html"), PathBuf::from("out.html")).id,
            "html:replace"
        );
        assert_eq!(BuildTarget::package(PathBuf::from("stage"), PathBuf::from("a.zip")).id, "package:zip");
    }

    #[test]
    fn test_build_order_dependencies_first() {
        let mut plan = BuildPlan::new();
        plan.add_target(
            BuildTarget::package(PathBuf::from("stage"), PathBuf::from("a.zip"))
                .with_dependency("clean:styles"),
        );
        plan.add_target(clean("styles"));

        let order = plan.build_order().unwrap();
        assert_eq!(order[0].id, "clean:styles");
        assert_eq!(order[1].id, "package:zip");
    }

    #[test]
    fn test_build_order_cycle() {
        let mut plan = BuildPlan::new();
        plan.add_target(clean("a").with_dependency("clean:b"));
        plan.add_target(clean("b").with_dependency("clean:a"));

        assert!(matches!(plan.build_order(), Err(BuildOrderError::CyclicDependency(_))));
    }

    #[test]
    fn test_build_order_unknown_dependency() {
        let mut plan = BuildPlan::new();
        plan.add_target(clean("a").with_dependency("clean:ghost"));

        let err = plan.build_order().unwrap_err();
        assert!(err.to_string().contains("clean:ghost"));
    }

    #[test]
    fn test_levels_group_independent_targets() {
        let mut plan = BuildPlan::new();
        plan.add_target(clean("a"));
        plan.add_target(clean("b"));
        plan.add_target(clean("c").with_dependencies(["clean:a", "clean:b"]));
        plan.add_target(clean("d").with_dependency("clean:c"));
        plan.add_target(clean("e").with_dependency("clean:a"));

        let levels = plan.levels().unwrap();
        let ids: Vec<Vec<&str>> =
            levels.iter().map(|l| l.iter().map(|t| t.id.as_str()).collect()).collect();
        assert_eq!(
            ids,
            vec![vec!["clean:a", "clean:b"], vec!["clean:c", "clean:e"], vec!["clean:d"]]
        );
    }

    #[test]
    fn test_levels_empty_plan() {
        assert!(BuildPlan::new().levels().unwrap().is_empty());
    }
}
