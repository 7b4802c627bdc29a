//! Build pipeline orchestration.
//!
//! The pipeline runs a [`BuildPlan`] wave by wave. Targets inside a wave
//! have no dependencies on each other and run concurrently on a rayon pool;
//! the next wave starts once the whole wave has finished.

use crate::build::progress::{NullProgress, ProgressEvent, ProgressReporter};
use crate::build::{
    BuildContext, BuildOrderError, BuildPlan, BuildResult, BuildTarget, TargetKind, TargetResult,
};
use crate::html::{prod_replacements, rewrite_html, HtmlError};
use crate::package::{clean_path, zip_directory, PackageError};
use crate::scripts::{build_scripts, ScriptError};
use crate::styles::{build_styles, StyleError};
use rayon::prelude::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

/// Error during build execution.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Build order error (circular or unknown dependencies)
    #[error("Build order error: {0}")]
    BuildOrder(#[from] BuildOrderError),
    /// Worker pool could not be created
    #[error("Failed to start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error(transparent)]
    Styles(#[from] StyleError),
    #[error(transparent)]
    Scripts(#[from] ScriptError),
    #[error(transparent)]
    Html(#[from] HtmlError),
    #[error(transparent)]
    Package(#[from] PackageError),
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Target is missing something it needs
    #[error("Build error: {0}")]
    Build(String),
}

/// Build pipeline for executing build plans.
pub struct BuildPipeline {
    /// Build context
    context: BuildContext,
    /// Whether to stop after the first failing wave
    fail_fast: bool,
    /// Whether to do a dry run (don't actually build)
    dry_run: bool,
    /// Worker threads per wave
    jobs: usize,
    /// Receives progress events
    reporter: Arc<dyn ProgressReporter>,
}

impl BuildPipeline {
    /// Create a new build pipeline.
    ///
    /// `fail_fast` and the worker count come from the `[build]` section.
    pub fn new(context: BuildContext) -> Self {
        let fail_fast = context.config().build.fail_fast;
        let jobs = context.jobs();
        Self { context, fail_fast, dry_run: false, jobs, reporter: Arc::new(NullProgress) }
    }

    /// Set fail-fast mode (stop after the first failing wave).
    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Set dry-run mode (report every target skipped, touch nothing).
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Set the number of worker threads.
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Set the progress reporter.
    pub fn with_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Get the build context.
    pub fn context(&self) -> &BuildContext {
        &self.context
    }

    /// Run a build plan.
    pub fn build(&self, plan: &BuildPlan) -> Result<BuildResult, BuildError> {
        let start = Instant::now();
        let levels = plan.levels()?;
        let pool = rayon::ThreadPoolBuilder::new().num_threads(self.jobs).build()?;

        self.reporter.report(ProgressEvent::BuildStarted { total_targets: plan.len() });
        tracing::debug!(targets = plan.len(), waves = levels.len(), jobs = self.jobs, "build plan");

        let mut result = BuildResult::new();
        // Targets that failed or were skipped because of a failure.
        let mut broken: HashSet<String> = HashSet::new();
        let mut halted = false;

        for level in levels {
            let mut runnable = Vec::with_capacity(level.len());
            for target in level {
                let reason = if halted {
                    Some("build stopped after an earlier failure".to_string())
                } else {
                    target
                        .dependencies
                        .iter()
                        .find(|dep| broken.contains(dep.as_str()))
                        .map(|dep| format!("prerequisite '{}' did not complete", dep))
                };

                match reason {
                    Some(reason) => {
                        broken.insert(target.id.clone());
                        result.add_result(self.skip(target, reason));
                    }
                    None => runnable.push(target),
                }
            }

            let wave: Vec<TargetResult> =
                pool.install(|| runnable.par_iter().map(|t| self.execute_target(t)).collect());

            for target_result in wave {
                if target_result.status.is_failure() {
                    broken.insert(target_result.target_id.clone());
                    halted |= self.fail_fast;
                }
                result.add_result(target_result);
            }
        }

        result.total_duration = start.elapsed();
        self.reporter.report(ProgressEvent::BuildCompleted {
            success: result.is_success(),
            duration_ms: result.total_duration.as_millis() as u64,
            succeeded: result.success_count(),
            skipped: result.skipped_count(),
            failed: result.failed_count(),
        });

        Ok(result)
    }

    fn skip(&self, target: &BuildTarget, reason: String) -> TargetResult {
        let skipped = TargetResult::skipped(target.id.clone(), reason);
        self.reporter.report(ProgressEvent::TargetCompleted {
            target_id: skipped.target_id.clone(),
            status: skipped.status.clone(),
            duration_ms: 0,
        });
        skipped
    }

    /// Execute a single build target.
    fn execute_target(&self, target: &BuildTarget) -> TargetResult {
        if self.dry_run {
            return self.skip(target, "dry run".to_string());
        }

        self.reporter.report(ProgressEvent::TargetStarted { target_id: target.id.clone() });
        let start = Instant::now();

        let build_result = match target.kind {
            TargetKind::Clean => self.run_clean(target),
            TargetKind::Styles => self.run_styles(target),
            TargetKind::Scripts => self.run_scripts(target),
            TargetKind::Html => self.run_html(target),
            TargetKind::Package => self.run_package(target),
        };

        let duration = start.elapsed();
        let target_result = match build_result {
            Ok(outputs) => TargetResult::success(target.id.clone(), outputs, duration),
            Err(e) => TargetResult::failed(target.id.clone(), e.to_string(), duration),
        };

        self.reporter.report(ProgressEvent::TargetCompleted {
            target_id: target.id.clone(),
            status: target_result.status.clone(),
            duration_ms: duration.as_millis() as u64,
        });
        target_result
    }

    fn run_clean(&self, target: &BuildTarget) -> Result<Vec<PathBuf>, BuildError> {
        let removed = clean_path(&target.output)?;
        if removed {
            tracing::debug!(path = %target.output.display(), "removed");
            Ok(vec![target.output.clone()])
        } else {
            Ok(vec![])
        }
    }

    fn run_styles(&self, target: &BuildTarget) -> Result<Vec<PathBuf>, BuildError> {
        let options = self.context.style_options(target.mode);
        let outputs = build_styles(first_source(target)?, &target.output, &options)?;
        Ok(outputs.iter().flat_map(|o| o.files()).collect())
    }

    fn run_scripts(&self, target: &BuildTarget) -> Result<Vec<PathBuf>, BuildError> {
        let options = self.context.script_options(target.mode);
        let output = build_scripts(first_source(target)?, &target.output, &options)?;
        Ok(output.files())
    }

    fn run_html(&self, target: &BuildTarget) -> Result<Vec<PathBuf>, BuildError> {
        let config = self.context.config();
        let replacements = prod_replacements(
            self.context.names(),
            &config.styles.prod_out,
            &config.scripts.prod_out,
        );
        let written = rewrite_html(
            first_source(target)?,
            &target.output,
            &replacements,
            config.html.keep_unassigned,
        )?;
        Ok(vec![written])
    }

    fn run_package(&self, target: &BuildTarget) -> Result<Vec<PathBuf>, BuildError> {
        let entries = zip_directory(first_source(target)?, &target.output)?;
        tracing::info!("Packaged {} files into {}", entries.len(), target.output.display());
        Ok(vec![target.output.clone()])
    }
}

fn first_source(target: &BuildTarget) -> Result<&Path, BuildError> {
    target
        .sources
        .first()
        .map(PathBuf::as_path)
        .ok_or_else(|| BuildError::Build(format!("target '{}' has no source", target.id)))
}
