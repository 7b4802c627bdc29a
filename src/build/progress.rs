//! Build progress reporting.
//!
//! The pipeline emits [`ProgressEvent`]s as targets start and finish.
//! [`TracingProgress`] turns them into task-runner style log lines:
//!
//! ```text
//! Starting 'styles:prod'...
//! Finished 'styles:prod' after 412 ms
//! ```

use crate::build::BuildStatus;

/// Events that can be reported during a build.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Build process started
    BuildStarted {
        /// Total number of targets in the plan
        total_targets: usize,
    },
    /// A target started executing
    TargetStarted {
        /// Target identifier
        target_id: String,
    },
    /// A target finished, was skipped, or failed
    TargetCompleted {
        /// Target identifier
        target_id: String,
        /// Build status
        status: BuildStatus,
        /// Duration in milliseconds
        duration_ms: u64,
    },
    /// Build process completed
    BuildCompleted {
        /// Whether the overall build succeeded
        success: bool,
        /// Total duration in milliseconds
        duration_ms: u64,
        /// Number of successful targets
        succeeded: usize,
        /// Number of skipped targets
        skipped: usize,
        /// Number of failed targets
        failed: usize,
    },
}

/// Trait for progress reporters.
///
/// Targets of one wave run on several threads, so reporters must be
/// shareable.
pub trait ProgressReporter: Send + Sync {
    /// Report a progress event.
    fn report(&self, event: ProgressEvent);
}

/// A progress reporter that discards all events.
#[derive(Debug, Default)]
pub struct NullProgress;

impl NullProgress {
    /// Create a new null progress reporter.
    pub fn new() -> Self {
        Self
    }
}

impl ProgressReporter for NullProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Progress reporter that logs through `tracing`.
#[derive(Debug, Default)]
pub struct TracingProgress;

impl TracingProgress {
    pub fn new() -> Self {
        Self
    }
}

impl ProgressReporter for TracingProgress {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::BuildStarted { total_targets } => {
                tracing::debug!(total_targets, "build started");
            }
            ProgressEvent::TargetStarted { target_id } => {
                tracing::info!("Starting '{}'...", target_id);
            }
            ProgressEvent::TargetCompleted { target_id, status, duration_ms } => match status {
                BuildStatus::Success => {
                    tracing::info!("Finished '{}' after {}", target_id, format_duration(duration_ms));
                }
                BuildStatus::Skipped(reason) => {
                    tracing::warn!("Skipped '{}': {}", target_id, reason);
                }
                BuildStatus::Failed(err) => {
                    tracing::error!(
                        "'{}' errored after {}: {}",
                        target_id,
                        format_duration(duration_ms),
                        err
                    );
                }
            },
            ProgressEvent::BuildCompleted { success, duration_ms, succeeded, skipped, failed } => {
                if success {
                    tracing::debug!(succeeded, skipped, "build finished in {}", format_duration(duration_ms));
                } else {
                    tracing::error!(succeeded, skipped, failed, "build failed");
                }
            }
        }
    }
}

/// Format a duration the way task runners print them.
pub fn format_duration(ms: u64) -> String {
    if ms < 1000 {
        format!("{} ms", ms)
    } else if ms < 60_000 {
        format!("{:.2} s", ms as f64 / 1000.0)
    } else {
        let minutes = ms / 60_000;
        let seconds = (ms % 60_000) / 1000;
        format!("{} min {} s", minutes, seconds)
    }
}
