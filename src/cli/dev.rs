//! Dev command implementation
//!
//! Compiles styles once, then runs the static server, the LiveReload server
//! and the watcher until the process is interrupted.

use std::io;
use std::process::ExitCode;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::oneshot;

use super::{EXIT_ERROR, EXIT_SUCCESS};
use crate::build::{create_dev_plan, BuildContext, BuildPipeline, BuildPlan, TracingProgress};
use crate::server::{self, livereload_router, static_router, LiveReload, ServerError};
use crate::watch::{watch_project, WatchError, WatchHandler, WatchRules};

#[derive(Debug, Error)]
enum DevError {
    #[error("Failed to start async runtime: {0}")]
    Runtime(#[source] io::Error),
    #[error(transparent)]
    Server(#[from] ServerError),
    #[error(transparent)]
    Watch(#[from] WatchError),
    #[error("Watcher thread stopped unexpectedly")]
    WatcherGone,
}

/// Reacts to file changes: rebuilds dev styles, notifies browsers.
struct DevWatcher {
    pipeline: BuildPipeline,
    plan: BuildPlan,
    livereload: LiveReload,
}

impl DevWatcher {
    /// Run the dev plan. Failures are logged; returns whether it succeeded.
    fn build_styles(&self) -> bool {
        match self.pipeline.build(&self.plan) {
            Ok(result) if result.is_success() => true,
            Ok(result) => {
                tracing::error!("{}", result.summary());
                false
            }
            Err(e) => {
                tracing::error!("{}", e);
                false
            }
        }
    }
}

impl WatchHandler for DevWatcher {
    fn rebuild_styles(&mut self) {
        self.build_styles();
    }

    fn reload(&mut self, paths: &[String]) {
        let clients = self.livereload.changed(paths);
        tracing::debug!(clients, "reload sent");
    }
}

async fn serve_dev(context: &BuildContext, watcher: DevWatcher) -> Result<(), DevError> {
    let config = context.config();
    let livereload = watcher.livereload.clone();

    let static_listener = server::bind(&config.server.host, config.server.port).await?;
    let livereload_listener = server::bind(&config.server.host, config.livereload.port).await?;

    let static_app = static_router(&context.src_dir(), config.livereload.port);
    let livereload_app = livereload_router(livereload);

    let mut static_task =
        tokio::spawn(server::serve(static_listener, static_app, "Static server"));
    let mut livereload_task =
        tokio::spawn(server::serve(livereload_listener, livereload_app, "LiveReload server"));

    // notify's channel is blocking, so the watch loop gets its own thread.
    let rules = WatchRules::new(context.project_root(), config)?;
    let debounce_ms = config.watch.debounce_ms;
    let (done_tx, done_rx) = oneshot::channel();
    std::thread::spawn(move || {
        let mut watcher = watcher;
        let _ = done_tx.send(watch_project(&rules, debounce_ms, &mut watcher));
    });

    tokio::select! {
        watched = done_rx => match watched {
            Ok(result) => result.map_err(DevError::from),
            Err(_) => Err(DevError::WatcherGone),
        },
        served = &mut static_task => flatten(served),
        served = &mut livereload_task => flatten(served),
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Stopping");
            Ok(())
        }
    }
}

fn flatten(joined: Result<Result<(), ServerError>, tokio::task::JoinError>) -> Result<(), DevError> {
    match joined {
        Ok(result) => result.map_err(DevError::from),
        Err(e) => Err(DevError::Server(ServerError::Serve(io::Error::other(e)))),
    }
}

/// Run the dev pipeline
pub fn run_dev(context: BuildContext) -> ExitCode {
    let watcher = DevWatcher {
        pipeline: BuildPipeline::new(context.clone()).with_reporter(Arc::new(TracingProgress::new())),
        plan: create_dev_plan(&context),
        livereload: LiveReload::new(),
    };

    // A broken stylesheet should not keep the server from starting.
    if !watcher.build_styles() {
        tracing::warn!("Initial style build failed; fix the sources and save to retry");
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: {}", DevError::Runtime(e));
            return ExitCode::from(EXIT_ERROR);
        }
    };

    match runtime.block_on(serve_dev(&context, watcher)) {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}
