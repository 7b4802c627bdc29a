//! Prod command implementation

use std::process::ExitCode;
use std::sync::Arc;

use super::{EXIT_ERROR, EXIT_SUCCESS};
use crate::build::{create_prod_plan, BuildContext, BuildPipeline, BuildPlan, TracingProgress};

/// Print the plan wave by wave.
fn print_plan(plan: &BuildPlan) -> Result<(), crate::build::BuildOrderError> {
    println!("Dry run - would build:");
    for (index, level) in plan.levels()?.iter().enumerate() {
        println!("  wave {}:", index + 1);
        for target in level {
            if target.dependencies.is_empty() {
                println!("    - {} -> {}", target.id, target.output.display());
            } else {
                println!(
                    "    - {} -> {} (after {})",
                    target.id,
                    target.output.display(),
                    target.dependencies.join(", ")
                );
            }
        }
    }
    Ok(())
}

/// Run the prod pipeline
pub fn run_prod(context: BuildContext, dry_run: bool, fail_fast: bool) -> ExitCode {
    let plan = create_prod_plan(&context);

    if dry_run {
        if let Err(e) = print_plan(&plan) {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    }

    let names = context.names();
    tracing::debug!(css = %names.css, js = %names.js, "session names");

    let mut pipeline = BuildPipeline::new(context)
        .with_dry_run(dry_run)
        .with_reporter(Arc::new(TracingProgress::new()));
    if fail_fast {
        pipeline = pipeline.with_fail_fast(true);
    }

    match pipeline.build(&plan) {
        Ok(result) => {
            println!("{}", result.summary());
            if result.is_success() {
                ExitCode::from(EXIT_SUCCESS)
            } else {
                ExitCode::from(EXIT_ERROR)
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}
