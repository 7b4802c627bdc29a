//! The two concrete pipelines.
//!
//! Dev compiles styles into the source tree so the static server picks them
//! up. Prod cleans the staging area and the archive, rebuilds every asset
//! under the session's cache-busting names and zips the result.

use crate::build::{BuildContext, BuildPlan, BuildTarget};
use crate::naming::BuildMode;

/// Plan for the dev command: `styles:dev`.
pub fn create_dev_plan(ctx: &BuildContext) -> BuildPlan {
    let mut plan = BuildPlan::new();
    plan.add_target(BuildTarget::styles(
        BuildMode::Dev,
        ctx.styles_src_dir(),
        ctx.styles_out_dir(BuildMode::Dev),
    ));
    plan
}

/// Plan for the prod command.
///
/// | target         | waits for                               |
/// |----------------|-----------------------------------------|
/// | `clean:*`      | nothing                                 |
/// | `styles:prod`  | clean:styles, clean:html, clean:archive |
/// | `scripts:prod` | clean:scripts                           |
/// | `html:replace` | clean:html                              |
/// | `package:zip`  | styles:prod, scripts:prod, html:replace |
pub fn create_prod_plan(ctx: &BuildContext) -> BuildPlan {
    let styles_out = ctx.styles_out_dir(BuildMode::Prod);
    let scripts_out = ctx.scripts_out_dir();
    let html_dest = ctx.html_dest();

    let mut plan = BuildPlan::new();
    plan.add_target(BuildTarget::clean("archive", ctx.archive_path()));
    plan.add_target(BuildTarget::clean("html", html_dest.clone()));
    plan.add_target(BuildTarget::clean("styles", styles_out.clone()));
    plan.add_target(BuildTarget::clean("scripts", scripts_out.clone()));

    plan.add_target(
        BuildTarget::styles(BuildMode::Prod, ctx.styles_src_dir(), styles_out)
            .with_dependencies(["clean:styles", "clean:html", "clean:archive"]),
    );
    plan.add_target(
        BuildTarget::scripts(BuildMode::Prod, ctx.src_dir(), scripts_out)
            .with_dependency("clean:scripts"),
    );
    plan.add_target(
        BuildTarget::html(ctx.html_template(), html_dest).with_dependency("clean:html"),
    );
    plan.add_target(
        BuildTarget::package(ctx.intermediate_dir(), ctx.archive_path())
            .with_dependencies(["styles:prod", "scripts:prod", "html:replace"]),
    );
    plan
}
