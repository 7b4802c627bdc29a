//! Task graph and build pipeline
//!
//! Every unit of work (cleaning an output, compiling styles, bundling
//! scripts, rewriting HTML, zipping) is a [`BuildTarget`] that names the
//! targets it waits for. A [`BuildPlan`] collects them; [`BuildPipeline`]
//! runs the plan in dependency waves.
//!
//! # Example
//!
//! ```no_run
//! use frontpipe::build::{create_prod_plan, BuildContext, BuildPipeline};
//! use frontpipe::config::load_config;
//!
//! let loaded = load_config(None)?;
//! let context = BuildContext::new(loaded.config, loaded.project_root);
//! let plan = create_prod_plan(&context);
//!
//! let result = BuildPipeline::new(context).build(&plan)?;
//! println!("{}", result.summary());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod context;
pub mod pipeline;
pub mod plan;
pub mod progress;
pub mod result;
pub mod target;

pub use context::*;
pub use pipeline::*;
pub use plan::*;
pub use progress::{NullProgress, ProgressEvent, ProgressReporter, TracingProgress};
pub use result::*;
pub use target::*;
