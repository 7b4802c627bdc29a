//! Frontpipe - frontend asset pipeline
//!
//! This library provides functionality to:
//! - Compile Sass, vendor-prefix and minify stylesheets
//! - Concatenate and minify scripts with sourcemaps
//! - Rewrite HTML build blocks to cache-busted asset names
//! - Package a staging directory as a zip archive
//! - Serve a source tree with live reload while watching it for changes

pub mod build;
pub mod cli;
pub mod config;
pub mod html;
pub mod logging;
pub mod naming;
pub mod package;
pub mod scripts;
pub mod server;
pub mod styles;
pub mod watch;
