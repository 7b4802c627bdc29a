//! Style pipeline
//!
//! Compiles a Sass source tree to CSS, vendor-prefixes it for the configured
//! browser matrix, writes a readable copy, then writes a minified and renamed
//! copy with a sourcemap next to it.
//!
//! ```text
//! sass/main.scss ──grass──► CSS ──lightningcss──► css/main.css
//!                                       │
//!                                       └──────► css/main.min.css (+ .map)
//! ```

use crate::naming::OutputName;
use glob::glob;
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use parcel_sourcemap::SourceMap;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Pattern of stylesheet entries below the style source directory.
pub const STYLE_PATTERN: &str = "**/*.s[ac]ss";

/// Error raised by the style pipeline.
#[derive(Debug, Error)]
pub enum StyleError {
    /// Style source directory does not exist
    #[error("Style source directory not found: {}", .0.display())]
    SourceNotFound(PathBuf),
    /// Invalid glob pattern
    #[error("Invalid glob pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },
    /// Two entries would write the same output files
    #[error("{} and {} both compile to {}", first.display(), second.display(), output.display())]
    DuplicateOutput { first: PathBuf, second: PathBuf, output: PathBuf },
    /// Sass compilation failed
    #[error("Sass compilation failed for {}: {message}", file.display())]
    Sass { file: PathBuf, message: String },
    /// CSS parsing, prefixing or printing failed
    #[error("CSS processing failed for {}: {message}", file.display())]
    Css { file: PathBuf, message: String },
    /// Browserslist query could not be resolved
    #[error("Invalid browser query: {0}")]
    Browsers(String),
    /// Sourcemap serialization failed
    #[error("Failed to write sourcemap for {}: {message}", file.display())]
    SourceMap { file: PathBuf, message: String },
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Settings for one run of the style pipeline.
#[derive(Debug, Clone)]
pub struct StyleOptions {
    /// Browserslist queries
    pub browsers: Vec<String>,
    /// Write a sourcemap for each minified stylesheet
    pub sourcemap: bool,
    /// Stem of the primary stylesheet
    pub main: String,
    /// Rename applied to minified outputs
    pub name: OutputName,
}

/// Files written for one stylesheet entry.
#[derive(Debug, Clone)]
pub struct StyleOutput {
    pub source: PathBuf,
    pub css: PathBuf,
    pub minified: PathBuf,
    pub map: Option<PathBuf>,
}

impl StyleOutput {
    /// All files written for this entry.
    pub fn files(&self) -> Vec<PathBuf> {
        let mut files = vec![self.css.clone(), self.minified.clone()];
        files.extend(self.map.clone());
        files
    }
}

/// Result of prefixing and minifying one stylesheet.
#[derive(Debug, Clone)]
pub struct ProcessedCss {
    pub expanded: String,
    pub minified: String,
    pub map: Option<String>,
}

/// Resolve browserslist queries into lightningcss targets.
pub fn resolve_targets(queries: &[String]) -> Result<Targets, StyleError> {
    let browsers = Browsers::from_browserslist(queries.iter().map(String::as_str))
        .map_err(|e| StyleError::Browsers(e.to_string()))?;
    Ok(Targets { browsers, ..Targets::default() })
}

/// Compile one Sass entry to expanded CSS.
///
/// The entry's own directory and `load_root` are searched for imports.
pub fn compile_sass(entry: &Path, load_root: &Path) -> Result<String, StyleError> {
    let options = grass::Options::default()
        .style(grass::OutputStyle::Expanded)
        .load_path(load_root);

    grass::from_path(entry, &options)
        .map_err(|e| StyleError::Sass { file: entry.to_path_buf(), message: e.to_string() })
}

/// Prefix and minify compiled CSS.
///
/// `filename` is recorded as the sourcemap source, so it should be the name
/// the readable copy is written under. The minified output is printed from
/// the readable copy, so the map points into that file.
pub fn process_css(
    css: &str,
    filename: &str,
    targets: Targets,
    sourcemap: bool,
) -> Result<ProcessedCss, StyleError> {
    let css_error = |message: String| StyleError::Css { file: PathBuf::from(filename), message };
    let parser_options = || ParserOptions { filename: filename.to_string(), ..ParserOptions::default() };

    let mut sheet = StyleSheet::parse(css, parser_options()).map_err(|e| css_error(e.to_string()))?;
    sheet
        .minify(MinifyOptions { targets, ..MinifyOptions::default() })
        .map_err(|e| css_error(e.to_string()))?;
    let expanded = sheet
        .to_css(PrinterOptions { targets, ..PrinterOptions::default() })
        .map_err(|e| css_error(e.to_string()))?
        .code;
    drop(sheet);

    let map_error = |e: parcel_sourcemap::SourceMapError| StyleError::SourceMap {
        file: PathBuf::from(filename),
        message: format!("{:?}", e),
    };

    let mut source_map = if sourcemap {
        let mut map = SourceMap::new("/");
        let source = map.add_source(filename);
        map.set_source_content(source as usize, &expanded).map_err(map_error)?;
        Some(map)
    } else {
        None
    };

    let minified = {
        let mut readable =
            StyleSheet::parse(&expanded, parser_options()).map_err(|e| css_error(e.to_string()))?;
        readable
            .minify(MinifyOptions { targets, ..MinifyOptions::default() })
            .map_err(|e| css_error(e.to_string()))?;
        let printed = readable
            .to_css(PrinterOptions {
                minify: true,
                targets,
                source_map: source_map.as_mut(),
                ..PrinterOptions::default()
            })
            .map_err(|e| css_error(e.to_string()))?;
        printed.code
    };

    let map = match source_map {
        Some(mut map) => Some(map.to_json(None).map_err(map_error)?),
        None => None,
    };

    Ok(ProcessedCss { expanded, minified, map })
}

fn is_partial(path: &Path) -> bool {
    path.file_name().and_then(|n| n.to_str()).map(|n| n.starts_with('_')).unwrap_or(true)
}

fn file_stem(path: &Path) -> String {
    path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default()
}

/// Find stylesheet entries below `src_dir`, sorted.
///
/// Partials (names starting with `_`) are only reachable through imports.
pub fn discover_styles(src_dir: &Path) -> Result<Vec<PathBuf>, StyleError> {
    let pattern = format!("{}/{}", glob::Pattern::escape(&src_dir.to_string_lossy()), STYLE_PATTERN);
    let paths = glob(&pattern)
        .map_err(|e| StyleError::InvalidPattern { pattern: pattern.clone(), message: e.to_string() })?;

    let mut files = Vec::new();
    for entry in paths {
        match entry {
            Ok(path) => {
                if path.is_file() && !is_partial(&path) {
                    files.push(path);
                }
            }
            Err(e) => tracing::warn!("error reading path: {}", e),
        }
    }

    files.sort();
    Ok(files)
}

/// Index of the entry that receives the bare cache-busting name.
///
/// That is the first entry whose stem is `main`, or the first entry when
/// none is.
fn primary_entry(entries: &[PathBuf], main: &str) -> usize {
    entries.iter().position(|e| file_stem(e) == main).unwrap_or(0)
}

/// Pick the rename for an entry.
///
/// With a random basename only the primary stylesheet gets the bare name;
/// the rest keep their stem as a tag so outputs never overwrite each other.
fn entry_output_name(options: &StyleOptions, stem: &str, primary: bool) -> OutputName {
    match &options.name.basename {
        Some(base) if !primary => {
            OutputName { basename: Some(format!("{}-{}", base, stem)), ..options.name.clone() }
        }
        _ => options.name.clone(),
    }
}

/// Reject entries that share a directory and stem (`main.scss` next to
/// `main.sass`).
fn check_duplicate_outputs(src_dir: &Path, entries: &[PathBuf]) -> Result<(), StyleError> {
    let mut seen: BTreeMap<PathBuf, &PathBuf> = BTreeMap::new();
    for entry in entries {
        let output = entry.strip_prefix(src_dir).unwrap_or(entry).with_extension("css");
        if let Some(first) = seen.insert(output.clone(), entry) {
            return Err(StyleError::DuplicateOutput {
                first: first.clone(),
                second: entry.clone(),
                output,
            });
        }
    }
    Ok(())
}

/// Run the style pipeline over every entry under `src_dir`.
///
/// Entries are `.scss`/`.sass` files whose names do not start with `_`.
/// Outputs mirror the entry's directory below `src_dir` inside `out_dir`.
pub fn build_styles(
    src_dir: &Path,
    out_dir: &Path,
    options: &StyleOptions,
) -> Result<Vec<StyleOutput>, StyleError> {
    if !src_dir.is_dir() {
        return Err(StyleError::SourceNotFound(src_dir.to_path_buf()));
    }

    let entries = discover_styles(src_dir)?;
    check_duplicate_outputs(src_dir, &entries)?;
    let targets = resolve_targets(&options.browsers)?;
    let primary = primary_entry(&entries, &options.main);
    let mut outputs = Vec::with_capacity(entries.len());

    for (index, entry) in entries.iter().enumerate() {
        let stem = file_stem(entry);
        let rel_dir = entry
            .parent()
            .and_then(|p| p.strip_prefix(src_dir).ok())
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let dest_dir = out_dir.join(rel_dir);
        fs::create_dir_all(&dest_dir)?;

        tracing::debug!(entry = %entry.display(), "compiling stylesheet");
        let compiled = compile_sass(entry, src_dir)?;

        let css_name = format!("{}.css", stem);
        let processed = process_css(&compiled, &css_name, targets, options.sourcemap)?;

        let css_path = dest_dir.join(&css_name);
        fs::write(&css_path, &processed.expanded)?;

        let min_name = entry_output_name(options, &stem, index == primary).apply(&stem, "css");
        let min_path = dest_dir.join(&min_name);
        let map_path = match &processed.map {
            Some(map) => {
                let map_name = format!("{}.map", min_name);
                let map_path = dest_dir.join(&map_name);
                fs::write(&map_path, map)?;
                fs::write(
                    &min_path,
                    format!("{}\n/*# sourceMappingURL={} */\n", processed.minified, map_name),
                )?;
                Some(map_path)
            }
            None => {
                fs::write(&min_path, &processed.minified)?;
                None
            }
        };

        tracing::debug!(output = %min_path.display(), "wrote stylesheet");
        outputs.push(StyleOutput {
            source: entry.clone(),
            css: css_path,
            minified: min_path,
            map: map_path,
        });
    }

    Ok(outputs)
}
