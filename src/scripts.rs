//! Script pipeline
//!
//! Concatenates the script sources into one bundle, minifies it, renames it
//! and writes a sourcemap that points each chunk back at its source file.

use crate::naming::OutputName;
use glob::{glob, Pattern};
use minify_js::{minify, Session, TopLevelMode};
use sourcemap::SourceMapBuilder;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error raised by the script pipeline.
#[derive(Debug, Error)]
pub enum ScriptError {
    /// Invalid glob pattern
    #[error("Invalid glob pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },
    /// No sources matched
    #[error("No script sources matched {0:?}")]
    NoSources(Vec<String>),
    /// Source failed to parse during minification
    #[error("Minification failed for {}: {message}", file.display())]
    Minify { file: PathBuf, message: String },
    /// Sourcemap serialization failed
    #[error("Failed to write sourcemap: {0}")]
    SourceMap(#[from] sourcemap::Error),
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Settings for one run of the script pipeline.
#[derive(Debug, Clone)]
pub struct ScriptOptions {
    /// Glob patterns relative to the source directory
    pub sources: Vec<String>,
    /// Bundle file name before renaming (e.g. `index.js`)
    pub bundle: String,
    /// Write a sourcemap next to the bundle
    pub sourcemap: bool,
    /// Rename applied to the minified bundle
    pub name: OutputName,
}

/// Files written by the script pipeline.
#[derive(Debug, Clone)]
pub struct ScriptOutput {
    pub bundle: PathBuf,
    pub map: Option<PathBuf>,
    pub sources: Vec<PathBuf>,
}

impl ScriptOutput {
    /// All files written.
    pub fn files(&self) -> Vec<PathBuf> {
        let mut files = vec![self.bundle.clone()];
        files.extend(self.map.clone());
        files
    }
}

/// Resolve script sources, sorted and deduplicated.
///
/// Files that are already minified (`*.min.js`) are skipped so a bundle
/// written into the source tree never feeds back into itself.
pub fn discover_scripts(src_dir: &Path, patterns: &[String]) -> Result<Vec<PathBuf>, ScriptError> {
    let mut files = BTreeSet::new();
    let base = Pattern::escape(&src_dir.to_string_lossy());

    for pattern in patterns {
        let full = format!("{}/{}", base, pattern);
        let paths = glob(&full).map_err(|e| ScriptError::InvalidPattern {
            pattern: pattern.clone(),
            message: e.to_string(),
        })?;

        for path in paths.filter_map(Result::ok) {
            let minified = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.ends_with(".min.js"))
                .unwrap_or(false);
            if path.is_file() && !minified {
                files.insert(path);
            }
        }
    }

    Ok(files.into_iter().collect())
}

/// Minify a single script.
pub fn minify_source(file: &Path, source: &str) -> Result<String, ScriptError> {
    let session = Session::new();
    let mut out = Vec::new();
    minify(&session, TopLevelMode::Global, source.as_bytes(), &mut out).map_err(|e| {
        ScriptError::Minify { file: file.to_path_buf(), message: format!("{:?}", e) }
    })?;
    Ok(String::from_utf8_lossy(&out).into_owned())
}

/// Concatenated, minified bundle with its sourcemap.
#[derive(Debug, Clone)]
pub struct Bundle {
    pub code: String,
    pub map: Option<String>,
}

/// Minify each source and join the results, one chunk per line group.
///
/// Each source is `(name, path, contents)`; `name` is what the sourcemap
/// records, `path` is only used for error messages.
pub fn bundle_sources(
    sources: &[(String, PathBuf, String)],
    file_name: &str,
    sourcemap: bool,
) -> Result<Bundle, ScriptError> {
    let mut code = String::new();
    let mut builder = SourceMapBuilder::new(Some(file_name));
    let mut line: u32 = 0;

    for (name, path, source) in sources {
        let chunk = minify_source(path, source)?;
        if chunk.is_empty() {
            continue;
        }

        if sourcemap {
            let src_id = builder.add_source(name);
            builder.set_source_contents(src_id, Some(source));
            builder.add_raw(line, 0, 0, 0, Some(src_id), None);
        }

        code.push_str(&chunk);
        if !chunk.ends_with(';') {
            code.push(';');
        }
        code.push('\n');
        line += 1 + chunk.matches('\n').count() as u32;
    }

    let map = if sourcemap {
        let mut buf = Vec::new();
        builder.into_sourcemap().to_writer(&mut buf)?;
        Some(String::from_utf8_lossy(&buf).into_owned())
    } else {
        None
    };

    Ok(Bundle { code, map })
}

/// Run the script pipeline: discover, bundle, minify, rename, write.
pub fn build_scripts(
    src_dir: &Path,
    out_dir: &Path,
    options: &ScriptOptions,
) -> Result<ScriptOutput, ScriptError> {
    let files = discover_scripts(src_dir, &options.sources)?;
    if files.is_empty() {
        return Err(ScriptError::NoSources(options.sources.clone()));
    }

    let mut sources = Vec::with_capacity(files.len());
    for file in &files {
        let name = file
            .strip_prefix(src_dir)
            .unwrap_or(file)
            .to_string_lossy()
            .replace('\\', "/");
        sources.push((name, file.clone(), fs::read_to_string(file)?));
    }

    let bundle_path = Path::new(&options.bundle);
    let stem = bundle_path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    let out_name = options.name.apply(&stem, "js");

    tracing::debug!(count = files.len(), bundle = %out_name, "bundling scripts");
    let bundle = bundle_sources(&sources, &out_name, options.sourcemap)?;

    fs::create_dir_all(out_dir)?;
    let out_path = out_dir.join(&out_name);
    let map_path = match &bundle.map {
        Some(map) => {
            let map_name = format!("{}.map", out_name);
            let map_path = out_dir.join(&map_name);
            fs::write(&map_path, map)?;
            fs::write(&out_path, format!("{}//# sourceMappingURL={}\n", bundle.code, map_name))?;
            Some(map_path)
        }
        None => {
            fs::write(&out_path, &bundle.code)?;
            None
        }
    };

    Ok(ScriptOutput { bundle: out_path, map: map_path, sources: files })
}
