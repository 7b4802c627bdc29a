//! Deployment packaging and output cleanup.

use glob::glob;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Error raised while packaging.
#[derive(Debug, Error)]
pub enum PackageError {
    /// Directory to archive does not exist
    #[error("Nothing to package: {} does not exist", .0.display())]
    SourceNotFound(PathBuf),
    /// Glob pattern failed to compile
    #[error("Invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),
    /// Zip operation failed
    #[error("Zip operation failed: {0}")]
    Zip(#[from] zip::result::ZipError),
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Pattern of files picked up from the staging directory.
pub const PACKAGE_PATTERN: &str = "**/*.*";

/// Zip every file matching [`PACKAGE_PATTERN`] below `dir` into `archive`.
///
/// Entry names are relative to `dir` and `/`-separated. Returns the entry
/// names in the order they were written.
pub fn zip_directory(dir: &Path, archive: &Path) -> Result<Vec<String>, PackageError> {
    if !dir.is_dir() {
        return Err(PackageError::SourceNotFound(dir.to_path_buf()));
    }

    let pattern = format!("{}/{}", glob::Pattern::escape(&dir.to_string_lossy()), PACKAGE_PATTERN);
    let mut files: Vec<PathBuf> = glob(&pattern)?
        .filter_map(Result::ok)
        .filter(|p| p.is_file())
        .collect();
    files.sort();

    if let Some(parent) = archive.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut zip = ZipWriter::new(File::create(archive)?);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut entries = Vec::with_capacity(files.len());

    for file in files {
        let name = file
            .strip_prefix(dir)
            .unwrap_or(&file)
            .to_string_lossy()
            .replace('\\', "/");

        zip.start_file(name.as_str(), options)?;
        zip.write_all(&fs::read(&file)?)?;
        entries.push(name);
    }

    zip.finish()?;
    tracing::debug!(archive = %archive.display(), entries = entries.len(), "archive written");
    Ok(entries)
}

/// Remove a file or directory tree. Missing paths are not an error.
///
/// Returns whether anything was removed.
pub fn clean_path(path: &Path) -> io::Result<bool> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };

    if metadata.is_dir() {
        fs::remove_dir_all(path)?;
    } else {
        fs::remove_file(path)?;
    }
    Ok(true)
}
