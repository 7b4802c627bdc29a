//! Output file naming
//!
//! Minified outputs get a `.min` suffix. Production builds also replace the
//! basename with a short random token so browsers never serve a stale cached
//! copy. The token only busts caches; it is not a secret and collisions are
//! tolerated.

use rand::distributions::Alphanumeric;
use rand::Rng;

/// Length of generated cache-busting names.
pub const RANDOM_NAME_LEN: usize = 5;

/// Alphabet the random names are drawn from.
pub const RANDOM_NAME_ALPHABET: &str =
    "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Suffix appended to every minified output.
pub const MIN_SUFFIX: &str = ".min";

/// Generate a cache-busting name of [`RANDOM_NAME_LEN`] alphanumeric characters.
pub fn generate_random_name() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(RANDOM_NAME_LEN)
        .map(char::from)
        .collect()
}

/// Random basenames for one process invocation.
///
/// Generated once when a command starts and read by every task afterwards,
/// so the stylesheet, the script bundle and the rewritten HTML agree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionNames {
    pub css: String,
    pub js: String,
}

impl SessionNames {
    pub fn generate() -> Self {
        Self { css: generate_random_name(), js: generate_random_name() }
    }
}

/// Build flavour. Decides where outputs go and how they are named.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuildMode {
    Dev,
    Prod,
}

impl std::fmt::Display for BuildMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuildMode::Dev => write!(f, "dev"),
            BuildMode::Prod => write!(f, "prod"),
        }
    }
}

/// Rename options applied to a minified output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputName {
    /// Replacement basename (prod only)
    pub basename: Option<String>,
    /// Suffix inserted between the basename and the extension
    pub suffix: String,
}

impl OutputName {
    /// Keep the source basename, add `.min`.
    pub fn dev() -> Self {
        Self { basename: None, suffix: MIN_SUFFIX.to_string() }
    }

    /// Replace the basename with `name`, add `.min`.
    pub fn prod(name: impl Into<String>) -> Self {
        Self { basename: Some(name.into()), suffix: MIN_SUFFIX.to_string() }
    }

    /// Final file name for a source with the given stem and extension.
    ///
    /// ```
    /// use frontpipe::naming::OutputName;
    ///
    /// assert_eq!(OutputName::dev().apply("main", "css"), "main.min.css");
    /// assert_eq!(OutputName::prod("Ab3xZ").apply("index", "js"), "Ab3xZ.min.js");
    /// ```
    pub fn apply(&self, stem: &str, extension: &str) -> String {
        let base = self.basename.as_deref().unwrap_or(stem);
        format!("{}{}.{}", base, self.suffix, extension)
    }
}
