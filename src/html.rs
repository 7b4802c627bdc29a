//! HTML reference rewriting
//!
//! The HTML template marks replaceable regions with build blocks:
//!
//! ```html
//! <!-- build:css -->
//! <link rel="stylesheet" href="css/main.css">
//! <!-- endbuild -->
//! ```
//!
//! For production the `css` and `js` blocks are swapped for tags pointing at
//! the cache-busted files. Blocks without a replacement are dropped unless
//! `keep_unassigned` is set.

use crate::naming::SessionNames;
use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;

/// Error raised while rewriting HTML.
#[derive(Debug, Error)]
pub enum HtmlError {
    /// Template does not exist
    #[error("HTML template not found: {}", .0.display())]
    TemplateNotFound(PathBuf),
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn block_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?s)([ \t]*)<!--\s*build:([A-Za-z0-9_-]+)\s*-->.*?<!--\s*endbuild\s*-->")
            .expect("build block pattern is valid")
    })
}

/// Stylesheet link tag.
pub fn css_tag(href: &str) -> String {
    format!(r#"<link rel="stylesheet" href="{}">"#, href)
}

/// Script tag.
pub fn js_tag(src: &str) -> String {
    format!(r#"<script src="{}"></script>"#, src)
}

/// URL path of a file relative to the site root, always `/`-separated.
fn url_path(dir: &Path, file: &str) -> String {
    let dir = dir.to_string_lossy().replace('\\', "/");
    let dir = dir.trim_matches('/');
    if dir.is_empty() {
        file.to_string()
    } else {
        format!("{}/{}", dir, file)
    }
}

/// Replacements for the production template.
///
/// `css_dir` and `js_dir` are the output directories relative to the
/// staging root, e.g. `css` and `js`.
pub fn prod_replacements(
    names: &SessionNames,
    css_dir: &Path,
    js_dir: &Path,
) -> BTreeMap<String, String> {
    let mut replacements = BTreeMap::new();
    replacements
        .insert("css".to_string(), css_tag(&url_path(css_dir, &format!("{}.min.css", names.css))));
    replacements
        .insert("js".to_string(), js_tag(&url_path(js_dir, &format!("{}.min.js", names.js))));
    replacements
}

/// Replace every build block in `html`.
///
/// Replacement tags keep the indentation of the opening marker.
pub fn replace_blocks(
    html: &str,
    replacements: &BTreeMap<String, String>,
    keep_unassigned: bool,
) -> String {
    block_pattern()
        .replace_all(html, |caps: &Captures| {
            let indent = &caps[1];
            match replacements.get(&caps[2]) {
                Some(tag) => format!("{}{}", indent, tag),
                None if keep_unassigned => caps[0].to_string(),
                None => String::new(),
            }
        })
        .into_owned()
}

/// Read `template`, rewrite its build blocks and write the result to `dest`.
pub fn rewrite_html(
    template: &Path,
    dest: &Path,
    replacements: &BTreeMap<String, String>,
    keep_unassigned: bool,
) -> Result<PathBuf, HtmlError> {
    if !template.is_file() {
        return Err(HtmlError::TemplateNotFound(template.to_path_buf()));
    }

    let html = fs::read_to_string(template)?;
    let rewritten = replace_blocks(&html, replacements, keep_unassigned);

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(dest, rewritten)?;
    Ok(dest.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <!-- build:css -->
    <link rel="stylesheet" href="css/main.css">
    <link rel="stylesheet" href="css/extra.css">
    <!-- endbuild -->
</head>
<body>
    <!-- build:analytics -->
    <script src="js/dev-only.js"></script>
    <!-- endbuild -->
    <!-- build:js -->
    <script src="js/index.js"></script>
    <!-- endbuild -->
</body>
</html>
"#;

    fn names() -> SessionNames {
        SessionNames { css: "AbCd1".to_string(), js: "Zy9Xw".to_string() }
    }

    #[test]
    fn test_prod_replacements() {
        let replacements = prod_replacements(&names(), Path::new("css"), Path::new("js"));
        assert_eq!(replacements["css"], r#"<link rel="stylesheet" href="css/AbCd1.min.css">"#);
        assert_eq!(replacements["js"], r#"<script src="js/Zy9Xw.min.js"></script>"#);
    }

    #[test]
    fn test_url_path_nested_and_empty() {
        assert_eq!(url_path(Path::new("assets/css"), "a.css"), "assets/css/a.css");
        assert_eq!(url_path(Path::new(""), "a.css"), "a.css");
    }

    #[test]
    fn test_replace_blocks() {
        let replacements = prod_replacements(&names(), Path::new("css"), Path::new("js"));
        let html = replace_blocks(TEMPLATE, &replacements, false);

        assert!(html.contains(r#"    <link rel="stylesheet" href="css/AbCd1.min.css">"#));
        assert!(html.contains(r#"    <script src="js/Zy9Xw.min.js"></script>"#));
        assert!(!html.contains("css/main.css"));
        assert!(!html.contains("extra.css"));
        assert!(!html.contains("dev-only.js"));
        assert!(!html.contains("build:"));
        assert!(!html.contains("endbuild"));
    }

    #[test]
    fn test_replace_blocks_keep_unassigned() {
        let replacements = prod_replacements(&names(), Path::new("css"), Path::new("js"));
        let html = replace_blocks(TEMPLATE, &replacements, true);

        assert!(html.contains("<!-- build:analytics -->"));
        assert!(html.contains("dev-only.js"));
        assert!(!html.contains("css/main.css"));
    }

    #[test]
    fn test_replace_blocks_without_markers_is_identity() {
        let html = "<html><body>plain</body></html>";
        assert_eq!(replace_blocks(html, &BTreeMap::new(), false), html);
    }

    #[test]
    fn test_rewrite_html_writes_destination() {
        let temp = TempDir::new().unwrap();
        let template = temp.path().join("src/index.html");
        fs::create_dir_all(template.parent().unwrap()).unwrap();
        fs::write(&template, TEMPLATE).unwrap();

        let dest = temp.path().join("build/intermediate/index.html");
        let replacements = prod_replacements(&names(), Path::new("css"), Path::new("js"));
        rewrite_html(&template, &dest, &replacements, false).unwrap();

        let written = fs::read_to_string(dest).unwrap();
        assert!(written.contains("AbCd1.min.css"));
    }

    #[test]
    fn test_rewrite_html_missing_template() {
        let temp = TempDir::new().unwrap();
        let result = rewrite_html(
            &temp.path().join("missing.html"),
            &temp.path().join("out.html"),
            &BTreeMap::new(),
            false,
        );
        assert!(matches!(result, Err(HtmlError::TemplateNotFound(_))));
    }
}
