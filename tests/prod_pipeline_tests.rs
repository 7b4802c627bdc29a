//! Prod pipeline integration tests
//!
//! Builds a small site end to end: clean, styles, scripts, HTML rewrite and
//! packaging, checking both the outputs and the order targets ran in.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use frontpipe::build::{
    create_prod_plan, BuildContext, BuildPipeline, BuildStatus, ProgressEvent, ProgressReporter,
};
use frontpipe::config::FrontpipeConfig;
use frontpipe::naming::{SessionNames, RANDOM_NAME_ALPHABET, RANDOM_NAME_LEN};

// ============================================================================
// Test Utilities
// ============================================================================

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
    <!-- build:css -->
    <link rel="stylesheet" href="css/main.css">
    <!-- endbuild -->
</head>
<body>
    <h1>Hello</h1>
    <!-- build:js -->
    <script src="js/a.js"></script>
    <script src="js/b.js"></script>
    <!-- endbuild -->
</body>
</html>
"#;

fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// Lay out a site the way the default config expects it.
fn create_site() -> TempDir {
    let temp = TempDir::new().unwrap();
    let root = temp.path();

    write(&root.join("src/sass/_vars.scss"), "$accent: #c0392b;\n");
    write(
        &root.join("src/sass/main.scss"),
        "@import 'vars';\n\nbody {\n  h1 { color: $accent; user-select: none; }\n}\n",
    );
    write(&root.join("src/js/a.js"), "function greet(name) {\n  return 'hi ' + name;\n}\n");
    write(&root.join("src/js/b.js"), "var message = greet('there');\nconsole.log(message);\n");
    write(&root.join("src/index.html"), INDEX_HTML);

    // Leftovers from an earlier build.
    write(&root.join("build/deploy.zip"), "stale archive");
    write(&root.join("build/intermediate/css/Old00.min.css"), ".old{}");
    write(&root.join("build/intermediate/js/Old00.min.js"), "var old;");

    temp
}

fn context(root: &Path) -> BuildContext {
    let names = SessionNames { css: "CssAb".to_string(), js: "Js123".to_string() };
    BuildContext::new(FrontpipeConfig::default(), root.to_path_buf()).with_names(names)
}

/// Records every event in arrival order.
#[derive(Default)]
struct RecordingProgress(Mutex<Vec<ProgressEvent>>);

impl ProgressReporter for RecordingProgress {
    fn report(&self, event: ProgressEvent) {
        self.0.lock().unwrap().push(event);
    }
}

fn zip_entries(archive: &Path) -> Vec<String> {
    let zip = zip::ZipArchive::new(File::open(archive).unwrap()).unwrap();
    let mut names: Vec<String> = zip.file_names().map(str::to_string).collect();
    names.sort();
    names
}

// ============================================================================
// Pipeline Integration Tests
// ============================================================================

#[test]
fn test_prod_build_outputs() {
    let site = create_site();
    let ctx = context(site.path());
    let plan = create_prod_plan(&ctx);

    let result = BuildPipeline::new(ctx).build(&plan).unwrap();
    assert!(result.is_success(), "{}", result.summary());
    assert_eq!(result.success_count(), 8);

    let stage = site.path().join("build/intermediate");
    assert!(stage.join("css/main.css").is_file());
    assert!(stage.join("css/CssAb.min.css").is_file());
    assert!(stage.join("css/CssAb.min.css.map").is_file());
    assert!(stage.join("js/Js123.min.js").is_file());
    assert!(stage.join("js/Js123.min.js.map").is_file());
    assert!(!stage.join("css/Old00.min.css").exists());
    assert!(!stage.join("js/Old00.min.js").exists());

    let css = fs::read_to_string(stage.join("css/CssAb.min.css")).unwrap();
    assert!(css.contains("#c0392b"));
    assert!(css.contains("sourceMappingURL=CssAb.min.css.map"));

    let html = fs::read_to_string(stage.join("index.html")).unwrap();
    assert!(html.contains(r#"<link rel="stylesheet" href="css/CssAb.min.css">"#));
    assert!(html.contains(r#"<script src="js/Js123.min.js"></script>"#));
    assert!(!html.contains("js/a.js"));
    assert!(html.contains("<h1>Hello</h1>"));
}

#[test]
fn test_prod_build_archive() {
    let site = create_site();
    let ctx = context(site.path());
    let plan = create_prod_plan(&ctx);

    let result = BuildPipeline::new(ctx).build(&plan).unwrap();
    assert!(result.is_success(), "{}", result.summary());

    let archive = site.path().join("build/deploy.zip");
    assert_eq!(
        zip_entries(&archive),
        vec![
            "css/CssAb.min.css",
            "css/CssAb.min.css.map",
            "css/main.css",
            "index.html",
            "js/Js123.min.js",
            "js/Js123.min.js.map",
        ]
    );

    let mut zip = zip::ZipArchive::new(File::open(&archive).unwrap()).unwrap();
    let mut html = String::new();
    zip.by_name("index.html").unwrap().read_to_string(&mut html).unwrap();
    assert!(html.contains("CssAb.min.css"));
}

#[test]
fn test_prerequisites_complete_before_dependents_start() {
    let site = create_site();
    let ctx = context(site.path());
    let plan = create_prod_plan(&ctx);
    let recorder = Arc::new(RecordingProgress::default());

    let result = BuildPipeline::new(ctx)
        .with_jobs(4)
        .with_reporter(recorder.clone())
        .build(&plan)
        .unwrap();
    assert!(result.is_success(), "{}", result.summary());

    let events = recorder.0.lock().unwrap();
    let mut started: HashMap<String, usize> = HashMap::new();
    let mut completed: HashMap<String, usize> = HashMap::new();
    for (index, event) in events.iter().enumerate() {
        match event {
            ProgressEvent::TargetStarted { target_id } => {
                started.insert(target_id.clone(), index);
            }
            ProgressEvent::TargetCompleted { target_id, status, .. } => {
                assert_eq!(*status, BuildStatus::Success, "{} did not succeed", target_id);
                completed.insert(target_id.clone(), index);
            }
            _ => {}
        }
    }

    assert_eq!(started.len(), 8);
    for target in plan.targets() {
        let start = started[&target.id];
        assert!(completed[&target.id] > start);
        for dep in &target.dependencies {
            assert!(
                completed[dep] < start,
                "{} started before its prerequisite {} completed",
                target.id,
                dep
            );
        }
    }

    assert!(matches!(events.first(), Some(ProgressEvent::BuildStarted { total_targets: 8 })));
    assert!(matches!(events.last(), Some(ProgressEvent::BuildCompleted { success: true, .. })));
}

#[test]
fn test_broken_stylesheet_blocks_packaging() {
    let site = create_site();
    write(&site.path().join("src/sass/main.scss"), "body { color: $undefined-variable; }\n");

    let ctx = context(site.path());
    let plan = create_prod_plan(&ctx);
    let result = BuildPipeline::new(ctx).build(&plan).unwrap();

    assert!(!result.is_success());
    match &result.get("styles:prod").unwrap().status {
        BuildStatus::Failed(message) => assert!(message.contains("main.scss"), "{}", message),
        other => panic!("expected failure, got {:?}", other),
    }
    assert!(result.get("scripts:prod").unwrap().is_success());
    assert!(matches!(result.get("package:zip").unwrap().status, BuildStatus::Skipped(_)));
    assert!(!site.path().join("build/deploy.zip").exists());
}

#[test]
fn test_html_link_resolves_without_main_stylesheet() {
    let site = create_site();
    fs::remove_file(site.path().join("src/sass/main.scss")).unwrap();
    write(&site.path().join("src/sass/app.scss"), "@import 'vars';\n.app { color: $accent; }\n");
    write(&site.path().join("src/sass/print.scss"), ".print { color: black; }\n");

    let ctx = context(site.path());
    let plan = create_prod_plan(&ctx);
    let result = BuildPipeline::new(ctx).build(&plan).unwrap();
    assert!(result.is_success(), "{}", result.summary());

    let stage = site.path().join("build/intermediate");
    let html = fs::read_to_string(stage.join("index.html")).unwrap();
    assert!(html.contains(r#"href="css/CssAb.min.css""#));
    let linked = fs::read_to_string(stage.join("css/CssAb.min.css")).unwrap();
    assert!(linked.contains(".app"));
    assert!(stage.join("css/CssAb-print.min.css").is_file());
}

#[test]
fn test_dry_run_touches_nothing() {
    let site = create_site();
    let ctx = context(site.path());
    let plan = create_prod_plan(&ctx);

    let result = BuildPipeline::new(ctx).with_dry_run(true).build(&plan).unwrap();
    assert_eq!(result.skipped_count(), 8);
    assert_eq!(fs::read_to_string(site.path().join("build/deploy.zip")).unwrap(), "stale archive");
    assert!(site.path().join("build/intermediate/css/Old00.min.css").exists());
}

#[test]
fn test_fresh_session_names_are_used_everywhere() {
    let site = create_site();
    let ctx = BuildContext::new(FrontpipeConfig::default(), site.path().to_path_buf());
    let names = ctx.names().clone();
    for name in [&names.css, &names.js] {
        assert_eq!(name.len(), RANDOM_NAME_LEN);
        assert!(name.chars().all(|c| RANDOM_NAME_ALPHABET.contains(c)));
    }

    let plan = create_prod_plan(&ctx);
    let result = BuildPipeline::new(ctx).build(&plan).unwrap();
    assert!(result.is_success(), "{}", result.summary());

    let stage: PathBuf = site.path().join("build/intermediate");
    let html = fs::read_to_string(stage.join("index.html")).unwrap();
    assert!(stage.join(format!("css/{}.min.css", names.css)).is_file());
    assert!(stage.join(format!("js/{}.min.js", names.js)).is_file());
    assert!(html.contains(&format!("css/{}.min.css", names.css)));
    assert!(html.contains(&format!("js/{}.min.js", names.js)));
}
