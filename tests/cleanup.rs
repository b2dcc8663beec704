// ABOUTME: Integration and property tests for the cleanup engine.
// ABOUTME: Checks idempotence, protection of site files, and preview fidelity.

use std::path::Path;

use pagepush::cleanup::patterns::is_protected_name;
use pagepush::cleanup::{Cleaner, CleanupEngine, CleanupError, CleanupRequest};
use proptest::prelude::*;

const DIRS: &[&str] = &["", "src", "docs", "assets", "pr/1", "vendor/lib", "blog/2024"];
const NAMES: &[&str] = &[
    "index.html",
    "main.go",
    "style.css",
    "notes.md",
    "CNAME",
    "data.json",
    "lib.rs",
    "app.js",
    "README.txt",
    "logo.png",
    "build.log",
    "feed.xml",
];

fn write_tree(root: &Path, files: &[(usize, usize)]) -> Vec<String> {
    let mut written = Vec::new();
    for &(d, n) in files {
        let rel = if DIRS[d].is_empty() {
            NAMES[n].to_string()
        } else {
            format!("{}/{}", DIRS[d], NAMES[n])
        };
        let path = root.join(&rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, rel.as_bytes()).unwrap();
        written.push(rel);
    }
    written
}

fn tree_strategy() -> impl Strategy<Value = Vec<(usize, usize)>> {
    prop::collection::vec((0..DIRS.len(), 0..NAMES.len()), 1..16)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn second_cleanup_removes_nothing(files in tree_strategy()) {
        let dir = tempfile::tempdir().unwrap();
        write_tree(dir.path(), &files);
        let engine = CleanupEngine::default();
        let patterns = vec!["*.log".to_string()];

        engine.cleanup(CleanupRequest::new(dir.path(), &patterns), false).unwrap();
        let again = engine.cleanup(CleanupRequest::new(dir.path(), &patterns), false).unwrap();

        prop_assert!(again.removed.is_empty(), "second pass removed {:?}", again.removed);
    }

    #[test]
    fn protected_files_always_survive(files in tree_strategy()) {
        let dir = tempfile::tempdir().unwrap();
        let written = write_tree(dir.path(), &files);
        let engine = CleanupEngine::default();
        let patterns = vec!["src/*".to_string(), "docs".to_string()];

        engine.cleanup(CleanupRequest::new(dir.path(), &patterns), false).unwrap();

        for rel in written {
            let name = rel.rsplit('/').next().unwrap();
            if is_protected_name(name) {
                prop_assert!(dir.path().join(&rel).exists(), "{} was removed", rel);
            }
        }
    }

    #[test]
    fn preview_matches_cleanup(files in tree_strategy()) {
        let dir = tempfile::tempdir().unwrap();
        write_tree(dir.path(), &files);
        let engine = CleanupEngine::default();
        let patterns = vec!["*.xml".to_string()];

        let preview = engine.preview(CleanupRequest::new(dir.path(), &patterns)).unwrap();
        let result = engine.cleanup(CleanupRequest::new(dir.path(), &patterns), false).unwrap();

        prop_assert_eq!(preview, result.removed);
    }
}

#[test]
fn dry_run_reports_without_removing() {
    let dir = tempfile::tempdir().unwrap();
    write_tree(dir.path(), &[(0, 1), (0, 0), (1, 6)]);
    let engine = CleanupEngine::default();

    let result = engine
        .cleanup(CleanupRequest::new(dir.path(), &[]), true)
        .unwrap();

    assert!(result.dry_run);
    assert_eq!(result.removed, vec!["main.go", "src"]);
    assert!(dir.path().join("main.go").exists());
    assert!(dir.path().join("src/lib.rs").exists());
}

#[test]
fn disposable_dir_with_site_files_is_descended() {
    let dir = tempfile::tempdir().unwrap();
    // docs/ is disposable but holds a page.
    write_tree(dir.path(), &[(2, 0), (2, 3)]);
    let engine = CleanupEngine::default();

    let result = engine
        .cleanup(CleanupRequest::new(dir.path(), &[]), false)
        .unwrap();

    assert_eq!(result.removed, vec!["docs/notes.md"]);
    assert!(dir.path().join("docs/index.html").exists());
}

#[test]
fn protect_list_overrides_removal_patterns() {
    let dir = tempfile::tempdir().unwrap();
    write_tree(dir.path(), &[(0, 11), (0, 3)]);
    let engine = CleanupEngine::new(Vec::new());
    let patterns = vec!["*.xml".to_string(), "*.md".to_string()];
    let protect = vec!["feed.xml".to_string()];

    let result = engine
        .cleanup(
            CleanupRequest::new(dir.path(), &patterns).protecting(&protect),
            false,
        )
        .unwrap();

    assert_eq!(result.removed, vec!["notes.md"]);
    assert!(dir.path().join("feed.xml").exists());
}

#[test]
fn critical_patterns_fail_before_touching_disk() {
    let dir = tempfile::tempdir().unwrap();
    write_tree(dir.path(), &[(0, 1)]);
    let engine = CleanupEngine::default();

    for pattern in ["*", "**", "index.html", "*.css"] {
        let patterns = vec![pattern.to_string()];
        let err = engine
            .cleanup(CleanupRequest::new(dir.path(), &patterns), false)
            .unwrap_err();
        assert!(matches!(err, CleanupError::CriticalPattern { .. }), "{pattern}");
    }
    assert!(dir.path().join("main.go").exists());
}

#[test]
fn preview_rejects_critical_patterns() {
    let dir = tempfile::tempdir().unwrap();
    write_tree(dir.path(), &[(0, 1)]);
    let engine = CleanupEngine::default();

    for pattern in [".nojekyll", "**"] {
        let patterns = vec![pattern.to_string()];
        let err = engine
            .preview(CleanupRequest::new(dir.path(), &patterns))
            .unwrap_err();
        assert!(matches!(err, CleanupError::CriticalPattern { .. }), "{pattern}");
    }
}
