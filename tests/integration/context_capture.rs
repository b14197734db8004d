//! Integration tests for run-context capture
//!
//! Exercises the git probe, header rendering and context dumps against
//! real repositories.

use super::common::determinism::{test_now, TEST_DATE};
use super::common::git_fixtures::TestRepo;
use studyrun::context::{format_header, CaptureOptions, ContextDump, RunContext, GIT_UNAVAILABLE};
use tempfile::TempDir;

fn capture(repo_dir: &std::path::Path) -> RunContext {
    RunContext::capture(&CaptureOptions {
        author: "Test User".to_string(),
        repo_dir: repo_dir.to_path_buf(),
        command: Some(vec!["studyrun".to_string(), "context".to_string()]),
        interpreter: None,
        notes: None,
    })
}

fn git_line(header: &str) -> &str {
    header
        .lines()
        .find(|l| l.starts_with("Git:"))
        .expect("header has a Git line")
}

/// A clean repository is recorded by commit and name, without a dirty marker
#[test]
fn test_clean_repository() {
    let repo = TestRepo::new();
    let ctx = capture(&repo.path);

    let git = ctx.git.as_ref().expect("repository detected");
    assert_eq!(git.commit.as_deref(), Some(repo.head_sha().as_str()));
    assert_eq!(git.repo_name, repo.name());
    assert!(!ctx.is_dirty());

    let header = format_header(&ctx);
    let expected = format!("Git:       {} ({})", &repo.head_sha()[..8], repo.name());
    assert_eq!(git_line(&header), expected);
}

/// Edits to tracked files show up as a dirty marker with diff statistics
#[test]
fn test_dirty_repository_reports_stats() {
    let repo = TestRepo::with_modified_file();
    let ctx = capture(&repo.path);

    assert!(ctx.is_dirty());
    let header = format_header(&ctx);
    assert!(
        git_line(&header).ends_with("[dirty: 1 file changed, +2/-1]"),
        "unexpected git line: {}",
        git_line(&header)
    );
}

/// Untracked files, such as earlier results, leave the repository clean
#[test]
fn test_untracked_files_do_not_mark_dirty() {
    let repo = TestRepo::with_uncommitted_changes();
    let ctx = capture(&repo.path);
    assert!(!ctx.is_dirty());
    assert!(!git_line(&format_header(&ctx)).contains("[dirty"));
}

/// Staged changes count even before the first commit
#[test]
fn test_staged_files_without_commits_mark_dirty() {
    let repo = TestRepo::empty();
    repo.create_file("notes.txt", "one\ntwo\n");
    repo.git_output(&["add", "notes.txt"]);

    let ctx = capture(&repo.path);
    let git = ctx.git.as_ref().expect("repository detected");
    assert!(git.dirty);
    assert_eq!(git.stats.files_changed, 1);
    assert_eq!(git.stats.additions, 2);
}

/// Two captures of the same checkout render identical headers apart from
/// the date
#[test]
fn test_header_differs_only_in_date() {
    let repo = TestRepo::with_modified_file();
    let first = format_header(&capture(&repo.path));
    std::thread::sleep(std::time::Duration::from_millis(1100));
    let second = format_header(&capture(&repo.path));

    let differing: Vec<_> = first
        .lines()
        .zip(second.lines())
        .filter(|(a, b)| a != b)
        .collect();
    assert_eq!(first.lines().count(), second.lines().count());
    assert_eq!(differing.len(), 1, "{differing:?}");
    assert!(differing[0].0.starts_with("Date:"));
}

/// Capturing from a subdirectory finds the enclosing repository
#[test]
fn test_capture_from_subdirectory() {
    let repo = TestRepo::new();
    repo.commit_file("studies/study01/study.toml", "", "Add study");

    let ctx = capture(&repo.path.join("studies").join("study01"));
    assert_eq!(ctx.git.unwrap().repo_name, repo.name());
}

/// Outside a repository the git field is a placeholder and capture succeeds
#[test]
fn test_outside_repository() {
    let dir = TempDir::new().unwrap();
    let ctx = capture(dir.path());

    assert!(ctx.git.is_none());
    let header = format_header(&ctx);
    assert_eq!(git_line(&header), format!("Git:       {GIT_UNAVAILABLE}"));
}

/// A repository without commits is detected but has no hash
#[test]
fn test_repository_without_commits() {
    let repo = TestRepo::empty();
    let ctx = capture(&repo.path);

    let git = ctx.git.as_ref().expect("repository detected");
    assert!(git.commit.is_none());
    assert!(git_line(&format_header(&ctx)).contains("<no commits>"));
}

/// The dump holds the header, JSON and the working-tree diff
#[test]
fn test_dump_with_local_diff() {
    let repo = TestRepo::with_modified_file();
    let out = TempDir::new().unwrap();
    let mut ctx = capture(&repo.path);
    ctx.timestamp = test_now();

    let dumped = ContextDump::new(out.path(), "Study 01").write(&ctx).unwrap();

    assert_eq!(dumped.dir, out.path().join("_context").join("study_01"));
    let info = std::fs::read_to_string(&dumped.info_path).unwrap();
    assert!(info.contains(&format!("Date:      {TEST_DATE}")));
    assert_eq!(info, format_header(&ctx));

    let diff = std::fs::read_to_string(dumped.diff_path.expect("diff written")).unwrap();
    assert!(diff.contains("+# Changed"));
    assert!(diff.contains("-# Test Repository"));

    let json: RunContext =
        serde_json::from_str(&std::fs::read_to_string(&dumped.json_path).unwrap()).unwrap();
    assert_eq!(json.author, "Test User");
    assert_eq!(json.git, ctx.git);
}

/// A clean repository produces no diff file
#[test]
fn test_dump_clean_repository_without_diff() {
    let repo = TestRepo::new();
    let out = TempDir::new().unwrap();
    let dumped = ContextDump::new(out.path(), "ctx").write(&capture(&repo.path)).unwrap();
    assert!(dumped.diff_path.is_none());
}

/// A config file is embedded verbatim, a missing one is recorded as absent
#[test]
fn test_config_attachment() {
    let repo = TestRepo::new();
    repo.create_file("configs/run.toml", "alpha = 0.5\nseed = 1\n");

    let ctx = capture(&repo.path).attach_config_or_warn(&repo.path.join("configs/run.toml"));
    let header = format_header(&ctx);
    assert!(header.contains("Config:\n-------\nPath: "));
    assert!(header.contains("alpha = 0.5\nseed = 1\n"));

    let missing = capture(&repo.path).attach_config_or_warn(&repo.path.join("configs/none.toml"));
    assert!(missing.config.is_none());
    assert!(!format_header(&missing).contains("Config:"));
}
