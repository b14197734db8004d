//! Git repository test fixtures
//!
//! Provides utilities for creating temporary git repositories
//! in various states for testing the git probe and context capture.

use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// A temporary git repository for testing
///
/// The repository is automatically cleaned up when the `TestRepo`
/// is dropped. Use the various constructors to create repos in
/// different initial states.
///
/// # Example
/// ```
/// let repo = TestRepo::new();
/// assert!(repo.path.join(".git").exists());
/// ```
pub struct TestRepo {
    /// TempDir handle (keeps directory alive until dropped)
    _dir: TempDir,
    /// Path to the repository root
    pub path: PathBuf,
}

impl TestRepo {
    /// Create a new test repository with an initial commit
    ///
    /// The repository will have:
    /// - Git initialized
    /// - User configured (test@example.com)
    /// - GPG signing disabled (for CI compatibility)
    /// - A README.md file
    /// - One initial commit
    pub fn new() -> Self {
        let repo = Self::empty();
        std::fs::write(repo.path.join("README.md"), "# Test Repository\n").unwrap();
        Self::git(&repo.path, &["add", "."]);
        Self::git(&repo.path, &["commit", "-m", "Initial commit"]);
        repo
    }

    /// Create an initialized repository without any commits
    pub fn empty() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().to_path_buf();

        Self::git(&path, &["init"]);
        Self::git(&path, &["config", "user.email", "test@example.com"]);
        Self::git(&path, &["config", "user.name", "Test User"]);
        // Disable GPG signing to ensure tests work on machines with global signing enabled
        Self::git(&path, &["config", "commit.gpgsign", "false"]);

        Self { _dir: dir, path }
    }

    /// Create a repository with uncommitted (untracked) changes
    pub fn with_uncommitted_changes() -> Self {
        let repo = Self::new();
        std::fs::write(repo.path.join("dirty.txt"), "uncommitted content").unwrap();
        repo
    }

    /// Create a repository where a tracked file was edited
    ///
    /// README.md gains two lines and loses one, so `git diff HEAD`
    /// reports 1 file changed, +2/-1.
    pub fn with_modified_file() -> Self {
        let repo = Self::new();
        std::fs::write(repo.path.join("README.md"), "# Changed\nline two\n").unwrap();
        repo
    }

    /// Add a file and commit it
    pub fn commit_file(&self, filename: &str, content: &str, message: &str) {
        self.create_file(filename, content);
        Self::git(&self.path, &["add", filename]);
        Self::git(&self.path, &["commit", "-m", message]);
    }

    /// Create a file without staging or committing
    /// Creates parent directories if they don't exist.
    pub fn create_file(&self, filename: &str, content: &str) {
        let file_path = self.path.join(filename);
        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(file_path, content).unwrap();
    }

    /// Check if the repository has uncommitted changes
    pub fn is_dirty(&self) -> bool {
        !self.git_output(&["status", "--porcelain"]).is_empty()
    }

    /// Get the HEAD commit SHA
    pub fn head_sha(&self) -> String {
        self.git_output(&["rev-parse", "HEAD"]).trim().to_string()
    }

    /// Name of the repository directory
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Execute a git command in the repository
    fn git(path: &Path, args: &[&str]) {
        let output = Command::new("git")
            .args(args)
            .current_dir(path)
            .output()
            .unwrap_or_else(|e| panic!("Git command failed to execute: {}", e));

        if !output.status.success() {
            panic!(
                "Git command failed: git {}\nstderr: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr)
            );
        }
    }

    /// Execute a git command and return output (for queries)
    pub fn git_output(&self, args: &[&str]) -> String {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.path)
            .output()
            .expect("Git command failed");

        if !output.status.success() {
            panic!(
                "Git command failed: git {}\nstderr: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr)
            );
        }

        String::from_utf8_lossy(&output.stdout).to_string()
    }
}

impl Default for TestRepo {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_creation() {
        let repo = TestRepo::new();
        assert!(repo.path.join(".git").exists());
        assert!(repo.path.join("README.md").exists());
        assert!(!repo.is_dirty());
    }

    #[test]
    fn test_repo_with_uncommitted() {
        let repo = TestRepo::with_uncommitted_changes();
        assert!(repo.is_dirty());
    }

    #[test]
    fn test_repo_with_modified_file() {
        let repo = TestRepo::with_modified_file();
        assert!(repo.is_dirty());
        let stat = repo.git_output(&["diff", "HEAD", "--shortstat"]);
        assert!(stat.contains("1 file changed"));
    }

    #[test]
    fn test_commit_file() {
        let repo = TestRepo::new();
        let initial_sha = repo.head_sha();

        repo.commit_file("src/lib.py", "x = 1\n", "Add module");

        assert_ne!(initial_sha, repo.head_sha());
        assert!(!repo.is_dirty());
    }

    #[test]
    fn test_empty_repo_has_no_head() {
        let repo = TestRepo::empty();
        let output = Command::new("git")
            .args(["rev-parse", "HEAD"])
            .current_dir(&repo.path)
            .output()
            .unwrap();
        assert!(!output.status.success());
    }
}
