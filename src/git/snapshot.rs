//! Best-effort snapshot of the repository a run was launched from

use std::path::{Path, PathBuf};
use std::process::Command;

use serde::{Deserialize, Serialize};

use super::status::GitDiffStats;

/// Number of commit-hash characters shown in headers
pub const SHORT_HASH_LEN: usize = 8;

/// Repository state at capture time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitSnapshot {
    /// Name of the repository root directory
    pub repo_name: String,
    /// Repository root (`git rev-parse --show-toplevel`)
    pub root: PathBuf,
    /// Full HEAD commit hash, `None` for a repository without commits
    pub commit: Option<String>,
    /// Whether tracked files differ from HEAD, staged or not. Untracked
    /// files, such as outputs of earlier runs, do not count.
    pub dirty: bool,
    pub stats: GitDiffStats,
}

impl GitSnapshot {
    /// Probe the repository containing `dir`.
    ///
    /// Returns `None` if `dir` does not exist, git is not installed, or
    /// `dir` is not inside a work tree. Never fails otherwise.
    pub fn probe(dir: &Path) -> Option<Self> {
        let dir = if dir.is_file() { dir.parent()? } else { dir };
        if !dir.is_dir() {
            tracing::debug!(path = %dir.display(), "Not a valid path for git probe");
            return None;
        }

        let root = match git_stdout(dir, &["rev-parse", "--show-toplevel"]) {
            Some(root) => PathBuf::from(root.trim()),
            None => {
                tracing::debug!(path = %dir.display(), "Not inside a git repository");
                return None;
            }
        };

        let commit = git_stdout(&root, &["rev-parse", "HEAD"])
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        let dirty = git_stdout(&root, &["status", "--porcelain", "--untracked-files=no"])
            .is_some_and(|s| !s.trim().is_empty());
        let stats = if dirty {
            GitDiffStats::collect(&root, commit.is_some())
        } else {
            GitDiffStats::default()
        };
        let repo_name = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "N/A".to_string());

        Some(Self {
            repo_name,
            root,
            commit,
            dirty,
            stats,
        })
    }

    /// First characters of the HEAD commit
    pub fn short_hash(&self) -> Option<&str> {
        self.commit
            .as_deref()
            .map(|c| &c[..c.len().min(SHORT_HASH_LEN)])
    }

    /// Diff of the working tree against HEAD, as written to `local.diff`.
    /// `None` when there is nothing to diff.
    pub fn working_diff(&self) -> Option<String> {
        if self.commit.is_none() {
            return None;
        }
        git_stdout(&self.root, &["diff", "HEAD"]).filter(|d| !d.trim().is_empty())
    }
}

/// Run a git command and return stdout if it succeeded
fn git_stdout(dir: &Path, args: &[&str]) -> Option<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).into_owned())
}
