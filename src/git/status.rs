//! Diff statistics for the dirty marker in context headers

use std::fmt;
use std::path::Path;
use std::process::Command;

use serde::{Deserialize, Serialize};

/// Size of the tracked changes: files, added and removed lines
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitDiffStats {
    pub additions: usize,
    pub deletions: usize,
    pub files_changed: usize,
}

impl GitDiffStats {
    /// Staged and unstaged changes to tracked files relative to HEAD.
    ///
    /// Without commits there is no HEAD; the staged files are counted
    /// instead. Untracked files never count. Any git failure yields zeros.
    pub fn collect(root: &Path, has_commits: bool) -> Self {
        let args: &[&str] = if has_commits {
            &["diff", "--shortstat", "HEAD"]
        } else {
            &["diff", "--shortstat", "--cached"]
        };

        match Command::new("git").args(args).current_dir(root).output() {
            Ok(o) if o.status.success() => {
                Self::parse_shortstat(&String::from_utf8_lossy(&o.stdout))
            }
            Ok(o) => {
                tracing::debug!(
                    path = %root.display(),
                    stderr = %String::from_utf8_lossy(&o.stderr).trim(),
                    "git diff --shortstat failed"
                );
                Self::default()
            }
            Err(e) => {
                tracing::debug!(error = %e, "Failed to run git diff");
                Self::default()
            }
        }
    }

    /// Parse e.g. " 1 file changed, 44 insertions(+), 10 deletions(-)".
    /// Either count clause may be missing; empty output means no changes.
    fn parse_shortstat(output: &str) -> Self {
        let mut stats = Self::default();
        for clause in output.trim().split(',') {
            let Some((count, label)) = clause.trim().split_once(' ') else {
                continue;
            };
            let Ok(count) = count.parse::<usize>() else {
                continue;
            };
            match label {
                l if l.starts_with("file") => stats.files_changed = count,
                l if l.starts_with("insertion") => stats.additions = count,
                l if l.starts_with("deletion") => stats.deletions = count,
                _ => {}
            }
        }
        stats
    }
}

impl fmt::Display for GitDiffStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let noun = if self.files_changed == 1 { "file" } else { "files" };
        write!(
            f,
            "{} {} changed, +{}/-{}",
            self.files_changed, noun, self.additions, self.deletions
        )
    }
}
