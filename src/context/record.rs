use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::system::SystemInfo;
use crate::git::GitSnapshot;

#[derive(Error, Debug)]
pub enum ContextError {
    #[error("Config not found: {0}")]
    ConfigNotFound(PathBuf),
    #[error("Failed to read config {path}: {source}")]
    ConfigRead { path: PathBuf, source: io::Error },
    #[error("Failed to write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("Failed to serialize context: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A configuration file embedded verbatim into the context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigAttachment {
    pub path: PathBuf,
    pub contents: String,
}

/// Reproducibility metadata for a single invocation.
///
/// Built once by [`RunContext::capture`] and not mutated afterwards apart
/// from the builder-style [`RunContext::attach_config`] and
/// [`RunContext::with_notes`], which consume and return it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunContext {
    pub author: String,
    pub timestamp: DateTime<Local>,
    /// `None` outside a git work tree
    pub git: Option<GitSnapshot>,
    pub system: SystemInfo,
    /// Command line of this invocation, program name first
    pub command: Vec<String>,
    pub config: Option<ConfigAttachment>,
    pub notes: Option<String>,
}

/// Inputs to [`RunContext::capture`]
#[derive(Debug, Clone, Default)]
pub struct CaptureOptions {
    pub author: String,
    /// Directory whose repository is probed (usually the project root)
    pub repo_dir: PathBuf,
    /// Overrides the process arguments as the recorded command line
    pub command: Option<Vec<String>>,
    /// Program whose `--version` is recorded as the runtime
    pub interpreter: Option<String>,
    pub notes: Option<String>,
}

impl RunContext {
    /// Read the clock, the repository state and the host description.
    ///
    /// Git is best-effort: a missing repository only leaves `git` empty.
    pub fn capture(options: &CaptureOptions) -> Self {
        let git = GitSnapshot::probe(&options.repo_dir);
        if git.is_none() {
            tracing::info!(
                path = %options.repo_dir.display(),
                "No git repository found, commit will be recorded as N/A"
            );
        }

        Self {
            author: options.author.clone(),
            timestamp: Local::now(),
            git,
            system: SystemInfo::detect(options.interpreter.as_deref()),
            command: options
                .command
                .clone()
                .unwrap_or_else(|| std::env::args().collect()),
            config: None,
            notes: options.notes.clone(),
        }
    }

    /// Embed the contents of a configuration file.
    ///
    /// Fails with [`ContextError::ConfigNotFound`] if `path` is not a file.
    /// For optional configs use [`RunContext::attach_config_or_warn`].
    pub fn attach_config(mut self, path: &Path) -> Result<Self, ContextError> {
        if !path.is_file() {
            return Err(ContextError::ConfigNotFound(path.to_path_buf()));
        }
        let contents = fs::read_to_string(path).map_err(|source| ContextError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        self.config = Some(ConfigAttachment {
            path: path.to_path_buf(),
            contents,
        });
        Ok(self)
    }

    /// Like [`RunContext::attach_config`], but a missing file is logged and
    /// the context is returned without a config section.
    pub fn attach_config_or_warn(self, path: &Path) -> Self {
        if !path.is_file() {
            tracing::warn!(path = %path.display(), "Config not found, recording it as absent");
            return self;
        }
        let fallback = self.clone();
        match self.attach_config(path) {
            Ok(ctx) => ctx,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to attach config");
                fallback
            }
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Whether the working tree had uncommitted changes at capture time
    pub fn is_dirty(&self) -> bool {
        self.git.as_ref().is_some_and(|g| g.dirty)
    }
}
