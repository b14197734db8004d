//! Writing a captured context next to a run's outputs
//!
//! Layout under the output root:
//! - `_context/<app_id>/info.txt`   formatted header
//! - `_context/<app_id>/info.json`  the same context as JSON
//! - `_context/<app_id>/local.diff` working tree diff against HEAD
//! - `_context/<app_id>/<artifact>` anything registered via `add_artifact`
//!
//! Existing files are never replaced unless `overwrite` is set; a counter is
//! appended instead (`info_001.txt`, `info_002.txt`, ...).

use std::fs;
use std::path::{Path, PathBuf};

use super::format::format_header;
use super::record::{ContextError, RunContext};
use crate::util::paths::{context_dir, ensure_counted_path, ensure_dir};

const INFO_TXT: &str = "info.txt";
const INFO_JSON: &str = "info.json";
const LOCAL_DIFF: &str = "local.diff";

/// Paths written by [`ContextDump::write`]
#[derive(Debug, Clone)]
pub struct DumpedContext {
    pub dir: PathBuf,
    pub info_path: PathBuf,
    pub json_path: PathBuf,
    pub diff_path: Option<PathBuf>,
    pub artifact_paths: Vec<PathBuf>,
}

pub struct ContextDump {
    dir: PathBuf,
    overwrite: bool,
    artifacts: Vec<(String, String)>,
}

impl ContextDump {
    pub fn new(out_dir: &Path, app_id: &str) -> Self {
        Self {
            dir: context_dir(out_dir, app_id),
            overwrite: false,
            artifacts: Vec::new(),
        }
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Register an extra file to write alongside the header.
    /// Registering the same name twice keeps the later contents.
    pub fn add_artifact(&mut self, filename: impl Into<String>, contents: impl Into<String>) {
        let filename = filename.into();
        let contents = contents.into();
        if let Some(existing) = self.artifacts.iter_mut().find(|(name, _)| *name == filename) {
            tracing::warn!(filename = %filename, "Overriding existing context artifact");
            existing.1 = contents;
        } else {
            self.artifacts.push((filename, contents));
        }
    }

    /// Write header, JSON, diff and artifacts.
    ///
    /// Failing to write the header or JSON is an error. A failed artifact is
    /// logged and skipped.
    pub fn write(&self, ctx: &RunContext) -> Result<DumpedContext, ContextError> {
        ensure_dir(&self.dir).map_err(|source| ContextError::Write {
            path: self.dir.clone(),
            source,
        })?;

        let info_path = self.target(INFO_TXT)?;
        write_file(&info_path, &format_header(ctx))?;

        let json_path = self.target(INFO_JSON)?;
        write_file(&json_path, &serde_json::to_string_pretty(ctx)?)?;

        let diff_path = match ctx.git.as_ref().and_then(|g| g.working_diff()) {
            Some(diff) => {
                let path = self.target(LOCAL_DIFF)?;
                write_file(&path, diff.trim())?;
                Some(path)
            }
            None => None,
        };

        let mut artifact_paths = Vec::new();
        for (filename, contents) in &self.artifacts {
            let written = self
                .target(filename)
                .and_then(|path| write_file(&path, contents).map(|_| path));
            match written {
                Ok(path) => artifact_paths.push(path),
                Err(e) => {
                    tracing::warn!(filename = %filename, error = %e, "Failed to dump context artifact");
                }
            }
        }

        tracing::info!(path = %info_path.display(), "Wrote run context");
        Ok(DumpedContext {
            dir: self.dir.clone(),
            info_path,
            json_path,
            diff_path,
            artifact_paths,
        })
    }

    fn target(&self, filename: &str) -> Result<PathBuf, ContextError> {
        let path = self.dir.join(filename);
        if self.overwrite {
            return Ok(path);
        }
        ensure_counted_path(&path, "_", true).map_err(|source| ContextError::Write { path, source })
    }
}

fn write_file(path: &Path, contents: &str) -> Result<(), ContextError> {
    fs::write(path, contents).map_err(|source| ContextError::Write {
        path: path.to_path_buf(),
        source,
    })
}
