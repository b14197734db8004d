use std::path::PathBuf;

use thiserror::Error;

use super::manifest::ManifestError;
use crate::context::ContextError;

/// Errors that prevent a study from running at all.
///
/// A step that runs and fails is not an error here; it is reported through
/// [`super::StepStatus`] so the summary can still be inspected.
#[derive(Error, Debug)]
pub enum StudyError {
    #[error("Study directory not found: {0}")]
    StudyNotFound(PathBuf),
    #[error("Failed to resolve study paths: {0}")]
    Layout(std::io::Error),
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    #[error(transparent)]
    Context(#[from] ContextError),
    #[error("Failed to create {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to start step '{step}': {source}")]
    Spawn {
        step: String,
        source: std::io::Error,
    },
    #[error("Transcript for step '{step}' failed: {source}")]
    Transcript {
        step: String,
        source: std::io::Error,
    },
}
