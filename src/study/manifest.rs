//! Study manifests (`studies/<name>/study.toml`)

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Manifest file name inside a study directory
pub const MANIFEST_FILE: &str = "study.toml";

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("Study manifest not found: {0}")]
    NotFound(PathBuf),
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Invalid study manifest {path}: {reason}")]
    Invalid { path: PathBuf, reason: String },
}

/// A study: an ordered list of steps
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StudyManifest {
    /// Defaults to the study directory name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub steps: Vec<StepSpec>,
}

/// One step of a study
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StepSpec {
    /// Also the name of the step's output subdirectory
    pub name: String,
    /// Program to run; a bare name is looked up on PATH, anything with a
    /// path separator is resolved against the study directory
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
}

impl StudyManifest {
    /// Load and validate `<study_dir>/study.toml`
    pub fn load(study_dir: &Path) -> Result<Self, ManifestError> {
        let path = study_dir.join(MANIFEST_FILE);
        if !path.is_file() {
            return Err(ManifestError::NotFound(path));
        }
        let contents = fs::read_to_string(&path).map_err(|source| ManifestError::Read {
            path: path.clone(),
            source,
        })?;
        let mut manifest: StudyManifest =
            toml::from_str(&contents).map_err(|source| ManifestError::Parse {
                path: path.clone(),
                source,
            })?;

        if manifest.name.as_deref().map_or(true, |n| n.trim().is_empty()) {
            manifest.name = study_dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned());
        }

        manifest
            .validate()
            .map_err(|reason| ManifestError::Invalid { path, reason })?;
        Ok(manifest)
    }

    /// Study name, falling back to "study"
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("study")
    }

    /// Check that the study name and the steps can be laid out as
    /// directories under the output root
    pub fn validate(&self) -> Result<(), String> {
        if let Some(name) = &self.name {
            plain_dir_name("study", name)?;
        }
        if self.steps.is_empty() {
            return Err("no steps defined".to_string());
        }
        let mut seen = HashSet::new();
        for step in &self.steps {
            let name = step.name.as_str();
            if name.trim().is_empty() {
                return Err("step with empty name".to_string());
            }
            plain_dir_name("step", name)?;
            if name.starts_with('_') {
                return Err(format!(
                    "step name '{name}' starts with '_', which is reserved for _context and _logs"
                ));
            }
            if step.program.trim().is_empty() {
                return Err(format!("step '{name}' has no program"));
            }
            if !seen.insert(name) {
                return Err(format!("duplicate step name '{name}'"));
            }
        }
        Ok(())
    }

    /// Manifest as TOML, as recorded in the context dump
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string(self)
    }
}

fn plain_dir_name(kind: &str, name: &str) -> Result<(), String> {
    if name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(format!("{kind} name '{name}' is not a plain directory name"));
    }
    Ok(())
}
