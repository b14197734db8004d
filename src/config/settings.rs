use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::util::paths::user_config_path;

/// Project settings file, looked up in the project root
pub const PROJECT_SETTINGS_FILE: &str = "studyrun.toml";

#[derive(Error, Debug)]
pub enum SettingsError {
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
}

/// Project configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settings {
    /// Author recorded in context headers (None = ask git, then the OS)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Default output root, relative to the project root
    pub results_dir: PathBuf,
    /// Directory holding one subdirectory per study
    pub studies_dir: PathBuf,
    /// Shared code, prepended to `search_path_var` for every step
    pub shared_dir: PathBuf,
    /// Environment variable steps use to locate shared code
    pub search_path_var: String,
    /// Flag passed to each step, followed by its output directory
    pub out_dir_flag: String,
    /// File name of the per-step console transcript
    pub transcript_name: String,
    /// Program whose `--version` is recorded as the runtime
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interpreter: Option<String>,
    /// Overwrite context dumps and logs instead of counting them up
    pub overwrite: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            author: None,
            results_dir: PathBuf::from("results"),
            studies_dir: PathBuf::from("studies"),
            shared_dir: PathBuf::from("src"),
            search_path_var: "PYTHONPATH".to_string(),
            out_dir_flag: "--outDir".to_string(),
            transcript_name: "console.log".to_string(),
            interpreter: None,
            overwrite: false,
        }
    }
}

/// TOML representation; every key is optional and merged over defaults
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlSettings {
    pub author: Option<String>,
    pub results_dir: Option<PathBuf>,
    pub studies_dir: Option<PathBuf>,
    pub shared_dir: Option<PathBuf>,
    pub search_path_var: Option<String>,
    pub out_dir_flag: Option<String>,
    pub transcript_name: Option<String>,
    pub interpreter: Option<String>,
    pub overwrite: Option<bool>,
}

impl Settings {
    /// Load settings for a project: defaults, then `~/.studyrun/config.toml`,
    /// then `<root>/studyrun.toml`.
    pub fn load(root: &Path) -> Result<Self, SettingsError> {
        Self::load_from(Some(&user_config_path()), &root.join(PROJECT_SETTINGS_FILE))
    }

    /// Load with explicit file locations.
    ///
    /// A broken user file is skipped with a warning; a broken project file
    /// is an error since it describes the study being run.
    pub fn load_from(user_file: Option<&Path>, project_file: &Path) -> Result<Self, SettingsError> {
        let mut settings = Settings::default();

        if let Some(user_file) = user_file.filter(|p| p.exists()) {
            match read_toml(user_file) {
                Ok(toml_settings) => settings.merge(toml_settings),
                Err(e) => {
                    tracing::warn!(path = %user_file.display(), error = %e, "Ignoring user settings");
                }
            }
        }

        if project_file.exists() {
            settings.merge(read_toml(project_file)?);
            tracing::debug!(path = %project_file.display(), "Loaded project settings");
        }

        Ok(settings)
    }

    fn merge(&mut self, toml: TomlSettings) {
        if let Some(author) = toml.author {
            self.author = Some(author);
        }
        if let Some(results_dir) = toml.results_dir {
            self.results_dir = results_dir;
        }
        if let Some(studies_dir) = toml.studies_dir {
            self.studies_dir = studies_dir;
        }
        if let Some(shared_dir) = toml.shared_dir {
            self.shared_dir = shared_dir;
        }
        if let Some(var) = toml.search_path_var {
            self.search_path_var = var;
        }
        if let Some(flag) = toml.out_dir_flag {
            self.out_dir_flag = flag;
        }
        if let Some(name) = toml.transcript_name {
            self.transcript_name = name;
        }
        if let Some(interpreter) = toml.interpreter {
            self.interpreter = Some(interpreter);
        }
        if let Some(overwrite) = toml.overwrite {
            self.overwrite = overwrite;
        }
    }

    /// Author for context headers.
    ///
    /// Priority:
    /// 1. `author` from settings
    /// 2. git config user.name
    /// 3. OS username (USER or USERNAME)
    /// 4. "unknown"
    pub fn resolve_author(&self) -> String {
        if let Some(author) = self.author.as_deref().map(str::trim) {
            if !author.is_empty() {
                return author.to_string();
            }
        }

        if let Ok(output) = std::process::Command::new("git")
            .args(["config", "user.name"])
            .output()
        {
            if output.status.success() {
                let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !name.is_empty() {
                    return name;
                }
            }
        }

        os_user().unwrap_or_else(|| "unknown".to_string())
    }
}

/// OS username from USER (Unix) or USERNAME (Windows)
pub fn os_user() -> Option<String> {
    ["USER", "USERNAME"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|user| !user.is_empty())
}

fn read_toml(path: &Path) -> Result<TomlSettings, SettingsError> {
    let contents = fs::read_to_string(path).map_err(|source| SettingsError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| SettingsError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
