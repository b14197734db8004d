//! Where a study lives and where its outputs go

use std::io;
use std::path::{Path, PathBuf};

use crate::config::Settings;
use crate::util::paths::ensure_dir;

/// Resolved, absolute paths for one study run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudyLayout {
    /// Project root
    pub root: PathBuf,
    /// Directory holding `study.toml`; steps run with this as cwd
    pub study_dir: PathBuf,
    /// Output root; one subdirectory per step
    pub out_dir: PathBuf,
    /// Shared code directory exported through the search-path variable
    pub shared_dir: PathBuf,
    transcript_name: String,
}

impl StudyLayout {
    /// Resolve the layout for `study`.
    ///
    /// `study` is either a name under `<root>/<studies_dir>` or a path to a
    /// study directory. The output root defaults to
    /// `<root>/<results_dir>/<study name>`.
    pub fn resolve(
        root: &Path,
        settings: &Settings,
        study: &str,
        out_dir: Option<&Path>,
    ) -> io::Result<Self> {
        let root = std::path::absolute(root)?;

        let as_path = Path::new(study);
        let study_dir = if as_path.components().count() > 1 && as_path.is_dir() {
            std::path::absolute(as_path)?
        } else {
            root.join(&settings.studies_dir).join(study)
        };

        let study_name = study_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| study.to_string());

        let out_dir = match out_dir {
            Some(dir) => std::path::absolute(dir)?,
            None => root.join(&settings.results_dir).join(&study_name),
        };

        Ok(Self {
            shared_dir: root.join(&settings.shared_dir),
            root,
            study_dir,
            out_dir,
            transcript_name: settings.transcript_name.clone(),
        })
    }

    pub fn step_dir(&self, step: &str) -> PathBuf {
        self.out_dir.join(step)
    }

    pub fn transcript_path(&self, step: &str) -> PathBuf {
        self.step_dir(step).join(&self.transcript_name)
    }

    /// Create the step's output directory, returning its path
    pub fn prepare_step(&self, step: &str) -> io::Result<PathBuf> {
        let dir = self.step_dir(step);
        ensure_dir(&dir)?;
        Ok(dir)
    }
}
