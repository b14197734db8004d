//! Study project fixtures
//!
//! A `TestProject` is a git repository laid out the way studyrun expects:
//! `studies/<name>/study.toml`, shared code under `src/`, outputs under
//! `results/`.

#![allow(dead_code)] // Each integration module uses a different subset

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use studyrun::study::{StepSpec, StudyManifest, MANIFEST_FILE};

use super::git_fixtures::TestRepo;

pub struct TestProject {
    pub repo: TestRepo,
}

impl TestProject {
    /// A committed, clean project with an empty shared `src/` directory
    pub fn new() -> Self {
        let repo = TestRepo::new();
        repo.commit_file("src/.keep", "", "Add shared code directory");
        Self { repo }
    }

    pub fn root(&self) -> &Path {
        &self.repo.path
    }

    /// Write `studies/<name>/study.toml` with the given contents
    pub fn add_study(&self, name: &str, manifest: &str) -> PathBuf {
        let dir = self.root().join("studies").join(name);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(MANIFEST_FILE), manifest).unwrap();
        dir
    }

    /// A study whose steps are `sh -c <script>`
    pub fn add_shell_study(&self, name: &str, steps: &[(&str, &str)]) -> PathBuf {
        let manifest = StudyManifest {
            name: None,
            description: None,
            steps: steps
                .iter()
                .map(|(step, script)| StepSpec {
                    name: step.to_string(),
                    program: "sh".to_string(),
                    args: vec!["-c".to_string(), script.to_string(), "sh".to_string()],
                    env: BTreeMap::new(),
                })
                .collect(),
        };
        self.add_study(name, &manifest.to_toml().unwrap())
    }

    /// Write the project settings file
    pub fn write_settings(&self, contents: &str) {
        std::fs::write(self.root().join("studyrun.toml"), contents).unwrap();
    }

    /// Stage and commit everything so the repository is clean
    pub fn commit_all(&self) {
        self.repo.git_output(&["add", "-A"]);
        self.repo.git_output(&["commit", "-m", "Update project"]);
    }

    pub fn results_dir(&self, study: &str) -> PathBuf {
        self.root().join("results").join(study)
    }
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}
