//! Study launcher
//!
//! A study is a directory under `studies/` holding a `study.toml` that lists
//! its steps. [`StudyRunner`] records the run context and executes the steps
//! in order through a [`StepExecutor`], capturing each step's console into
//! `<out>/<step>/console.log`.

mod error;
mod executor;
mod interrupt;
mod layout;
mod manifest;
pub mod mock;
mod runner;
mod transcript;

pub use error::StudyError;
pub use executor::{ProcessExecutor, StepExecutor, StepInvocation, StepStatus};
pub use interrupt::{CtrlCListener, Interrupt};
pub use layout::StudyLayout;
pub use manifest::{ManifestError, StepSpec, StudyManifest, MANIFEST_FILE};
pub use mock::MockExecutor;
pub use runner::{
    PreparedStudy, RunRequest, RunSummary, StepOutcome, StudyRunner, ENV_CONFIG, ENV_OUT_DIR,
    ENV_STEP, ENV_STUDY,
};
pub use transcript::tee;
