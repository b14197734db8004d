pub mod cli;
pub mod config;
pub mod context;
pub mod git;
pub mod logging;
pub mod study;
pub mod util;

pub use config::{Settings, SettingsError};
pub use context::{format_header, CaptureOptions, ContextDump, ContextError, RunContext};
pub use git::{GitDiffStats, GitSnapshot};
pub use study::{
    Interrupt, MockExecutor, ProcessExecutor, RunRequest, RunSummary, StepExecutor, StepStatus,
    StudyError, StudyRunner,
};
pub use util::{ChecksumEntry, ChecksumError, ChecksumOptions};
