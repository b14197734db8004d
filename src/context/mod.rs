//! Run-context recorder
//!
//! Captures who ran what, where and from which commit, renders it as a
//! fixed-layout header and files it next to the run's outputs:
//!
//! ```no_run
//! use studyrun::context::{format_header, CaptureOptions, ContextDump, RunContext};
//! # use std::path::Path;
//!
//! let ctx = RunContext::capture(&CaptureOptions {
//!     author: "ada".into(),
//!     repo_dir: ".".into(),
//!     ..Default::default()
//! })
//! .attach_config_or_warn(Path::new("configs/run.toml"));
//!
//! print!("{}", format_header(&ctx));
//! ContextDump::new(Path::new("results/study01"), "study01").write(&ctx)?;
//! # Ok::<(), studyrun::context::ContextError>(())
//! ```

mod dump;
mod format;
mod record;
mod system;

pub use dump::{ContextDump, DumpedContext};
pub use format::{command_line, format_header, DATE_FORMAT, GIT_UNAVAILABLE};
pub use record::{CaptureOptions, ConfigAttachment, ContextError, RunContext};
pub use system::{own_version, SystemInfo};
