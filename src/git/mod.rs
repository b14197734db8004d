//! Git queries used for run-context capture
//!
//! Everything here is best-effort: outside a repository, or without a git
//! binary, callers get `None` rather than an error.

mod snapshot;
mod status;

pub use snapshot::{GitSnapshot, SHORT_HASH_LEN};
pub use status::GitDiffStats;
