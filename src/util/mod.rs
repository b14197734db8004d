//! Utility modules

pub mod checksum;
pub mod paths;

pub use checksum::{
    dir_checksums, file_checksum, write_manifest, write_manifest_file, ChecksumEntry,
    ChecksumError, ChecksumOptions,
};
pub use paths::{context_dir, ensure_counted_path, ensure_dir, logs_dir, normalize_app_id};
