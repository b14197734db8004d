//! Path utilities for studyrun output trees and user-level files

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Subdirectory of an output root that holds context dumps
pub const CONTEXT_SUBDIR: &str = "_context";

/// Subdirectory of an output root that holds launcher logs
pub const LOGS_SUBDIR: &str = "_logs";

/// Get the user-level studyrun directory (~/.studyrun)
pub fn user_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".studyrun"))
        .unwrap_or_else(|| PathBuf::from(".studyrun"))
}

/// Get the user-level config file path (~/.studyrun/config.toml)
pub fn user_config_path() -> PathBuf {
    user_dir().join("config.toml")
}

/// Normalize an application identifier for use as a directory name.
///
/// Lowercases and replaces spaces with underscores, so "Study 01" and
/// "study_01" land in the same place.
pub fn normalize_app_id(app_id: &str) -> String {
    app_id.trim().to_lowercase().replace(' ', "_")
}

/// `<out>/_context/<app_id>`
pub fn context_dir(out_dir: &Path, app_id: &str) -> PathBuf {
    out_dir.join(CONTEXT_SUBDIR).join(normalize_app_id(app_id))
}

/// `<out>/_logs/<app_id>`
pub fn logs_dir(out_dir: &Path, app_id: &str) -> PathBuf {
    out_dir.join(LOGS_SUBDIR).join(normalize_app_id(app_id))
}

/// Create a directory (and its parents) if it does not exist yet
pub fn ensure_dir(dir: &Path) -> io::Result<()> {
    if !dir.is_dir() {
        tracing::debug!(path = %dir.display(), "Creating output directory");
        fs::create_dir_all(dir)?;
    }
    Ok(())
}

/// Return a path that does not collide with existing files by appending a
/// zero-padded counter to the file stem: `info.txt` -> `info_001.txt`.
///
/// The counter continues after the highest existing one, so removed files
/// never cause a number to be reused. With `skip_first`, the bare path is
/// returned as long as neither it nor any counted sibling exists.
///
/// The parent directory is created if needed.
pub fn ensure_counted_path(path: &Path, separator: &str, skip_first: bool) -> io::Result<PathBuf> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    ensure_dir(&parent)?;

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = path.extension().map(|e| e.to_string_lossy().into_owned());

    let mut highest: Option<u32> = None;
    for entry in fs::read_dir(&parent)? {
        let entry_path = entry?.path();
        let entry_ext = entry_path
            .extension()
            .map(|e| e.to_string_lossy().into_owned());
        if entry_ext != extension {
            continue;
        }
        let Some(entry_stem) = entry_path.file_stem().map(|s| s.to_string_lossy()) else {
            continue;
        };
        if let Some(count) = parse_count(&entry_stem, &stem, separator) {
            highest = Some(highest.map_or(count, |h| h.max(count)));
        }
    }

    let count = match highest {
        Some(n) => n + 1,
        None if skip_first && !path.exists() => return Ok(path.to_path_buf()),
        None => 1,
    };

    let file_name = match &extension {
        Some(ext) => format!("{stem}{separator}{count:03}.{ext}"),
        None => format!("{stem}{separator}{count:03}"),
    };
    Ok(parent.join(file_name))
}

fn parse_count(candidate: &str, stem: &str, separator: &str) -> Option<u32> {
    let digits = candidate.strip_prefix(stem)?.strip_prefix(separator)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}
