//! SHA-256 checksums for study artifacts
//!
//! A single file yields one digest; a directory yields one entry per file
//! matching a glob, sorted by relative path so manifests of identical trees
//! compare equal line by line.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use ignore::overrides::OverrideBuilder;
use ignore::WalkBuilder;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Extension of checksum sidecar files, never hashed themselves
const CHECKSUM_EXTENSION: &str = "sha256";

#[derive(Error, Debug)]
pub enum ChecksumError {
    #[error("Path does not exist: {0}")]
    NotFound(PathBuf),
    #[error("Output file already exists: {0} (pass --force to replace)")]
    OutputExists(PathBuf),
    #[error("Invalid pattern: {0}")]
    Pattern(#[from] ignore::Error),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// One hashed file inside a directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumEntry {
    pub filename: String,
    /// Path relative to the scanned directory
    pub filepath: PathBuf,
    pub sha256: String,
}

/// Options for scanning a directory
#[derive(Debug, Clone)]
pub struct ChecksumOptions {
    /// Gitignore-style glob applied to file names
    pub pattern: String,
    pub recursive: bool,
    /// A file to leave out of the scan (typically the manifest being written)
    pub exclude: Option<PathBuf>,
}

impl Default for ChecksumOptions {
    fn default() -> Self {
        Self {
            pattern: "*".to_string(),
            recursive: false,
            exclude: None,
        }
    }
}

/// Compute the SHA-256 digest of a file as lowercase hex
pub fn file_checksum(path: &Path) -> Result<String, ChecksumError> {
    if !path.is_file() {
        return Err(ChecksumError::NotFound(path.to_path_buf()));
    }
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}

/// Hash every matching file beneath `dir`
pub fn dir_checksums(
    dir: &Path,
    options: &ChecksumOptions,
) -> Result<Vec<ChecksumEntry>, ChecksumError> {
    if !dir.is_dir() {
        return Err(ChecksumError::NotFound(dir.to_path_buf()));
    }

    let mut overrides = OverrideBuilder::new(dir);
    overrides.add(&options.pattern)?;
    let overrides = overrides.build()?;

    let walker = WalkBuilder::new(dir)
        .standard_filters(false)
        .follow_links(false)
        .overrides(overrides)
        .max_depth(if options.recursive { None } else { Some(1) })
        .build();

    let exclude = options
        .exclude
        .as_ref()
        .and_then(|p| p.canonicalize().ok());

    let mut entries = Vec::new();
    for result in walker {
        let entry = result?;
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let path = entry.path();
        if path
            .extension()
            .is_some_and(|ext| ext == CHECKSUM_EXTENSION)
        {
            continue;
        }
        if let Some(exclude) = &exclude {
            if path.canonicalize().ok().as_ref() == Some(exclude) {
                continue;
            }
        }

        let sha256 = file_checksum(path)?;
        let filepath = path.strip_prefix(dir).unwrap_or(path).to_path_buf();
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        tracing::trace!(path = %filepath.display(), %sha256, "Hashed file");
        entries.push(ChecksumEntry {
            filename,
            filepath,
            sha256,
        });
    }

    entries.sort_by(|a, b| a.filepath.cmp(&b.filepath));
    Ok(entries)
}

/// Write entries as `filename,filepath,sha256` CSV with a header row
pub fn write_manifest<W: Write>(w: &mut W, entries: &[ChecksumEntry]) -> io::Result<()> {
    writeln!(w, "filename,filepath,sha256")?;
    for entry in entries {
        writeln!(
            w,
            "{},{},{}",
            csv_field(&entry.filename),
            csv_field(&entry.filepath.to_string_lossy()),
            entry.sha256
        )?;
    }
    Ok(())
}

/// Write a manifest to `path`, refusing to replace an existing file
/// unless `force` is set
pub fn write_manifest_file(
    path: &Path,
    entries: &[ChecksumEntry],
    force: bool,
) -> Result<(), ChecksumError> {
    if path.exists() && !force {
        return Err(ChecksumError::OutputExists(path.to_path_buf()));
    }
    let mut file = io::BufWriter::new(File::create(path)?);
    write_manifest(&mut file, entries)?;
    file.flush()?;
    tracing::info!(path = %path.display(), files = entries.len(), "Wrote checksum manifest");
    Ok(())
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
