//! Filesystem backend.
//!
//! Each entry is one JSON file under the configured root, named by a
//! filesafe transform of its ID. Files are opened per operation; nothing is
//! held open between calls.
//!
//! Writes stage the new JSON in a dot-prefixed temporary file in the root and
//! rename it over the entry's file, so a concurrent reader sees either the
//! old or the new entry, never a partial one. Filesafe names never start with
//! a dot, and scans skip dot-prefixed files.

use std::fs;
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};

use databank_core::{DriverError, DriverResult, Entry};
use once_cell::sync::Lazy;
use regex::Regex;
use tempfile::NamedTempFile;

use crate::driver::{BulkOutcome, Driver};

static UNSAFE_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9._-]").expect("Invalid filesafe regex"));

const STAGING_PREFIX: &str = ".staging-";

/// One-way transform from an ID to a filename.
///
/// Every character outside `[A-Za-z0-9._-]` becomes `_`, so distinct IDs may
/// collide if they differ only in such characters. A leading `.` also becomes
/// `_` and the empty ID maps to `_`, so no ID names the root, its parent or a
/// hidden file.
pub fn filesafe(id: &str) -> String {
    let safe = UNSAFE_CHARS.replace_all(id, "_").into_owned();
    if let Some(rest) = safe.strip_prefix('.') {
        return format!("_{rest}");
    }
    if safe.is_empty() {
        return "_".to_string();
    }
    safe
}

/// Configuration for [`DiskDriver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskConfig {
    /// Root directory holding one file per entry.
    pub path: PathBuf,
    /// Permission bits for directories created on write (unix only).
    pub dir_mode: u32,
    /// Permission bits for entry files, before the umask (unix only).
    pub file_mode: u32,
}

impl DiskConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            dir_mode: 0o755,
            file_mode: 0o666,
        }
    }

    pub fn with_dir_mode(mut self, mode: u32) -> Self {
        self.dir_mode = mode;
        self
    }

    pub fn with_file_mode(mut self, mode: u32) -> Self {
        self.file_mode = mode;
        self
    }
}

/// Driver persisting entries as JSON files.
#[derive(Debug, Clone)]
pub struct DiskDriver {
    config: DiskConfig,
}

impl DiskDriver {
    pub fn new(config: DiskConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DiskConfig {
        &self.config
    }

    /// Storage path for an ID.
    pub fn path_for(&self, id: &str) -> PathBuf {
        self.config.path.join(filesafe(id))
    }

    /// Make sure the root exists and is a directory.
    fn ensure_root(&self) -> DriverResult<()> {
        let root = &self.config.path;
        match fs::metadata(root) {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(DriverError::NotADirectory { path: root.clone() }),
            Err(e) if e.kind() == ErrorKind::NotFound => create_dir_all(root, self.config.dir_mode),
            Err(e) => Err(e.into()),
        }
    }

    /// Apply `step` to each stored entry, collecting errors.
    fn each_entry(&self, mut step: impl FnMut(Entry) -> DriverResult<bool>) -> BulkOutcome<u64> {
        let ids = match self.scan() {
            Ok(ids) => ids,
            Err(e) => return BulkOutcome::failed(0, e),
        };
        let mut outcome = BulkOutcome::ok(0);
        for id in ids {
            match self.read(&id) {
                Ok(Some(entry)) => match step(entry) {
                    Ok(true) => outcome.value += 1,
                    Ok(false) => {}
                    Err(e) => outcome.push_error(e),
                },
                Ok(None) => {}
                Err(e) => outcome.push_error(e),
            }
        }
        outcome
    }
}

/// Temporary file in the root, renamed into place once written.
fn staging_file(config: &DiskConfig) -> io::Result<NamedTempFile> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(STAGING_PREFIX).suffix(".tmp");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(fs::Permissions::from_mode(config.file_mode));
    }
    builder.tempfile_in(&config.path)
}

#[cfg(unix)]
fn create_dir_all(path: &Path, mode: u32) -> DriverResult<()> {
    use std::os::unix::fs::DirBuilderExt;
    fs::DirBuilder::new()
        .recursive(true)
        .mode(mode)
        .create(path)?;
    Ok(())
}

#[cfg(not(unix))]
fn create_dir_all(path: &Path, _mode: u32) -> DriverResult<()> {
    fs::create_dir_all(path)?;
    Ok(())
}

impl Driver for DiskDriver {
    fn cleanup(&self) -> BulkOutcome<u64> {
        self.each_entry(|entry| {
            if entry.is_expired() {
                self.delete(&entry.id())
            } else {
                Ok(false)
            }
        })
    }

    fn count(&self) -> DriverResult<u64> {
        Ok(self.scan()?.len() as u64)
    }

    fn delete(&self, id: &str) -> DriverResult<bool> {
        if !self.has(id)? {
            return Ok(true);
        }
        match fs::remove_file(self.path_for(id)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(true),
            Err(e) => Err(e.into()),
        }
    }

    fn flush(&self) -> BulkOutcome {
        let ids = match self.scan() {
            Ok(ids) => ids,
            Err(e) => return BulkOutcome::failed((), e),
        };
        let mut outcome = BulkOutcome::ok(());
        for id in ids {
            if let Err(e) = self.delete(&id) {
                outcome.push_error(e);
            }
        }
        outcome
    }

    fn has(&self, id: &str) -> DriverResult<bool> {
        let path = self.path_for(id);
        match fs::metadata(&path) {
            Ok(meta) if meta.is_file() => Ok(true),
            Ok(_) => Err(DriverError::NotARegularFile { path }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn read(&self, id: &str) -> DriverResult<Option<Entry>> {
        if !self.has(id)? {
            return Ok(None);
        }
        let bytes = match fs::read(self.path_for(id)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    fn review(&self) -> BulkOutcome<u64> {
        self.each_entry(|mut entry| {
            if entry.maybe_expire() {
                self.write(&entry)
            } else {
                Ok(false)
            }
        })
    }

    fn scan(&self) -> DriverResult<Vec<String>> {
        let dir = match fs::read_dir(&self.config.path) {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut ids = Vec::new();
        for item in dir {
            let item = item?;
            let name = item.file_name().to_string_lossy().into_owned();
            if item.file_type()?.is_file() && !name.starts_with('.') {
                ids.push(name);
            }
        }
        ids.sort();
        Ok(ids)
    }

    fn write(&self, entry: &Entry) -> DriverResult<bool> {
        self.ensure_root()?;
        let mut stored = entry.clone();
        stored.calculate_size();
        let json = serde_json::to_vec(&stored)?;

        let mut staged = staging_file(&self.config)?;
        staged.write_all(&json)?;
        staged
            .persist(self.path_for(&stored.id()))
            .map_err(|e| e.error)?;
        Ok(true)
    }
}
