//! Durable single-writer file: write new, rename into place, keep previous.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// A small state file replaced as a whole on every update.
///
/// `replace` writes `<path>.tmp` and syncs it, moves the current file to
/// `<path>.old`, then renames the temp file into place. After a crash at any
/// step, either `<path>` or `<path>.old` holds a complete version; `.tmp` is
/// never read.
#[derive(Debug, Clone)]
pub struct DurableFile {
    path: PathBuf,
}

impl DurableFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Previous version, kept as a recovery fallback.
    pub fn backup_path(&self) -> PathBuf {
        with_suffix(&self.path, ".old")
    }

    fn temp_path(&self) -> PathBuf {
        with_suffix(&self.path, ".tmp")
    }

    /// Contents of the current version, `None` if absent.
    pub fn read_current(&self) -> Result<Option<String>> {
        read_optional(&self.path)
    }

    /// Contents of the backup version, `None` if absent.
    pub fn read_backup(&self) -> Result<Option<String>> {
        read_optional(&self.backup_path())
    }

    /// Replace the current version with `contents`, keeping the previous one as backup.
    pub fn replace(&self, contents: &str) -> Result<()> {
        let tmp = self.temp_path();
        {
            let mut f = File::create(&tmp)
                .with_context(|| format!("create {}", tmp.display()))?;
            f.write_all(contents.as_bytes())
                .with_context(|| format!("write {}", tmp.display()))?;
            f.sync_all()
                .with_context(|| format!("sync {}", tmp.display()))?;
        }
        if self.path.exists() {
            let old = self.backup_path();
            std::fs::rename(&self.path, &old).with_context(|| {
                format!("rename {} to {}", self.path.display(), old.display())
            })?;
        }
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("rename {} to {}", tmp.display(), self.path.display()))?;
        sync_parent_dir(&self.path);
        Ok(())
    }

    /// Remove the backup and any leftover temp file, keeping the current version.
    pub fn discard_backup(&self) -> Result<()> {
        remove_if_exists(&self.backup_path())?;
        remove_if_exists(&self.temp_path())
    }

    /// Remove every artifact (current, backup, temp).
    pub fn remove_all(&self) -> Result<()> {
        remove_if_exists(&self.path)?;
        self.discard_backup()
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut o = path.as_os_str().to_owned();
    o.push(suffix);
    PathBuf::from(o)
}

fn read_optional(path: &Path) -> Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(s) => Ok(Some(s)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("read {}", path.display())),
    }
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("remove {}", path.display())),
    }
}

/// Persist the renames themselves. Best effort: not every platform can open a directory.
fn sync_parent_dir(path: &Path) {
    #[cfg(unix)]
    {
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        if let Ok(dir) = File::open(parent) {
            let _ = dir.sync_all();
        }
    }
    #[cfg(not(unix))]
    let _ = path;
}
