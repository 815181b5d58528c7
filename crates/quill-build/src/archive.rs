//! Access to files packed inside zip/jar archives

use crate::error::{BuildError, BuildResult};
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

/// A file stored inside an archive
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArchiveEntry {
    /// Archive on disk
    pub archive: PathBuf,
    /// Slash-separated path of the member inside the archive
    pub entry: String,
}

impl ArchiveEntry {
    pub fn new(archive: impl Into<PathBuf>, entry: impl Into<String>) -> Self {
        Self {
            archive: archive.into(),
            entry: entry.into(),
        }
    }

    /// Path of the entry relative to an extraction root
    pub fn relative_path(&self) -> PathBuf {
        self.entry.split('/').filter(|s| !s.is_empty()).collect()
    }

    /// Read the entry as UTF-8 text
    pub fn read_to_string(&self) -> BuildResult<String> {
        let file = File::open(&self.archive).map_err(|e| BuildError::io(&self.archive, e))?;
        let mut zip =
            zip::ZipArchive::new(file).map_err(|e| BuildError::archive(&self.archive, e))?;
        let mut member = zip
            .by_name(&self.entry)
            .map_err(|e| BuildError::archive(&self.archive, e))?;

        let mut contents = String::new();
        member
            .read_to_string(&mut contents)
            .map_err(|e| BuildError::io(self.display_path(), e))?;
        Ok(contents)
    }

    /// Write the entry beneath `output_dir`, keeping its archive-relative path.
    ///
    /// Existing files are left untouched.
    pub fn extract_to(&self, output_dir: &Path) -> BuildResult<PathBuf> {
        let target = output_dir.join(self.relative_path());
        if target.exists() {
            tracing::debug!(path = %target.display(), "archive entry already extracted");
            return Ok(target);
        }

        let contents = self.read_to_string()?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| BuildError::io(parent, e))?;
        }
        fs::write(&target, contents).map_err(|e| BuildError::io(&target, e))?;
        tracing::debug!(entry = %self.entry, path = %target.display(), "extracted archive entry");
        Ok(target)
    }

    /// `archive.jar!/entry` style path for diagnostics
    pub fn display_path(&self) -> PathBuf {
        PathBuf::from(format!("{}!/{}", self.archive.display(), self.entry))
    }
}
