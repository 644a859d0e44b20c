//! On-disk index snapshot.
//!
//! The snapshot is the whole [`Index`] serialized as one JSON document. It is
//! written after every successful refresh and read back on start, so a
//! restarted process can serve immediately without re-downloading.
//!
//! # Location
//!
//! Unless configured otherwise the snapshot lives in the platform data
//! directory:
//! - Linux: `~/.local/share/nixsearch/index.json`
//! - macOS: `~/Library/Application Support/nixsearch/index.json`
//! - Windows: `%APPDATA%\nixsearch\index.json`
//!
//! # Example
//!
//! ```no_run
//! use nixsearch::snapshot::SnapshotFile;
//!
//! let snapshot = SnapshotFile::new("/var/lib/nixsearch/index.json");
//! if let Some(index) = snapshot.load().unwrap() {
//!     println!("{} records", index.total());
//! }
//! ```

use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::model::Index;

#[derive(Debug, Clone)]
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    fn io_error(&self, source: std::io::Error) -> Error {
        Error::SnapshotIo {
            path: self.path.clone(),
            source,
        }
    }

    /// Reads the snapshot.
    ///
    /// Returns `Ok(None)` if there is no snapshot file yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or is not a
    /// valid index document.
    pub fn load(&self) -> Result<Option<Index>> {
        let file = match fs::File::open(&self.path) {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(self.io_error(err)),
        };

        let index: Index =
            serde_json::from_reader(BufReader::new(file)).map_err(|source| Error::SnapshotFormat {
                path: self.path.clone(),
                source,
            })?;
        tracing::info!(path = %self.path.display(), records = index.total(), "loaded index snapshot");
        Ok(Some(index))
    }

    /// Writes the snapshot.
    ///
    /// The document is written next to the target and renamed into place,
    /// so a concurrent reader never sees a partial file. Creates the parent
    /// directory if it doesn't exist.
    pub fn save(&self, index: &Index) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|err| self.io_error(err))?;
            }
        }

        let staging = self.path.with_extension("json.tmp");
        let written = self
            .write_staging(&staging, index)
            .and_then(|()| fs::rename(&staging, &self.path).map_err(|err| self.io_error(err)));
        if let Err(err) = written {
            if let Err(cleanup) = fs::remove_file(&staging) {
                if cleanup.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(path = %staging.display(), error = %cleanup, "failed to remove staging file");
                }
            }
            return Err(err);
        }

        tracing::info!(path = %self.path.display(), records = index.total(), "wrote index snapshot");
        Ok(())
    }

    fn write_staging(&self, staging: &Path, index: &Index) -> Result<()> {
        let file = fs::File::create(staging).map_err(|err| self.io_error(err))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, index).map_err(|source| Error::SnapshotFormat {
            path: staging.to_path_buf(),
            source,
        })?;
        writer.flush().map_err(|err| self.io_error(err))
    }
}
