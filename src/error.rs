//! Library error type.
//!
//! Query evaluation never fails; errors only come out of fetching upstream
//! dumps, decoding whole documents, and reading or writing the snapshot file.

use std::path::PathBuf;

use crate::model::Collection;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Transport-level failure while downloading a release asset.
    #[error("failed to fetch {file}: {source}")]
    Fetch {
        file: String,
        #[source]
        source: reqwest::Error,
    },

    /// The release server answered with something other than 200.
    #[error("failed to fetch {file}: HTTP {status}")]
    Status { file: String, status: u16 },

    /// The document is not a keyed JSON collection at all.
    #[error("failed to decode {collection} dump: {source}")]
    Decode {
        collection: Collection,
        #[source]
        source: serde_json::Error,
    },

    #[error("snapshot {}: {source}", path.display())]
    SnapshotIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("snapshot {} is not a valid index: {source}", path.display())]
    SnapshotFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("an index refresh is already in progress")]
    RefreshInProgress,

    #[error("index build task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
