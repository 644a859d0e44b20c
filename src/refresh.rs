//! Index rebuild driver.
//!
//! A refresh downloads the five upstream dumps and the release `version`,
//! normalizes them into a brand-new [`Index`] off to the side, writes the
//! snapshot file and publishes the result through the [`IndexHandle`].
//! Any failure before publication aborts the cycle and leaves the previous
//! snapshot serving.

use async_trait::async_trait;
use futures::future::try_join_all;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::model::Index;
use crate::snapshot::SnapshotFile;
use crate::source::{normalize, SourceSpec, SOURCES};
use crate::store::IndexHandle;

/// Release asset holding the upstream version string.
pub const VERSION_FILE: &str = "version";

/// Source of release assets.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Returns the raw bytes of one release asset.
    async fn fetch(&self, file: &str) -> Result<Vec<u8>>;
}

/// Downloads release assets over HTTP from a base URL.
pub struct ReleaseFetcher {
    client: reqwest::Client,
    base_url: String,
}

impl ReleaseFetcher {
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    pub fn url(&self, file: &str) -> String {
        format!("{}{}", self.base_url, file)
    }
}

#[async_trait]
impl Fetcher for ReleaseFetcher {
    async fn fetch(&self, file: &str) -> Result<Vec<u8>> {
        let url = self.url(file);
        tracing::info!(%url, "downloading release asset");

        let transport = |source| Error::Fetch {
            file: file.to_string(),
            source,
        };
        let response = self.client.get(&url).send().await.map_err(transport)?;
        if !response.status().is_success() {
            return Err(Error::Status {
                file: file.to_string(),
                status: response.status().as_u16(),
            });
        }
        let bytes = response.bytes().await.map_err(transport)?;

        tracing::info!(file, bytes = bytes.len(), "downloaded release asset");
        Ok(bytes.to_vec())
    }
}

/// Normalizes downloaded dumps into a stamped index.
///
/// Fails if any one source fails to decode; there is no partial index.
pub fn build_index(version: &str, payloads: Vec<(&'static SourceSpec, Vec<u8>)>) -> Result<Index> {
    let mut index = Index::default();
    for (spec, bytes) in payloads {
        normalize(spec, &bytes)?.install(&mut index);
    }
    Ok(index.stamp(version))
}

/// Rebuilds and publishes the index; at most one rebuild runs at a time.
pub struct Refresher<F> {
    fetcher: F,
    index: Arc<IndexHandle>,
    snapshot: Option<SnapshotFile>,
    in_flight: Mutex<()>,
}

impl<F: Fetcher> Refresher<F> {
    pub fn new(fetcher: F, index: Arc<IndexHandle>, snapshot: Option<SnapshotFile>) -> Self {
        Self {
            fetcher,
            index,
            snapshot,
            in_flight: Mutex::new(()),
        }
    }

    pub fn index(&self) -> &Arc<IndexHandle> {
        &self.index
    }

    /// Runs one refresh cycle.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RefreshInProgress`] if another cycle is running, or
    /// the first fetch/decode error. In both cases the current snapshot is
    /// left untouched.
    pub async fn refresh(&self) -> Result<Arc<Index>> {
        let _guard = self.in_flight.try_lock().map_err(|_| Error::RefreshInProgress)?;
        let started = Instant::now();
        tracing::info!("refreshing index");

        let (version, payloads) = futures::try_join!(self.fetch_version(), self.fetch_sources())?;

        let snapshot = self.snapshot.clone();
        let index = tokio::task::spawn_blocking(move || -> Result<Index> {
            let index = build_index(&version, payloads)?;
            if let Some(snapshot) = snapshot {
                if let Err(err) = snapshot.save(&index) {
                    tracing::warn!(error = %err, "failed to write index snapshot");
                }
            }
            Ok(index)
        })
        .await??;

        let index = self.index.publish(index);
        tracing::info!(
            records = index.total(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            generation = self.index.generation(),
            "index refreshed"
        );
        Ok(index)
    }

    /// Runs one refresh cycle, logging a failure instead of returning it.
    /// Returns whether a new snapshot was published.
    pub async fn refresh_or_keep(&self) -> bool {
        match self.refresh().await {
            Ok(_) => true,
            Err(Error::RefreshInProgress) => {
                tracing::debug!("skipping refresh, one is already running");
                false
            }
            Err(err) => {
                tracing::error!(error = %err, "index refresh failed, keeping previous snapshot");
                false
            }
        }
    }

    async fn fetch_version(&self) -> Result<String> {
        let bytes = self.fetcher.fetch(VERSION_FILE).await?;
        Ok(String::from_utf8_lossy(&bytes).trim().to_string())
    }

    async fn fetch_sources(&self) -> Result<Vec<(&'static SourceSpec, Vec<u8>)>> {
        try_join_all(SOURCES.iter().map(|spec| async move {
            let bytes = self.fetcher.fetch(spec.file).await?;
            Ok::<_, Error>((spec, bytes))
        }))
        .await
    }
}
