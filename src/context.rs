//! Running service state: the published index, its refresher and the
//! periodic refresh task.
//!
//! There is no global state; everything a request handler or the CLI needs
//! hangs off one [`Context`].

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::config::Config;
use crate::error::Result;
use crate::model::Index;
use crate::refresh::{Fetcher, ReleaseFetcher, Refresher};
use crate::search::PackageOrOption;
use crate::snapshot::SnapshotFile;
use crate::store::IndexHandle;

pub struct Context<F> {
    index: Arc<IndexHandle>,
    refresher: Arc<Refresher<F>>,
    shutdown: watch::Sender<bool>,
    refresh_task: Option<JoinHandle<()>>,
}

impl Context<ReleaseFetcher> {
    /// Builds a context from configuration and loads the initial index.
    pub async fn from_config(config: &Config) -> Self {
        let fetcher = ReleaseFetcher::new(config.release_url.clone());
        let snapshot = SnapshotFile::new(config.index_path.clone());
        Self::init(fetcher, Some(snapshot)).await
    }
}

impl<F: Fetcher + 'static> Context<F> {
    pub fn new(fetcher: F, snapshot: Option<SnapshotFile>) -> Self {
        let index = Arc::new(IndexHandle::default());
        let refresher = Arc::new(Refresher::new(fetcher, Arc::clone(&index), snapshot));
        let (shutdown, _) = watch::channel(false);
        Self {
            index,
            refresher,
            shutdown,
            refresh_task: None,
        }
    }

    /// Creates the context and fills the index.
    ///
    /// A readable snapshot file is published as is. Without one, a refresh
    /// runs right away; if that fails too, the context serves an empty index
    /// until a later refresh succeeds.
    pub async fn init(fetcher: F, snapshot: Option<SnapshotFile>) -> Self {
        let context = Self::new(fetcher, snapshot.clone());

        let loaded = match snapshot.as_ref().map(SnapshotFile::load) {
            Some(Ok(Some(index))) => Some(index),
            Some(Ok(None)) | None => None,
            Some(Err(err)) => {
                tracing::warn!(error = %err, "ignoring unreadable index snapshot");
                None
            }
        };

        match loaded {
            Some(index) => {
                context.index.publish(index);
            }
            None => {
                context.refresher.refresh_or_keep().await;
            }
        }
        context
    }

    pub fn index(&self) -> &Arc<IndexHandle> {
        &self.index
    }

    pub fn snapshot(&self) -> Arc<Index> {
        self.index.load()
    }

    pub fn search(&self, query: &str) -> Vec<PackageOrOption> {
        self.index.search(query)
    }

    pub async fn refresh(&self) -> Result<Arc<Index>> {
        self.refresher.refresh().await
    }

    /// Starts refreshing every `every`, first tick one period from now.
    ///
    /// Ticks that land while a refresh is still running are delayed, not
    /// queued up. Calling this again replaces the previous task.
    pub fn spawn_refresh_loop(&mut self, every: Duration) {
        if let Some(task) = self.refresh_task.take() {
            task.abort();
        }

        let refresher = Arc::clone(&self.refresher);
        let mut shutdown = self.shutdown.subscribe();
        let task = tokio::spawn(async move {
            let mut ticks = interval_at(Instant::now() + every, every);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticks.tick() => {
                        refresher.refresh_or_keep().await;
                    }
                    _ = shutdown.changed() => break,
                }
            }
            tracing::debug!("refresh loop stopped");
        });
        tracing::info!(interval_secs = every.as_secs(), "scheduled index refresh");
        self.refresh_task = Some(task);
    }

    /// Stops the refresh loop and waits for it to finish.
    pub async fn shutdown(mut self) {
        let _ = self.shutdown.send(true);
        if let Some(task) = self.refresh_task.take() {
            if let Err(err) = task.await {
                tracing::warn!(error = %err, "refresh loop ended abnormally");
            }
        }
    }
}
