pub mod config;
pub mod context;
pub mod decode;
pub mod error;
pub mod model;
pub mod output;
pub mod refresh;
pub mod search;
pub mod server;
pub mod snapshot;
pub mod source;
pub mod store;

pub use config::Config;
pub use context::Context;
pub use error::{Error, Result};
pub use model::{CanonicalOption, CanonicalPackage, Collection, Index, Kind};
pub use refresh::{Fetcher, ReleaseFetcher, Refresher};
pub use search::{search, PackageOrOption, Query};
pub use snapshot::SnapshotFile;
pub use source::{normalize, SourceSpec};
pub use store::IndexHandle;
