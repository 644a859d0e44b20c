//! Keyword search over an [`Index`](crate::model::Index) snapshot.
//!
//! A query string is first parsed into a [`Query`] (mode, exclusions and an
//! ordered list of filters), then [`execute`]d: active collections are
//! narrowed filter by filter, merged into one list and ranked
//! shortest-key-first. There is no relevance scoring.
//!
//! # Query syntax
//!
//! | Term | Effect |
//! |------|--------|
//! | `package` / `option` (first term) | only package / option collections |
//! | `!nixos` `!home-manager` `!darwin` `!nixpkgs` `!nur` | drop that collection |
//! | `?maintainer=<handle>` | packages maintained by a GitHub handle |
//! | `?broken` | packages marked broken |
//! | `^text` / `text$` | key starts / ends with `text` |
//! | `text` | `"<collection> <option\|package> <key>"` contains `text` |
//!
//! # Example
//!
//! ```
//! use nixsearch::model::{CanonicalPackage, Index, PackageSource};
//! use nixsearch::search::search;
//!
//! let mut index = Index::default();
//! index.nixpkgs.insert(
//!     "ripgrep".to_string(),
//!     CanonicalPackage::new(PackageSource::Nixpkgs, "ripgrep-14.1.1", "14.1.1"),
//! );
//!
//! let results = search(&index, "package ^rip");
//! assert_eq!(results[0].key, "ripgrep");
//! ```

mod engine;
mod query;

pub use engine::{execute, rank_key, rank_len, search};
pub use query::{Filter, Mode, Pattern, Query};

use serde::{Deserialize, Serialize};

use crate::model::{Collection, Kind};

/// One search hit, flattened from whichever collection it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageOrOption {
    pub kind: Kind,
    pub source: Collection,
    pub key: String,
    pub description: String,
    pub broken: bool,
    pub insecure: bool,
}
