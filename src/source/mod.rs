//! Upstream sources and their normalization into canonical records.
//!
//! Every upstream dump is described by a [`SourceSpec`]: the file it is
//! published as, how its records are laid out, and how package positions
//! become source-browsing URLs. A single [`normalize`] operation turns the raw
//! bytes of any source into a keyed collection of canonical records.
//!
//! # Sources
//!
//! | Collection | File | Layout | Records |
//! |------------|------|--------|---------|
//! | `nixos` | `nixos.json` | flat | options |
//! | `home-manager` | `home-manager.json` | flat | options |
//! | `darwin` | `darwin.json` | wrapped | options |
//! | `nixpkgs` | `nixpkgs.json` | wrapped | packages |
//! | `nur` | `nur.json` | wrapped | packages |
//!
//! # Example
//!
//! ```
//! use nixsearch::model::Collection;
//! use nixsearch::source::{normalize, Normalized, SourceSpec};
//!
//! let spec = SourceSpec::of(Collection::Darwin);
//! let bytes = br#"{"version": 1, "packages": {"system.stateVersion": {"type": "int"}}}"#;
//! match normalize(spec, bytes).unwrap() {
//!     Normalized::Options(_, options) => assert_eq!(options.len(), 1),
//!     Normalized::Packages(..) => unreachable!(),
//! }
//! ```

mod raw;

pub use raw::Layout;

use raw::{RawOption, RawPackage};

use crate::error::{Error, Result};
use crate::model::{
    simplify_platforms, CanonicalOption, CanonicalPackage, Collection, Index, OptionSource,
    Options, Origin, PackageSource, Packages,
};

const NIXPKGS_BLOB_URL: &str = "https://github.com/NixOS/nixpkgs/blob/nixos-unstable/";

/// How a package `position` (`path/to/file.nix:42`) becomes `positionUrl`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionUrl {
    /// Rewrite the last `:line` to `#Lline` and prefix a browsing base URL.
    Blob(&'static str),
    /// Keep the raw position.
    Verbatim,
}

impl PositionUrl {
    pub fn resolve(&self, position: &str) -> String {
        if position.is_empty() {
            return String::new();
        }
        match self {
            PositionUrl::Blob(base) => match position.rsplit_once(':') {
                Some((path, line)) => format!("{base}{path}#L{line}"),
                None => format!("{base}{position}"),
            },
            PositionUrl::Verbatim => position.to_string(),
        }
    }
}

/// Per-source normalization settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceSpec {
    pub collection: Collection,
    /// Release asset name.
    pub file: &'static str,
    pub layout: Layout,
    pub position_url: PositionUrl,
}

/// All upstream sources, in merge order.
pub const SOURCES: [SourceSpec; 5] = [
    SourceSpec {
        collection: Collection::Nixos,
        file: "nixos.json",
        layout: Layout::Flat,
        position_url: PositionUrl::Verbatim,
    },
    SourceSpec {
        collection: Collection::HomeManager,
        file: "home-manager.json",
        layout: Layout::Flat,
        position_url: PositionUrl::Verbatim,
    },
    SourceSpec {
        collection: Collection::Darwin,
        file: "darwin.json",
        layout: Layout::Wrapped,
        position_url: PositionUrl::Verbatim,
    },
    SourceSpec {
        collection: Collection::Nixpkgs,
        file: "nixpkgs.json",
        layout: Layout::Wrapped,
        position_url: PositionUrl::Blob(NIXPKGS_BLOB_URL),
    },
    SourceSpec {
        collection: Collection::Nur,
        file: "nur.json",
        layout: Layout::Wrapped,
        position_url: PositionUrl::Verbatim,
    },
];

impl SourceSpec {
    pub fn of(collection: Collection) -> &'static SourceSpec {
        match collection {
            Collection::Nixos => &SOURCES[0],
            Collection::HomeManager => &SOURCES[1],
            Collection::Darwin => &SOURCES[2],
            Collection::Nixpkgs => &SOURCES[3],
            Collection::Nur => &SOURCES[4],
        }
    }
}

/// A normalized collection, tagged with the source it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    Options(OptionSource, Options),
    Packages(PackageSource, Packages),
}

impl Normalized {
    pub fn len(&self) -> usize {
        match self {
            Normalized::Options(_, options) => options.len(),
            Normalized::Packages(_, packages) => packages.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Moves the collection into its slot of `index`.
    pub fn install(self, index: &mut Index) {
        match self {
            Normalized::Options(source, options) => *index.options_mut(source) = options,
            Normalized::Packages(source, packages) => *index.packages_mut(source) = packages,
        }
    }
}

/// Normalizes one upstream document.
///
/// Every key of the upstream collection yields exactly one record; malformed
/// fields degrade to defaults. Only a document that is not a keyed JSON
/// collection at all is an error.
pub fn normalize(spec: &SourceSpec, bytes: &[u8]) -> Result<Normalized> {
    let decode_error = |source| Error::Decode {
        collection: spec.collection,
        source,
    };

    let normalized = match spec.collection.origin() {
        Origin::Option(source) => {
            let raw: std::collections::BTreeMap<String, RawOption> =
                spec.layout.decode(bytes).map_err(decode_error)?;
            Normalized::Options(
                source,
                raw.into_iter()
                    .map(|(key, option)| (key, option_record(source, option)))
                    .collect(),
            )
        }
        Origin::Package(source) => {
            let raw: std::collections::BTreeMap<String, RawPackage> =
                spec.layout.decode(bytes).map_err(decode_error)?;
            Normalized::Packages(
                source,
                raw.into_iter()
                    .map(|(key, package)| (key, package_record(spec, source, package)))
                    .collect(),
            )
        }
    };

    tracing::debug!(
        collection = %spec.collection,
        records = normalized.len(),
        "normalized source"
    );
    Ok(normalized)
}

fn option_record(source: OptionSource, raw: RawOption) -> CanonicalOption {
    CanonicalOption {
        source,
        description: raw.description,
        example: raw.example,
        option_type: raw.option_type,
        default: raw.default,
        declarations: raw.declarations,
    }
}

fn package_record(spec: &SourceSpec, source: PackageSource, raw: RawPackage) -> CanonicalPackage {
    let meta = raw.meta;
    CanonicalPackage {
        source,
        name: meta.name,
        version: raw.version,
        description: meta.description,
        long_description: meta.long_description,
        main_program: meta.main_program,
        homepages: meta.homepage,
        maintainers: meta.maintainers,
        platforms_simplified: simplify_platforms(&meta.platforms),
        platforms: meta.platforms,
        position_url: spec.position_url.resolve(&meta.position),
        position: meta.position,
        broken: meta.broken,
        licenses: meta.license,
        unfree: meta.unfree,
        insecure: meta.insecure,
        known_vulnerabilities: meta.known_vulnerabilities,
    }
}
