//! Canonical record types shared by the normalizers, the index and search.
//!
//! This module contains the strictly typed shapes every upstream dump is
//! normalized into:
//!
//! - [`CanonicalOption`] - A configuration option (NixOS, Home-Manager, nix-darwin)
//! - [`CanonicalPackage`] - A buildable package (nixpkgs, NUR)
//! - [`Collection`] - One of the five keyed collections of the [`Index`]
//! - [`Platform`] - Simplified platform family derived from raw platform strings
//! - [`Index`] - One complete snapshot of all five collections
//!
//! # Example
//!
//! ```
//! use nixsearch::model::{Collection, Kind};
//!
//! let collection: Collection = "home-manager".parse().unwrap();
//! assert_eq!(collection.kind(), Kind::Option);
//! ```

mod index;
mod option;
mod package;
mod platform;

pub use index::*;
pub use option::*;
pub use package::*;
pub use platform::*;

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Role of a record: something you configure or something you install.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Option,
    Package,
}

impl Kind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Option => "option",
            Kind::Package => "package",
        }
    }
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Upstream of an option record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OptionSource {
    #[serde(alias = "nixpkgs")]
    Nixos,
    HomeManager,
    Darwin,
}

/// Upstream of a package record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageSource {
    Nixpkgs,
    Nur,
}

/// The typed origin behind a [`Collection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Option(OptionSource),
    Package(PackageSource),
}

/// One of the five independent key namespaces of the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Collection {
    Nixos,
    HomeManager,
    Darwin,
    Nixpkgs,
    Nur,
}

impl Collection {
    /// All collections, in merge order.
    pub const ALL: [Collection; 5] = [
        Collection::Nixos,
        Collection::HomeManager,
        Collection::Darwin,
        Collection::Nixpkgs,
        Collection::Nur,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Nixos => "nixos",
            Collection::HomeManager => "home-manager",
            Collection::Darwin => "darwin",
            Collection::Nixpkgs => "nixpkgs",
            Collection::Nur => "nur",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Collection::Nixos => "NixOS",
            Collection::HomeManager => "Home Manager",
            Collection::Darwin => "nix-darwin",
            Collection::Nixpkgs => "Nixpkgs",
            Collection::Nur => "NUR",
        }
    }

    pub fn origin(&self) -> Origin {
        match self {
            Collection::Nixos => Origin::Option(OptionSource::Nixos),
            Collection::HomeManager => Origin::Option(OptionSource::HomeManager),
            Collection::Darwin => Origin::Option(OptionSource::Darwin),
            Collection::Nixpkgs => Origin::Package(PackageSource::Nixpkgs),
            Collection::Nur => Origin::Package(PackageSource::Nur),
        }
    }

    pub fn kind(&self) -> Kind {
        match self.origin() {
            Origin::Option(_) => Kind::Option,
            Origin::Package(_) => Kind::Package,
        }
    }
}

impl From<OptionSource> for Collection {
    fn from(source: OptionSource) -> Self {
        match source {
            OptionSource::Nixos => Collection::Nixos,
            OptionSource::HomeManager => Collection::HomeManager,
            OptionSource::Darwin => Collection::Darwin,
        }
    }
}

impl From<PackageSource> for Collection {
    fn from(source: PackageSource) -> Self {
        match source {
            PackageSource::Nixpkgs => Collection::Nixpkgs,
            PackageSource::Nur => Collection::Nur,
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Collection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "nixos" => Ok(Collection::Nixos),
            "home-manager" | "homemanager" => Ok(Collection::HomeManager),
            "darwin" => Ok(Collection::Darwin),
            "nixpkgs" => Ok(Collection::Nixpkgs),
            "nur" => Ok(Collection::Nur),
            _ => Err(format!(
                "Unknown collection: {}. Use: nixos, home-manager, darwin, nixpkgs, nur",
                s
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_round_trips_through_str() {
        for collection in Collection::ALL {
            assert_eq!(collection.as_str().parse::<Collection>(), Ok(collection));
        }
        assert_eq!("homemanager".parse(), Ok(Collection::HomeManager));
        assert!("flakes".parse::<Collection>().is_err());
    }

    #[test]
    fn test_collection_kind() {
        assert_eq!(Collection::Nixos.kind(), Kind::Option);
        assert_eq!(Collection::Darwin.kind(), Kind::Option);
        assert_eq!(Collection::Nixpkgs.kind(), Kind::Package);
        assert_eq!(Collection::Nur.kind(), Kind::Package);
    }

    #[test]
    fn test_source_serialization_matches_collection_names() {
        assert_eq!(
            serde_json::to_string(&OptionSource::HomeManager).unwrap(),
            "\"home-manager\""
        );
        assert_eq!(serde_json::to_string(&PackageSource::Nur).unwrap(), "\"nur\"");
        assert_eq!(
            Collection::from(OptionSource::HomeManager).as_str(),
            "home-manager"
        );
    }
}
