use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{
    CanonicalOption, CanonicalPackage, Collection, OptionSource, Options, Origin, PackageSource,
    Packages,
};

pub const INFO_VERSION: &str = "version";
pub const INFO_LAST_UPDATED: &str = "last-updated";
/// Home Manager count under its older, unhyphenated name. Written next to
/// `home-manager-length` for existing `/stats` consumers.
pub const INFO_HOMEMANAGER_LENGTH: &str = "homemanager-length";

/// One complete, internally consistent build of all five collections.
///
/// This is also the on-disk snapshot shape: a JSON object with the keys
/// `info`, `nixos`, `home-manager`, `darwin`, `nixpkgs` and `nur`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Index {
    #[serde(default, deserialize_with = "crate::decode::nullable")]
    pub info: BTreeMap<String, String>,

    #[serde(default, deserialize_with = "crate::decode::nullable")]
    pub nixos: Options,
    #[serde(
        default,
        rename = "home-manager",
        deserialize_with = "crate::decode::nullable"
    )]
    pub home_manager: Options,
    #[serde(default, deserialize_with = "crate::decode::nullable")]
    pub darwin: Options,

    #[serde(default, deserialize_with = "crate::decode::nullable")]
    pub nixpkgs: Packages,
    #[serde(default, deserialize_with = "crate::decode::nullable")]
    pub nur: Packages,
}

/// A borrowed record from any collection.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(untagged)]
pub enum Entry<'a> {
    Option(&'a CanonicalOption),
    Package(&'a CanonicalPackage),
}

impl Entry<'_> {
    pub fn description(&self) -> &str {
        match self {
            Entry::Option(option) => &option.description,
            Entry::Package(package) => &package.description,
        }
    }

    pub fn broken(&self) -> bool {
        match self {
            Entry::Option(_) => false,
            Entry::Package(package) => package.broken,
        }
    }

    pub fn insecure(&self) -> bool {
        match self {
            Entry::Option(_) => false,
            Entry::Package(package) => package.insecure,
        }
    }
}

/// Key of the cardinality entry for `collection` in [`Index::info`].
pub fn length_key(collection: Collection) -> String {
    format!("{}-length", collection.as_str())
}

impl Index {
    pub fn options(&self, source: OptionSource) -> &Options {
        match source {
            OptionSource::Nixos => &self.nixos,
            OptionSource::HomeManager => &self.home_manager,
            OptionSource::Darwin => &self.darwin,
        }
    }

    pub fn options_mut(&mut self, source: OptionSource) -> &mut Options {
        match source {
            OptionSource::Nixos => &mut self.nixos,
            OptionSource::HomeManager => &mut self.home_manager,
            OptionSource::Darwin => &mut self.darwin,
        }
    }

    pub fn packages(&self, source: PackageSource) -> &Packages {
        match source {
            PackageSource::Nixpkgs => &self.nixpkgs,
            PackageSource::Nur => &self.nur,
        }
    }

    pub fn packages_mut(&mut self, source: PackageSource) -> &mut Packages {
        match source {
            PackageSource::Nixpkgs => &mut self.nixpkgs,
            PackageSource::Nur => &mut self.nur,
        }
    }

    pub fn len(&self, collection: Collection) -> usize {
        match collection.origin() {
            Origin::Option(source) => self.options(source).len(),
            Origin::Package(source) => self.packages(source).len(),
        }
    }

    /// Number of records across all collections.
    pub fn total(&self) -> usize {
        Collection::ALL.iter().map(|c| self.len(*c)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    pub fn get(&self, collection: Collection, key: &str) -> Option<Entry<'_>> {
        match collection.origin() {
            Origin::Option(source) => self.options(source).get(key).map(Entry::Option),
            Origin::Package(source) => self.packages(source).get(key).map(Entry::Package),
        }
    }

    /// Records of one collection in ascending key order.
    pub fn entries(&self, collection: Collection) -> Box<dyn Iterator<Item = (&str, Entry<'_>)> + '_> {
        match collection.origin() {
            Origin::Option(source) => Box::new(
                self.options(source)
                    .iter()
                    .map(|(key, option)| (key.as_str(), Entry::Option(option))),
            ),
            Origin::Package(source) => Box::new(
                self.packages(source)
                    .iter()
                    .map(|(key, package)| (key.as_str(), Entry::Package(package))),
            ),
        }
    }

    /// Recomputes `info` for the current collections, stamped now.
    pub fn stamp(self, version: &str) -> Self {
        self.stamp_at(version, Utc::now())
    }

    pub fn stamp_at(mut self, version: &str, updated: DateTime<Utc>) -> Self {
        let mut info = BTreeMap::new();
        info.insert(INFO_VERSION.to_string(), version.trim().to_string());
        info.insert(INFO_LAST_UPDATED.to_string(), updated.to_rfc3339());
        for collection in Collection::ALL {
            info.insert(length_key(collection), self.len(collection).to_string());
        }
        info.insert(
            INFO_HOMEMANAGER_LENGTH.to_string(),
            self.len(Collection::HomeManager).to_string(),
        );
        self.info = info;
        self
    }
}
