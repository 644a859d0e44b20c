//! Upstream record shapes, as found in the release dumps.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::decode::{self, Lenient};
use crate::model::{License, Maintainer};

/// How the keyed records are laid out in an upstream file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// The document is the keyed map itself.
    Flat,
    /// The keyed map sits under `packages`, next to a format `version`.
    Wrapped,
}

#[derive(Deserialize)]
struct Wrapped<T> {
    // Required: a document without it is not a dump, e.g. an error body.
    packages: BTreeMap<String, T>,
}

impl Layout {
    /// Decodes the keyed records. Individual records never fail: a record
    /// whose shape is unusable decodes as `T::default()`.
    pub fn decode<T>(&self, bytes: &[u8]) -> serde_json::Result<BTreeMap<String, T>>
    where
        T: DeserializeOwned + Default,
    {
        let records: BTreeMap<String, Lenient<T>> = match self {
            Layout::Flat => serde_json::from_slice(bytes)?,
            Layout::Wrapped => serde_json::from_slice::<Wrapped<Lenient<T>>>(bytes)?.packages,
        };
        Ok(records
            .into_iter()
            .map(|(key, record)| (key, record.into_inner()))
            .collect())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RawOption {
    #[serde(default, deserialize_with = "decode::or_default")]
    pub description: String,
    #[serde(default, rename = "type", deserialize_with = "decode::or_default")]
    pub option_type: String,
    #[serde(default, deserialize_with = "decode::literal_text")]
    pub default: String,
    #[serde(default, deserialize_with = "decode::literal_text")]
    pub example: String,
    #[serde(default, deserialize_with = "decode::declarations")]
    pub declarations: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawPackage {
    #[serde(default, deserialize_with = "decode::or_default")]
    pub version: String,
    #[serde(default, deserialize_with = "decode::or_default")]
    pub meta: RawMeta,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMeta {
    #[serde(default, deserialize_with = "decode::or_default")]
    pub name: String,
    #[serde(default, deserialize_with = "decode::or_default")]
    pub description: String,
    #[serde(default, deserialize_with = "decode::or_default")]
    pub long_description: String,
    #[serde(default, deserialize_with = "decode::or_default")]
    pub main_program: String,
    #[serde(default, deserialize_with = "decode::one_or_many")]
    pub homepage: Vec<String>,
    #[serde(default, deserialize_with = "decode::licenses")]
    pub license: Vec<License>,
    #[serde(default, deserialize_with = "decode::maintainers")]
    pub maintainers: Vec<Maintainer>,
    #[serde(default, deserialize_with = "decode::or_default")]
    pub broken: bool,
    #[serde(default, deserialize_with = "decode::or_default")]
    pub unfree: bool,
    #[serde(default, deserialize_with = "decode::or_default")]
    pub insecure: bool,
    #[serde(default, deserialize_with = "decode::or_default")]
    pub position: String,
    #[serde(default, deserialize_with = "decode::one_or_many")]
    pub platforms: Vec<String>,
    #[serde(default, deserialize_with = "decode::one_or_many")]
    pub known_vulnerabilities: Vec<String>,
}
