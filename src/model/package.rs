use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;

use super::{PackageSource, Platform};

/// Packages keyed by their attribute path.
pub type Packages = BTreeMap<String, CanonicalPackage>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct License {
    #[serde(default)]
    pub free: bool,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub spdx_id: String,
}

impl License {
    /// A license known only by name, as some upstreams encode it.
    pub fn named(full_name: impl Into<String>) -> Self {
        Self {
            free: false,
            full_name: full_name.into(),
            spdx_id: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Maintainer {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// GitHub handle.
    #[serde(default)]
    pub github: String,
    #[serde(default, rename = "githubId")]
    pub github_id: u64,
}

impl Maintainer {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// A package from nixpkgs or the NUR, in canonical form.
///
/// `vulnerable` is not stored: it is derived from `known_vulnerabilities`
/// through [`CanonicalPackage::vulnerable`] and only materialized when the
/// record is serialized.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalPackage {
    pub source: PackageSource,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub long_description: String,
    #[serde(default)]
    pub main_program: String,
    #[serde(default, deserialize_with = "crate::decode::nullable")]
    pub homepages: Vec<String>,
    #[serde(default, deserialize_with = "crate::decode::nullable")]
    pub maintainers: Vec<Maintainer>,
    #[serde(default, deserialize_with = "crate::decode::nullable")]
    pub platforms: Vec<String>,
    #[serde(
        default,
        alias = "platformsSimplify",
        deserialize_with = "crate::decode::nullable"
    )]
    pub platforms_simplified: Vec<Platform>,
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub position_url: String,
    #[serde(default)]
    pub broken: bool,
    #[serde(default, deserialize_with = "crate::decode::nullable")]
    pub licenses: Vec<License>,
    #[serde(default)]
    pub unfree: bool,
    #[serde(default)]
    pub insecure: bool,
    #[serde(default, deserialize_with = "crate::decode::nullable")]
    pub known_vulnerabilities: Vec<String>,
}

impl CanonicalPackage {
    pub fn new(source: PackageSource, name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            source,
            name: name.into(),
            version: version.into(),
            description: String::new(),
            long_description: String::new(),
            main_program: String::new(),
            homepages: Vec::new(),
            maintainers: Vec::new(),
            platforms: Vec::new(),
            platforms_simplified: Vec::new(),
            position: String::new(),
            position_url: String::new(),
            broken: false,
            licenses: Vec::new(),
            unfree: false,
            insecure: false,
            known_vulnerabilities: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_maintainers(mut self, maintainers: Vec<Maintainer>) -> Self {
        self.maintainers = maintainers;
        self
    }

    /// True iff upstream lists at least one known vulnerability.
    pub fn vulnerable(&self) -> bool {
        !self.known_vulnerabilities.is_empty()
    }

    /// Whether any maintainer's GitHub handle equals `handle`, ignoring
    /// ASCII case. GitHub handles are ASCII.
    pub fn has_maintainer(&self, handle: &str) -> bool {
        self.maintainers
            .iter()
            .any(|m| !m.github.is_empty() && m.github.eq_ignore_ascii_case(handle))
    }
}

impl Serialize for CanonicalPackage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("CanonicalPackage", 19)?;
        state.serialize_field("source", &self.source)?;
        state.serialize_field("name", &self.name)?;
        state.serialize_field("version", &self.version)?;
        state.serialize_field("description", &self.description)?;
        state.serialize_field("longDescription", &self.long_description)?;
        state.serialize_field("mainProgram", &self.main_program)?;
        state.serialize_field("homepages", &self.homepages)?;
        state.serialize_field("maintainers", &self.maintainers)?;
        state.serialize_field("platforms", &self.platforms)?;
        state.serialize_field("platformsSimplified", &self.platforms_simplified)?;
        state.serialize_field("position", &self.position)?;
        state.serialize_field("positionUrl", &self.position_url)?;
        state.serialize_field("broken", &self.broken)?;
        state.serialize_field("vulnerable", &self.vulnerable())?;
        state.serialize_field("licenses", &self.licenses)?;
        state.serialize_field("unfree", &self.unfree)?;
        state.serialize_field("insecure", &self.insecure)?;
        state.serialize_field("knownVulnerabilities", &self.known_vulnerabilities)?;
        state.end()
    }
}
