use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::OptionSource;

/// Options keyed by their dotted attribute path.
pub type Options = BTreeMap<String, CanonicalOption>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalOption {
    pub source: OptionSource,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub example: String,
    #[serde(default, rename = "type")]
    pub option_type: String,
    #[serde(default)]
    pub default: String,
    /// File paths or URLs of the modules declaring this option.
    #[serde(default, deserialize_with = "crate::decode::nullable")]
    pub declarations: Vec<String>,
}

impl CanonicalOption {
    pub fn new(source: OptionSource) -> Self {
        Self {
            source,
            description: String::new(),
            example: String::new(),
            option_type: String::new(),
            default: String::new(),
            declarations: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}
