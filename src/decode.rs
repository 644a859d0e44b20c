//! Lenient field decoders for upstream dumps.
//!
//! Upstream JSON is machine-generated by several tools and its field shapes
//! drift: a homepage may be a string or a list, a license a name or an
//! object, a GitHub id a number or a numeric string. Every decoder here
//! resolves the shape once, at the ingestion boundary, and falls back to an
//! empty or default value instead of failing the enclosing document.
//!
//! The functions are meant for `#[serde(default, deserialize_with = "...")]`.

use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::model::{License, Maintainer};

/// A value that decodes to `T::default()` when its JSON shape does not fit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Lenient<T>(pub T);

impl<T> Lenient<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<'de, T> Deserialize<'de> for Lenient<T>
where
    T: DeserializeOwned + Default,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        match serde_json::from_value(value) {
            Ok(decoded) => Ok(Lenient(decoded)),
            Err(err) => {
                tracing::debug!(error = %err, "falling back to default for malformed value");
                Ok(Lenient(T::default()))
            }
        }
    }
}

/// Decodes any field leniently; see [`Lenient`].
pub fn or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    Lenient::<T>::deserialize(deserializer).map(Lenient::into_inner)
}

/// Decodes `null` as `T::default()`. Other mismatches are still errors.
pub fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

/// A string or a list of strings. Any other shape (including the nested
/// platform-constraint objects some packages carry) yields an empty list.
pub fn one_or_many<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(strings(value))
}

pub fn strings(value: Value) -> Vec<String> {
    match serde_json::from_value::<OneOrMany<String>>(value) {
        Ok(OneOrMany::One(single)) => vec![single],
        Ok(OneOrMany::Many(many)) => many,
        Err(_) => Vec::new(),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LicenseRepr {
    Name(String),
    Full(License),
}

impl From<LicenseRepr> for License {
    fn from(repr: LicenseRepr) -> Self {
        match repr {
            LicenseRepr::Name(name) => License::named(name),
            LicenseRepr::Full(license) => license,
        }
    }
}

/// One license or a list of them, each either a bare name or a
/// `{free, fullName, spdxId}` object. Entries of any other shape are dropped.
pub fn licenses<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<License>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(each(value)
        .filter_map(|entry| match serde_json::from_value::<LicenseRepr>(entry) {
            Ok(repr) => Some(repr.into()),
            Err(err) => {
                tracing::debug!(error = %err, "dropping malformed license");
                None
            }
        })
        .collect())
}

#[derive(Deserialize)]
struct FullMaintainer {
    #[serde(default, deserialize_with = "nullable")]
    name: String,
    #[serde(default)]
    email: Option<String>,
    github: String,
    #[serde(default, rename = "githubId", deserialize_with = "github_id")]
    github_id: u64,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MaintainerRepr {
    Full(FullMaintainer),
    Named { name: String },
    Bare(String),
}

impl From<MaintainerRepr> for Maintainer {
    fn from(repr: MaintainerRepr) -> Self {
        match repr {
            MaintainerRepr::Full(full) => Maintainer {
                name: full.name,
                email: full.email,
                github: full.github,
                github_id: full.github_id,
            },
            MaintainerRepr::Named { name } | MaintainerRepr::Bare(name) => Maintainer::named(name),
        }
    }
}

/// Decodes one maintainer entry: a full object, a `{name}` object or a bare
/// string, tried in that order.
pub fn maintainer(value: Value) -> Result<Maintainer, serde_json::Error> {
    serde_json::from_value::<MaintainerRepr>(value).map(Maintainer::from)
}

/// A list of maintainers. Entries matching none of the accepted shapes are
/// skipped and logged; the remaining entries are kept in order.
pub fn maintainers<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Maintainer>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(each(value)
        .filter_map(|entry| {
            let raw = entry.to_string();
            match maintainer(entry) {
                Ok(maintainer) => Some(maintainer),
                Err(err) => {
                    tracing::warn!(entry = %raw, error = %err, "skipping unparseable maintainer");
                    None
                }
            }
        })
        .collect())
}

/// A GitHub account id given as a JSON number or a numeric string.
pub fn github_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(0),
        Value::Number(number) => number
            .as_u64()
            .ok_or_else(|| de::Error::custom(format!("githubId {number} is not a positive integer"))),
        Value::String(text) => text
            .trim()
            .parse()
            .map_err(|_| de::Error::custom(format!("githubId {text:?} is not numeric"))),
        other => Err(de::Error::custom(format!("unexpected githubId {other}"))),
    }
}

/// Option defaults and examples: a plain string, or an object carrying the
/// rendered expression in `text` (`{"_type": "literalExpression", "text": ...}`).
/// Other values are kept as their JSON rendering.
pub fn literal_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => String::new(),
        Value::String(text) => text,
        Value::Object(mut object) => match object.remove("text") {
            Some(Value::String(text)) => text,
            Some(other) => other.to_string(),
            None => Value::Object(object).to_string(),
        },
        other => other.to_string(),
    })
}

/// Option declarations: paths as strings, or `{name, url}` objects of which
/// the url is preferred.
pub fn declarations<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(each(value)
        .filter_map(|entry| match entry {
            Value::String(path) => Some(path),
            Value::Object(mut object) => match (object.remove("url"), object.remove("name")) {
                (Some(Value::String(url)), _) if !url.is_empty() => Some(url),
                (_, Some(Value::String(name))) => Some(name),
                _ => None,
            },
            _ => None,
        })
        .collect())
}

/// Iterates list elements, or the value itself when it is not a list.
fn each(value: Value) -> Box<dyn Iterator<Item = Value>> {
    match value {
        Value::Null => Box::new(std::iter::empty()),
        Value::Array(items) => Box::new(items.into_iter()),
        single => Box::new(std::iter::once(single)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Default, Deserialize)]
    struct Meta {
        #[serde(default, deserialize_with = "one_or_many")]
        homepage: Vec<String>,
        #[serde(default, deserialize_with = "licenses")]
        license: Vec<License>,
        #[serde(default, deserialize_with = "maintainers")]
        maintainers: Vec<Maintainer>,
        #[serde(default, deserialize_with = "or_default")]
        broken: bool,
    }

    fn meta(value: Value) -> Meta {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_homepage_string_becomes_single_element() {
        assert_eq!(meta(json!({"homepage": "https://x"})).homepage, vec!["https://x"]);
    }

    #[test]
    fn test_homepage_array_is_unchanged() {
        let decoded = meta(json!({"homepage": ["https://a", "https://b"]}));
        assert_eq!(decoded.homepage, vec!["https://a", "https://b"]);
    }

    #[test]
    fn test_unrecognized_shape_yields_empty() {
        let decoded = meta(json!({
            "homepage": [{"cpu": {"family": "x86"}, "kernel": {"name": "linux"}}],
            "broken": "sometimes"
        }));
        assert!(decoded.homepage.is_empty());
        assert!(!decoded.broken);
        assert!(meta(json!({"homepage": null})).homepage.is_empty());
        assert!(meta(json!({})).homepage.is_empty());
    }

    #[test]
    fn test_license_name_and_object() {
        let decoded = meta(json!({
            "license": ["Proprietary", {"free": true, "fullName": "MIT License", "spdxId": "MIT"}]
        }));
        assert_eq!(
            decoded.license,
            vec![
                License::named("Proprietary"),
                License {
                    free: true,
                    full_name: "MIT License".to_string(),
                    spdx_id: "MIT".to_string(),
                },
            ]
        );

        let single = meta(json!({"license": {"fullName": "GPL", "free": true}}));
        assert_eq!(single.license.len(), 1);
        assert_eq!(single.license[0].spdx_id, "");
    }

    #[test]
    fn test_license_bare_string_is_not_free() {
        let decoded = meta(json!({"license": "BSD"}));
        assert!(!decoded.license[0].free);
        assert_eq!(decoded.license[0].full_name, "BSD");
    }

    #[test]
    fn test_maintainer_shapes() {
        let decoded = meta(json!({
            "maintainers": [
                {"name": "Alice", "email": "alice@example.org", "github": "alice", "githubId": 42},
                {"name": "Bob", "github": "bob", "githubId": "7"},
                {"name": "Carol"},
                "dave",
                {"name": null, "github": "erin", "githubId": 3}
            ]
        }));
        let names: Vec<&str> = decoded.maintainers.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Alice", "Bob", "Carol", "dave", ""]);
        assert_eq!(decoded.maintainers[0].github_id, 42);
        assert_eq!(decoded.maintainers[0].email.as_deref(), Some("alice@example.org"));
        assert_eq!(decoded.maintainers[1].github_id, 7);
        assert_eq!(decoded.maintainers[1].github, "bob");
        assert_eq!(decoded.maintainers[2].github, "");
        assert_eq!(decoded.maintainers[4].github, "erin");
        assert_eq!(decoded.maintainers[4].github_id, 3);
    }

    #[test]
    fn test_unparseable_maintainer_is_skipped() {
        let decoded = meta(json!({
            "maintainers": [42, {"github": "alice", "githubId": 1}, [true]]
        }));
        assert_eq!(decoded.maintainers.len(), 1);
        assert_eq!(decoded.maintainers[0].github, "alice");
    }

    #[test]
    fn test_non_numeric_github_id_falls_back_to_name() {
        let parsed = maintainer(json!({"name": "Eve", "github": "eve", "githubId": "abc"})).unwrap();
        assert_eq!(parsed, Maintainer::named("Eve"));

        assert!(maintainer(json!({"github": "eve", "githubId": {"id": 1}})).is_err());
    }

    #[test]
    fn test_literal_text() {
        #[derive(Deserialize)]
        struct Opt {
            #[serde(default, deserialize_with = "literal_text")]
            default: String,
        }
        let text = |value: Value| serde_json::from_value::<Opt>(value).unwrap().default;

        assert_eq!(text(json!({"default": {"_type": "literalExpression", "text": "[ ]"}})), "[ ]");
        assert_eq!(text(json!({"default": "pkgs.hello"})), "pkgs.hello");
        assert_eq!(text(json!({"default": true})), "true");
        assert_eq!(text(json!({"default": null})), "");
        assert_eq!(text(json!({})), "");
    }

    #[test]
    fn test_declarations_prefer_url() {
        #[derive(Deserialize)]
        struct Opt {
            #[serde(default, deserialize_with = "declarations")]
            declarations: Vec<String>,
        }
        let decls = |value: Value| serde_json::from_value::<Opt>(value).unwrap().declarations;

        assert_eq!(
            decls(json!({"declarations": [
                {"name": "<home-manager/modules/programs/git.nix>", "url": "https://github.com/nix-community/home-manager/blob/master/modules/programs/git.nix"},
                {"name": "local.nix"},
                "nixos/modules/services/web-servers/nginx/default.nix",
                7
            ]})),
            vec![
                "https://github.com/nix-community/home-manager/blob/master/modules/programs/git.nix",
                "local.nix",
                "nixos/modules/services/web-servers/nginx/default.nix",
            ]
        );
    }
}
