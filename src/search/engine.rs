use crate::model::{Collection, Entry, Index, Kind};

use super::query::{Filter, Query};
use super::PackageOrOption;

const RANK_PREFIXES: [&str; 2] = ["services.", "programs."];
const RANK_SUFFIXES: [&str; 2] = [".enable", ".settings"];

struct Candidate<'a> {
    collection: Collection,
    key: &'a str,
    entry: Entry<'a>,
    /// `"<collection> <kind> <key>"`, built only when an unanchored pattern needs it.
    label: Option<String>,
}

impl<'a> Candidate<'a> {
    fn new(collection: Collection, key: &'a str, entry: Entry<'a>, with_label: bool) -> Self {
        let label = with_label.then(|| format!("{} {} {}", collection, collection.kind(), key));
        Self {
            collection,
            key,
            entry,
            label,
        }
    }

    fn matches(&self, filter: &Filter) -> bool {
        match filter {
            Filter::Maintainer(handle) => match self.entry {
                Entry::Package(package) => package.has_maintainer(handle),
                Entry::Option(_) => false,
            },
            Filter::Broken => match self.entry {
                Entry::Package(package) => package.broken,
                Entry::Option(_) => false,
            },
            Filter::Pattern(pattern) => {
                if pattern.is_anchored() {
                    pattern.is_match(self.key)
                } else {
                    pattern.is_match(self.label.as_deref().unwrap_or(self.key))
                }
            }
        }
    }

    fn into_result(self) -> PackageOrOption {
        PackageOrOption {
            kind: self.collection.kind(),
            source: self.collection,
            key: self.key.to_string(),
            description: self.entry.description().to_string(),
            broken: self.entry.broken(),
            insecure: self.entry.insecure(),
        }
    }
}

/// Key used for ranking: the key without a leading `services.`/`programs.`
/// and a trailing `.enable`/`.settings`.
pub fn rank_key(key: &str) -> &str {
    let mut key = key;
    for prefix in RANK_PREFIXES {
        key = key.strip_prefix(prefix).unwrap_or(key);
    }
    for suffix in RANK_SUFFIXES {
        key = key.strip_suffix(suffix).unwrap_or(key);
    }
    key
}

/// Length in characters of [`rank_key`].
pub fn rank_len(key: &str) -> usize {
    rank_key(key).chars().count()
}

/// Runs a parsed query against one snapshot.
pub fn execute(index: &Index, query: &Query) -> Vec<PackageOrOption> {
    let with_label = query.needs_label();

    let mut candidates: Vec<Candidate<'_>> = query
        .active_collections()
        .flat_map(|collection| {
            index
                .entries(collection)
                .map(move |(key, entry)| Candidate::new(collection, key, entry, with_label))
        })
        .collect();

    for filter in &query.filters {
        candidates.retain(|candidate| candidate.matches(filter));
        if candidates.is_empty() {
            break;
        }
    }

    let mut results: Vec<PackageOrOption> =
        candidates.into_iter().map(Candidate::into_result).collect();
    // sort_by_key is stable: equal ranks keep merge order.
    results.sort_by_key(|result| rank_len(&result.key));
    results
}

/// Parses and runs `query`. A blank query yields no results.
pub fn search(index: &Index, query: &str) -> Vec<PackageOrOption> {
    match Query::parse(query) {
        Some(query) => execute(index, &query),
        None => Vec::new(),
    }
}

impl PackageOrOption {
    pub fn is_package(&self) -> bool {
        self.kind == Kind::Package
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CanonicalOption, CanonicalPackage, Maintainer, OptionSource, PackageSource};

    fn option(index: &mut Index, source: OptionSource, key: &str) {
        index
            .options_mut(source)
            .insert(key.to_string(), CanonicalOption::new(source).with_description(key));
    }

    fn package(index: &mut Index, source: PackageSource, key: &str, handle: &str, broken: bool) {
        let mut package = CanonicalPackage::new(source, key, "1.0").with_maintainers(vec![Maintainer {
            name: handle.to_string(),
            email: None,
            github: handle.to_string(),
            github_id: 1,
        }]);
        package.broken = broken;
        index.packages_mut(source).insert(key.to_string(), package);
    }

    fn fixture() -> Index {
        let mut index = Index::default();
        option(&mut index, OptionSource::Nixos, "services.foo.enable");
        option(&mut index, OptionSource::Nixos, "bar.baz");
        option(&mut index, OptionSource::Nixos, "foo");
        option(&mut index, OptionSource::Nixos, "foobar");
        option(&mut index, OptionSource::Nixos, "barfoo");
        option(&mut index, OptionSource::HomeManager, "programs.git.enable");
        option(&mut index, OptionSource::HomeManager, "foo");
        option(&mut index, OptionSource::Darwin, "system.defaults.dock.autohide");
        package(&mut index, PackageSource::Nixpkgs, "git", "Alice", false);
        package(&mut index, PackageSource::Nixpkgs, "foo", "Bob", true);
        package(&mut index, PackageSource::Nixpkgs, "hello", "alice", false);
        package(&mut index, PackageSource::Nur, "repos.bob.foo", "Bob", false);
        index
    }

    fn keys(results: &[PackageOrOption]) -> Vec<(Collection, &str)> {
        results.iter().map(|r| (r.source, r.key.as_str())).collect()
    }

    #[test]
    fn test_blank_query_returns_nothing() {
        let index = fixture();
        assert!(search(&index, "").is_empty());
        assert!(search(&index, "   ").is_empty());
    }

    #[test]
    fn test_rank_key_strips_affixes() {
        assert_eq!(rank_key("services.foo.enable"), "foo");
        assert_eq!(rank_key("programs.git.settings"), "git");
        assert_eq!(rank_key("services.programs.x"), "x");
        assert_eq!(rank_key("bar.baz"), "bar.baz");
        assert_eq!(rank_len("services.foo.enable"), 3);
        assert_eq!(rank_len("bar.baz"), 7);
        assert_eq!(rank_len("ünïcode"), 7);
    }

    #[test]
    fn test_shorter_normalized_keys_rank_first() {
        let index = fixture();
        let results = search(&index, "option !home-manager !darwin");
        let order = keys(&results);
        let enable = order.iter().position(|(_, k)| *k == "services.foo.enable").unwrap();
        let bar_baz = order.iter().position(|(_, k)| *k == "bar.baz").unwrap();
        assert!(enable < bar_baz);
        assert_eq!(order[0], (Collection::Nixos, "foo"));
    }

    #[test]
    fn test_ties_keep_merge_order() {
        let index = fixture();
        let results = search(&index, "^foo$");
        assert_eq!(
            keys(&results),
            vec![
                (Collection::Nixos, "foo"),
                (Collection::HomeManager, "foo"),
                (Collection::Nixpkgs, "foo"),
            ]
        );
    }

    #[test]
    fn test_anchors_match_key_only() {
        let index = fixture();
        assert_eq!(search(&index, "option ^foo").len(), 3);

        let results = search(&index, "!home-manager option ^foo");
        let mut found: Vec<&str> = results.iter().map(|r| r.key.as_str()).collect();
        found.sort_unstable();
        assert_eq!(found, vec!["foo", "foobar"]);

        let results = search(&index, "option !home-manager bar$");
        let mut found: Vec<&str> = results.iter().map(|r| r.key.as_str()).collect();
        found.sort_unstable();
        assert_eq!(found, vec!["foobar"]);

        let results = search(&index, "^FOO$ !nixpkgs !home-manager");
        assert_eq!(keys(&results), vec![(Collection::Nixos, "foo")]);
    }

    #[test]
    fn test_unanchored_term_matches_label() {
        let index = fixture();
        let results = search(&index, "nur");
        assert_eq!(keys(&results), vec![(Collection::Nur, "repos.bob.foo")]);

        let results = search(&index, "darwin option");
        assert_eq!(
            keys(&results),
            vec![(Collection::Darwin, "system.defaults.dock.autohide")]
        );
    }

    #[test]
    fn test_terms_are_anded() {
        let index = fixture();
        let results = search(&index, "foo bar");
        let mut found: Vec<&str> = results.iter().map(|r| r.key.as_str()).collect();
        found.sort_unstable();
        assert_eq!(found, vec!["barfoo", "foobar"]);
    }

    #[test]
    fn test_mode_restricts_collections() {
        let index = fixture();
        let results = search(&index, "package foo");
        assert!(results.iter().all(PackageOrOption::is_package));
        assert_eq!(results.len(), 2);

        let results = search(&index, "option foo");
        assert!(results.iter().all(|r| r.kind == Kind::Option));
    }

    #[test]
    fn test_exclusions_remove_collections() {
        let index = fixture();
        for (token, collection) in [
            ("!nixos", Collection::Nixos),
            ("!home-manager", Collection::HomeManager),
            ("!darwin", Collection::Darwin),
            ("!nixpkgs", Collection::Nixpkgs),
            ("!nur", Collection::Nur),
        ] {
            let leading = search(&index, &format!("{token} o"));
            let trailing = search(&index, &format!("o {token}"));
            assert!(leading.iter().all(|r| r.source != collection), "{token}");
            assert_eq!(leading, trailing);
        }
    }

    #[test]
    fn test_maintainer_predicate() {
        let index = fixture();
        let results = search(&index, "?maintainer=alice");
        assert_eq!(
            keys(&results),
            vec![(Collection::Nixpkgs, "git"), (Collection::Nixpkgs, "hello")]
        );

        let results = search(&index, "?maintainer=BOB foo");
        assert_eq!(
            keys(&results),
            vec![(Collection::Nixpkgs, "foo"), (Collection::Nur, "repos.bob.foo")]
        );
    }

    #[test]
    fn test_broken_predicate() {
        let index = fixture();
        let results = search(&index, "?broken");
        assert_eq!(keys(&results), vec![(Collection::Nixpkgs, "foo")]);
        assert!(results[0].broken);
        assert!(search(&index, "option ?broken").is_empty());
    }

    #[test]
    fn test_search_is_idempotent() {
        let index = fixture();
        for query in ["foo", "o", "package", "?maintainer=bob", "^foo !nur"] {
            assert_eq!(search(&index, query), search(&index, query), "{query}");
        }
    }

    #[test]
    fn test_result_carries_record_fields() {
        let index = fixture();
        let results = search(&index, "^services.foo.enable$");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].kind, Kind::Option);
        assert_eq!(results[0].description, "services.foo.enable");
        assert!(!results[0].broken);
        assert!(!results[0].insecure);
    }
}
