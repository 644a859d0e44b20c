//! The query mini-language.
//!
//! ```text
//! query      := [mode] term*
//! mode       := "package" | "option"            (first term only)
//! term       := exclusion | predicate | pattern
//! exclusion  := "!nixos" | "!home-manager" | "!darwin" | "!nixpkgs" | "!nur"
//! predicate  := "?maintainer=" handle | "?broken" ...
//! pattern    := ["^"] text ["$"]
//! ```
//!
//! Parsing is total: every string parses, and anything that is not a mode,
//! exclusion or predicate is matched as literal text.

use regex::{Regex, RegexBuilder};

use crate::model::{Collection, Kind};

const MAINTAINER_PREFIX: &str = "?maintainer=";
const BROKEN_PREFIX: &str = "?broken";

/// Which kinds of collections a query starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    All,
    Packages,
    Options,
}

impl Mode {
    fn from_term(term: &str) -> Option<Self> {
        match term {
            "package" => Some(Mode::Packages),
            "option" => Some(Mode::Options),
            _ => None,
        }
    }

    pub fn admits(&self, kind: Kind) -> bool {
        match self {
            Mode::All => true,
            Mode::Packages => kind == Kind::Package,
            Mode::Options => kind == Kind::Option,
        }
    }
}

/// A literal text match, optionally anchored to the start and/or end of the key.
#[derive(Debug, Clone)]
pub struct Pattern {
    pub text: String,
    pub anchor_start: bool,
    pub anchor_end: bool,
    /// `None` when the expression could not be compiled; such a pattern
    /// matches everything.
    regex: Option<Regex>,
}

impl Pattern {
    pub fn parse(term: &str) -> Self {
        let (anchor_start, rest) = match term.strip_prefix('^') {
            Some(rest) => (true, rest),
            None => (false, term),
        };
        let (anchor_end, text) = match rest.strip_suffix('$') {
            Some(text) => (true, text),
            None => (false, rest),
        };

        let expression = format!(
            "{}{}{}",
            if anchor_start { "^" } else { "" },
            regex::escape(text),
            if anchor_end { "$" } else { "" },
        );
        let regex = match RegexBuilder::new(&expression).case_insensitive(true).build() {
            Ok(regex) => Some(regex),
            Err(err) => {
                tracing::debug!(term, error = %err, "ignoring uncompilable search term");
                None
            }
        };

        Self {
            text: text.to_string(),
            anchor_start,
            anchor_end,
            regex,
        }
    }

    /// Anchored patterns only look at the key.
    pub fn is_anchored(&self) -> bool {
        self.anchor_start || self.anchor_end
    }

    pub fn is_inert(&self) -> bool {
        self.regex.is_none()
    }

    pub fn is_match(&self, haystack: &str) -> bool {
        self.regex.as_ref().map_or(true, |regex| regex.is_match(haystack))
    }
}

/// One narrowing step of a query.
#[derive(Debug, Clone)]
pub enum Filter {
    /// Packages with a maintainer whose GitHub handle equals this, ignoring case.
    Maintainer(String),
    /// Packages marked broken.
    Broken,
    Pattern(Pattern),
}

impl Filter {
    pub fn parse(term: &str) -> Self {
        if let Some(handle) = term.strip_prefix(MAINTAINER_PREFIX) {
            Filter::Maintainer(handle.to_string())
        } else if term.starts_with(BROKEN_PREFIX) {
            Filter::Broken
        } else {
            Filter::Pattern(Pattern::parse(term))
        }
    }
}

/// A parsed query: starting collections plus an ordered list of filters.
#[derive(Debug, Clone, Default)]
pub struct Query {
    pub mode: Mode,
    pub excluded: Vec<Collection>,
    pub filters: Vec<Filter>,
}

fn exclusion(term: &str) -> Option<Collection> {
    match term {
        "!nixos" => Some(Collection::Nixos),
        "!home-manager" => Some(Collection::HomeManager),
        "!darwin" => Some(Collection::Darwin),
        "!nixpkgs" => Some(Collection::Nixpkgs),
        "!nur" => Some(Collection::Nur),
        _ => None,
    }
}

impl Query {
    /// Parses `input`, or returns `None` for a blank query.
    pub fn parse(input: &str) -> Option<Self> {
        let mut terms = input.split_whitespace().peekable();
        let first = *terms.peek()?;

        let mut query = Query::default();
        if let Some(mode) = Mode::from_term(first) {
            query.mode = mode;
            terms.next();
        }

        for term in terms {
            match exclusion(term) {
                Some(collection) => {
                    if !query.excluded.contains(&collection) {
                        query.excluded.push(collection);
                    }
                }
                None => query.filters.push(Filter::parse(term)),
            }
        }
        Some(query)
    }

    /// Whether records of `collection` are candidates at all.
    pub fn is_active(&self, collection: Collection) -> bool {
        self.mode.admits(collection.kind()) && !self.excluded.contains(&collection)
    }

    pub fn active_collections(&self) -> impl Iterator<Item = Collection> + '_ {
        Collection::ALL.into_iter().filter(|c| self.is_active(*c))
    }

    /// Whether any filter matches against the `"<collection> <kind> <key>"` label.
    pub fn needs_label(&self) -> bool {
        self.filters
            .iter()
            .any(|filter| matches!(filter, Filter::Pattern(p) if !p.is_anchored() && !p.is_inert()))
    }
}
