//! Street-name normalization.
//!
//! Raw street cells arrive in every shape local clerks could invent: prefixed
//! with street-type abbreviations, carrying cadastral markers that are not
//! addresses at all, or with the building number trailing the name. The
//! normalizer runs a fixed sequence of cleanup passes and either produces a
//! query-ready name or rejects the value outright:
//!
//! 1. trim surrounding whitespace
//! 2. reject names containing any configured substring
//! 3. apply configured abbreviation expansions (case-insensitive regexes)
//! 4. strip dotted abbreviations such as `ul.` or `św.`
//! 5. move a trailing building number to the front (`Polna 7` -> `7, Polna`)
//!
//! Rejection wins over everything else: once a substring matches, no further
//! pass runs and the caller gets [`ParsedName::Rejected`].

use std::sync::OnceLock;

use regex::{Regex, RegexBuilder};

/// Outcome of normalizing a street name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedName {
    /// A cleaned-up name ready for address assembly.
    Accepted(String),
    /// The raw value matched a reject substring and must not be queried.
    Rejected,
}

impl ParsedName {
    pub fn accepted(self) -> Option<String> {
        match self {
            ParsedName::Accepted(name) => Some(name),
            ParsedName::Rejected => None,
        }
    }
}

/// A compiled abbreviation-expansion rule. Patterns are matched
/// case-insensitively and every occurrence is replaced.
#[derive(Debug, Clone)]
pub struct Expansion {
    pattern: Regex,
    replacement: String,
}

impl Expansion {
    pub fn compile(pattern: &str, replacement: &str) -> Result<Self, regex::Error> {
        let pattern = RegexBuilder::new(pattern).case_insensitive(true).build()?;
        Ok(Self {
            pattern,
            replacement: replacement.to_string(),
        })
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn replacement(&self) -> &str {
        &self.replacement
    }
}

#[derive(Debug, Clone, Default)]
pub struct NormalizeOptions {
    /// Names containing any of these substrings are rejected outright.
    pub reject_substrings: Vec<String>,
    /// Expansion rules applied in order, each over the previous result.
    pub expansions: Vec<Expansion>,
    /// Remove `\w+\.`-style abbreviations after expansion.
    pub strip_abbreviations: bool,
    /// Move a trailing building number to the front of the name.
    pub number_first: bool,
}

fn abbreviation_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\w+\.").expect("abbreviation pattern"))
}

/// Matches a building number at the end of a name, preceded by a space:
/// an optional `NN/`, `NN-`, or `NN\` prefix, the number itself, and an
/// optional single-letter suffix that may be separated by ` `, `/`, or `\`.
fn building_number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r" (?:(\d+)([/\\-]))?(\d+)[ /\\]?([A-Za-z])?$").expect("building number pattern")
    })
}

pub fn normalize(name: &str, options: &NormalizeOptions) -> ParsedName {
    let mut name = name.trim().to_string();
    for substring in &options.reject_substrings {
        if name.contains(substring.as_str()) {
            return ParsedName::Rejected;
        }
    }
    for expansion in &options.expansions {
        name = expansion
            .pattern
            .replace_all(&name, expansion.replacement.as_str())
            .into_owned();
    }
    if options.strip_abbreviations {
        name = abbreviation_re().replace_all(&name, "").trim().to_string();
    }
    if options.number_first {
        if let Some(reordered) = reorder_building_number(&name) {
            name = reordered;
        }
    }
    ParsedName::Accepted(name)
}

/// Rewrites `<name> <number>` as `<number>, <name>`, gluing the number
/// together from its matched pieces so `Polna 5/a` becomes `5a, Polna` and
/// `Krucza 17-23` becomes `17-23, Krucza`. Returns `None` when the name does
/// not end in a recognizable building number.
fn reorder_building_number(name: &str) -> Option<String> {
    let caps = building_number_re().captures(name)?;
    let full = caps.get(0)?;
    let number: String = (1..=4)
        .filter_map(|idx| caps.get(idx))
        .map(|group| group.as_str())
        .collect();
    let remainder = name[..full.start()].trim();
    Some(format!("{number}, {remainder}"))
}
