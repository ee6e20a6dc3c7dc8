//! Noise filtering: drop running footers, DOIs and page numbers before
//! any boundary search.
//!
//! ## Why whole lines?
//!
//! PDF text layers interleave page furniture (copyright footers, licensing
//! notices, conference headers, bare page numbers) with body text. These
//! lines are noise wherever they appear, and a partial match nearly always
//! means the rest of the line is furniture too. Dropping the entire line
//! keeps the filter a pure, line-by-line predicate, which also makes it
//! idempotent: a surviving line matched no pattern, so a second pass
//! removes nothing.
//!
//! Whitespace collapsing is a separate step ([`normalize_whitespace`]) that
//! runs *after* filtering. Collapsing first would join footers onto body
//! lines and the filter would then throw away real content.

use crate::error::RelworkError;
use once_cell::sync::Lazy;
use regex::{Regex, RegexSet};

/// Built-in noise patterns, matched case-insensitively against each line.
pub const DEFAULT_NOISE_PATTERNS: &[&str] = &[
    // ISBN 978-1-2345-6789-0
    r"\bISBN\b.*?\d{3}-\d-\d{4}-\d{4}-\d",
    // ©2024 IEEE
    r"©\s*\d{4}\s*IEEE",
    // IEEE Xplore metadata line
    r"IEEE Xplore.*?ISBN.*?\d+",
    // Licensing footer
    r"Authorized licensed use.*?Restrictions apply\.",
    // Bare page-number line
    r"^\s*\d{1,4}\s*$",
    // Conference proceedings header
    r"\bProceedings of the .*?Conference.*?\)",
    // DOI: 10.1109/ABC.2024.123
    r"DOI:\s*10\.\d{4,9}/[-._;()/:A-Z0-9]+",
    // IEEE download URL
    r"https?://\S*ieee\.org",
    // arXiv side stamp: arXiv:1706.03762v7 [cs.CL] 6 Dec 2017
    r"\barXiv:\d{4}\.\d{4,5}(?:v\d+)?\s*\[",
];

/// Compiled line filter.
#[derive(Debug, Clone)]
pub struct NoiseFilter {
    set: RegexSet,
}

impl NoiseFilter {
    /// Compile a filter from caller-supplied patterns.
    ///
    /// A malformed pattern is a configuration error, reported with the
    /// offending pattern so it can be fixed.
    pub fn new<I, S>(patterns: I) -> Result<Self, RelworkError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns: Vec<String> = patterns
            .into_iter()
            .map(|p| format!("(?i){}", p.as_ref()))
            .collect();

        for p in &patterns {
            Regex::new(p).map_err(|e| {
                RelworkError::InvalidConfig(format!("bad noise pattern {p:?}: {e}"))
            })?;
        }

        let set = RegexSet::new(&patterns)
            .map_err(|e| RelworkError::InvalidConfig(format!("noise patterns: {e}")))?;
        Ok(Self { set })
    }

    /// `true` when any pattern matches anywhere in `line`.
    pub fn is_noise(&self, line: &str) -> bool {
        self.set.is_match(line)
    }

    /// Drop every noise line, keeping the surviving lines newline-separated.
    pub fn filter_lines(&self, text: &str) -> String {
        text.lines()
            .filter(|line| !self.is_noise(line))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Filter noise lines, then collapse whitespace to single spaces.
    pub fn clean(&self, text: &str) -> String {
        normalize_whitespace(&self.filter_lines(text))
    }

    /// Number of compiled patterns.
    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }
}

impl Default for NoiseFilter {
    fn default() -> Self {
        DEFAULT_FILTER.clone()
    }
}

static DEFAULT_FILTER: Lazy<NoiseFilter> = Lazy::new(|| {
    NoiseFilter::new(DEFAULT_NOISE_PATTERNS).expect("built-in noise patterns compile")
});

static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Collapse every whitespace run (newlines included) to a single space and trim.
pub fn normalize_whitespace(text: &str) -> String {
    RE_WHITESPACE.replace_all(text, " ").trim().to_string()
}

/// Join page texts into one document, one newline between pages.
pub fn join_pages<S: AsRef<str>>(pages: &[S]) -> String {
    pages
        .iter()
        .map(|p| p.as_ref())
        .collect::<Vec<_>>()
        .join("\n")
}
