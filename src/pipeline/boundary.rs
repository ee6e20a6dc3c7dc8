//! Keyword boundary search over cleaned document text.
//!
//! ## Priority beats position
//!
//! [`find_keyword`] walks the keyword list in order and returns the first
//! keyword that occurs *anywhere*. It does not look for the globally
//! earliest match across keywords: with `["Conclusions", "Conclusion"]`
//! the plural wins even if the singular appears earlier in the text.
//!
//! ## Case and offsets
//!
//! Matching is case-insensitive via the regex `(?i)` flag rather than a
//! lowercased copy of the text. Lowercasing can change the byte length of
//! some characters, which would make offsets from a lowercase mirror
//! unusable for slicing the original-case text.

use regex::Regex;
use tracing::warn;

/// A keyword hit in the searched text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordMatch {
    /// The keyword (as supplied) that matched.
    pub keyword: String,
    /// Byte offset of the match start.
    pub start: usize,
    /// Byte offset just past the match.
    pub end: usize,
}

/// Build a whole-word, case-insensitive matcher for `keyword`.
///
/// Interior spaces match any whitespace run so `Literature Review` still
/// matches when the PDF broke the line between the two words.
fn keyword_regex(keyword: &str) -> Option<Regex> {
    let words: Vec<String> = keyword.split_whitespace().map(regex::escape).collect();
    if words.is_empty() {
        return None;
    }
    let pattern = format!(r"(?i)\b{}\b", words.join(r"\s+"));
    match Regex::new(&pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            warn!("Skipping keyword {:?}: {}", keyword, e);
            None
        }
    }
}

/// First keyword (in priority order) that occurs anywhere in `text`.
pub fn find_keyword<S: AsRef<str>>(text: &str, keywords: &[S]) -> Option<KeywordMatch> {
    keywords.iter().find_map(|kw| {
        let kw = kw.as_ref();
        let re = keyword_regex(kw)?;
        re.find(text).map(|m| KeywordMatch {
            keyword: kw.to_string(),
            start: m.start(),
            end: m.end(),
        })
    })
}

/// `true` when `keyword` occurs in `text` as a whole word, ignoring case.
pub fn contains_keyword(text: &str, keyword: &str) -> bool {
    keyword_regex(keyword).is_some_and(|re| re.is_match(text))
}

/// Text from the first start keyword up to the first stop keyword.
///
/// Both searches use keyword priority order. The stop search only looks
/// at text after the matched start keyword, so a stop keyword mentioned
/// earlier in the paper cannot produce an empty or inverted span. With no
/// stop match the span runs to the end of `text`.
///
/// Returns `None` when no start keyword occurs or the span is empty.
pub fn extract_between<S: AsRef<str>>(
    text: &str,
    start_keywords: &[S],
    stop_keywords: &[S],
) -> Option<String> {
    let start = find_keyword(text, start_keywords)?;
    let rest = &text[start.end..];
    let stop = find_keyword(rest, stop_keywords)
        .map(|m| start.end + m.start)
        .unwrap_or(text.len());

    let span = text[start.start..stop].trim();
    if span.is_empty() {
        None
    } else {
        Some(span.to_string())
    }
}
