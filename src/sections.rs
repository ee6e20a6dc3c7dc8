//! Section vocabulary and the extraction result type.
//!
//! The pipeline works with a fixed vocabulary of four logical sections
//! (title, abstract, introduction, conclusion — "TAIC"). Each body section
//! is described by a [`SectionPlan`]: the keywords that mark where it
//! starts and the keywords that mark where the following section begins.
//!
//! Keyword lists are **priority ordered**. The extractor takes the first
//! keyword in list order that occurs anywhere in the text, even when a
//! lower-priority keyword occurs earlier.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One of the four TAIC sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionName {
    Title,
    Abstract,
    Introduction,
    Conclusion,
}

impl SectionName {
    /// All sections in document order.
    pub const ALL: [SectionName; 4] = [
        SectionName::Title,
        SectionName::Abstract,
        SectionName::Introduction,
        SectionName::Conclusion,
    ];

    /// Lowercase identifier, also used as the template placeholder name.
    pub fn as_str(&self) -> &'static str {
        match self {
            SectionName::Title => "title",
            SectionName::Abstract => "abstract",
            SectionName::Introduction => "introduction",
            SectionName::Conclusion => "conclusion",
        }
    }
}

impl fmt::Display for SectionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Start/stop keywords for one target section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionPlan {
    pub name: SectionName,
    /// Keywords opening the section, highest priority first.
    pub start_keywords: Vec<String>,
    /// Keywords opening the *next* section, highest priority first.
    ///
    /// Used by the raw keyword scan, which is the coarse second pass, so
    /// the list is kept narrow: only headings that plausibly follow.
    pub stop_keywords: Vec<String>,
}

impl SectionPlan {
    pub fn new<S: Into<String>>(
        name: SectionName,
        start: impl IntoIterator<Item = S>,
        stop: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            name,
            start_keywords: start.into_iter().map(Into::into).collect(),
            stop_keywords: stop.into_iter().map(Into::into).collect(),
        }
    }
}

/// Plans for abstract, introduction and conclusion.
///
/// The title has no plan: it comes from document structure (Grobid title,
/// PDF metadata, or the first line of page 1).
pub fn default_plans() -> Vec<SectionPlan> {
    vec![
        SectionPlan::new(
            SectionName::Abstract,
            ["Abstract"],
            ["Index Terms", "Keywords", "Introduction"],
        ),
        SectionPlan::new(
            SectionName::Introduction,
            ["Introduction"],
            [
                "Literature Review",
                "Related Work",
                "Background",
                "Methodology",
            ],
        ),
        SectionPlan::new(
            SectionName::Conclusion,
            ["Conclusions", "Conclusion", "Concluding Remarks"],
            [
                "Acknowledgments",
                "Acknowledgements",
                "Acknowledgment",
                "References",
                "Bibliography",
                "Appendix",
            ],
        ),
    ]
}

/// Which pass produced a section's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionOrigin {
    /// PDF document-information dictionary.
    Metadata,
    /// Heading lines detected in the decoded page text.
    Headings,
    /// Grobid TEI structure.
    Grobid,
    /// Raw keyword boundary scan over the cleaned document.
    KeywordScan,
    /// First non-noise line of the first page.
    FirstLine,
}

/// Text of one located section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedSection {
    pub text: String,
    pub origin: SectionOrigin,
}

impl ExtractedSection {
    pub fn new(text: impl Into<String>, origin: SectionOrigin) -> Self {
        Self {
            text: text.into(),
            origin,
        }
    }

    /// Whitespace-separated word count.
    pub fn word_count(&self) -> usize {
        word_count(&self.text)
    }
}

/// Whitespace-separated word count of `text`.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Mapping from section name to its extracted text.
///
/// A section that could not be located has **no entry**; `get` returns
/// `None` and [`SectionMap::text_or_empty`] returns `""`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SectionMap {
    sections: BTreeMap<SectionName, ExtractedSection>,
}

impl SectionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a section. Empty (whitespace-only) text is treated as absent.
    pub fn insert(&mut self, name: SectionName, section: ExtractedSection) {
        if section.text.trim().is_empty() {
            self.sections.remove(&name);
        } else {
            self.sections.insert(name, section);
        }
    }

    pub fn get(&self, name: SectionName) -> Option<&ExtractedSection> {
        self.sections.get(&name)
    }

    pub fn text(&self, name: SectionName) -> Option<&str> {
        self.get(name).map(|s| s.text.as_str())
    }

    /// Section text, or `""` when absent (the form prompts expect).
    pub fn text_or_empty(&self, name: SectionName) -> &str {
        self.text(name).unwrap_or("")
    }

    pub fn contains(&self, name: SectionName) -> bool {
        self.sections.contains_key(&name)
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SectionName, &ExtractedSection)> {
        self.sections.iter().map(|(k, v)| (*k, v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_is_absent() {
        let mut map = SectionMap::new();
        map.insert(
            SectionName::Abstract,
            ExtractedSection::new("   ", SectionOrigin::KeywordScan),
        );
        assert!(!map.contains(SectionName::Abstract));
        assert_eq!(map.text_or_empty(SectionName::Abstract), "");
    }

    #[test]
    fn serialises_with_lowercase_keys() {
        let mut map = SectionMap::new();
        map.insert(
            SectionName::Conclusion,
            ExtractedSection::new("Conclusion We find Y.", SectionOrigin::Headings),
        );
        let json = serde_json::to_value(&map).unwrap();
        assert_eq!(json["conclusion"]["text"], "Conclusion We find Y.");
        assert_eq!(json["conclusion"]["origin"], "headings");
        assert!(json.get("title").is_none());
    }

    #[test]
    fn default_plans_cover_body_sections() {
        let names: Vec<_> = default_plans().iter().map(|p| p.name).collect();
        assert_eq!(
            names,
            vec![
                SectionName::Abstract,
                SectionName::Introduction,
                SectionName::Conclusion
            ]
        );
    }

    #[test]
    fn conclusion_plan_prefers_plural() {
        let plans = default_plans();
        let conclusion = plans
            .iter()
            .find(|p| p.name == SectionName::Conclusion)
            .unwrap();
        assert_eq!(conclusion.start_keywords[0], "Conclusions");
        assert_eq!(conclusion.start_keywords[1], "Conclusion");
    }
}
