//! Section extraction: structure pass first, keyword scan as fallback.
//!
//! ## Two passes, never merged
//!
//! 1. **Structure** — look the section up among heading divisions
//!    ([`crate::pipeline::headings`] or Grobid TEI).
//! 2. **Keyword scan** — when the structural text has fewer than
//!    `min_words` words (or is missing), scan the whole cleaned document
//!    between the plan's start and stop keywords
//!    ([`crate::pipeline::boundary::extract_between`]).
//!
//! A non-empty scan result *replaces* the structural one. The scan never
//! runs for sections whose structural text is long enough.
//!
//! Both passes bound a span the same way: it starts at the matched start
//! keyword and ends before the first stop keyword that follows. In the
//! structure pass the start keyword is the one in the division heading
//! (numbering prefixes are dropped) and the stop search begins after the
//! heading.

use crate::error::RelworkError;
use crate::pipeline::boundary::{extract_between, find_keyword};
use crate::pipeline::clean::{join_pages, normalize_whitespace, NoiseFilter};
use crate::pipeline::headings::{self, Division, DocumentStructure};
use crate::sections::{
    default_plans, word_count, ExtractedSection, SectionMap, SectionName, SectionOrigin,
    SectionPlan,
};
use tracing::debug;

/// Default minimum words before the keyword fallback is skipped.
pub const DEFAULT_MIN_SECTION_WORDS: usize = 50;

/// Locates TAIC sections in decoded page text.
#[derive(Debug, Clone)]
pub struct SectionExtractor {
    plans: Vec<SectionPlan>,
    noise: NoiseFilter,
    min_words: usize,
}

impl Default for SectionExtractor {
    fn default() -> Self {
        Self {
            plans: default_plans(),
            noise: NoiseFilter::default(),
            min_words: DEFAULT_MIN_SECTION_WORDS,
        }
    }
}

impl SectionExtractor {
    pub fn new(plans: Vec<SectionPlan>, noise: NoiseFilter, min_words: usize) -> Self {
        Self {
            plans,
            noise,
            min_words,
        }
    }

    /// Build an extractor from noise patterns, validating them.
    pub fn with_patterns<I, S>(
        plans: Vec<SectionPlan>,
        patterns: I,
        min_words: usize,
    ) -> Result<Self, RelworkError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(Self::new(plans, NoiseFilter::new(patterns)?, min_words))
    }

    pub fn plans(&self) -> &[SectionPlan] {
        &self.plans
    }

    pub fn noise(&self) -> &NoiseFilter {
        &self.noise
    }

    pub fn min_words(&self) -> usize {
        self.min_words
    }

    /// Cleaned single-line document text the keyword scan runs over.
    pub fn cleaned_text<S: AsRef<str>>(&self, pages: &[S]) -> String {
        self.noise.clean(&join_pages(pages))
    }

    /// Extract using heading lines detected in the pages themselves.
    pub fn extract<S: AsRef<str>>(&self, pages: &[S]) -> SectionMap {
        let structure = headings::detect_structure(pages, &self.noise);
        self.extract_with_structure(pages, &structure)
    }

    /// Extract using a precomputed structure (heading lines or Grobid).
    pub fn extract_with_structure<S: AsRef<str>>(
        &self,
        pages: &[S],
        structure: &DocumentStructure,
    ) -> SectionMap {
        let mut map = SectionMap::new();

        if let Some(ref title) = structure.title {
            map.insert(SectionName::Title, title.clone());
        }

        // Computed lazily: only sections that need the fallback pay for it.
        let mut cleaned: Option<String> = None;

        for plan in &self.plans {
            let structural = self.structural_section(plan, structure);
            let words = structural.as_ref().map_or(0, ExtractedSection::word_count);

            if words >= self.min_words {
                debug!("{}: {} words from {:?}", plan.name, words, structure.origin);
                if let Some(section) = structural {
                    map.insert(plan.name, section);
                }
                continue;
            }

            debug!(
                "{}: structural text has {} words (< {}), scanning keywords",
                plan.name, words, self.min_words
            );
            let text = cleaned.get_or_insert_with(|| self.cleaned_text(pages));
            let scanned = extract_between(text, &plan.start_keywords, &plan.stop_keywords)
                .map(|t| ExtractedSection::new(t, SectionOrigin::KeywordScan));

            match scanned.or(structural) {
                Some(section) => {
                    debug!(
                        "{}: {} words from {:?}",
                        plan.name,
                        section.word_count(),
                        section.origin
                    );
                    map.insert(plan.name, section);
                }
                None => debug!("{}: not found", plan.name),
            }
        }

        map
    }

    /// Section text from the structure pass, if any.
    fn structural_section(
        &self,
        plan: &SectionPlan,
        structure: &DocumentStructure,
    ) -> Option<ExtractedSection> {
        match plan.name {
            SectionName::Title => structure.title.clone(),
            SectionName::Abstract if structure.abstract_text.is_some() => structure
                .abstract_text
                .as_ref()
                .map(|t| ExtractedSection::new(t.clone(), structure.origin)),
            _ => structure
                .find_division(&plan.start_keywords)
                .and_then(|d| bounded_division_text(d, plan))
                .map(|t| ExtractedSection::new(t, structure.origin)),
        }
        .filter(|s| word_count(&s.text) > 0)
    }
}

/// Division text from the heading's start keyword to the first stop
/// keyword after the heading.
fn bounded_division_text(division: &Division, plan: &SectionPlan) -> Option<String> {
    let head = normalize_whitespace(&division.head);
    let start = find_keyword(&head, &plan.start_keywords)?;
    // `head` is a prefix of the normalised division text.
    let text = division.text();
    let body_from = head.len().min(text.len());
    let stop = find_keyword(&text[body_from..], &plan.stop_keywords)
        .map(|m| body_from + m.start)
        .unwrap_or(text.len());

    let span = text[start.start..stop].trim();
    (!span.is_empty()).then(|| span.to_string())
}
