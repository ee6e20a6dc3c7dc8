//! Result types returned by the generation entry points.
//!
//! Everything here is `Serialize` so the CLI `--json` flag can dump a full
//! run for inspection or regression diffs.

use crate::sections::SectionMap;
use serde::{Deserialize, Serialize};

/// Complete result of a related-work generation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelatedWorkOutput {
    /// The generated related-work section, post-processed.
    pub related_work: String,
    /// TAIC sections extracted from the target paper.
    pub sections: SectionMap,
    /// Faceted summary of the target paper.
    pub target_facet: String,
    /// Main idea of the target paper.
    pub main_idea: String,
    /// Per-cited-paper intermediate results, input order.
    pub cited: Vec<CitedAnalysis>,
    pub metadata: DocumentMetadata,
    pub stats: GenerationStats,
}

/// Intermediate LLM results for one cited paper.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CitedAnalysis {
    pub title: String,
    /// Citation marker, e.g. `Vaswani et al. (2017)`.
    pub marker: String,
    pub facet: String,
    pub relationship: String,
    pub usage: String,
}

/// Result of the extraction-only path (no LLM calls).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionOutput {
    pub sections: SectionMap,
    pub metadata: DocumentMetadata,
    /// Wall-clock time for decode + extraction.
    pub duration_ms: u64,
}

/// Timing and token counters for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationStats {
    /// Successful LLM calls (retries not counted).
    pub llm_calls: usize,
    /// Failed attempts that were retried.
    pub retried_calls: usize,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    /// Decode + structure + extraction.
    pub extraction_duration_ms: u64,
    pub llm_duration_ms: u64,
    pub total_duration_ms: u64,
}

impl GenerationStats {
    /// Fold one LLM call's counters in.
    pub fn record_call(&mut self, call: &CallStats) {
        self.llm_calls += 1;
        self.retried_calls += call.retries as usize;
        self.total_input_tokens += call.input_tokens as u64;
        self.total_output_tokens += call.output_tokens as u64;
        self.llm_duration_ms += call.duration_ms;
    }
}

/// Counters for a single successful LLM call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallStats {
    pub input_tokens: usize,
    pub output_tokens: usize,
    /// Attempts that failed before the successful one.
    pub retries: u32,
    pub duration_ms: u64,
}

/// PDF document-information dictionary plus page count.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    /// Raw PDF date string, e.g. `D:20240115093000Z`.
    pub creation_date: Option<String>,
    pub modification_date: Option<String>,
    pub page_count: usize,
    pub pdf_version: String,
}

impl DocumentMetadata {
    /// Four-digit year from the creation date, if it has one.
    pub fn creation_year(&self) -> Option<String> {
        let date = self.creation_date.as_deref()?.trim();
        let date = date.strip_prefix("D:").unwrap_or(date);
        let year: String = date.chars().take(4).collect();
        (year.len() == 4 && year.chars().all(|c| c.is_ascii_digit())).then_some(year)
    }

    /// Surname of the first listed author.
    ///
    /// Authors are split on `,`, `;` and ` and `; the surname is the last
    /// word of the first entry.
    pub fn first_author_surname(&self) -> Option<String> {
        let author = self.author.as_deref()?;
        let first = author
            .split([',', ';'])
            .next()?
            .split(" and ")
            .next()?
            .trim();
        first.split_whitespace().last().map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creation_year_from_pdf_date() {
        let meta = DocumentMetadata {
            creation_date: Some("D:20240115093000Z".into()),
            ..Default::default()
        };
        assert_eq!(meta.creation_year().as_deref(), Some("2024"));

        let meta = DocumentMetadata {
            creation_date: Some("2019-05-01".into()),
            ..Default::default()
        };
        assert_eq!(meta.creation_year().as_deref(), Some("2019"));

        let meta = DocumentMetadata {
            creation_date: Some("D:".into()),
            ..Default::default()
        };
        assert_eq!(meta.creation_year(), None);
        assert_eq!(DocumentMetadata::default().creation_year(), None);
    }

    #[test]
    fn first_author_surname_variants() {
        let with = |a: &str| DocumentMetadata {
            author: Some(a.into()),
            ..Default::default()
        };
        assert_eq!(
            with("Ashish Vaswani, Noam Shazeer").first_author_surname().as_deref(),
            Some("Vaswani")
        );
        assert_eq!(
            with("Jane Doe and John Roe").first_author_surname().as_deref(),
            Some("Doe")
        );
        assert_eq!(with("  ").first_author_surname(), None);
    }

    #[test]
    fn stats_accumulate_calls() {
        let mut stats = GenerationStats::default();
        stats.record_call(&CallStats {
            input_tokens: 100,
            output_tokens: 20,
            retries: 1,
            duration_ms: 300,
        });
        stats.record_call(&CallStats {
            input_tokens: 50,
            output_tokens: 10,
            retries: 0,
            duration_ms: 200,
        });
        assert_eq!(stats.llm_calls, 2);
        assert_eq!(stats.retried_calls, 1);
        assert_eq!(stats.total_input_tokens, 150);
        assert_eq!(stats.llm_duration_ms, 500);
    }
}
