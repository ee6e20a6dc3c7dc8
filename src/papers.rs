//! Cited-paper inputs and the text blocks built from them.
//!
//! Cited papers are supplied as a JSON array:
//!
//! ```json
//! [
//!   {
//!     "title": "Automatic generation of related work through summarizing citations",
//!     "authors": ["Chen", "Zhuge"],
//!     "year": "2019",
//!     "abstract": "This paper proposes ...",
//!     "spans": ["Chen and Zhuge (2019) introduced ..."]
//!   }
//! ]
//! ```
//!
//! `year` may be a string or a number. `abstract` and `spans` are optional.

use crate::error::RelworkError;
use crate::output::CitedAnalysis;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;
use tracing::{debug, warn};

/// One paper cited by the target paper.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitedPaper {
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default, deserialize_with = "year_as_string")]
    pub year: String,
    #[serde(default, rename = "abstract")]
    pub abstract_text: String,
    /// Sentences of the target paper that cite this paper.
    #[serde(default)]
    pub spans: Vec<String>,
}

fn year_as_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Year {
        Text(String),
        Number(i64),
    }
    Ok(match Option::<Year>::deserialize(d)? {
        Some(Year::Text(s)) => s,
        Some(Year::Number(n)) => n.to_string(),
        None => String::new(),
    })
}

impl CitedPaper {
    /// Authors with placeholder entries such as `"et al."` removed.
    pub fn named_authors(&self) -> Vec<&str> {
        self.authors
            .iter()
            .map(|a| a.trim())
            .filter(|a| !a.is_empty() && !is_et_al(a))
            .collect()
    }

    /// `true` when the author list was explicitly truncated with "et al.".
    fn truncated_authors(&self) -> bool {
        self.authors.iter().any(|a| is_et_al(a.trim()))
    }

    /// First named author, or `"Anonymous"`.
    pub fn first_author(&self) -> &str {
        self.named_authors().first().copied().unwrap_or("Anonymous")
    }

    pub fn year_or_nd(&self) -> &str {
        match self.year.trim() {
            "" => "n.d.",
            y => y,
        }
    }

    /// Spans as one block, one per line.
    pub fn spans_block(&self) -> String {
        self.spans.join("\n")
    }

    /// Author-year marker: `A (Y)`, `A and B (Y)` or `A et al. (Y)`.
    pub fn citation_marker(&self) -> String {
        let names = self.named_authors();
        let year = self.year_or_nd();
        match (names.as_slice(), self.truncated_authors()) {
            ([], _) => format!("Anonymous ({year})"),
            ([only], false) => format!("{only} ({year})"),
            ([a, b], false) => format!("{a} and {b} ({year})"),
            ([first, ..], _) => format!("{first} et al. ({year})"),
        }
    }
}

fn is_et_al(author: &str) -> bool {
    matches!(
        author.to_lowercase().trim_end_matches('.').trim(),
        "et al" | "others" | "et. al"
    )
}

/// Parse a JSON array of cited papers.
pub fn parse_cited_papers(json: &str, source: &Path) -> Result<Vec<CitedPaper>, RelworkError> {
    let papers: Vec<CitedPaper> =
        serde_json::from_str(json).map_err(|e| RelworkError::CitedPapersInvalid {
            path: source.to_path_buf(),
            detail: e.to_string(),
        })?;

    for (i, paper) in papers.iter().enumerate() {
        if paper.title.trim().is_empty() {
            return Err(RelworkError::CitedPapersInvalid {
                path: source.to_path_buf(),
                detail: format!("entry {} has an empty title", i + 1),
            });
        }
        if paper.abstract_text.trim().is_empty() {
            warn!("Cited paper '{}' has no abstract", paper.title);
        }
    }

    debug!("Loaded {} cited papers from {}", papers.len(), source.display());
    Ok(papers)
}

/// Read and parse a cited-papers JSON file.
pub async fn load_cited_papers(path: &Path) -> Result<Vec<CitedPaper>, RelworkError> {
    let json = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| RelworkError::CitedPapersInvalid {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
    parse_cited_papers(&json, path)
}

/// The numbered cited-paper list fed to the final template.
///
/// `analyses` is index-aligned with `papers`.
pub fn cited_info_block(papers: &[CitedPaper], analyses: &[CitedAnalysis]) -> String {
    papers
        .iter()
        .zip(analyses)
        .enumerate()
        .map(|(i, (paper, analysis))| {
            format!(
                "{}. {} by {} ({})\n{}\n<Usage> {}",
                i + 1,
                paper.title,
                paper.authors.join(", "),
                paper.year_or_nd(),
                analysis.facet,
                analysis.usage
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
