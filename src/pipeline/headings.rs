//! Heading-line structure detection over decoded page text.
//!
//! This is the structural first pass of section extraction. Academic PDFs
//! put section headings on their own line ("1 Introduction",
//! "IV. CONCLUSIONS", "Related Work"), so grouping lines under the
//! nearest preceding heading gives a division list comparable to what a
//! layout-aware service such as Grobid returns, without the service.
//!
//! The heuristic errs towards recall: a false heading only cuts a division
//! short, and the extractor's keyword fallback repairs short divisions.

use crate::pipeline::boundary::contains_keyword;
use crate::pipeline::clean::{normalize_whitespace, NoiseFilter};
use crate::sections::{ExtractedSection, SectionOrigin};
use once_cell::sync::Lazy;
use regex::Regex;

/// Maximum words in a heading (after the numbering prefix).
const MAX_HEADING_WORDS: usize = 8;
/// Maximum characters in a heading line.
const MAX_HEADING_CHARS: usize = 80;

/// Section words recognised as headings even without numbering or capitals.
const KNOWN_HEADINGS: &[&str] = &[
    "abstract",
    "introduction",
    "related work",
    "related works",
    "background",
    "literature review",
    "method",
    "methods",
    "methodology",
    "approach",
    "experiments",
    "evaluation",
    "results",
    "discussion",
    "conclusion",
    "conclusions",
    "concluding remarks",
    "future work",
    "acknowledgment",
    "acknowledgments",
    "acknowledgement",
    "acknowledgements",
    "references",
    "bibliography",
    "appendix",
    "index terms",
    "keywords",
];

// "1 ", "2.3 ", "IV. ", "A. ", "3) "
static RE_NUMBERING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:\d{1,2}(?:\.\d{1,2})*\.?|[IVXL]{1,6}[.)]?|[A-H][.)]|\d{1,2}\))\s+").unwrap()
});

/// One heading and the lines that follow it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Division {
    /// Heading line as printed, numbering included.
    pub head: String,
    /// Body lines joined by single spaces.
    pub body: String,
}

impl Division {
    /// Heading followed by body, whitespace-collapsed.
    pub fn text(&self) -> String {
        normalize_whitespace(&format!("{} {}", self.head, self.body))
    }
}

/// Section structure of one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentStructure {
    /// Best title candidate, with its provenance.
    pub title: Option<ExtractedSection>,
    /// Abstract supplied directly by the structure source (Grobid only).
    pub abstract_text: Option<String>,
    /// Divisions in document order.
    pub divisions: Vec<Division>,
    /// Which pass produced the divisions.
    pub origin: SectionOrigin,
}

impl DocumentStructure {
    /// An empty structure: every lookup misses.
    pub fn empty(origin: SectionOrigin) -> Self {
        Self {
            title: None,
            abstract_text: None,
            divisions: Vec::new(),
            origin,
        }
    }

    /// First division whose heading contains a keyword, in keyword priority order.
    pub fn find_division<S: AsRef<str>>(&self, keywords: &[S]) -> Option<&Division> {
        keywords.iter().find_map(|kw| {
            self.divisions
                .iter()
                .find(|d| contains_keyword(&d.head, kw.as_ref()))
        })
    }

    /// Prefer a plausible PDF metadata title over a first-line guess.
    ///
    /// A Grobid title is never replaced.
    pub fn with_metadata_title(mut self, metadata_title: Option<&str>) -> Self {
        let from_grobid = self
            .title
            .as_ref()
            .is_some_and(|t| t.origin == SectionOrigin::Grobid);
        if from_grobid {
            return self;
        }
        if let Some(title) = metadata_title.filter(|t| is_plausible_title(t)) {
            self.title = Some(ExtractedSection::new(
                normalize_whitespace(title),
                SectionOrigin::Metadata,
            ));
        }
        self
    }
}

/// Reject metadata titles that are file names or authoring-tool defaults.
fn is_plausible_title(title: &str) -> bool {
    let t = title.trim();
    let lower = t.to_lowercase();
    if t.split_whitespace().count() < 2 {
        return false;
    }
    if lower.starts_with("microsoft word") || lower.starts_with("untitled") {
        return false;
    }
    ![".pdf", ".doc", ".docx", ".dvi", ".tex"]
        .iter()
        .any(|ext| lower.ends_with(ext))
}

/// `true` when `line` looks like a section heading.
pub fn is_heading(line: &str) -> bool {
    let line = line.trim();
    if line.is_empty() || line.chars().count() > MAX_HEADING_CHARS {
        return false;
    }

    let (numbered, rest) = match RE_NUMBERING.find(line) {
        Some(m) => (true, line[m.end()..].trim()),
        None => (false, line),
    };
    let rest = rest.trim_end_matches(':').trim_end();

    let words = rest.split_whitespace().count();
    if words == 0 || words > MAX_HEADING_WORDS {
        return false;
    }
    if rest.ends_with(['.', ',', ';']) {
        return false;
    }
    if !rest.chars().any(char::is_alphabetic) {
        return false;
    }

    let starts_upper = rest.chars().next().is_some_and(char::is_uppercase);
    let letters: Vec<char> = rest.chars().filter(|c| c.is_alphabetic()).collect();
    let all_caps = letters.len() >= 3 && letters.iter().all(|c| c.is_uppercase());
    let known = KNOWN_HEADINGS.contains(&rest.to_lowercase().as_str());

    (numbered && starts_upper) || all_caps || known
}

/// Group noise-filtered page lines into heading divisions.
///
/// Lines before the first heading are front matter; the first non-empty
/// one becomes the title candidate.
pub fn detect_structure<S: AsRef<str>>(pages: &[S], noise: &NoiseFilter) -> DocumentStructure {
    let mut structure = DocumentStructure::empty(SectionOrigin::Headings);

    structure.title = pages
        .first()
        .and_then(|first| {
            noise
                .filter_lines(first.as_ref())
                .lines()
                .map(str::trim)
                .find(|l| !l.is_empty())
                .map(str::to_string)
        })
        .map(|t| ExtractedSection::new(t, SectionOrigin::FirstLine));

    let mut current: Option<(String, Vec<String>)> = None;

    for page in pages {
        let filtered = noise.filter_lines(page.as_ref());
        for line in filtered.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if is_heading(line) {
                if let Some((head, body)) = current.take() {
                    structure.divisions.push(Division {
                        head,
                        body: normalize_whitespace(&body.join(" ")),
                    });
                }
                current = Some((line.to_string(), Vec::new()));
            } else if let Some((_, body)) = current.as_mut() {
                body.push(line.to_string());
            }
        }
    }

    if let Some((head, body)) = current {
        structure.divisions.push(Division {
            head,
            body: normalize_whitespace(&body.join(" ")),
        });
    }

    structure
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_common_heading_forms() {
        assert!(is_heading("1 Introduction"));
        assert!(is_heading("1. Introduction"));
        assert!(is_heading("IV. CONCLUSIONS"));
        assert!(is_heading("INTRODUCTION"));
        assert!(is_heading("Related Work"));
        assert!(is_heading("2.1 Data Collection"));
        assert!(is_heading("A. Threat Model"));
        assert!(is_heading("Abstract:"));
    }

    #[test]
    fn rejects_prose() {
        assert!(!is_heading("This is a normal paragraph with some text."));
        assert!(!is_heading("we observe that the model converges quickly"));
        assert!(!is_heading("I think the results are clear"));
        assert!(!is_heading("42"));
        assert!(!is_heading(""));
        assert!(!is_heading(
            "1 This heading line is far too long to be a real heading in a paper"
        ));
    }

    #[test]
    fn groups_lines_under_headings() {
        let pages = vec![
            "A Study of X\nJane Doe\n1 Introduction\nWe study X.\nIt matters.".to_string(),
            "2 Related Work\nPrior work exists.\n5 Conclusion\nWe find Y.".to_string(),
        ];
        let s = detect_structure(&pages, &NoiseFilter::default());
        assert_eq!(s.divisions.len(), 3);
        assert_eq!(s.divisions[0].head, "1 Introduction");
        assert_eq!(s.divisions[0].body, "We study X. It matters.");
        assert_eq!(s.divisions[2].text(), "5 Conclusion We find Y.");
        let title = s.title.unwrap();
        assert_eq!(title.text, "A Study of X");
        assert_eq!(title.origin, SectionOrigin::FirstLine);
    }

    #[test]
    fn noise_lines_do_not_split_or_pollute() {
        let pages = vec!["1 Introduction\nWe study X.\n658\n©2024 IEEE\nMore text.".to_string()];
        let s = detect_structure(&pages, &NoiseFilter::default());
        assert_eq!(s.divisions.len(), 1);
        assert_eq!(s.divisions[0].body, "We study X. More text.");
    }

    #[test]
    fn find_division_uses_keyword_priority() {
        let pages = vec!["Conclusion\nshort\nCONCLUSIONS\nlong".to_string()];
        let s = detect_structure(&pages, &NoiseFilter::default());
        let d = s.find_division(&["Conclusions", "Conclusion"]).unwrap();
        assert_eq!(d.head, "CONCLUSIONS");
    }

    #[test]
    fn metadata_title_replaces_first_line_guess() {
        let pages = vec!["Journal of Things, Vol 3\n1 Introduction\nbody".to_string()];
        let s = detect_structure(&pages, &NoiseFilter::default())
            .with_metadata_title(Some("Explaining Relationships Among Papers"));
        let title = s.title.unwrap();
        assert_eq!(title.text, "Explaining Relationships Among Papers");
        assert_eq!(title.origin, SectionOrigin::Metadata);
    }

    #[test]
    fn implausible_metadata_title_is_ignored() {
        let pages = vec!["Real Title Here\n1 Introduction".to_string()];
        let s = detect_structure(&pages, &NoiseFilter::default())
            .with_metadata_title(Some("Microsoft Word - draft7.docx"));
        assert_eq!(s.title.unwrap().text, "Real Title Here");
    }

    #[test]
    fn empty_pages_give_empty_structure() {
        let s = detect_structure::<String>(&[], &NoiseFilter::default());
        assert!(s.title.is_none());
        assert!(s.divisions.is_empty());
    }
}
