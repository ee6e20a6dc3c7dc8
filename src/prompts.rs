//! Prompt templates for the related-work generation chain.
//!
//! Five templates drive the chain, one per LLM step. The built-in versions
//! below are used unless the caller supplies a template directory or inline
//! templates via [`TemplateSource`].
//!
//! ## Template syntax
//!
//! `{name}` is replaced by the named value; `{{` and `}}` produce literal
//! braces. Any other `{identifier}` is rejected with
//! [`RelworkError::TemplateError`]. Templates are checked when loaded, so a
//! typo in a custom template fails before the first (billable) LLM call.

use crate::error::RelworkError;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Faceted summary of one paper (target or cited).
pub const FACETED_SUMMARY_TEMPLATE: &str = r#"Title: {title}
Abstract: {abstract}
Introduction: {introduction}
Conclusion: {conclusion}

What are the objective, method, findings, contributions and keywords of the paper above? Answer in this format:
Objective: ...
Method: ...
Findings: ...
Contribution: ...
Keywords: A; B; C"#;

/// Relationship between the target paper (A) and one cited paper (B).
pub const RELATIONSHIP_TEMPLATE: &str = r#"Paper A: {title_a} by {author_a} ({year_a})
Faceted summary of A:
{facet_a}

Paper B: {title_b} by {author_b} ({year_b})
Faceted summary of B:
{facet_b}

How Paper A cites Paper B:
{spans}

Very briefly explain the relationship between Paper A and Paper B, referring to Paper B as {citation_marker}. TLDR:"#;

/// How a cited paper is known and commonly cited.
pub const USAGE_TEMPLATE: &str = r#"Faceted summary of B ({citation_marker}):
{facet}

How B is cited by others:
{relations}

Citation sentences mentioning B:
{spans}

Summarize how B is known and commonly cited. Format: "B is known for ... and cited for ...""#;

/// Main idea of the related-work section to write.
pub const MAIN_IDEA_TEMPLATE: &str = r#"Title: {title}
Abstract: {abstract}
Introduction: {introduction}
Conclusion: {conclusion}

Faceted summary:
{facet}

Author's note on the cited work:
{hint}

Write a short summary of the main idea of the related work section."#;

/// Final related-work section.
pub const RELATED_WORK_TEMPLATE: &str = r#"Title: {title}
Abstract: {abstract}
Introduction: {introduction}
Conclusion: {conclusion}

Main idea of the related work section:
{main_idea}

List of cited papers:
{cited_info}

Relationships among papers:
{relationships}

Write a related work section that includes all papers, integrates their content, and uses transitions. Do not list summaries. Use paragraph structure."#;

/// The five chain steps that use a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateKind {
    FacetedSummary,
    Relationship,
    Usage,
    MainIdea,
    RelatedWork,
}

impl TemplateKind {
    pub const ALL: [TemplateKind; 5] = [
        TemplateKind::FacetedSummary,
        TemplateKind::Relationship,
        TemplateKind::Usage,
        TemplateKind::MainIdea,
        TemplateKind::RelatedWork,
    ];

    /// File name looked up in a template directory.
    pub fn file_name(&self) -> &'static str {
        match self {
            TemplateKind::FacetedSummary => "generate_faceted_summary.txt",
            TemplateKind::Relationship => "infer_relationship.txt",
            TemplateKind::Usage => "enrich_usage.txt",
            TemplateKind::MainIdea => "generate_main_idea.txt",
            TemplateKind::RelatedWork => "generate_related_work.txt",
        }
    }

    /// Template name used in errors and logs.
    pub fn name(&self) -> &'static str {
        self.file_name().trim_end_matches(".txt")
    }

    pub fn builtin(&self) -> &'static str {
        match self {
            TemplateKind::FacetedSummary => FACETED_SUMMARY_TEMPLATE,
            TemplateKind::Relationship => RELATIONSHIP_TEMPLATE,
            TemplateKind::Usage => USAGE_TEMPLATE,
            TemplateKind::MainIdea => MAIN_IDEA_TEMPLATE,
            TemplateKind::RelatedWork => RELATED_WORK_TEMPLATE,
        }
    }

    /// Placeholders the chain supplies for this step.
    pub fn placeholders(&self) -> &'static [&'static str] {
        match self {
            TemplateKind::FacetedSummary => &["title", "abstract", "introduction", "conclusion"],
            TemplateKind::Relationship => &[
                "title_a",
                "author_a",
                "year_a",
                "facet_a",
                "title_b",
                "author_b",
                "year_b",
                "facet_b",
                "citation_marker",
                "spans",
            ],
            TemplateKind::Usage => &["facet", "relations", "spans", "citation_marker"],
            TemplateKind::MainIdea => &[
                "title",
                "abstract",
                "introduction",
                "conclusion",
                "facet",
                "hint",
            ],
            TemplateKind::RelatedWork => &[
                "title",
                "abstract",
                "introduction",
                "conclusion",
                "main_idea",
                "cited_info",
                "relationships",
            ],
        }
    }
}

/// One text per chain step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptTemplates {
    pub faceted_summary: String,
    pub relationship: String,
    pub usage: String,
    pub main_idea: String,
    pub related_work: String,
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self {
            faceted_summary: FACETED_SUMMARY_TEMPLATE.to_string(),
            relationship: RELATIONSHIP_TEMPLATE.to_string(),
            usage: USAGE_TEMPLATE.to_string(),
            main_idea: MAIN_IDEA_TEMPLATE.to_string(),
            related_work: RELATED_WORK_TEMPLATE.to_string(),
        }
    }
}

impl PromptTemplates {
    pub fn get(&self, kind: TemplateKind) -> &str {
        match kind {
            TemplateKind::FacetedSummary => &self.faceted_summary,
            TemplateKind::Relationship => &self.relationship,
            TemplateKind::Usage => &self.usage,
            TemplateKind::MainIdea => &self.main_idea,
            TemplateKind::RelatedWork => &self.related_work,
        }
    }

    fn slot(&mut self, kind: TemplateKind) -> &mut String {
        match kind {
            TemplateKind::FacetedSummary => &mut self.faceted_summary,
            TemplateKind::Relationship => &mut self.relationship,
            TemplateKind::Usage => &mut self.usage,
            TemplateKind::MainIdea => &mut self.main_idea,
            TemplateKind::RelatedWork => &mut self.related_work,
        }
    }

    /// Load templates from `dir`; a missing file keeps the built-in text.
    pub fn from_dir(dir: &Path) -> Result<Self, RelworkError> {
        let mut templates = Self::default();
        for kind in TemplateKind::ALL {
            let path = dir.join(kind.file_name());
            match std::fs::read_to_string(&path) {
                Ok(text) => {
                    debug!("Loaded template {}", path.display());
                    *templates.slot(kind) = text;
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    debug!("No {} in {}, using built-in", kind.file_name(), dir.display());
                }
                Err(source) => return Err(RelworkError::TemplateReadFailed { path, source }),
            }
        }
        Ok(templates)
    }

    /// Check every template only references placeholders its step supplies.
    pub fn validate(&self) -> Result<(), RelworkError> {
        for kind in TemplateKind::ALL {
            if let Some(unknown) = placeholders_in(self.get(kind))
                .into_iter()
                .find(|p| !kind.placeholders().contains(&p.as_str()))
            {
                return Err(RelworkError::TemplateError {
                    template: kind.name().to_string(),
                    placeholder: unknown,
                });
            }
        }
        Ok(())
    }

    /// Fill the template for `kind`.
    pub fn render(&self, kind: TemplateKind, values: &[(&str, &str)]) -> Result<String, RelworkError> {
        render_template(kind.name(), self.get(kind), values)
    }
}

/// Where the chain's templates come from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TemplateSource {
    /// The built-in templates in this module.
    #[default]
    Builtin,
    /// A directory of `*.txt` files named after [`TemplateKind::file_name`].
    Directory(PathBuf),
    /// Templates supplied as strings.
    Inline(PromptTemplates),
}

impl TemplateSource {
    /// Resolve and validate the templates.
    pub fn load(&self) -> Result<PromptTemplates, RelworkError> {
        let templates = match self {
            TemplateSource::Builtin => PromptTemplates::default(),
            TemplateSource::Directory(dir) => PromptTemplates::from_dir(dir)?,
            TemplateSource::Inline(t) => t.clone(),
        };
        templates.validate()?;
        Ok(templates)
    }
}

static RE_PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{|\}\}|\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap());

/// Placeholder names referenced by `template`, in order of appearance.
pub fn placeholders_in(template: &str) -> Vec<String> {
    RE_PLACEHOLDER
        .captures_iter(template)
        .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

/// Substitute `{name}` placeholders and unescape `{{`/`}}`.
///
/// Substituted values are inserted verbatim: braces inside a value are
/// never interpreted.
pub fn render_template(
    template_name: &str,
    template: &str,
    values: &[(&str, &str)],
) -> Result<String, RelworkError> {
    let mut unknown: Option<String> = None;
    let rendered = RE_PLACEHOLDER.replace_all(template, |caps: &Captures<'_>| {
        match caps.get(1) {
            None if &caps[0] == "{{" => "{".to_string(),
            None => "}".to_string(),
            Some(name) => match values.iter().find(|(k, _)| *k == name.as_str()) {
                Some((_, v)) => v.to_string(),
                None => {
                    unknown.get_or_insert_with(|| name.as_str().to_string());
                    String::new()
                }
            },
        }
    });

    match unknown {
        Some(placeholder) => Err(RelworkError::TemplateError {
            template: template_name.to_string(),
            placeholder,
        }),
        None => Ok(rendered.into_owned()),
    }
}
