//! # edgequake-relwork
//!
//! Extract the Title, Abstract, Introduction and Conclusion (TAIC) of an
//! academic PDF, then draft its related-work section with an LLM.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input      resolve local file or download from URL
//!  ├─ 2. Decode     per-page text + metadata via pdfium (spawn_blocking)
//!  ├─ 3. Structure  heading detection, or Grobid TEI when configured
//!  ├─ 4. Extract    TAIC sections, keyword scan when a division is too short
//!  ├─ 5. Chain      faceted summaries → relationships → usage → main idea
//!  └─ 6. Output     related-work section + intermediate results + stats
//! ```
//!
//! A run with `n` cited papers makes `3n + 3` sequential LLM calls.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_relwork::{generate_related_work, CitedPaper, RelatedWorkConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / ...
//!     let config = RelatedWorkConfig::default();
//!     let cited = vec![CitedPaper {
//!         title: "Automatic generation of related work".into(),
//!         authors: vec!["Chen".into(), "Zhuge".into()],
//!         year: "2019".into(),
//!         ..Default::default()
//!     }];
//!     let output = generate_related_work("paper.pdf", &cited, &config).await?;
//!     println!("{}", output.related_work);
//!     Ok(())
//! }
//! ```
//!
//! Extraction alone needs no provider:
//!
//! ```rust,no_run
//! # async fn run() -> Result<(), edgequake_relwork::RelworkError> {
//! use edgequake_relwork::{extract_taic, RelatedWorkConfig, SectionName};
//!
//! let out = extract_taic("paper.pdf", &RelatedWorkConfig::default()).await?;
//! println!("{}", out.sections.text_or_empty(SectionName::Abstract));
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `relwork` binary (clap + anyhow + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod generate;
pub mod output;
pub mod papers;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod sections;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{RelatedWorkConfig, RelatedWorkConfigBuilder, TemplateSource};
pub use error::RelworkError;
pub use generate::{
    extract_taic, generate_from_sections, generate_related_work, generate_sync,
    generate_to_file, inspect,
};
pub use output::{
    CitedAnalysis, DocumentMetadata, ExtractionOutput, GenerationStats, RelatedWorkOutput,
};
pub use papers::{load_cited_papers, parse_cited_papers, CitedPaper};
pub use pipeline::clean::NoiseFilter;
pub use pipeline::extract::SectionExtractor;
pub use pipeline::llm::TextGenerator;
pub use progress::{GenerationProgressCallback, NoopProgressCallback, ProgressCallback, Stage};
pub use prompts::{PromptTemplates, TemplateKind};
pub use sections::{ExtractedSection, SectionMap, SectionName, SectionOrigin, SectionPlan};
