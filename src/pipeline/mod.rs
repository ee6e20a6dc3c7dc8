//! Pipeline stages for TAIC extraction and related-work generation.
//!
//! Each submodule implements one step and is testable on its own.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ decode ──▶ headings | grobid ──▶ extract ──▶ llm ──▶ postprocess
//! (URL/path) (pdfium)   (structure)          (TAIC)      (chain)  (cleanup)
//! ```
//!
//! 1. [`input`]    — canonicalise the user-supplied path or URL to a local file
//! 2. [`decode`]   — per-page text and metadata; runs in `spawn_blocking`
//!    because pdfium is not async-safe
//! 3. [`clean`]    — noise-line filter and whitespace normalisation
//! 4. [`headings`] / [`grobid`] — section structure, from heading detection
//!    or from a Grobid TEI document
//! 5. [`boundary`] — keyword search between a start and stop heading
//! 6. [`extract`]  — structural pass with keyword-scan fallback
//! 7. [`llm`]      — one completion with retry/backoff; the only stage that
//!    talks to an LLM
//! 8. [`postprocess`] — deterministic cleanup of model prose

pub mod boundary;
pub mod clean;
pub mod decode;
pub mod extract;
pub mod grobid;
pub mod headings;
pub mod input;
pub mod llm;
pub mod postprocess;
