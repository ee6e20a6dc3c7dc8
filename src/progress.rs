//! Progress-callback trait for per-call generation events.
//!
//! Inject an [`Arc<dyn GenerationProgressCallback>`] via
//! [`crate::config::RelatedWorkConfigBuilder::progress_callback`] to hear
//! about each stage of a run. The CLI drives its spinner from these events.
//!
//! A run with `n` cited papers makes `3n + 3` LLM calls: one faceted
//! summary for the target and each cited paper, one relationship and one
//! usage per cited paper, then the main idea and the final section.
//!
//! # Example
//!
//! ```rust
//! use edgequake_relwork::{GenerationProgressCallback, RelatedWorkConfig, Stage};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     done: AtomicUsize,
//! }
//!
//! impl GenerationProgressCallback for CountingCallback {
//!     fn on_call_complete(&self, stage: Stage, call: usize, total: usize, len: usize) {
//!         self.done.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("[{call}/{total}] {stage}: {len} bytes");
//!     }
//! }
//!
//! let config = RelatedWorkConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { done: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use std::fmt;
use std::sync::Arc;

/// One stage of a generation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Extraction,
    FacetedSummary,
    Relationship,
    Usage,
    MainIdea,
    RelatedWork,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Extraction => "extraction",
            Stage::FacetedSummary => "faceted summary",
            Stage::Relationship => "relationship",
            Stage::Usage => "usage",
            Stage::MainIdea => "main idea",
            Stage::RelatedWork => "related work",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Number of LLM calls a run with `cited` papers makes.
pub fn total_llm_calls(cited: usize) -> usize {
    3 * cited + 3
}

/// Called by the pipeline as a run progresses.
///
/// All methods default to no-ops. Calls arrive sequentially from the task
/// running the pipeline.
pub trait GenerationProgressCallback: Send + Sync {
    /// Decoding and section extraction are about to start.
    fn on_extraction_start(&self, input: &str) {
        let _ = input;
    }

    /// Extraction finished.
    ///
    /// * `pages`          — decoded page count
    /// * `sections_found` — TAIC sections present (0–4)
    fn on_extraction_complete(&self, pages: usize, sections_found: usize) {
        let _ = (pages, sections_found);
    }

    /// An LLM call is about to be sent.
    ///
    /// * `call`  — 1-indexed call number across the run
    /// * `total` — see [`total_llm_calls`]
    /// * `label` — what the call is about (a paper title, "target", ...)
    fn on_call_start(&self, stage: Stage, call: usize, total: usize, label: &str) {
        let _ = (stage, call, total, label);
    }

    /// An LLM call returned; `output_len` is the cleaned text's byte length.
    fn on_call_complete(&self, stage: Stage, call: usize, total: usize, output_len: usize) {
        let _ = (stage, call, total, output_len);
    }

    /// A call failed after every retry. The run stops after this event.
    fn on_call_error(&self, stage: Stage, call: usize, total: usize, error: &str) {
        let _ = (stage, call, total, error);
    }

    /// The related-work section is complete.
    fn on_generation_complete(&self, llm_calls: usize, output_len: usize) {
        let _ = (llm_calls, output_len);
    }
}

/// Default when no callback is configured.
pub struct NoopProgressCallback;

impl GenerationProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::RelatedWorkConfig`].
pub type ProgressCallback = Arc<dyn GenerationProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        calls: AtomicUsize,
        stages: Mutex<Vec<Stage>>,
    }

    impl GenerationProgressCallback for Recorder {
        fn on_call_start(&self, stage: Stage, _call: usize, _total: usize, _label: &str) {
            self.stages.lock().unwrap().push(stage);
        }

        fn on_call_complete(&self, _stage: Stage, _call: usize, _total: usize, _len: usize) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_extraction_start("paper.pdf");
        cb.on_extraction_complete(12, 4);
        cb.on_call_start(Stage::FacetedSummary, 1, 6, "target");
        cb.on_call_complete(Stage::FacetedSummary, 1, 6, 300);
        cb.on_call_error(Stage::MainIdea, 5, 6, "timeout");
        cb.on_generation_complete(6, 2048);
    }

    #[test]
    fn recorder_through_arc_dyn() {
        let rec = Arc::new(Recorder::default());
        let cb: ProgressCallback = rec.clone();
        cb.on_call_start(Stage::Relationship, 3, 6, "B");
        cb.on_call_complete(Stage::Relationship, 3, 6, 80);
        assert_eq!(rec.calls.load(Ordering::SeqCst), 1);
        assert_eq!(*rec.stages.lock().unwrap(), vec![Stage::Relationship]);
    }

    #[test]
    fn call_count_formula() {
        assert_eq!(total_llm_calls(0), 3);
        assert_eq!(total_llm_calls(2), 9);
    }

    #[test]
    fn stage_display() {
        assert_eq!(Stage::RelatedWork.to_string(), "related work");
    }
}
