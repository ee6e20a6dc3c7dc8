//! End-to-end integration tests for edgequake-relwork.
//!
//! These tests use real PDF files in `./test_cases/`, need a pdfium library,
//! and (for generation) make live LLM API calls. They are gated behind the
//! `E2E_ENABLED` environment variable so they do not run in CI unless
//! explicitly requested.
//!
//! Run with:
//!   E2E_ENABLED=1 PDFIUM_LIB_PATH=/path/to/lib cargo test --test e2e -- --nocapture
//!
//! Generation tests additionally need `OPENAI_API_KEY` (or another provider).

use edgequake_relwork::{
    extract_taic, generate_to_file, inspect, CitedPaper, RelatedWorkConfig, RelworkError,
    SectionName,
};
use std::path::PathBuf;

// ── Test helpers ─────────────────────────────────────────────────────────────

fn test_cases_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases")
}

/// Skip this test if E2E_ENABLED is not set *or* no PDF file at `path`.
macro_rules! e2e_skip_unless_ready {
    ($path:expr) => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP — set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        let p: PathBuf = $path;
        if !p.exists() {
            println!("SKIP — test file not found: {}", p.display());
            return;
        }
        p
    }};
}

fn has_llm_key() -> bool {
    ["OPENAI_API_KEY", "ANTHROPIC_API_KEY", "GEMINI_API_KEY"]
        .iter()
        .any(|k| std::env::var(k).is_ok_and(|v| !v.is_empty()))
}

fn attention_cited() -> Vec<CitedPaper> {
    vec![
        CitedPaper {
            title: "Neural machine translation by jointly learning to align and translate".into(),
            authors: vec!["Bahdanau".into(), "Cho".into(), "Bengio".into()],
            year: "2014".into(),
            abstract_text: "We conjecture that the use of a fixed-length vector is a \
                            bottleneck and propose to allow a model to automatically \
                            search for parts of a source sentence relevant to a target word."
                .into(),
            spans: vec!["Attention mechanisms have become an integral part of \
                         sequence modeling [2]."
                .into()],
        },
        CitedPaper {
            title: "Long short-term memory".into(),
            authors: vec!["Hochreiter".into(), "Schmidhuber".into()],
            year: "1997".into(),
            abstract_text: "Learning to store information over extended time intervals by \
                            recurrent backpropagation takes a very long time."
                .into(),
            spans: vec!["Recurrent neural networks, long short-term memory [13] ...".into()],
        },
    ]
}

// ── Inspect tests (no LLM) ───────────────────────────────────────────────────

#[tokio::test]
async fn test_inspect_arxiv_paper() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("attention_is_all_you_need.pdf"));

    let meta = inspect(path.to_str().unwrap(), &RelatedWorkConfig::default())
        .await
        .expect("inspect() should succeed");

    assert_eq!(meta.page_count, 15, "Attention paper should have 15 pages");
    assert!(!meta.pdf_version.is_empty());
    println!("Metadata: {:?}", meta);
}

#[tokio::test]
async fn test_inspect_nonexistent() {
    if std::env::var("E2E_ENABLED").is_err() {
        println!("SKIP");
        return;
    }
    let err = inspect("/no/such/paper.pdf", &RelatedWorkConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, RelworkError::FileNotFound { .. }));
}

// ── Extraction tests (pdfium, no LLM) ────────────────────────────────────────

#[tokio::test]
async fn test_extract_arxiv_paper() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("attention_is_all_you_need.pdf"));

    let out = extract_taic(path.to_str().unwrap(), &RelatedWorkConfig::default())
        .await
        .expect("extract_taic() should succeed");

    for name in SectionName::ALL {
        let section = out.sections.get(name);
        assert!(section.is_some(), "{name} should be found");
        println!(
            "{name}: {} words ({:?})",
            section.map_or(0, |s| s.word_count()),
            section.map(|s| s.origin)
        );
    }

    let abstract_text = out.sections.text_or_empty(SectionName::Abstract);
    assert!(abstract_text.contains("Transformer"));
    let conclusion = out.sections.text_or_empty(SectionName::Conclusion);
    assert!(!conclusion.contains("References"));
}

#[tokio::test]
async fn test_extract_with_grobid() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("attention_is_all_you_need.pdf"));
    let Ok(url) = std::env::var("GROBID_URL") else {
        println!("SKIP — set GROBID_URL to run Grobid tests");
        return;
    };

    let config = RelatedWorkConfig::builder().grobid_url(url).build().unwrap();
    let out = extract_taic(path.to_str().unwrap(), &config)
        .await
        .expect("Grobid extraction should succeed");

    assert!(out
        .sections
        .text_or_empty(SectionName::Title)
        .contains("Attention"));
    assert!(out.sections.contains(SectionName::Introduction));
}

// ── Generation tests (live LLM) ──────────────────────────────────────────────

#[tokio::test]
async fn test_generate_related_work_to_file() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("attention_is_all_you_need.pdf"));
    if !has_llm_key() {
        println!("SKIP — no LLM API key in environment");
        return;
    }

    let dir = tempfile::tempdir().unwrap();
    let out_path = dir.path().join("related_work.txt");
    let cited = attention_cited();
    let config = RelatedWorkConfig::builder()
        .target_author("Vaswani")
        .target_year("2017")
        .build()
        .unwrap();

    let output = generate_to_file(path.to_str().unwrap(), &cited, &out_path, &config)
        .await
        .expect("generation should succeed");

    assert_eq!(output.stats.llm_calls, 9);
    assert_eq!(output.cited.len(), 2);
    assert_eq!(output.cited[0].marker, "Bahdanau et al. (2014)");

    let written = std::fs::read_to_string(&out_path).unwrap();
    assert_eq!(written, output.related_work);
    assert!(written.ends_with('\n'));
    assert!(!written.starts_with("```"));
    assert!(written.len() >= 200, "related work suspiciously short");

    println!(
        "✓ {} bytes, {} in / {} out tokens",
        written.len(),
        output.stats.total_input_tokens,
        output.stats.total_output_tokens
    );
}
