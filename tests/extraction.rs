//! Integration tests over decoded page text: no PDF engine, no network.
//!
//! These drive the public API the way a caller that already has page text
//! (or a different LLM backend) would.

use edgequake_relwork::pipeline::llm::{Completion, CompletionFuture};
use edgequake_relwork::{
    generate_from_sections, parse_cited_papers, CitedPaper, DocumentMetadata, PromptTemplates,
    RelatedWorkConfig, RelworkError, SectionExtractor, SectionName, SectionOrigin, TemplateKind,
    TemplateSource, TextGenerator,
};
use edgequake_llm::CompletionOptions;
use std::path::Path;
use std::sync::Mutex;

fn words(prefix: &str, n: usize) -> String {
    (0..n)
        .map(|i| format!("{prefix}{i}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn sample_pages() -> Vec<String> {
    vec![
        format!(
            "Citation-Aware Drafting of Related Work\n\
             Ada Lovelace, Charles Babbage\n\
             Abstract\n{}\n\
             1 Introduction\n{}\n\
             2 Related Work\nPrior systems summarize citations.\n",
            words("a", 60),
            words("i", 70)
        ),
        format!(
            "3\n\
             3 Method\nWe build a chain of prompts.\n\
             4 Conclusion\n{}\n\
             Authorized licensed use limited to: Somewhere. Downloaded on May 1. Restrictions apply.\n\
             References\n[1] Chen and Zhuge.",
            words("c", 55)
        ),
    ]
}

// ── Extraction ───────────────────────────────────────────────────────────────

#[test]
fn extracts_all_taic_sections_from_headings() {
    let map = SectionExtractor::default().extract(&sample_pages());

    assert_eq!(map.len(), 4);
    assert_eq!(
        map.text(SectionName::Title),
        Some("Citation-Aware Drafting of Related Work")
    );
    assert_eq!(
        map.get(SectionName::Title).map(|s| s.origin),
        Some(SectionOrigin::FirstLine)
    );

    let abstract_text = map.text(SectionName::Abstract).unwrap();
    assert!(abstract_text.starts_with("Abstract a0 a1"));
    assert!(abstract_text.ends_with("a59"));

    let intro = map.get(SectionName::Introduction).unwrap();
    assert_eq!(intro.origin, SectionOrigin::Headings);
    assert!(intro.text.starts_with("Introduction i0"));
    assert_eq!(intro.word_count(), 71);

    let conclusion = map.text(SectionName::Conclusion).unwrap();
    assert!(conclusion.starts_with("Conclusion c0"));
    assert!(conclusion.ends_with("c54"));
    assert!(!conclusion.contains("Restrictions apply"));
}

#[test]
fn page_number_lines_never_reach_section_text() {
    let text = SectionExtractor::default().cleaned_text(&sample_pages());
    assert!(!text.contains(" 3 3 Method"));
    assert!(text.contains("3 Method"));
}

#[test]
fn custom_noise_pattern_hides_running_header() {
    let pages = vec![
        "Preprint under review\nConclusion\nWe find Y.\nPreprint under review\nand Z.\nReferences"
            .to_string(),
    ];

    let default_map = SectionExtractor::default().extract(&pages);
    assert!(default_map
        .text(SectionName::Conclusion)
        .unwrap()
        .contains("Preprint"));

    let config = RelatedWorkConfig::builder()
        .add_noise_pattern("^Preprint under review$")
        .build()
        .unwrap();
    let map = config.section_extractor().unwrap().extract(&pages);
    assert_eq!(
        map.text(SectionName::Conclusion),
        Some("Conclusion We find Y. and Z.")
    );
}

#[test]
fn malformed_noise_pattern_is_rejected_at_build() {
    let err = RelatedWorkConfig::builder()
        .add_noise_pattern("(unclosed")
        .build()
        .unwrap_err();
    assert!(matches!(err, RelworkError::InvalidConfig(_)));
}

// ── Templates ────────────────────────────────────────────────────────────────

#[test]
fn template_directory_overrides_one_step() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join(TemplateKind::MainIdea.file_name()),
        "Main idea of {title}? {{json}}",
    )
    .unwrap();

    let templates = TemplateSource::Directory(dir.path().to_path_buf())
        .load()
        .unwrap();
    assert_eq!(templates.main_idea, "Main idea of {title}? {{json}}");
    assert_eq!(templates.usage, PromptTemplates::default().usage);

    let rendered = templates
        .render(TemplateKind::MainIdea, &[("title", "X")])
        .unwrap();
    assert_eq!(rendered, "Main idea of X? {json}");
}

#[test]
fn template_with_unknown_placeholder_fails_to_load() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join(TemplateKind::Usage.file_name()),
        "{facet} {venue}",
    )
    .unwrap();

    let err = TemplateSource::Directory(dir.path().to_path_buf())
        .load()
        .unwrap_err();
    match err {
        RelworkError::TemplateError { placeholder, .. } => assert_eq!(placeholder, "venue"),
        other => panic!("unexpected error: {other}"),
    }
}

// ── Generation chain with a custom backend ───────────────────────────────────

/// Answers every prompt with a fixed string and records what it saw.
#[derive(Default)]
struct CannedBackend {
    seen: Mutex<Vec<(String, Option<f32>)>>,
}

impl TextGenerator for CannedBackend {
    fn complete<'a>(
        &'a self,
        prompt: &'a str,
        options: &'a CompletionOptions,
    ) -> CompletionFuture<'a> {
        self.seen
            .lock()
            .unwrap()
            .push((prompt.to_string(), options.temperature));
        Box::pin(async move {
            Ok(Completion {
                content: "**Answer:** canned reply  \n\n\n\nsecond line".to_string(),
                input_tokens: prompt.split_whitespace().count(),
                output_tokens: 5,
            })
        })
    }
}

const CITED_JSON: &str = r#"[
  {
    "title": "Automatic generation of related work through summarizing citations",
    "authors": ["Chen", "Zhuge"],
    "year": 2019,
    "abstract": "We summarize citation sentences.",
    "spans": ["Chen and Zhuge (2019) generate related work from citations."]
  },
  {
    "title": "Attention is all you need",
    "authors": ["Vaswani", "Shazeer", "Parmar"],
    "year": "2017"
  }
]"#;

#[tokio::test]
async fn chain_runs_end_to_end_on_extracted_sections() {
    let cited: Vec<CitedPaper> = parse_cited_papers(CITED_JSON, Path::new("cited.json")).unwrap();
    let sections = SectionExtractor::default().extract(&sample_pages());
    let config = RelatedWorkConfig::builder()
        .target_author("Lovelace")
        .target_year("2024")
        .main_idea_hint("focus on citation graphs")
        .build()
        .unwrap();

    let backend = CannedBackend::default();
    let output = generate_from_sections(
        &backend,
        &backend,
        &PromptTemplates::default(),
        sections,
        DocumentMetadata::default(),
        &cited,
        &config,
    )
    .await
    .unwrap();

    let seen = backend.seen.lock().unwrap().clone();
    assert_eq!(seen.len(), 9);
    assert_eq!(output.stats.llm_calls, 9);
    assert_eq!(output.stats.total_output_tokens, 45);

    // Intermediate results are cleaned but carry no trailing newline.
    assert_eq!(output.target_facet, "canned reply\n\nsecond line");
    // The final section always ends with exactly one newline.
    assert_eq!(output.related_work, "canned reply\n\nsecond line\n");

    assert_eq!(output.cited[0].marker, "Chen and Zhuge (2019)");
    assert_eq!(output.cited[1].marker, "Vaswani et al. (2017)");

    let relationship_prompt = &seen[3].0;
    assert!(relationship_prompt.contains("by Lovelace (2024)"));
    assert!(relationship_prompt.contains("Chen and Zhuge (2019) generate related work"));

    let main_idea_prompt = &seen[7].0;
    assert!(main_idea_prompt.contains("focus on citation graphs"));

    let (final_prompt, final_temperature) = &seen[8];
    assert_eq!(*final_temperature, Some(0.3));
    assert!(final_prompt.contains("2. Attention is all you need by Vaswani, Shazeer, Parmar (2017)"));
    assert!(final_prompt.contains("<Usage> canned reply"));
}
