//! Orchestration: target PDF + cited papers → related-work section.
//!
//! ## Chain
//!
//! ```text
//! extract TAIC ─▶ faceted summaries (target + each cited)
//!              ─▶ relationship per cited paper
//!              ─▶ usage per cited paper
//!              ─▶ main idea
//!              ─▶ related-work section (final model / temperature)
//! ```
//!
//! Steps run strictly in order, one call at a time: each step's prompt
//! embeds earlier results. Any call that fails after its retries aborts
//! the run.

use crate::config::{RelatedWorkConfig, DEFAULT_MODEL};
use crate::error::RelworkError;
use crate::output::{
    CitedAnalysis, DocumentMetadata, ExtractionOutput, GenerationStats, RelatedWorkOutput,
};
use crate::papers::{cited_info_block, CitedPaper};
use crate::pipeline::headings::{self, DocumentStructure};
use crate::pipeline::llm::{self, GenerationParams, TextGenerator};
use crate::pipeline::{decode, grobid, input, postprocess};
use crate::progress::{total_llm_calls, Stage};
use crate::prompts::{PromptTemplates, TemplateKind};
use crate::sections::{SectionMap, SectionName};
use edgequake_llm::{LLMProvider, ProviderFactory};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Decode a PDF and extract its TAIC sections. No LLM is involved.
pub async fn extract_taic(
    input_str: impl AsRef<str>,
    config: &RelatedWorkConfig,
) -> Result<ExtractionOutput, RelworkError> {
    let start = Instant::now();
    let input_str = input_str.as_ref();
    info!("Extracting sections: {}", input_str);

    if let Some(ref cb) = config.progress_callback {
        cb.on_extraction_start(input_str);
    }

    let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;
    let (sections, metadata) = extract_from_path(resolved.path(), config).await?;

    if let Some(ref cb) = config.progress_callback {
        cb.on_extraction_complete(metadata.page_count, sections.len());
    }

    Ok(ExtractionOutput {
        sections,
        metadata,
        duration_ms: start.elapsed().as_millis() as u64,
    })
}

async fn extract_from_path(
    pdf_path: &Path,
    config: &RelatedWorkConfig,
) -> Result<(SectionMap, DocumentMetadata), RelworkError> {
    let extractor = config.section_extractor()?;
    let document = decode::decode(pdf_path, config.password.as_deref()).await?;

    let structure: DocumentStructure = match config.grobid_url {
        Some(ref url) => grobid::fetch_structure(pdf_path, url, config.grobid_timeout_secs).await?,
        None => headings::detect_structure(&document.pages, extractor.noise()),
    }
    .with_metadata_title(document.metadata.title.as_deref());

    debug!(
        "Structure: {} divisions from {:?}",
        structure.divisions.len(),
        structure.origin
    );

    let sections = extractor.extract_with_structure(&document.pages, &structure);
    for name in SectionName::ALL {
        match sections.get(name) {
            Some(s) => info!("{}: {} words ({:?})", name, s.word_count(), s.origin),
            None => info!("{}: not found", name),
        }
    }

    Ok((sections, document.metadata))
}

/// Generate a related-work section for the paper at `input_str`.
///
/// Templates are loaded and the provider resolved before the PDF is
/// opened, so configuration mistakes fail fast.
pub async fn generate_related_work(
    input_str: impl AsRef<str>,
    cited: &[CitedPaper],
    config: &RelatedWorkConfig,
) -> Result<RelatedWorkOutput, RelworkError> {
    let total_start = Instant::now();
    let input_str = input_str.as_ref();
    info!(
        "Generating related work for {} ({} cited papers)",
        input_str,
        cited.len()
    );

    let templates = config.templates.load()?;
    let provider = resolve_provider(config, None)?;
    let final_provider = match config.final_model.as_deref() {
        Some(m) if config.provider.is_none() && Some(m) != config.model.as_deref() => {
            resolve_provider(config, Some(m))?
        }
        _ => Arc::clone(&provider),
    };

    let extraction = extract_taic(input_str, config).await?;

    let mut output = generate_from_sections(
        &provider,
        &final_provider,
        &templates,
        extraction.sections,
        extraction.metadata,
        cited,
        config,
    )
    .await?;

    output.stats.extraction_duration_ms = extraction.duration_ms;
    output.stats.total_duration_ms = total_start.elapsed().as_millis() as u64;

    info!(
        "Related work complete: {} LLM calls, {} in / {} out tokens, {}ms",
        output.stats.llm_calls,
        output.stats.total_input_tokens,
        output.stats.total_output_tokens,
        output.stats.total_duration_ms
    );

    Ok(output)
}

/// Run the LLM chain over already-extracted sections.
///
/// `final_generator` handles only the last step.
pub async fn generate_from_sections(
    generator: &dyn TextGenerator,
    final_generator: &dyn TextGenerator,
    templates: &PromptTemplates,
    sections: SectionMap,
    metadata: DocumentMetadata,
    cited: &[CitedPaper],
    config: &RelatedWorkConfig,
) -> Result<RelatedWorkOutput, RelworkError> {
    let mut chain = Chain {
        config,
        templates,
        call: 0,
        total: total_llm_calls(cited.len()),
        stats: GenerationStats::default(),
    };
    let params = config.generation_params();
    let final_params = config.final_generation_params();

    let title = sections.text_or_empty(SectionName::Title);
    let abstract_text = sections.text_or_empty(SectionName::Abstract);
    let introduction = sections.text_or_empty(SectionName::Introduction);
    let conclusion = sections.text_or_empty(SectionName::Conclusion);
    let taic = [
        ("title", title),
        ("abstract", abstract_text),
        ("introduction", introduction),
        ("conclusion", conclusion),
    ];

    // ── Step 2: faceted summaries ────────────────────────────────────────
    let target_facet = chain
        .step(
            generator,
            &params,
            Stage::FacetedSummary,
            "target paper",
            TemplateKind::FacetedSummary,
            &taic,
        )
        .await?;

    let mut analyses: Vec<CitedAnalysis> = Vec::with_capacity(cited.len());
    for paper in cited {
        let facet = chain
            .step(
                generator,
                &params,
                Stage::FacetedSummary,
                &paper.title,
                TemplateKind::FacetedSummary,
                &[
                    ("title", paper.title.as_str()),
                    ("abstract", paper.abstract_text.as_str()),
                    ("introduction", ""),
                    ("conclusion", ""),
                ],
            )
            .await?;
        analyses.push(CitedAnalysis {
            title: paper.title.clone(),
            marker: paper.citation_marker(),
            facet,
            ..Default::default()
        });
    }

    // ── Step 3: relationships ────────────────────────────────────────────
    let author_a = target_author(config, &metadata);
    let year_a = target_year(config, &metadata);
    for (paper, analysis) in cited.iter().zip(analyses.iter_mut()) {
        let spans = paper.spans_block();
        analysis.relationship = chain
            .step(
                generator,
                &params,
                Stage::Relationship,
                &paper.title,
                TemplateKind::Relationship,
                &[
                    ("title_a", title),
                    ("author_a", author_a.as_str()),
                    ("year_a", year_a.as_str()),
                    ("facet_a", target_facet.as_str()),
                    ("title_b", paper.title.as_str()),
                    ("author_b", paper.first_author()),
                    ("year_b", paper.year_or_nd()),
                    ("facet_b", analysis.facet.as_str()),
                    ("citation_marker", analysis.marker.as_str()),
                    ("spans", spans.as_str()),
                ],
            )
            .await?;
    }
    let relationships = analyses
        .iter()
        .map(|a| a.relationship.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    // ── Step 4: enriched usage ───────────────────────────────────────────
    for (paper, analysis) in cited.iter().zip(analyses.iter_mut()) {
        let spans = paper.spans_block();
        analysis.usage = chain
            .step(
                generator,
                &params,
                Stage::Usage,
                &paper.title,
                TemplateKind::Usage,
                &[
                    ("facet", analysis.facet.as_str()),
                    ("relations", relationships.as_str()),
                    ("spans", spans.as_str()),
                    ("citation_marker", analysis.marker.as_str()),
                ],
            )
            .await?;
    }

    // ── Step 5: main idea ────────────────────────────────────────────────
    let hint = config.main_idea_hint.as_deref().unwrap_or("");
    let main_idea = chain
        .step(
            generator,
            &params,
            Stage::MainIdea,
            "target paper",
            TemplateKind::MainIdea,
            &[
                ("title", title),
                ("abstract", abstract_text),
                ("introduction", introduction),
                ("conclusion", conclusion),
                ("facet", target_facet.as_str()),
                ("hint", hint),
            ],
        )
        .await?;

    // ── Step 6: related-work section ─────────────────────────────────────
    let cited_info = cited_info_block(cited, &analyses);
    let raw = chain
        .step(
            final_generator,
            &final_params,
            Stage::RelatedWork,
            "related work",
            TemplateKind::RelatedWork,
            &[
                ("title", title),
                ("abstract", abstract_text),
                ("introduction", introduction),
                ("conclusion", conclusion),
                ("main_idea", main_idea.as_str()),
                ("cited_info", cited_info.as_str()),
                ("relationships", relationships.as_str()),
            ],
        )
        .await?;
    let related_work = postprocess::clean_generated(&raw);

    if let Some(ref cb) = config.progress_callback {
        cb.on_generation_complete(chain.stats.llm_calls, related_work.len());
    }

    Ok(RelatedWorkOutput {
        related_work,
        sections,
        target_facet,
        main_idea,
        cited: analyses,
        metadata,
        stats: chain.stats,
    })
}

/// Running state of one chain: call numbering and counters.
struct Chain<'a> {
    config: &'a RelatedWorkConfig,
    templates: &'a PromptTemplates,
    call: usize,
    total: usize,
    stats: GenerationStats,
}

impl Chain<'_> {
    async fn step(
        &mut self,
        generator: &dyn TextGenerator,
        params: &GenerationParams,
        stage: Stage,
        label: &str,
        kind: TemplateKind,
        values: &[(&str, &str)],
    ) -> Result<String, RelworkError> {
        self.call += 1;
        let prompt = self.templates.render(kind, values)?;
        let cb = self.config.progress_callback.as_ref();

        if let Some(cb) = cb {
            cb.on_call_start(stage, self.call, self.total, label);
        }
        debug!("[{}/{}] {} for '{}'", self.call, self.total, stage, label);

        match llm::generate(generator, stage.as_str(), &prompt, params).await {
            Ok((text, call_stats)) => {
                self.stats.record_call(&call_stats);
                let text = postprocess::clean_intermediate(&text);
                if let Some(cb) = cb {
                    cb.on_call_complete(stage, self.call, self.total, text.len());
                }
                Ok(text)
            }
            Err(e) => {
                if let Some(cb) = cb {
                    cb.on_call_error(stage, self.call, self.total, &e.to_string());
                }
                Err(e)
            }
        }
    }
}

fn target_author(config: &RelatedWorkConfig, metadata: &DocumentMetadata) -> String {
    config
        .target_author
        .clone()
        .or_else(|| metadata.first_author_surname())
        .unwrap_or_else(|| "Anonymous".to_string())
}

fn target_year(config: &RelatedWorkConfig, metadata: &DocumentMetadata) -> String {
    config
        .target_year
        .clone()
        .or_else(|| metadata.creation_year())
        .unwrap_or_else(|| "n.d.".to_string())
}

/// Generate and write the related-work section to `output_path`.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn generate_to_file(
    input_str: impl AsRef<str>,
    cited: &[CitedPaper],
    output_path: impl AsRef<Path>,
    config: &RelatedWorkConfig,
) -> Result<RelatedWorkOutput, RelworkError> {
    let output = generate_related_work(input_str, cited, config).await?;
    write_atomic(output_path.as_ref(), &output.related_work).await?;
    Ok(output)
}

/// Write `contents` to a sibling temp file, then rename over `path`.
pub async fn write_atomic(path: &Path, contents: &str) -> Result<(), RelworkError> {
    let fail = |source: std::io::Error| RelworkError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(fail)?;
    }

    let tmp_path = tmp_sibling(path);
    tokio::fs::write(&tmp_path, contents).await.map_err(fail)?;
    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(fail(e));
    }
    debug!("Wrote {} bytes to {}", contents.len(), path.display());
    Ok(())
}

fn tmp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("output"));
    name.push(".tmp");
    path.with_file_name(name)
}

/// Synchronous wrapper around [`generate_related_work`].
///
/// Creates a temporary tokio runtime internally.
pub fn generate_sync(
    input_str: impl AsRef<str>,
    cited: &[CitedPaper],
    config: &RelatedWorkConfig,
) -> Result<RelatedWorkOutput, RelworkError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| RelworkError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(generate_related_work(input_str, cited, config))
}

/// Read PDF metadata without extracting sections.
///
/// Does not require an LLM provider or API key.
pub async fn inspect(
    input_str: impl AsRef<str>,
    config: &RelatedWorkConfig,
) -> Result<DocumentMetadata, RelworkError> {
    let resolved = input::resolve_input(input_str.as_ref(), config.download_timeout_secs).await?;
    decode::extract_metadata(resolved.path(), config.password.as_deref()).await
}

// ── Provider resolution ──────────────────────────────────────────────────

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, RelworkError> {
    debug!("Creating provider {} with model {}", provider_name, model);
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        RelworkError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`), used as-is.
/// 2. **Named provider** (`config.provider_name`) with the requested model.
/// 3. **Environment pair** `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`;
///    an explicit model in the config still wins over `EDGEQUAKE_MODEL`.
/// 4. **OpenAI** when `OPENAI_API_KEY` is set.
/// 5. **Auto-detection** via [`ProviderFactory::from_env`] (default model
///    of whichever provider it finds).
///
/// `model_override` (the final-step model) takes precedence over `config.model`.
pub fn resolve_provider(
    config: &RelatedWorkConfig,
    model_override: Option<&str>,
) -> Result<Arc<dyn LLMProvider>, RelworkError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    let requested = model_override.or(config.model.as_deref());

    if let Some(ref name) = config.provider_name {
        return create_provider(name, requested.unwrap_or(DEFAULT_MODEL));
    }

    if let (Ok(prov), Ok(env_model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !env_model.is_empty() {
            return create_provider(&prov, requested.unwrap_or(&env_model));
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            return create_provider("openai", requested.unwrap_or(DEFAULT_MODEL));
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| RelworkError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}
