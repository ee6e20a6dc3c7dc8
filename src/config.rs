//! Configuration for extraction and related-work generation.
//!
//! Every knob lives in [`RelatedWorkConfig`], built via
//! [`RelatedWorkConfigBuilder`] and passed explicitly to each entry point.
//! Model names, temperatures, template locations and noise patterns are
//! all per-call values; nothing is read from module-level state.
//!
//! # Example
//! ```rust
//! use edgequake_relwork::{RelatedWorkConfig, TemplateSource};
//!
//! let config = RelatedWorkConfig::builder()
//!     .model("gpt-4.1-nano")
//!     .final_model("gpt-4.1")
//!     .temperature(0.5)
//!     .templates(TemplateSource::Builtin)
//!     .min_section_words(50)
//!     .build()
//!     .unwrap();
//! ```

use crate::error::RelworkError;
use crate::pipeline::clean::{NoiseFilter, DEFAULT_NOISE_PATTERNS};
use crate::pipeline::extract::{SectionExtractor, DEFAULT_MIN_SECTION_WORDS};
use crate::pipeline::input::is_url;
use crate::pipeline::llm::GenerationParams;
use crate::progress::ProgressCallback;
use crate::sections::{default_plans, SectionPlan};
use edgequake_llm::LLMProvider;
use std::fmt;
use std::sync::Arc;

pub use crate::prompts::TemplateSource;

/// Model used when neither the config nor the environment names one.
pub const DEFAULT_MODEL: &str = "gpt-4.1-nano";

/// Configuration for one related-work run.
#[derive(Clone)]
pub struct RelatedWorkConfig {
    /// Model for every step except the final section. If None, uses
    /// `EDGEQUAKE_MODEL` or [`DEFAULT_MODEL`].
    pub model: Option<String>,

    /// Model for the final related-work section. If None, uses `model`.
    pub final_model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    /// If None along with `provider`, the provider is auto-detected.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider, used for every step. Takes precedence
    /// over `provider_name` and both model fields.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature for intermediate steps. Default: 0.5.
    pub temperature: f32,

    /// Sampling temperature for the final section. Default: 0.3.
    pub final_temperature: f32,

    /// Maximum tokens per completion. Default: 2048.
    pub max_tokens: usize,

    /// Retries after a failed LLM call. Default: 3.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled per attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Per-LLM-call timeout in seconds. Default: 120.
    pub api_timeout_secs: u64,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Where the five prompt templates come from. Default: built-in.
    pub templates: TemplateSource,

    /// Grobid base URL (e.g. `http://localhost:8070`). When set, TEI
    /// structure replaces heading-line detection.
    pub grobid_url: Option<String>,

    /// Timeout for the Grobid request in seconds. Default: 120.
    pub grobid_timeout_secs: u64,

    /// Structural sections shorter than this trigger the keyword scan. Default: 50.
    pub min_section_words: usize,

    /// Line noise patterns (case-insensitive regexes). Default: built-in set.
    pub noise_patterns: Vec<String>,

    /// Section start/stop keyword plans. Default: abstract, introduction, conclusion.
    pub section_plans: Vec<SectionPlan>,

    /// Target paper's first-author surname for relationship prompts.
    /// If None, taken from PDF metadata.
    pub target_author: Option<String>,

    /// Target paper's year. If None, taken from the PDF creation date.
    pub target_year: Option<String>,

    /// Free-text note passed to the main-idea step.
    pub main_idea_hint: Option<String>,

    pub progress_callback: Option<ProgressCallback>,
}

impl Default for RelatedWorkConfig {
    fn default() -> Self {
        Self {
            model: None,
            final_model: None,
            provider_name: None,
            provider: None,
            temperature: 0.5,
            final_temperature: 0.3,
            max_tokens: 2048,
            max_retries: 3,
            retry_backoff_ms: 500,
            api_timeout_secs: 120,
            download_timeout_secs: 120,
            password: None,
            templates: TemplateSource::default(),
            grobid_url: None,
            grobid_timeout_secs: 120,
            min_section_words: DEFAULT_MIN_SECTION_WORDS,
            noise_patterns: DEFAULT_NOISE_PATTERNS.iter().map(|p| p.to_string()).collect(),
            section_plans: default_plans(),
            target_author: None,
            target_year: None,
            main_idea_hint: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for RelatedWorkConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelatedWorkConfig")
            .field("model", &self.model)
            .field("final_model", &self.final_model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("final_temperature", &self.final_temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("templates", &self.templates)
            .field("grobid_url", &self.grobid_url)
            .field("min_section_words", &self.min_section_words)
            .field("noise_patterns", &self.noise_patterns.len())
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl RelatedWorkConfig {
    pub fn builder() -> RelatedWorkConfigBuilder {
        RelatedWorkConfigBuilder {
            config: Self::default(),
        }
    }

    /// Compile the configured noise patterns.
    pub fn noise_filter(&self) -> Result<NoiseFilter, RelworkError> {
        NoiseFilter::new(&self.noise_patterns)
    }

    /// Extractor for this config's plans, noise patterns and threshold.
    pub fn section_extractor(&self) -> Result<SectionExtractor, RelworkError> {
        Ok(SectionExtractor::new(
            self.section_plans.clone(),
            self.noise_filter()?,
            self.min_section_words,
        ))
    }

    /// Call settings for intermediate steps.
    pub fn generation_params(&self) -> GenerationParams {
        GenerationParams {
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            max_retries: self.max_retries,
            retry_backoff_ms: self.retry_backoff_ms,
            api_timeout_secs: self.api_timeout_secs,
        }
    }

    /// Call settings for the final related-work step.
    pub fn final_generation_params(&self) -> GenerationParams {
        GenerationParams {
            temperature: self.final_temperature,
            ..self.generation_params()
        }
    }
}

/// Builder for [`RelatedWorkConfig`].
#[derive(Debug)]
pub struct RelatedWorkConfigBuilder {
    config: RelatedWorkConfig,
}

impl RelatedWorkConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn final_model(mut self, model: impl Into<String>) -> Self {
        self.config.final_model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn final_temperature(mut self, t: f32) -> Self {
        self.config.final_temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn templates(mut self, source: TemplateSource) -> Self {
        self.config.templates = source;
        self
    }

    pub fn grobid_url(mut self, url: impl Into<String>) -> Self {
        self.config.grobid_url = Some(url.into());
        self
    }

    pub fn grobid_timeout_secs(mut self, secs: u64) -> Self {
        self.config.grobid_timeout_secs = secs;
        self
    }

    pub fn min_section_words(mut self, n: usize) -> Self {
        self.config.min_section_words = n;
        self
    }

    /// Replace the noise patterns entirely.
    pub fn noise_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.noise_patterns = patterns.into_iter().map(Into::into).collect();
        self
    }

    /// Append one pattern to the current set.
    pub fn add_noise_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.config.noise_patterns.push(pattern.into());
        self
    }

    pub fn section_plans(mut self, plans: Vec<SectionPlan>) -> Self {
        self.config.section_plans = plans;
        self
    }

    pub fn target_author(mut self, author: impl Into<String>) -> Self {
        self.config.target_author = Some(author.into());
        self
    }

    pub fn target_year(mut self, year: impl Into<String>) -> Self {
        self.config.target_year = Some(year.into());
        self
    }

    pub fn main_idea_hint(mut self, hint: impl Into<String>) -> Self {
        self.config.main_idea_hint = Some(hint.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    ///
    /// Noise patterns are compiled here so a malformed pattern is reported
    /// before any PDF is opened. Inline templates are validated too;
    /// directory templates are checked when loaded.
    pub fn build(self) -> Result<RelatedWorkConfig, RelworkError> {
        let c = &self.config;
        if c.max_tokens == 0 {
            return Err(RelworkError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        if c.api_timeout_secs == 0 {
            return Err(RelworkError::InvalidConfig(
                "api_timeout_secs must be ≥ 1".into(),
            ));
        }
        if let Some(ref url) = c.grobid_url {
            if !is_url(url) {
                return Err(RelworkError::InvalidConfig(format!(
                    "grobid_url must be an http(s) URL, got '{}'",
                    url
                )));
            }
        }
        if let Some(plan) = c.section_plans.iter().find(|p| {
            p.start_keywords.iter().all(|k| k.trim().is_empty())
        }) {
            return Err(RelworkError::InvalidConfig(format!(
                "section plan '{}' has no start keywords",
                plan.name
            )));
        }
        c.noise_filter()?;
        if let TemplateSource::Inline(ref templates) = c.templates {
            templates.validate()?;
        }
        Ok(self.config)
    }
}
