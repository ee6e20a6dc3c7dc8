//! CLI binary for edgequake-relwork.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `RelatedWorkConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_relwork::{
    extract_taic, generate_related_work, generate_to_file, inspect, load_cited_papers,
    CitedPaper, GenerationProgressCallback, ProgressCallback, RelatedWorkConfig, SectionName,
    Stage, TemplateSource,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner while the PDF is decoded, then a bar over the LLM calls with one
/// log line per finished call.
struct CliProgressCallback {
    bar: ProgressBar,
    call_started: Mutex<Option<Instant>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            call_started: Mutex::new(None),
        })
    }

    fn activate_bar(&self, total: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>2}/{len} calls  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Generating");
        self.bar.reset_eta();
    }

    fn elapsed_secs(&self) -> f64 {
        self.call_started
            .lock()
            .ok()
            .and_then(|mut g| g.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl GenerationProgressCallback for CliProgressCallback {
    fn on_extraction_start(&self, input: &str) {
        self.bar.set_prefix("Extracting");
        self.bar.set_message(input.to_string());
    }

    fn on_extraction_complete(&self, pages: usize, sections_found: usize) {
        let mark = if sections_found == SectionName::ALL.len() {
            green("✓")
        } else {
            cyan("⚠")
        };
        self.bar.println(format!(
            "  {} {} pages, {}/{} sections found",
            mark,
            pages,
            sections_found,
            SectionName::ALL.len()
        ));
    }

    fn on_call_start(&self, stage: Stage, call: usize, total: usize, label: &str) {
        if call == 1 {
            self.activate_bar(total);
        }
        if let Ok(mut g) = self.call_started.lock() {
            *g = Some(Instant::now());
        }
        self.bar.set_message(format!("{stage}: {}", truncate(label, 40)));
    }

    fn on_call_complete(&self, stage: Stage, call: usize, total: usize, output_len: usize) {
        self.bar.println(format!(
            "  {} {:>2}/{:<2} {:<16} {}  {}",
            green("✓"),
            call,
            total,
            stage.as_str(),
            dim(&format!("{output_len:>5} chars")),
            dim(&format!("{:.1}s", self.elapsed_secs())),
        ));
        self.bar.inc(1);
    }

    fn on_call_error(&self, stage: Stage, call: usize, total: usize, error: &str) {
        self.bar.println(format!(
            "  {} {:>2}/{:<2} {:<16} {}  {}",
            red("✗"),
            call,
            total,
            stage.as_str(),
            red(&truncate(error, 80)),
            dim(&format!("{:.1}s", self.elapsed_secs())),
        ));
        self.bar.finish_and_clear();
    }

    fn on_generation_complete(&self, llm_calls: usize, output_len: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} related work generated: {} chars from {} LLM calls",
            green("✔"),
            bold(&output_len.to_string()),
            llm_calls
        );
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        format!("{}\u{2026}", s.chars().take(max - 1).collect::<String>())
    } else {
        s.to_string()
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Related work for a local paper (stdout)
  relwork paper.pdf --cited cited.json

  # Write to a file, final section with a stronger model
  relwork paper.pdf --cited cited.json --final-model gpt-4 -o related_work.txt

  # Paper from a URL, sections from a local Grobid service
  relwork https://arxiv.org/pdf/2106.09685 --cited cited.json \
      --grobid-url http://localhost:8070

  # Only extract Title/Abstract/Introduction/Conclusion (no API key needed)
  relwork --extract-only --json paper.pdf

  # Inspect PDF metadata (no API key needed)
  relwork --inspect-only paper.pdf

  # Custom prompt templates and an extra noise line pattern
  relwork paper.pdf --cited cited.json --templates ./prompts \
      --noise-pattern '^Preprint under review'

CITED PAPERS FILE (--cited):
  [
    {"title": "...", "authors": ["Chen", "Zhuge"], "year": 2019,
     "abstract": "...", "spans": ["Chen and Zhuge (2019) introduced ..."]}
  ]

TEMPLATE DIRECTORY (--templates):
  generate_faceted_summary.txt  infer_relationship.txt  enrich_usage.txt
  generate_main_idea.txt        generate_related_work.txt
  (missing files fall back to the built-in template)

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to libpdfium (file or directory)
  RELWORK_*               Any flag, e.g. RELWORK_GROBID_URL, RELWORK_MIN_WORDS
"#;

/// Draft the related-work section of an academic paper with LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "relwork",
    version,
    about = "Draft the related-work section of an academic PDF using LLMs",
    long_about = "Extract the title, abstract, introduction and conclusion of an academic PDF \
(local file or URL), summarize it and the papers it cites, and draft its related-work section. \
Supports OpenAI, Anthropic, Google Gemini, Azure OpenAI, and any OpenAI-compatible endpoint.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL of the target paper.
    input: String,

    /// JSON file listing the cited papers.
    #[arg(long, env = "RELWORK_CITED")]
    cited: Option<PathBuf>,

    /// Write the related-work section to this file instead of stdout.
    #[arg(short, long, env = "RELWORK_OUTPUT")]
    output: Option<PathBuf>,

    /// LLM model ID for the intermediate steps (default: gpt-4.1-nano).
    #[arg(long, env = "RELWORK_MODEL")]
    model: Option<String>,

    /// LLM model ID for the final related-work step (default: --model).
    #[arg(long, env = "RELWORK_FINAL_MODEL")]
    final_model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "RELWORK_PROVIDER")]
    provider: Option<String>,

    /// Temperature for the intermediate steps.
    #[arg(long, env = "RELWORK_TEMPERATURE", default_value_t = 0.5)]
    temperature: f32,

    /// Temperature for the final step.
    #[arg(long, env = "RELWORK_FINAL_TEMPERATURE", default_value_t = 0.3)]
    final_temperature: f32,

    /// Directory of prompt templates overriding the built-ins.
    #[arg(long, env = "RELWORK_TEMPLATES")]
    templates: Option<PathBuf>,

    /// Grobid service URL; when set, sections come from its TEI output.
    #[arg(long, env = "RELWORK_GROBID_URL")]
    grobid_url: Option<String>,

    /// Minimum words for a heading-based section before the keyword scan runs.
    #[arg(long, env = "RELWORK_MIN_WORDS", default_value_t = 50)]
    min_words: usize,

    /// Extra noise line pattern (regex); repeatable.
    #[arg(long = "noise-pattern", env = "RELWORK_NOISE_PATTERN", value_delimiter = '\n')]
    noise_patterns: Vec<String>,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "RELWORK_PASSWORD")]
    password: Option<String>,

    /// Surname used for the target paper in relationship prompts.
    #[arg(long, env = "RELWORK_TARGET_AUTHOR")]
    target_author: Option<String>,

    /// Year used for the target paper in relationship prompts.
    #[arg(long, env = "RELWORK_TARGET_YEAR")]
    target_year: Option<String>,

    /// Author's note steering the main-idea step.
    #[arg(long, env = "RELWORK_MAIN_IDEA_HINT")]
    main_idea_hint: Option<String>,

    /// Max LLM output tokens per call.
    #[arg(long, env = "RELWORK_MAX_TOKENS", default_value_t = 2048)]
    max_tokens: usize,

    /// Retries per LLM call on failure.
    #[arg(long, env = "RELWORK_MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "RELWORK_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Per-call LLM timeout in seconds.
    #[arg(long, env = "RELWORK_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,

    /// Print the extracted sections only, no LLM calls.
    #[arg(long, env = "RELWORK_EXTRACT_ONLY")]
    extract_only: bool,

    /// Print PDF metadata only.
    #[arg(long)]
    inspect_only: bool,

    /// Output structured JSON instead of plain text.
    #[arg(long, env = "RELWORK_JSON")]
    json: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "RELWORK_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "RELWORK_QUIET")]
    quiet: bool,

    /// Disable the progress bar.
    #[arg(long, env = "RELWORK_NO_PROGRESS")]
    no_progress: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // INFO-level library logs are suppressed while the progress bar runs.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let cli_cb = (show_progress && !cli.inspect_only).then(CliProgressCallback::new);
    let progress_cb: Option<ProgressCallback> = cli_cb
        .clone()
        .map(|cb| cb as Arc<dyn GenerationProgressCallback>);
    let config = build_config(&cli, progress_cb)?;

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let meta = inspect(&cli.input, &config)
            .await
            .context("Failed to inspect PDF")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&meta).context("Failed to serialize metadata")?
            );
        } else {
            println!("File:         {}", cli.input);
            if let Some(ref t) = meta.title {
                println!("Title:        {}", t);
            }
            if let Some(ref a) = meta.author {
                println!("Author:       {}", a);
            }
            println!("Pages:        {}", meta.page_count);
            println!("PDF Version:  {}", meta.pdf_version);
            if let Some(ref d) = meta.creation_date {
                println!("Created:      {}", d);
            }
            if let Some(ref p) = meta.producer {
                println!("Producer:     {}", p);
            }
        }
        return Ok(());
    }

    // ── Extract-only mode ────────────────────────────────────────────────
    if cli.extract_only {
        let extraction = extract_taic(&cli.input, &config)
            .await
            .context("Section extraction failed")?;
        if let Some(ref cb) = cli_cb {
            cb.bar.finish_and_clear();
        }

        let rendered = if cli.json {
            serde_json::to_string_pretty(&extraction).context("Failed to serialise sections")?
        } else {
            SectionName::ALL
                .iter()
                .map(|&name| {
                    format!(
                        "{}: {}",
                        name,
                        extraction.sections.text(name).unwrap_or("(not found)")
                    )
                })
                .collect::<Vec<_>>()
                .join("\n\n")
        };
        emit(&rendered, cli.output.as_ref()).await?;
        return Ok(());
    }

    // ── Generate ─────────────────────────────────────────────────────────
    let cited: Vec<CitedPaper> = match cli.cited {
        Some(ref path) => load_cited_papers(path)
            .await
            .context("Failed to load cited papers")?,
        None => Vec::new(),
    };
    if cited.is_empty() && !cli.quiet {
        eprintln!("{} no cited papers given; drafting from the target paper alone", cyan("⚠"));
    }

    let output = match (cli.output.as_ref(), cli.json) {
        (Some(path), false) => generate_to_file(&cli.input, &cited, path, &config)
            .await
            .context("Generation failed")?,
        _ => generate_related_work(&cli.input, &cited, &config)
            .await
            .context("Generation failed")?,
    };

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        emit(&json, cli.output.as_ref()).await?;
    } else if cli.output.is_none() {
        emit(&output.related_work, None).await?;
    }

    if !cli.quiet && !cli.json {
        eprintln!(
            "   {} tokens in  /  {} tokens out  /  {} retries  —  {}ms total{}",
            dim(&output.stats.total_input_tokens.to_string()),
            dim(&output.stats.total_output_tokens.to_string()),
            output.stats.retried_calls,
            output.stats.total_duration_ms,
            cli.output
                .as_ref()
                .map(|p| format!("  →  {}", bold(&p.display().to_string())))
                .unwrap_or_default(),
        );
    }

    Ok(())
}

/// Print to stdout, or write to `path` when given.
async fn emit(text: &str, path: Option<&PathBuf>) -> Result<()> {
    match path {
        Some(p) => edgequake_relwork::generate::write_atomic(p, &format!("{text}\n"))
            .await
            .with_context(|| format!("Failed to write {}", p.display())),
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(text.as_bytes())
                .context("Failed to write to stdout")?;
            if !text.ends_with('\n') {
                handle.write_all(b"\n").ok();
            }
            Ok(())
        }
    }
}

/// Map CLI args to `RelatedWorkConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<RelatedWorkConfig> {
    let mut builder = RelatedWorkConfig::builder()
        .temperature(cli.temperature)
        .final_temperature(cli.final_temperature)
        .max_tokens(cli.max_tokens)
        .max_retries(cli.max_retries)
        .download_timeout_secs(cli.download_timeout)
        .api_timeout_secs(cli.api_timeout)
        .min_section_words(cli.min_words);

    if let Some(ref m) = cli.model {
        builder = builder.model(m);
    }
    if let Some(ref m) = cli.final_model {
        builder = builder.final_model(m);
    }
    if let Some(ref p) = cli.provider {
        builder = builder.provider_name(p);
    }
    if let Some(ref dir) = cli.templates {
        builder = builder.templates(TemplateSource::Directory(dir.clone()));
    }
    if let Some(ref url) = cli.grobid_url {
        builder = builder.grobid_url(url);
    }
    for pattern in &cli.noise_patterns {
        builder = builder.add_noise_pattern(pattern);
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd);
    }
    if let Some(ref a) = cli.target_author {
        builder = builder.target_author(a);
    }
    if let Some(ref y) = cli.target_year {
        builder = builder.target_year(y);
    }
    if let Some(ref h) = cli.main_idea_hint {
        builder = builder.main_idea_hint(h);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
