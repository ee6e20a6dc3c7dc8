//! Text generation: one templated prompt in, one completion out.
//!
//! Every LLM call in the chain goes through [`generate`], which adds a
//! per-call timeout and retries with exponential backoff
//! (`retry_backoff_ms * 2^(attempt-1)`: 500 ms → 1 s → 2 s with the
//! defaults). When every attempt fails the run is aborted with
//! [`RelworkError::LlmApiError`]; a related-work section built from a
//! missing summary would be silently wrong.
//!
//! The provider is reached through [`TextGenerator`] so the chain can be
//! driven by a scripted generator in tests.

use crate::error::RelworkError;
use crate::output::CallStats;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, warn};

/// A completed generation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    pub content: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
}

/// Boxed future returned by [`TextGenerator::complete`].
pub type CompletionFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Completion, String>> + Send + 'a>>;

/// Something that turns a single user prompt into text.
pub trait TextGenerator: Send + Sync {
    fn complete<'a>(
        &'a self,
        prompt: &'a str,
        options: &'a CompletionOptions,
    ) -> CompletionFuture<'a>;
}

impl TextGenerator for Arc<dyn LLMProvider> {
    fn complete<'a>(
        &'a self,
        prompt: &'a str,
        options: &'a CompletionOptions,
    ) -> CompletionFuture<'a> {
        Box::pin(async move {
            let messages = vec![ChatMessage::user(prompt)];
            self.chat(&messages, Some(options))
                .await
                .map(|response| Completion {
                    content: response.content,
                    input_tokens: response.prompt_tokens,
                    output_tokens: response.completion_tokens,
                })
                .map_err(|e| e.to_string())
        })
    }
}

/// Sampling and retry settings for one call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_tokens: usize,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
    pub api_timeout_secs: u64,
}

/// Send `prompt` and return the completion text with its counters.
///
/// `stage` names the chain step in logs and in the final error.
pub async fn generate<G>(
    generator: &G,
    stage: &str,
    prompt: &str,
    params: &GenerationParams,
) -> Result<(String, CallStats), RelworkError>
where
    G: TextGenerator + ?Sized,
{
    let options = build_options(params);
    let start = Instant::now();
    let mut last_err: Option<String> = None;

    for attempt in 0..=params.max_retries {
        if attempt > 0 {
            let backoff = params.retry_backoff_ms * 2u64.pow(attempt - 1);
            warn!(
                "{}: retry {}/{} after {}ms",
                stage, attempt, params.max_retries, backoff
            );
            sleep(Duration::from_millis(backoff)).await;
        }

        let call = generator.complete(prompt, &options);
        let outcome = match timeout(Duration::from_secs(params.api_timeout_secs), call).await {
            Ok(result) => result,
            Err(_) => Err(format!("timed out after {}s", params.api_timeout_secs)),
        };

        match outcome {
            Ok(completion) => {
                let duration = start.elapsed();
                debug!(
                    "{}: {} input tokens, {} output tokens, {:?}",
                    stage, completion.input_tokens, completion.output_tokens, duration
                );
                let stats = CallStats {
                    input_tokens: completion.input_tokens,
                    output_tokens: completion.output_tokens,
                    retries: attempt,
                    duration_ms: duration.as_millis() as u64,
                };
                return Ok((completion.content, stats));
            }
            Err(e) => {
                warn!("{}: attempt {} failed: {}", stage, attempt + 1, e);
                last_err = Some(e);
            }
        }
    }

    Err(RelworkError::LlmApiError {
        stage: stage.to_string(),
        message: format!(
            "{} (after {} attempts)",
            last_err.unwrap_or_else(|| "Unknown error".to_string()),
            params.max_retries + 1
        ),
    })
}

fn build_options(params: &GenerationParams) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(params.temperature),
        max_tokens: Some(params.max_tokens),
        ..Default::default()
    }
}

/// Scripted generator for unit tests.
#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Replies from a queue, then falls back to echoing a prefix of the prompt.
    pub(crate) struct ScriptedGenerator {
        replies: Mutex<Vec<Result<String, String>>>,
        prompts: Mutex<Vec<(String, Option<f32>)>>,
    }

    impl ScriptedGenerator {
        pub(crate) fn new(mut replies: Vec<Result<String, String>>) -> Self {
            replies.reverse();
            Self {
                replies: Mutex::new(replies),
                prompts: Mutex::new(Vec::new()),
            }
        }

        /// Every prompt received with its temperature, in call order.
        pub(crate) fn prompts(&self) -> Vec<(String, Option<f32>)> {
            self.prompts.lock().unwrap().clone()
        }
    }

    impl TextGenerator for ScriptedGenerator {
        fn complete<'a>(
            &'a self,
            prompt: &'a str,
            options: &'a CompletionOptions,
        ) -> CompletionFuture<'a> {
            self.prompts
                .lock()
                .unwrap()
                .push((prompt.to_string(), options.temperature));
            let reply = self.replies.lock().unwrap().pop().unwrap_or_else(|| {
                Ok(format!("echo: {}", prompt.chars().take(40).collect::<String>()))
            });
            Box::pin(async move {
                reply.map(|content| Completion {
                    content,
                    input_tokens: prompt.len(),
                    output_tokens: 7,
                })
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::ScriptedGenerator;
    use super::*;

    fn params(max_retries: u32) -> GenerationParams {
        GenerationParams {
            temperature: 0.5,
            max_tokens: 1024,
            max_retries,
            retry_backoff_ms: 0,
            api_timeout_secs: 30,
        }
    }

    #[test]
    fn build_options_carries_sampling() {
        let opts = build_options(&params(3));
        assert_eq!(opts.temperature, Some(0.5));
        assert_eq!(opts.max_tokens, Some(1024));
    }

    #[tokio::test]
    async fn returns_first_success() {
        let gen = ScriptedGenerator::new(vec![Ok("Facets: X".into())]);
        let (text, stats) = generate(&gen, "faceted summary", "prompt", &params(3))
            .await
            .unwrap();
        assert_eq!(text, "Facets: X");
        assert_eq!(stats.retries, 0);
        assert_eq!(stats.output_tokens, 7);
    }

    #[tokio::test]
    async fn retries_transient_failures() {
        let gen = ScriptedGenerator::new(vec![
            Err("HTTP 503".into()),
            Err("HTTP 429".into()),
            Ok("done".into()),
        ]);
        let (text, stats) = generate(&gen, "main idea", "p", &params(3)).await.unwrap();
        assert_eq!(text, "done");
        assert_eq!(stats.retries, 2);
        assert_eq!(gen.prompts().len(), 3);
    }

    #[tokio::test]
    async fn exhausted_retries_are_fatal() {
        let gen = ScriptedGenerator::new(vec![Err("boom".into()), Err("boom again".into())]);
        let err = generate(&gen, "related work", "p", &params(1))
            .await
            .unwrap_err();
        match err {
            RelworkError::LlmApiError { stage, message } => {
                assert_eq!(stage, "related work");
                assert!(message.contains("boom again"));
                assert!(message.contains("2 attempts"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
