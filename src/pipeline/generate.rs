//! Content generation: one chunk (or topic) in, one validated bundle out.
//!
//! This module is intentionally thin. Prompt wording lives in
//! [`crate::prompts`], response cleanup and validation in
//! [`super::normalize`]; here we only drive the call with a timeout and
//! bounded retries.
//!
//! Only transport failures are retried. A malformed or schema-violating
//! response comes back as an error on the first attempt, because the same
//! prompt tends to produce the same broken output.

use crate::config::{PipelineConfig, VideoConfig};
use crate::error::GenerationError;
use crate::pipeline::normalize;
use crate::pipeline::retry::RetryPolicy;
use crate::prompts::{generation_prompt, SYSTEM_PROMPT};
use crate::schema::ContentBundle;
use crate::services::GenerationBackend;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{timeout, Duration};
use tracing::debug;

/// What to generate a presentation from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationSource<'a> {
    /// A chunk of extracted document text.
    Chunk(&'a str),
    /// A bare topic, with no source document.
    Topic(&'a str),
}

/// Calls the generation service and validates its answer.
pub struct ContentGenerator {
    backend: Arc<dyn GenerationBackend>,
    policy: RetryPolicy,
    call_timeout: Duration,
}

impl ContentGenerator {
    pub fn new(backend: Arc<dyn GenerationBackend>, config: &PipelineConfig) -> Self {
        Self::with_policy(
            backend,
            RetryPolicy::from_config(config),
            Duration::from_secs(config.api_timeout_secs),
        )
    }

    pub fn with_policy(
        backend: Arc<dyn GenerationBackend>,
        policy: RetryPolicy,
        call_timeout: Duration,
    ) -> Self {
        Self {
            backend,
            policy,
            call_timeout,
        }
    }

    /// Produce one [`ContentBundle`], or a [`GenerationError`] saying why not.
    pub async fn generate(
        &self,
        source: GenerationSource<'_>,
        video: &VideoConfig,
    ) -> Result<ContentBundle, GenerationError> {
        let prompt = match source {
            GenerationSource::Chunk(text) => generation_prompt(text, false, video),
            GenerationSource::Topic(topic) => generation_prompt(topic, true, video),
        };
        debug!("Generation prompt: {} chars", prompt.len());

        let backend = &self.backend;
        let prompt = prompt.as_str();
        let limit = self.call_timeout;
        let start = Instant::now();

        let raw = self
            .policy
            .run(
                "generation",
                || async move {
                    match timeout(limit, backend.complete(SYSTEM_PROMPT, prompt)).await {
                        Ok(result) => result,
                        Err(_) => Err(format!("timed out after {}s", limit.as_secs())),
                    }
                },
                |_| true,
            )
            .await
            .map_err(|ex| GenerationError::Transport {
                detail: ex.error,
                attempts: ex.attempts,
            })?;

        debug!(
            "Generation response: {} chars in {:?}",
            raw.len(),
            start.elapsed()
        );

        normalize::parse_bundle(&raw)
    }
}

/// [`GenerationBackend`] over an edgequake-llm provider.
pub struct LlmBackend {
    provider: Arc<dyn LLMProvider>,
    temperature: f32,
    max_tokens: usize,
}

impl LlmBackend {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &PipelineConfig) -> Self {
        Self {
            provider,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }

    fn options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        }
    }
}

#[async_trait]
impl GenerationBackend for LlmBackend {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, String> {
        let messages = vec![ChatMessage::system(system), ChatMessage::user(prompt)];
        let response = self
            .provider
            .chat(&messages, Some(&self.options()))
            .await
            .map_err(|e| e.to_string())?;
        debug!(
            "LLM usage: {} input tokens, {} output tokens",
            response.prompt_tokens, response.completion_tokens
        );
        Ok(response.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct Scripted {
        replies: Mutex<VecDeque<Result<String, String>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl Scripted {
        fn new(replies: Vec<Result<&str, &str>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(
                    replies
                        .into_iter()
                        .map(|r| r.map(str::to_string).map_err(str::to_string))
                        .collect(),
                ),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl GenerationBackend for Scripted {
        async fn complete(&self, _system: &str, prompt: &str) -> Result<String, String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err("no scripted reply".into()))
        }
    }

    const ONE_SLIDE: &str =
        r#"{"slides": [{"title": "T", "content": "C", "key_points": [], "voice_over": "Hi."}]}"#;

    fn generator(backend: Arc<Scripted>, retries: u32) -> ContentGenerator {
        ContentGenerator::with_policy(
            backend,
            RetryPolicy::new(retries, 1),
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn transport_failures_are_retried() {
        let backend = Scripted::new(vec![Err("503"), Ok(ONE_SLIDE)]);
        let g = generator(backend.clone(), 2);
        let bundle = g
            .generate(GenerationSource::Chunk("text"), &VideoConfig::default())
            .await
            .unwrap();
        assert_eq!(bundle.slides.len(), 1);
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test]
    async fn transport_error_reports_attempts() {
        let backend = Scripted::new(vec![Err("503"), Err("503"), Err("503")]);
        let err = generator(backend.clone(), 2)
            .generate(GenerationSource::Chunk("text"), &VideoConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Transport { attempts: 3, .. }));
        assert_eq!(backend.calls(), 3);
    }

    #[tokio::test]
    async fn malformed_json_is_not_retried() {
        let backend = Scripted::new(vec![Ok("{\"slides\": ["), Ok(ONE_SLIDE)]);
        let err = generator(backend.clone(), 2)
            .generate(GenerationSource::Chunk("text"), &VideoConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::MalformedJson { .. }));
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn topic_source_uses_topic_prompt() {
        let backend = Scripted::new(vec![Ok(ONE_SLIDE)]);
        generator(backend.clone(), 0)
            .generate(GenerationSource::Topic("Tides"), &VideoConfig::default())
            .await
            .unwrap();
        let prompts = backend.prompts.lock().unwrap();
        assert!(prompts[0].contains("Topic:\nTides"));
    }

    #[tokio::test]
    async fn slow_backend_times_out() {
        struct Slow;
        #[async_trait]
        impl GenerationBackend for Slow {
            async fn complete(&self, _s: &str, _p: &str) -> Result<String, String> {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(String::new())
            }
        }
        let g = ContentGenerator::with_policy(
            Arc::new(Slow),
            RetryPolicy::new(0, 1),
            Duration::from_millis(20),
        );
        let err = g
            .generate(GenerationSource::Chunk("x"), &VideoConfig::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }
}
