//! Backend trait and normalized request/response types.
//!
//! The [`Backend`] trait abstracts over LLM providers, translating between
//! normalized [`LlmRequest`]/[`LlmResponse`] types and provider-specific
//! HTTP APIs. Built-in implementations: [`MockBackend`] and, behind the
//! `openai` feature, [`OpenAiBackend`].
//!
//! [`ModelOutput`] is the layer where raw completions meet the recovery
//! parser: every response text is run through [`crate::recovery::fit`] and
//! the outcome travels alongside the raw text under `parsed`.

pub mod backoff;
pub mod mock;
#[cfg(feature = "openai")]
pub mod openai;

pub use backoff::BackoffConfig;
pub use mock::MockBackend;
#[cfg(feature = "openai")]
pub use openai::OpenAiBackend;

use crate::error::{ForgeError, Result};
use crate::recovery::{self, CompletionResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;

/// Type alias for the callback invoked before each transport retry.
///
/// Arguments: `(attempt_number, delay_before_retry, reason_for_retry)`.
pub type RetryCallback<'a> = Option<&'a mut (dyn FnMut(u32, std::time::Duration, &str) + Send)>;

/// Generation parameters shared by all backends.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Sampling temperature. Default: 0.7.
    pub temperature: f64,

    /// Maximum tokens to generate. Default: 2048.
    pub max_tokens: u32,

    /// Nucleus sampling cutoff, if the provider supports it.
    pub top_p: Option<f64>,

    /// Ask the provider to constrain output to valid JSON where supported.
    /// The recovery parser still runs either way; providers truncate JSON
    /// output at `max_tokens` just like prose.
    pub json_mode: bool,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 2048,
            top_p: None,
            json_mode: false,
        }
    }
}

impl LlmConfig {
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_top_p(mut self, top_p: f64) -> Self {
        self.top_p = Some(top_p);
        self
    }

    pub fn with_json_mode(mut self, json_mode: bool) -> Self {
        self.json_mode = json_mode;
        self
    }
}

/// A normalized LLM request — provider-agnostic.
///
/// The [`Prompter`](crate::prompter::Prompter) builds this from its template
/// and config; the [`Backend`] translates it into the provider-specific
/// HTTP request.
#[derive(Debug, Clone)]
pub struct LlmRequest {
    /// Model identifier (e.g. `"gpt-4o"`).
    pub model: String,

    /// Optional system instructions prepended to the conversation.
    pub system_prompt: Option<String>,

    /// The rendered prompt text.
    pub prompt: String,

    /// Generation parameters.
    pub config: LlmConfig,
}

impl LlmRequest {
    /// The request as a chat conversation: optional system message followed
    /// by the prompt as a user message.
    pub fn messages(&self) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &self.system_prompt {
            messages.push(ChatMessage {
                role: Role::System,
                content: system.clone(),
            });
        }
        messages.push(ChatMessage {
            role: Role::User,
            content: self.prompt.clone(),
        });
        messages
    }
}

/// A single message in a chat conversation.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// The role of a chat message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A normalized LLM response.
#[derive(Debug)]
pub struct LlmResponse {
    /// The generated text content.
    pub text: String,

    /// HTTP status code (for diagnostics/logging).
    pub status: u16,

    /// Provider-specific metadata (token counts, timing, model info).
    /// Stored as raw JSON — each provider returns different fields.
    pub metadata: Option<serde_json::Value>,
}

/// A response paired with its recovery-parse outcome.
///
/// This is what callers actually consume: the raw text survives untouched,
/// and the structured interpretation (or the reason there is none) sits
/// next to it under `parsed`.
#[derive(Debug, Clone, Serialize)]
pub struct ModelOutput {
    /// Raw completion text as the provider returned it.
    pub text: String,

    /// Recovery-parse outcome for `text`.
    pub parsed: CompletionResult,

    /// Provider metadata carried over from the response.
    pub metadata: Option<serde_json::Value>,
}

impl ModelOutput {
    /// Parse a response's text, retrying once on quote-escape-normalized
    /// text whenever the first pass needed repair.
    ///
    /// An apostrophe inside a single-quoted literal terminates the string
    /// early, and the completion search then "succeeds" with everything
    /// after it cut off. Retrying on the escaped text and keeping the
    /// richer result recovers the full value in that case. A direct parse
    /// (no repair) is never second-guessed.
    pub fn from_response(response: LlmResponse, depth_limit: usize) -> Self {
        let direct = recovery::fit(&response.text, depth_limit);
        let direct_parse = matches!(
            &direct,
            CompletionResult::Completed { alternatives, .. } if alternatives.is_empty()
        );
        let parsed = if direct_parse {
            direct
        } else {
            let escaped = recovery::escape_quotes(&response.text);
            prefer_richer(direct, recovery::fit(&escaped, depth_limit))
        };
        Self {
            text: response.text,
            parsed,
            metadata: response.metadata,
        }
    }

    /// The recovered structured value, or `ForgeError::Recovery` when the
    /// parse failed. The raw text stays available on `self.text` either way.
    pub fn completion(&self) -> Result<&serde_json::Value> {
        match &self.parsed {
            CompletionResult::Completed { best, .. } => Ok(best),
            CompletionResult::Failed { message } => {
                Err(ForgeError::Recovery(message.clone()))
            }
        }
    }
}

/// Keep whichever outcome carries the longer recovered value; the original
/// wins ties and total failures.
fn prefer_richer(original: CompletionResult, retried: CompletionResult) -> CompletionResult {
    let original_len = original.completion().map(|v| v.to_string().len());
    let retried_len = retried.completion().map(|v| v.to_string().len());
    match (original_len, retried_len) {
        (Some(o), Some(r)) if r > o => retried,
        (None, Some(_)) => retried,
        _ => original,
    }
}

/// Abstraction over LLM providers.
///
/// Implementors translate between the normalized [`LlmRequest`]/[`LlmResponse`]
/// and the provider's HTTP API.
///
/// # Object Safety
///
/// This trait is object-safe and designed to be used as `Arc<dyn Backend>`.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Execute an LLM call.
    async fn complete(
        &self,
        client: &Client,
        base_url: &str,
        request: &LlmRequest,
    ) -> Result<LlmResponse>;

    /// Human-readable name for logging and diagnostics.
    fn name(&self) -> &'static str;
}

/// Check whether a [`ForgeError`] is retryable based on the backoff config.
///
/// Retryable conditions:
/// - [`ForgeError::HttpError`] with a status in `config.retryable_statuses`
/// - [`ForgeError::Request`] (connection/transport errors)
pub fn is_retryable(error: &ForgeError, config: &BackoffConfig) -> bool {
    match error {
        ForgeError::HttpError { status, .. } => config.retryable_statuses.contains(status),
        ForgeError::Request(_) => true,
        _ => false,
    }
}

/// Execute a backend call with transport-level retry and exponential backoff.
///
/// Wraps [`Backend::complete`] with automatic retry on transient failures
/// (429, 5xx, connection errors), honoring `Retry-After` when the config
/// says to. Returns the first successful response, or the last error once
/// retries are exhausted.
pub async fn with_backoff(
    backend: &Arc<dyn Backend>,
    client: &Client,
    base_url: &str,
    request: &LlmRequest,
    config: &BackoffConfig,
    mut on_retry: RetryCallback<'_>,
) -> Result<LlmResponse> {
    let mut last_error: Option<ForgeError> = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let delay = match &last_error {
                Some(ForgeError::HttpError {
                    retry_after: Some(ra),
                    ..
                }) if config.respect_retry_after => *ra,
                _ => config.delay_for_attempt(attempt - 1),
            };

            let reason = last_error
                .as_ref()
                .map(|e| e.to_string())
                .unwrap_or_default();

            if let Some(ref mut cb) = on_retry {
                cb(attempt, delay, &reason);
            }

            tokio::time::sleep(delay).await;
        }

        match backend.complete(client, base_url, request).await {
            Ok(response) => return Ok(response),
            Err(e) => {
                if attempt < config.max_retries && is_retryable(&e, config) {
                    last_error = Some(e);
                    continue;
                }
                return Err(e);
            }
        }
    }

    Err(last_error
        .unwrap_or(ForgeError::Other("backoff loop exited unexpectedly".into())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn test_is_retryable_429_and_503() {
        let config = BackoffConfig::standard();
        for status in [429u16, 503] {
            let err = ForgeError::HttpError {
                status,
                body: "transient".into(),
                retry_after: None,
            };
            assert!(is_retryable(&err, &config), "status {status}");
        }
    }

    #[test]
    fn test_is_retryable_400_not_retried() {
        let config = BackoffConfig::standard();
        let err = ForgeError::HttpError {
            status: 400,
            body: "bad request".into(),
            retry_after: None,
        };
        assert!(!is_retryable(&err, &config));
    }

    #[test]
    fn test_is_retryable_other_error_not_retried() {
        let config = BackoffConfig::standard();
        assert!(!is_retryable(&ForgeError::Recovery("nope".into()), &config));
        assert!(!is_retryable(&ForgeError::Other("boom".into()), &config));
    }

    #[test]
    fn test_request_messages_shape() {
        let request = LlmRequest {
            model: "test".into(),
            system_prompt: Some("you are terse".into()),
            prompt: "hello".into(),
            config: LlmConfig::default(),
        };
        let messages = request.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].role, Role::User);
        assert_eq!(messages[1].content, "hello");

        let bare = LlmRequest {
            system_prompt: None,
            ..request
        };
        assert_eq!(bare.messages().len(), 1);
    }

    #[test]
    fn test_config_builders() {
        let config = LlmConfig::default()
            .with_temperature(0.0)
            .with_max_tokens(64)
            .with_top_p(0.9)
            .with_json_mode(true);
        assert_eq!(config.temperature, 0.0);
        assert_eq!(config.max_tokens, 64);
        assert_eq!(config.top_p, Some(0.9));
        assert!(config.json_mode);
    }

    #[test]
    fn test_model_output_parses_truncated_text() {
        let response = LlmResponse {
            text: r#"{"entities": ["aspirin", "ibuprofen""#.into(),
            status: 200,
            metadata: Some(json!({"total_tokens": 12})),
        };
        let output = ModelOutput::from_response(response, 10);
        let value = output.completion().unwrap();
        assert_eq!(value["entities"][1], "ibuprofen");
        assert!(output.text.ends_with('"'));
    }

    #[test]
    fn test_model_output_quote_escape_retry_recovers_possessive() {
        // Without the escaped retry, the completion search would clip the
        // value at the apostrophe and return {"disease": "Parkinson"}.
        let response = LlmResponse {
            text: "{'disease': 'Parkinson's disease', 'confirmed': True}".into(),
            status: 200,
            metadata: None,
        };
        let output = ModelOutput::from_response(response, 10);
        let value = output.completion().unwrap();
        assert_eq!(value["disease"], "Parkinson's disease");
        assert_eq!(value["confirmed"], true);
    }

    #[test]
    fn test_model_output_direct_parse_not_second_guessed() {
        let response = LlmResponse {
            text: r#"{"note": "5'10 tall"}"#.into(),
            status: 200,
            metadata: None,
        };
        let output = ModelOutput::from_response(response, 10);
        assert_eq!(output.completion().unwrap()["note"], "5'10 tall");
        assert!(output.parsed.alternatives().is_empty());
    }

    #[test]
    fn test_model_output_failure_surfaces_as_recovery_error() {
        let response = LlmResponse {
            text: "I'm sorry, I cannot produce JSON for that.".into(),
            status: 200,
            metadata: None,
        };
        let output = ModelOutput::from_response(response, 10);
        assert!(matches!(
            output.completion(),
            Err(ForgeError::Recovery(_))
        ));
        // Raw text is untouched by the failed parse.
        assert!(output.text.starts_with("I'm sorry"));
    }

    #[test]
    fn test_model_output_serializes_parsed_inline() {
        let response = LlmResponse {
            text: "[1, 2".into(),
            status: 200,
            metadata: None,
        };
        let output = ModelOutput::from_response(response, 10);
        let wire = serde_json::to_value(&output).unwrap();
        assert_eq!(wire["parsed"]["status"], "completed");
        assert_eq!(wire["parsed"]["best"], json!([1, 2]));
    }

    #[tokio::test]
    async fn test_with_backoff_returns_after_transient_failures() {
        let backend: Arc<dyn Backend> = Arc::new(MockBackend::flaky(
            2,
            r#"{"ok": true}"#,
        ));
        let client = Client::new();
        let request = LlmRequest {
            model: "mock".into(),
            system_prompt: None,
            prompt: "ping".into(),
            config: LlmConfig::default(),
        };
        let config = BackoffConfig {
            initial_delay: Duration::from_millis(1),
            jitter: backoff::JitterStrategy::None,
            ..BackoffConfig::standard()
        };

        let mut retries = Vec::new();
        let mut on_retry =
            |attempt: u32, _delay: Duration, _reason: &str| retries.push(attempt);
        let response = with_backoff(
            &backend,
            &client,
            "http://unused",
            &request,
            &config,
            Some(&mut on_retry),
        )
        .await
        .unwrap();

        assert_eq!(response.text, r#"{"ok": true}"#);
        assert_eq!(retries, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_with_backoff_gives_up_after_max_retries() {
        let backend: Arc<dyn Backend> = Arc::new(MockBackend::flaky(10, "never"));
        let client = Client::new();
        let request = LlmRequest {
            model: "mock".into(),
            system_prompt: None,
            prompt: "ping".into(),
            config: LlmConfig::default(),
        };
        let config = BackoffConfig {
            max_retries: 2,
            initial_delay: Duration::from_millis(1),
            jitter: backoff::JitterStrategy::None,
            ..BackoffConfig::standard()
        };

        let result =
            with_backoff(&backend, &client, "http://unused", &request, &config, None).await;
        assert!(matches!(
            result,
            Err(ForgeError::HttpError { status: 503, .. })
        ));
    }
}
