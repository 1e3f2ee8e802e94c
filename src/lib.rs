//! # prompt-forge
//!
//! Prompt templating, pluggable LLM backends, and recovery parsing for
//! truncated model output.
//!
//! The core is the [`recovery`] module: model completions are frequently cut
//! off mid-structure (token limits) or lightly malformed (single quotes,
//! Python booleans, an apostrophe inside a quoted value). [`recovery::fit`]
//! repairs such text into a `serde_json::Value` by evaluating it directly
//! and, failing that, searching over closing-bracket completions for the
//! longest valid reconstruction.
//!
//! Around the parser sit the pieces a production workflow needs: on-disk
//! task templates with `{key}` placeholder rendering, a [`Backend`] trait
//! with transport retry and backoff, an LRU prompt cache, and the
//! [`Prompter`] orchestrator tying them together.
//!
//! ## Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//! use prompt_forge::{backend::MockBackend, Prompter};
//!
//! # async fn run() -> prompt_forge::error::Result<()> {
//! let prompter = Prompter::builder(
//!     "http://localhost:8080",
//!     Arc::new(MockBackend::fixed(r#"[{"entity": "aspirin", "type": "drug""#)),
//! )
//! .model("gpt-4o")
//! .build();
//!
//! // The response is truncated; the recovery parser completes it.
//! let output = prompter.raw_fit("Extract drug names as JSON.").await?;
//! let entities = output.completion()?;
//! assert_eq!(entities[0]["entity"], "aspirin");
//! # Ok(())
//! # }
//! ```
//!
//! The parser is also usable standalone:
//!
//! ```
//! use prompt_forge::recovery::fit;
//!
//! let result = fit(r#"{"a": 1, "b": [2, 3"#, 10);
//! assert_eq!(result.completion().unwrap()["b"][1], 3);
//! ```

pub mod backend;
pub mod cache;
pub mod error;
pub mod prompt;
pub mod prompter;
pub mod recovery;
pub mod template;

pub use backend::{Backend, BackoffConfig, LlmConfig, LlmRequest, LlmResponse, ModelOutput};
#[cfg(feature = "openai")]
pub use backend::OpenAiBackend;
pub use cache::PromptCache;
pub use error::{ForgeError, Result};
pub use prompt::TemplateVars;
pub use prompter::Prompter;
pub use recovery::{fit, CompletionResult, ValueKind};
pub use template::TemplateStore;
