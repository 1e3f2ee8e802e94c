//! High-level orchestration: template + backend + cache + recovery parse.
//!
//! [`Prompter`] wires the pieces together for the common workflow: render a
//! task template against input text and variables, send it to the configured
//! backend with transport retry, run the response through the recovery
//! parser, and hand back a [`ModelOutput`]. An optional LRU cache keyed by
//! the rendered prompt short-circuits repeat calls in batch jobs.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use reqwest::Client;

use crate::backend::{
    with_backoff, Backend, BackoffConfig, LlmConfig, LlmRequest, ModelOutput,
};
use crate::cache::{PromptCache, DEFAULT_CACHE_SIZE};
use crate::error::{ForgeError, Result};
use crate::prompt::{render, template_variables, TemplateVars};
use crate::template::TemplateStore;

/// Default recovery-search depth limit. Deep enough for the nesting real
/// model output reaches, shallow enough to keep the worst case fast.
pub const DEFAULT_DEPTH_LIMIT: usize = 20;

/// Placeholders a template may reference without the caller providing them.
/// These are optional sections in task templates, not per-call data.
pub const DEFAULT_ALLOWED_MISSING: [&str; 3] = ["examples", "description", "output_format"];

/// The name of the placeholder that receives the input text in [`Prompter::fit`].
pub const TEXT_INPUT_VAR: &str = "text_input";

/// Orchestrator for template-driven structured extraction.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use prompt_forge::backend::MockBackend;
/// use prompt_forge::prompter::Prompter;
///
/// # async fn run() -> prompt_forge::error::Result<()> {
/// let prompter = Prompter::builder("http://localhost:8080", Arc::new(MockBackend::fixed("[]")))
///     .model("gpt-4o")
///     .template_dir("./templates")
///     .build();
/// let output = prompter.raw_fit("List three colors as a JSON array.").await?;
/// println!("{:?}", output.completion()?);
/// # Ok(())
/// # }
/// ```
pub struct Prompter {
    client: Client,
    base_url: String,
    backend: Arc<dyn Backend>,
    backoff: BackoffConfig,
    templates: Option<TemplateStore>,
    model: String,
    system_prompt: Option<String>,
    config: LlmConfig,
    defaults: TemplateVars,
    allowed_missing: Vec<String>,
    depth_limit: usize,
    cache: Option<Mutex<PromptCache<ModelOutput>>>,
}

impl Prompter {
    /// Create a new builder. The backend is required up front; everything
    /// else has a default.
    pub fn builder(base_url: impl Into<String>, backend: Arc<dyn Backend>) -> PrompterBuilder {
        PrompterBuilder {
            client: None,
            base_url: base_url.into(),
            backend,
            backoff: None,
            template_dir: None,
            model: None,
            system_prompt: None,
            config: None,
            defaults: TemplateVars::new(),
            allowed_missing: None,
            depth_limit: None,
            cache_size: None,
            timeout: None,
        }
    }

    /// The template store, if a template directory was configured.
    pub fn templates(&self) -> Option<&TemplateStore> {
        self.templates.as_ref()
    }

    /// Render a named template against `text_input` and `vars`, validating
    /// that every placeholder the template references is covered by the
    /// provided vars, the configured defaults, `text_input`, or the
    /// allowed-missing list.
    pub fn render_prompt(
        &self,
        template: &str,
        text_input: &str,
        vars: &TemplateVars,
    ) -> Result<String> {
        let store = self.templates.as_ref().ok_or_else(|| {
            ForgeError::InvalidConfig("no template directory configured".into())
        })?;
        let body = store.load(template)?;

        let merged = self
            .defaults
            .merged_with(vars)
            .insert(TEXT_INPUT_VAR, text_input);

        let missing: Vec<String> = template_variables(&body)
            .into_iter()
            .filter(|name| {
                !merged.contains(name) && !self.allowed_missing.iter().any(|a| a == name)
            })
            .collect();
        if !missing.is_empty() {
            return Err(ForgeError::MissingVariables {
                template: template.to_string(),
                variables: missing,
            });
        }

        Ok(render(&body, &merged))
    }

    /// Run the full workflow: render, consult the cache, call the backend
    /// with retry, recovery-parse, cache, return.
    pub async fn fit(
        &self,
        template: &str,
        text_input: &str,
        vars: &TemplateVars,
    ) -> Result<ModelOutput> {
        let prompt = self.render_prompt(template, text_input, vars)?;

        if let Some(cache) = &self.cache {
            let mut cache = cache.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(hit) = cache.get(&prompt) {
                return Ok(hit);
            }
        }

        let output = self.dispatch(prompt.clone()).await?;

        if let Some(cache) = &self.cache {
            let mut cache = cache.lock().unwrap_or_else(|e| e.into_inner());
            cache.insert(prompt, output.clone());
        }
        Ok(output)
    }

    /// Send a prompt as-is: no template, no variable validation, no cache.
    /// The response still goes through the recovery parser.
    pub async fn raw_fit(&self, prompt: &str) -> Result<ModelOutput> {
        self.dispatch(prompt.to_string()).await
    }

    async fn dispatch(&self, prompt: String) -> Result<ModelOutput> {
        let request = LlmRequest {
            model: self.model.clone(),
            system_prompt: self.system_prompt.clone(),
            prompt,
            config: self.config.clone(),
        };
        let response = with_backoff(
            &self.backend,
            &self.client,
            &self.base_url,
            &request,
            &self.backoff,
            None,
        )
        .await?;
        Ok(ModelOutput::from_response(response, self.depth_limit))
    }
}

impl std::fmt::Debug for Prompter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Prompter")
            .field("base_url", &self.base_url)
            .field("backend", &self.backend.name())
            .field("model", &self.model)
            .field("depth_limit", &self.depth_limit)
            .field("has_templates", &self.templates.is_some())
            .field("has_cache", &self.cache.is_some())
            .finish()
    }
}

/// Builder for [`Prompter`].
pub struct PrompterBuilder {
    client: Option<Client>,
    base_url: String,
    backend: Arc<dyn Backend>,
    backoff: Option<BackoffConfig>,
    template_dir: Option<std::path::PathBuf>,
    model: Option<String>,
    system_prompt: Option<String>,
    config: Option<LlmConfig>,
    defaults: TemplateVars,
    allowed_missing: Option<Vec<String>>,
    depth_limit: Option<usize>,
    cache_size: Option<usize>,
    timeout: Option<Duration>,
}

impl PrompterBuilder {
    /// Set the HTTP client. If not set, a default client is created.
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Set the transport retry configuration. Default: [`BackoffConfig::none()`].
    pub fn backoff(mut self, config: BackoffConfig) -> Self {
        self.backoff = Some(config);
        self
    }

    /// Set the directory `*.tmpl` task templates are loaded from.
    pub fn template_dir(mut self, dir: impl Into<std::path::PathBuf>) -> Self {
        self.template_dir = Some(dir.into());
        self
    }

    /// Set the model identifier sent to the backend.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set a system prompt prepended to every request.
    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Set the generation parameters. Default: [`LlmConfig::default()`].
    pub fn config(mut self, config: LlmConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Insert a default template variable, overridable per call.
    pub fn default_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.defaults = self.defaults.insert(key, value);
        self
    }

    /// Replace the allowed-missing placeholder list.
    /// Default: [`DEFAULT_ALLOWED_MISSING`].
    pub fn allowed_missing(mut self, names: Vec<String>) -> Self {
        self.allowed_missing = Some(names);
        self
    }

    /// Set the recovery-search depth limit. Default: [`DEFAULT_DEPTH_LIMIT`].
    pub fn depth_limit(mut self, limit: usize) -> Self {
        self.depth_limit = Some(limit);
        self
    }

    /// Enable the prompt cache with [`DEFAULT_CACHE_SIZE`] entries.
    pub fn cached(self) -> Self {
        self.cache_size(DEFAULT_CACHE_SIZE)
    }

    /// Enable the prompt cache with an explicit capacity.
    pub fn cache_size(mut self, capacity: usize) -> Self {
        self.cache_size = Some(capacity);
        self
    }

    /// Set the request timeout for the default client. Default: 60 seconds.
    /// Ignored when a custom client is provided via [`client`](Self::client).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the prompter.
    pub fn build(self) -> Prompter {
        let timeout = self.timeout.unwrap_or(Duration::from_secs(60));
        let client = self.client.unwrap_or_else(|| {
            Client::builder()
                .timeout(timeout)
                .build()
                .expect("Failed to build HTTP client")
        });
        Prompter {
            client,
            base_url: normalize_base_url(&self.base_url),
            backend: self.backend,
            backoff: self.backoff.unwrap_or_else(BackoffConfig::none),
            templates: self.template_dir.map(TemplateStore::new),
            model: self.model.unwrap_or_default(),
            system_prompt: self.system_prompt,
            config: self.config.unwrap_or_default(),
            defaults: self.defaults,
            allowed_missing: self.allowed_missing.unwrap_or_else(|| {
                DEFAULT_ALLOWED_MISSING
                    .iter()
                    .map(|s| s.to_string())
                    .collect()
            }),
            depth_limit: self.depth_limit.unwrap_or(DEFAULT_DEPTH_LIMIT),
            cache: self.cache_size.map(|n| Mutex::new(PromptCache::new(n))),
        }
    }
}

/// Strip known provider path suffixes from a base URL.
/// Prevents double-pathing when backends append their own paths.
/// e.g., "https://api.openai.com/v1" -> "https://api.openai.com"
fn normalize_base_url(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    // Longest suffixes first
    for suffix in &["/v1/chat/completions", "/v1/chat", "/v1"] {
        if let Some(stripped) = trimmed.strip_suffix(suffix) {
            return stripped.to_string();
        }
    }
    trimmed.to_string()
}
