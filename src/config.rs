//! Configuration for a [`crate::DocumentPipeline`].
//!
//! Credentials and endpoints are fixed when the pipeline is constructed and
//! never change afterwards. Everything is built through
//! [`PipelineConfigBuilder`]; unset knobs fall back to the defaults the
//! reference deployment uses (300 DPI, temperature 0.8, 350 tokens).

use crate::error::ExtractorError;
use std::fmt;

/// Default OpenAI chat completions endpoint.
pub const DEFAULT_COMPLETION_URL: &str = "https://api.openai.com/v1/chat/completions";

/// AWS credentials for the Textract client.
#[derive(Clone)]
pub struct OcrCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    /// Default: `us-east-1`.
    pub region: String,
    /// Default: `textract`. Used as the credential provider name.
    pub service_name: String,
}

impl OcrCredentials {
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            region: "us-east-1".to_string(),
            service_name: "textract".to_string(),
        }
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = name.into();
        self
    }
}

impl fmt::Debug for OcrCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OcrCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("region", &self.region)
            .field("service_name", &self.service_name)
            .finish()
    }
}

/// API key and model for the completion endpoint.
#[derive(Clone)]
pub struct LlmCredentials {
    pub api_key: String,
    /// Model identifier, e.g. `gpt-4o-mini`.
    pub model: String,
}

impl LlmCredentials {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
        }
    }
}

impl fmt::Debug for LlmCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmCredentials")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .finish()
    }
}

/// Configuration for a document pipeline.
///
/// # Example
/// ```rust
/// use t2_extractor::{LlmCredentials, OcrCredentials, PipelineConfig};
///
/// let config = PipelineConfig::builder()
///     .ocr(OcrCredentials::new("AKIA...", "secret").region("sa-east-1"))
///     .llm(LlmCredentials::new("sk-...", "gpt-4o-mini"))
///     .review_endpoints(
///         "https://verification.example.com/api/tasks/",
///         "https://verification.example.com/api/tasks/project/",
///     )
///     .build()
///     .unwrap();
/// assert_eq!(config.dpi, 300);
/// ```
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Textract credentials. Required for text extraction.
    pub ocr: Option<OcrCredentials>,

    /// Overrides the Textract endpoint (LocalStack, VPC endpoints).
    pub ocr_endpoint: Option<String>,

    /// Completion API credentials. Required for [`crate::Summarizer`].
    pub llm: Option<LlmCredentials>,

    /// Chat completions URL. Default: [`DEFAULT_COMPLETION_URL`].
    pub completion_url: String,

    /// Review portal URL that accepts task POSTs.
    pub review_tasks_url: Option<String>,

    /// Review portal URL prefix; the project id and a trailing `/` are appended.
    pub review_list_url: Option<String>,

    /// Rendering DPI for PDF rasterisation. Range: 72–600. Default: 300.
    pub dpi: u32,

    /// Sampling temperature for completions. Default: 0.8.
    pub temperature: f32,

    /// Default completion budget. Default: 350.
    pub max_tokens: u32,

    /// Per-request HTTP timeout in seconds. Default: 120.
    pub http_timeout_secs: u64,

    /// Retries on transient HTTP failures (transport, 429, 5xx). Default: 0.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled per attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Flatten nested JSON completions before submitting them for review. Default: false.
    pub flatten_verification: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            ocr: None,
            ocr_endpoint: None,
            llm: None,
            completion_url: DEFAULT_COMPLETION_URL.to_string(),
            review_tasks_url: None,
            review_list_url: None,
            dpi: 300,
            temperature: 0.8,
            max_tokens: 350,
            http_timeout_secs: 120,
            max_retries: 0,
            retry_backoff_ms: 500,
            flatten_verification: false,
        }
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn ocr(mut self, credentials: OcrCredentials) -> Self {
        self.config.ocr = Some(credentials);
        self
    }

    pub fn ocr_endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.ocr_endpoint = Some(url.into());
        self
    }

    pub fn llm(mut self, credentials: LlmCredentials) -> Self {
        self.config.llm = Some(credentials);
        self
    }

    pub fn completion_url(mut self, url: impl Into<String>) -> Self {
        self.config.completion_url = url.into();
        self
    }

    pub fn review_endpoints(
        mut self,
        tasks_url: impl Into<String>,
        list_url: impl Into<String>,
    ) -> Self {
        self.config.review_tasks_url = Some(tasks_url.into());
        self.config.review_list_url = Some(list_url.into());
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi;
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: u32) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn http_timeout_secs(mut self, secs: u64) -> Self {
        self.config.http_timeout_secs = secs;
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

    pub fn flatten_verification(mut self, v: bool) -> Self {
        self.config.flatten_verification = v;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, ExtractorError> {
        let c = &self.config;
        if c.dpi < 72 || c.dpi > 600 {
            return Err(ExtractorError::InvalidConfig(format!(
                "DPI must be 72–600, got {}",
                c.dpi
            )));
        }
        if c.max_tokens == 0 {
            return Err(ExtractorError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        if c.http_timeout_secs == 0 {
            return Err(ExtractorError::InvalidConfig(
                "HTTP timeout must be ≥ 1 second".into(),
            ));
        }
        for (name, url) in [
            ("completion_url", Some(&c.completion_url)),
            ("review_tasks_url", c.review_tasks_url.as_ref()),
            ("review_list_url", c.review_list_url.as_ref()),
        ] {
            if let Some(url) = url {
                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    return Err(ExtractorError::InvalidConfig(format!(
                        "{name} must be an HTTP/HTTPS URL, got '{url}'"
                    )));
                }
            }
        }
        Ok(self.config)
    }
}
