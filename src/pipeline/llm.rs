//! Field capture: send extracted text plus an instruction to the LLM.
//!
//! The request is a single user message `"<prompt>: <text>"`. The text is
//! neither chunked nor truncated, so very long documents can exceed the
//! model's context window; the API error is surfaced as-is in that case.

use crate::config::{LlmCredentials, PipelineConfig};
use crate::error::{ExtractorError, ServiceStage};
use crate::pipeline::http::{self, RetryPolicy};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Completion text and token usage for one call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionResult {
    pub completion: String,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: Usage,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

/// Build the single user message content.
pub fn user_content(prompt: &str, text: &str) -> String {
    format!("{}: {}", prompt, text)
}

/// Client for an OpenAI-compatible chat completions endpoint.
#[derive(Debug, Clone)]
pub struct Summarizer {
    client: Client,
    endpoint: String,
    credentials: LlmCredentials,
    temperature: f32,
    default_max_tokens: u32,
    retry: RetryPolicy,
}

impl Summarizer {
    /// Build a summarizer from the pipeline configuration.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, ExtractorError> {
        let credentials = config.llm.clone().ok_or_else(|| {
            ExtractorError::InvalidConfig("LLM credentials are not configured".into())
        })?;
        Ok(Self {
            client: http::build_client(config.http_timeout_secs)?,
            endpoint: config.completion_url.clone(),
            credentials,
            temperature: config.temperature,
            default_max_tokens: config.max_tokens,
            retry: RetryPolicy {
                max_retries: config.max_retries,
                backoff_ms: config.retry_backoff_ms,
            },
        })
    }

    /// Capture with the configured token budget (350 unless overridden).
    pub async fn capture_default(
        &self,
        prompt: &str,
        text: &str,
    ) -> Result<CompletionResult, ExtractorError> {
        self.capture(prompt, text, self.default_max_tokens).await
    }

    /// Ask the model to apply `prompt` to `text`.
    ///
    /// # Errors
    /// - [`ExtractorError::ExternalService`] on transport failure or non-2xx status
    /// - [`ExtractorError::MalformedResponse`] when the body lacks
    ///   `choices[0].message.content` or `usage`
    pub async fn capture(
        &self,
        prompt: &str,
        text: &str,
        max_tokens: u32,
    ) -> Result<CompletionResult, ExtractorError> {
        info!(
            "Capturing fields with model {} ({} chars of text)",
            self.credentials.model,
            text.len()
        );

        let body = ChatRequest {
            model: &self.credentials.model,
            messages: vec![ChatMessage {
                role: "user",
                content: user_content(prompt, text),
            }],
            max_tokens,
            temperature: self.temperature,
        };

        let response = http::send_with_retry(ServiceStage::Completion, self.retry, || {
            self.client
                .post(&self.endpoint)
                .bearer_auth(&self.credentials.api_key)
                .json(&body)
        })
        .await?;

        if !response.status().is_success() {
            let (status, text) = http::error_body(response).await;
            return Err(ExtractorError::service(
                ServiceStage::Completion,
                format!("HTTP {}: {}", status, text),
            ));
        }

        let raw = response.text().await.map_err(|e| {
            ExtractorError::service(ServiceStage::Completion, format!("reading body: {}", e))
        })?;
        let result = parse_completion(&raw)?;

        debug!(
            "Completion: {} prompt tokens, {} completion tokens",
            result.prompt_tokens, result.completion_tokens
        );
        Ok(result)
    }
}

/// Parse a chat completions response body.
pub fn parse_completion(raw: &str) -> Result<CompletionResult, ExtractorError> {
    let parsed: ChatResponse = serde_json::from_str(raw)
        .map_err(|e| ExtractorError::malformed(ServiceStage::Completion, e.to_string()))?;

    let choice = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ExtractorError::malformed(ServiceStage::Completion, "empty choices"))?;

    Ok(CompletionResult {
        completion: choice.message.content,
        prompt_tokens: parsed.usage.prompt_tokens,
        completion_tokens: parsed.usage.completion_tokens,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_content_joins_prompt_and_text() {
        assert_eq!(
            user_content("Extract the CNPJ", "ACME LTDA\n12.345"),
            "Extract the CNPJ: ACME LTDA\n12.345"
        );
    }

    #[test]
    fn request_body_shape() {
        let body = ChatRequest {
            model: "gpt-4o-mini",
            messages: vec![ChatMessage {
                role: "user",
                content: user_content("p", "t"),
            }],
            max_tokens: 350,
            temperature: 0.8,
        };
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(v["model"], "gpt-4o-mini");
        assert_eq!(v["messages"][0]["role"], "user");
        assert_eq!(v["messages"][0]["content"], "p: t");
        assert_eq!(v["max_tokens"], 350);
        assert!((v["temperature"].as_f64().unwrap() - 0.8).abs() < 1e-6);
    }

    #[test]
    fn parse_valid_response() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":"X"}}],
                      "usage":{"prompt_tokens":5,"completion_tokens":3,"total_tokens":8}}"#;
        let r = parse_completion(raw).unwrap();
        assert_eq!(
            r,
            CompletionResult {
                completion: "X".into(),
                prompt_tokens: 5,
                completion_tokens: 3,
            }
        );
    }

    #[test]
    fn parse_rejects_missing_usage_and_empty_choices() {
        for raw in [
            r#"{"choices":[{"message":{"content":"X"}}]}"#,
            r#"{"choices":[],"usage":{"prompt_tokens":1,"completion_tokens":1}}"#,
            "not json",
        ] {
            let err = parse_completion(raw).unwrap_err();
            assert!(
                matches!(err, ExtractorError::MalformedResponse { stage: ServiceStage::Completion, .. }),
                "{raw}: {err:?}"
            );
        }
    }

    #[test]
    fn from_config_requires_credentials() {
        let err = Summarizer::from_config(&PipelineConfig::default()).unwrap_err();
        assert!(matches!(err, ExtractorError::InvalidConfig(_)));
    }
}
