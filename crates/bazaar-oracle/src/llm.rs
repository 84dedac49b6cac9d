//! LLM backends for the remote oracle.
//!
//! Enum dispatch over the two supported API dialects. Both send a rendered
//! system/user prompt over HTTP via `reqwest` and return the raw text of the
//! reply; turning that text into an outcome is [`parse`](crate::parse)'s job.

use crate::config::{BackendType, LlmBackendConfig, OracleConfig};
use crate::error::OracleError;
use crate::prompt::RenderedPrompt;

/// Sampling parameters shared by both dialects.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Sampling {
    temperature: f64,
    max_tokens: u32,
}

// ---------------------------------------------------------------------------
// Unified backend enum
// ---------------------------------------------------------------------------

/// An LLM backend that turns a prompt into response text.
pub enum LlmBackend {
    /// OpenAI-compatible chat completions API.
    OpenAi(OpenAiBackend),
    /// Anthropic Messages API.
    Anthropic(AnthropicBackend),
}

impl LlmBackend {
    /// Send a prompt and return the response text.
    ///
    /// # Errors
    ///
    /// Returns [`OracleError::Unavailable`] if the HTTP call fails, the
    /// status is not a success, or the reply has no text content.
    pub async fn complete(&self, prompt: &RenderedPrompt) -> Result<String, OracleError> {
        match self {
            Self::OpenAi(backend) => backend.complete(prompt).await,
            Self::Anthropic(backend) => backend.complete(prompt).await,
        }
    }

    /// Dialect name for logging.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::OpenAi(_) => "openai-compatible",
            Self::Anthropic(_) => "anthropic",
        }
    }
}

// ---------------------------------------------------------------------------
// OpenAI-compatible backend
// ---------------------------------------------------------------------------

/// Backend for OpenAI-compatible chat completions APIs.
///
/// Posts to `{api_url}/chat/completions` and asks for a JSON object reply.
pub struct OpenAiBackend {
    client: reqwest::Client,
    backend: LlmBackendConfig,
    sampling: Sampling,
}

impl OpenAiBackend {
    async fn complete(&self, prompt: &RenderedPrompt) -> Result<String, OracleError> {
        let url = format!("{}/chat/completions", self.backend.api_url.trim_end_matches('/'));

        let body = serde_json::json!({
            "model": self.backend.model,
            "messages": [
                {"role": "system", "content": prompt.system},
                {"role": "user", "content": prompt.user}
            ],
            "temperature": self.sampling.temperature,
            "max_tokens": self.sampling.max_tokens,
            "response_format": {"type": "json_object"}
        });

        let request = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.backend.api_key))
            .json(&body);

        let json = send(request, "OpenAI").await?;
        extract_openai_content(&json)
    }
}

/// Extract the text content from an `OpenAI` chat completions response.
fn extract_openai_content(json: &serde_json::Value) -> Result<String, OracleError> {
    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(serde_json::Value::as_str)
        .map(ToOwned::to_owned)
        .ok_or_else(|| {
            OracleError::Unavailable(
                "OpenAI response missing choices[0].message.content".to_owned(),
            )
        })
}

// ---------------------------------------------------------------------------
// Anthropic Messages API backend
// ---------------------------------------------------------------------------

/// Backend for the Anthropic Messages API.
///
/// The system prompt is a top-level field and the reply text lives at
/// `content[0].text`.
pub struct AnthropicBackend {
    client: reqwest::Client,
    backend: LlmBackendConfig,
    sampling: Sampling,
}

impl AnthropicBackend {
    async fn complete(&self, prompt: &RenderedPrompt) -> Result<String, OracleError> {
        let url = format!("{}/messages", self.backend.api_url.trim_end_matches('/'));

        let body = serde_json::json!({
            "model": self.backend.model,
            "max_tokens": self.sampling.max_tokens,
            "temperature": self.sampling.temperature,
            "system": prompt.system,
            "messages": [
                {"role": "user", "content": prompt.user}
            ]
        });

        let request = self
            .client
            .post(&url)
            .header("x-api-key", &self.backend.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&body);

        let json = send(request, "Anthropic").await?;
        extract_anthropic_content(&json)
    }
}

/// Extract the text content from an Anthropic Messages API response.
fn extract_anthropic_content(json: &serde_json::Value) -> Result<String, OracleError> {
    json.get("content")
        .and_then(|c| c.get(0))
        .and_then(|b| b.get("text"))
        .and_then(serde_json::Value::as_str)
        .map(ToOwned::to_owned)
        .ok_or_else(|| {
            OracleError::Unavailable("Anthropic response missing content[0].text".to_owned())
        })
}

// ---------------------------------------------------------------------------
// Shared transport
// ---------------------------------------------------------------------------

/// Send a request and decode a successful JSON body.
async fn send(
    request: reqwest::RequestBuilder,
    label: &str,
) -> Result<serde_json::Value, OracleError> {
    let response = request
        .send()
        .await
        .map_err(|e| OracleError::Unavailable(format!("{label} request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let error_body = response
            .text()
            .await
            .unwrap_or_else(|_| "unable to read error body".to_owned());
        return Err(OracleError::Unavailable(format!(
            "{label} returned {status}: {error_body}"
        )));
    }

    response
        .json()
        .await
        .map_err(|e| OracleError::Unavailable(format!("{label} response decode failed: {e}")))
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// Create the backend described by an [`OracleConfig`].
pub fn create_backend(config: &OracleConfig) -> LlmBackend {
    let client = reqwest::Client::new();
    let backend = config.backend.clone();
    let sampling = Sampling {
        temperature: config.temperature,
        max_tokens: config.max_tokens,
    };
    match config.backend.backend_type {
        BackendType::OpenAi => LlmBackend::OpenAi(OpenAiBackend {
            client,
            backend,
            sampling,
        }),
        BackendType::Anthropic => LlmBackend::Anthropic(AnthropicBackend {
            client,
            backend,
            sampling,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(backend_type: BackendType) -> OracleConfig {
        OracleConfig::new(LlmBackendConfig {
            backend_type,
            api_url: "https://example.invalid/v1".to_owned(),
            api_key: "test".to_owned(),
            model: "test-model".to_owned(),
        })
    }

    #[test]
    fn extract_openai_content_valid() {
        let json = serde_json::json!({
            "choices": [{
                "message": {
                    "content": "{\"accepted\": true, \"dialogue\": \"Deal.\"}"
                }
            }]
        });
        let result = extract_openai_content(&json);
        assert!(result.unwrap_or_default().contains("Deal."));
    }

    #[test]
    fn extract_openai_content_missing_choices() {
        let json = serde_json::json!({"error": "rate_limit"});
        assert!(matches!(
            extract_openai_content(&json),
            Err(OracleError::Unavailable(_))
        ));
    }

    #[test]
    fn extract_anthropic_content_valid() {
        let json = serde_json::json!({
            "content": [{
                "type": "text",
                "text": "{\"accepted\": false}"
            }]
        });
        assert!(extract_anthropic_content(&json).unwrap_or_default().contains("accepted"));
    }

    #[test]
    fn extract_anthropic_content_missing() {
        let json = serde_json::json!({"content": []});
        assert!(extract_anthropic_content(&json).is_err());
    }

    #[test]
    fn create_backend_dispatches_correctly() {
        assert_eq!(create_backend(&config(BackendType::OpenAi)).name(), "openai-compatible");
        assert_eq!(create_backend(&config(BackendType::Anthropic)).name(), "anthropic");
    }
}
