//! Ollama daemon client
//!
//! Speaks the local Ollama HTTP API: `/api/generate` for single-shot,
//! non-streaming generation and `/api/tags` for the installed model list.

use std::time::Instant;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use common::error::{Error, Result};
use common::models::InferenceResult;

use crate::{
    build_http_client, InferenceBackend, AVAILABILITY_TIMEOUT, GENERATE_TIMEOUT,
    LIST_MODELS_TIMEOUT,
};

/// Response body of `/api/generate` with `stream: false`
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    /// Generated text
    response: String,

    /// Tokens consumed by the prompt
    #[serde(default)]
    prompt_eval_count: u64,

    /// Tokens generated
    #[serde(default)]
    eval_count: u64,
}

/// Response body of `/api/tags`
#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Debug, Deserialize)]
struct ModelTag {
    name: String,
}

/// Client for a local Ollama daemon
pub struct OllamaClient {
    /// HTTP client
    client: reqwest::Client,

    /// Base URL of the daemon, without a trailing slash
    base_url: String,
}

impl OllamaClient {
    /// Creates a client for the daemon at `base_url`
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = build_http_client().map_err(|e| Error::Inference(e.to_string()))?;
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Ok(Self { client, base_url })
    }

    fn generate_url(&self) -> String {
        format!("{}/api/generate", self.base_url)
    }

    fn tags_url(&self) -> String {
        format!("{}/api/tags", self.base_url)
    }
}

#[async_trait]
impl InferenceBackend for OllamaClient {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn run(&self, model: &str, prompt: &str) -> InferenceResult {
        let body = serde_json::json!({
            "model": model,
            "prompt": prompt,
            "stream": false,
        });

        debug!("Running prompt against ollama model {}", model);
        let start = Instant::now();

        let response = match self
            .client
            .post(self.generate_url())
            .json(&body)
            .timeout(GENERATE_TIMEOUT)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!("Ollama request failed: {}", e);
                return InferenceResult::failure(e.to_string(), start.elapsed().as_secs_f64());
            }
        };

        if !response.status().is_success() {
            let status = response.status();
            return InferenceResult::failure(
                format!("HTTP {}", status),
                start.elapsed().as_secs_f64(),
            );
        }

        let parsed: GenerateResponse = match response.json().await {
            Ok(parsed) => parsed,
            Err(e) => {
                return InferenceResult::failure(
                    format!("invalid response body: {}", e),
                    start.elapsed().as_secs_f64(),
                )
            }
        };

        let duration_seconds = start.elapsed().as_secs_f64();

        InferenceResult {
            success: true,
            text: parsed.response,
            prompt_tokens: parsed.prompt_eval_count,
            completion_tokens: parsed.eval_count,
            duration_seconds,
            error: None,
        }
    }

    async fn is_available(&self) -> bool {
        self.client
            .get(self.tags_url())
            .timeout(AVAILABILITY_TIMEOUT)
            .send()
            .await
            .map(|response| response.status().is_success())
            .unwrap_or(false)
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        let response = self
            .client
            .get(self.tags_url())
            .timeout(LIST_MODELS_TIMEOUT)
            .send()
            .await
            .map_err(|e| Error::Inference(format!("failed to list ollama models: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::Inference(format!(
                "failed to list ollama models: HTTP {}",
                response.status()
            )));
        }

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| Error::Inference(format!("invalid tags response: {}", e)))?;

        Ok(tags.models.into_iter().map(|tag| tag.name).collect())
    }
}
