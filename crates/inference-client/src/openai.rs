//! OpenAI-compatible endpoint client
//!
//! Speaks the `chat/completions` wire format served by OpenAI, vLLM,
//! LM Studio, llama.cpp server, and similar. A bearer token is attached when
//! an API key is configured.

use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use common::error::{Error, Result};
use common::models::InferenceResult;

use crate::{
    build_http_client, InferenceBackend, AVAILABILITY_TIMEOUT, GENERATE_TIMEOUT,
    LIST_MODELS_TIMEOUT,
};

/// Request body of `POST {base}/chat/completions`
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// Response body of `POST {base}/chat/completions`
#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

/// Response body of `GET {base}/models`
#[derive(Debug, Deserialize)]
struct ModelsResponse {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}

/// Client for any OpenAI-compatible HTTP endpoint
pub struct OpenAiCompatClient {
    /// HTTP client
    client: reqwest::Client,

    /// Base URL of the API, without a trailing slash
    base_url: String,

    /// Optional bearer token
    api_key: Option<String>,
}

impl OpenAiCompatClient {
    /// Creates a client for the endpoint at `base_url`
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Result<Self> {
        let client = build_http_client().map_err(|e| Error::Inference(e.to_string()))?;
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn models_url(&self) -> String {
        format!("{}/models", self.base_url)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }
}

#[async_trait]
impl InferenceBackend for OpenAiCompatClient {
    fn name(&self) -> &str {
        "openai-compatible"
    }

    async fn run(&self, model: &str, prompt: &str) -> InferenceResult {
        let body = ChatRequest {
            model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        debug!("Running prompt against openai-compatible model {}", model);
        let start = Instant::now();

        let request = self
            .client
            .post(self.completions_url())
            .json(&body)
            .timeout(GENERATE_TIMEOUT);

        let response = match self.authorize(request).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("OpenAI-compatible request failed: {}", e);
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

        let parsed: ChatResponse = match response.json().await {
            Ok(parsed) => parsed,
            Err(e) => {
                return InferenceResult::failure(
                    format!("invalid response body: {}", e),
                    start.elapsed().as_secs_f64(),
                )
            }
        };

        let duration_seconds = start.elapsed().as_secs_f64();

        let text = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .unwrap_or_default();
        let (prompt_tokens, completion_tokens) = parsed
            .usage
            .map(|usage| (usage.prompt_tokens, usage.completion_tokens))
            .unwrap_or((0, 0));

        InferenceResult {
            success: true,
            text,
            prompt_tokens,
            completion_tokens,
            duration_seconds,
            error: None,
        }
    }

    async fn is_available(&self) -> bool {
        let request = self
            .client
            .get(self.models_url())
            .timeout(AVAILABILITY_TIMEOUT);

        self.authorize(request)
            .send()
            .await
            .map(|response| response.status().is_success())
            .unwrap_or(false)
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        let request = self.client.get(self.models_url()).timeout(LIST_MODELS_TIMEOUT);

        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| Error::Inference(format!("failed to list models: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::Inference(format!(
                "failed to list models: HTTP {}",
                response.status()
            )));
        }

        let models: ModelsResponse = response
            .json()
            .await
            .map_err(|e| Error::Inference(format!("invalid models response: {}", e)))?;

        Ok(models.data.into_iter().map(|entry| entry.id).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_request_wire_shape() {
        let body = ChatRequest {
            model: "gpt-4o-mini",
            messages: vec![ChatMessage {
                role: "user",
                content: "hello",
            }],
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "hello");
    }

    #[test]
    fn test_chat_response_parses() {
        let body = r#"{
            "choices": [{"message": {"role": "assistant", "content": "Hi there."}}],
            "usage": {"prompt_tokens": 9, "completion_tokens": 3, "total_tokens": 12}
        }"#;

        let parsed: ChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.choices[0].message.content, "Hi there.");
        let usage = parsed.usage.unwrap();
        assert_eq!(usage.prompt_tokens, 9);
        assert_eq!(usage.completion_tokens, 3);
    }

    #[test]
    fn test_chat_response_tolerates_missing_usage() {
        let body = r#"{"choices": [{"message": {"content": "ok"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(body).unwrap();
        assert!(parsed.usage.is_none());
    }

    #[test]
    fn test_models_response_parses() {
        let body = r#"{"object": "list", "data": [{"id": "gpt-4o"}, {"id": "gpt-4o-mini"}]}"#;
        let parsed: ModelsResponse = serde_json::from_str(body).unwrap();
        let ids: Vec<_> = parsed.data.into_iter().map(|m| m.id).collect();
        assert_eq!(ids, vec!["gpt-4o", "gpt-4o-mini"]);
    }
}
