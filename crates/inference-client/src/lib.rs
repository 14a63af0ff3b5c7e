//! Inference backend clients for EnviroLLM
//!
//! Two backends share one capability: run a single prompt and report the
//! generated text, token counts, and wall-clock duration. Call failures are
//! folded into the returned `InferenceResult` rather than raised, so one
//! model's failure never aborts a benchmark batch.

use std::time::Duration;

use async_trait::async_trait;

use common::error::Result;
use common::models::InferenceResult;

pub mod ollama;
pub mod openai;

// Re-export commonly used types
pub use ollama::OllamaClient;
pub use openai::OpenAiCompatClient;

/// Timeout for availability probes
pub const AVAILABILITY_TIMEOUT: Duration = Duration::from_secs(2);

/// Timeout for a single generation call
pub const GENERATE_TIMEOUT: Duration = Duration::from_secs(120);

/// Timeout for listing available models
pub const LIST_MODELS_TIMEOUT: Duration = Duration::from_secs(5);

/// A backend able to run one prompt against a named model
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    /// Short backend name for logging
    fn name(&self) -> &str;

    /// Runs a single prompt; failures are captured in the result
    async fn run(&self, model: &str, prompt: &str) -> InferenceResult;

    /// Probes backend reachability; swallows all errors
    async fn is_available(&self) -> bool;

    /// Lists models the backend can serve
    async fn list_models(&self) -> Result<Vec<String>>;
}

/// Builds the shared reqwest client used by both backends
pub(crate) fn build_http_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent("EnviroLLM/0.1.0")
        .connect_timeout(Duration::from_secs(10))
        .build()
}
