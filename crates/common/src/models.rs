//! Data model for EnviroLLM
//!
//! This module defines the core data structures shared across the system:
//! sensor snapshots, inference results, derived quality metrics, and the
//! persisted benchmark record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single GPU reading taken from the NVML driver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpuReading {
    /// GPU index as reported by the driver
    pub index: u32,

    /// GPU product name
    pub name: String,

    /// GPU utilization percentage
    pub utilization_percent: f64,

    /// GPU memory in use, in gigabytes
    pub memory_used_gb: f64,

    /// Total GPU memory, in gigabytes
    pub memory_total_gb: f64,

    /// Current power draw in watts
    pub power_watts: f64,

    /// Current temperature in degrees Celsius
    pub temperature_c: f64,
}

/// GPU portion of a sensor snapshot
///
/// Degrades to `available: false` when the driver library is absent or
/// errors, with the probe error attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpuSection {
    /// Whether GPU readings could be collected
    pub available: bool,

    /// Per-device readings, in driver index order
    pub gpus: Vec<GpuReading>,

    /// Probe error when the section is unavailable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GpuSection {
    /// A section with no GPU data and no error (bare machine)
    pub fn unavailable() -> Self {
        Self {
            available: false,
            gpus: Vec::new(),
            error: None,
        }
    }

    /// A section that failed to probe, carrying the probe error
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            available: false,
            gpus: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// A point-in-time reading of system sensors
///
/// Transient: never persisted directly, only derived values are stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorSnapshot {
    /// CPU utilization percentage, 0-100
    pub cpu_percent: f64,

    /// Memory utilization percentage, 0-100
    pub memory_percent: f64,

    /// GPU readings, or a degraded marker
    pub gpu: GpuSection,
}

/// Static description of the host system
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemSpecs {
    /// Total system memory in gigabytes
    pub memory_gb: f64,

    /// CPU brand string
    pub cpu_brand: String,

    /// Number of physical CPU cores
    pub cpu_cores_physical: usize,

    /// Number of logical CPU cores
    pub cpu_cores_logical: usize,

    /// Operating system name and release
    pub platform: String,

    /// Machine architecture
    pub architecture: String,

    /// Whether GPU readings are available
    pub gpu_available: bool,

    /// Detected GPUs
    pub gpus: Vec<GpuReading>,
}

/// Outcome of one prompt/backend interaction
///
/// Ephemeral: produced and consumed within one orchestration call. Failures
/// are folded into `success: false` with the error text rather than raised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceResult {
    /// Whether the backend produced a response
    pub success: bool,

    /// Generated text, empty on failure
    pub text: String,

    /// Tokens consumed by the prompt
    pub prompt_tokens: u64,

    /// Tokens generated in the response
    pub completion_tokens: u64,

    /// Wall-clock duration of the inference call in seconds
    pub duration_seconds: f64,

    /// Error text when the call failed
    pub error: Option<String>,
}

impl InferenceResult {
    /// Builds a failed result carrying the error text
    pub fn failure(error: impl Into<String>, duration_seconds: f64) -> Self {
        Self {
            success: false,
            text: String::new(),
            prompt_tokens: 0,
            completion_tokens: 0,
            duration_seconds,
            error: Some(error.into()),
        }
    }
}

/// Lexical-diversity and structure metrics derived from response text
///
/// The quality score is a heuristic, not a calibrated NLP metric. Immutable
/// once computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    /// Character count of the trimmed response
    pub char_count: usize,

    /// Whitespace-delimited word count
    pub word_count: usize,

    /// Distinct lowercased words with surrounding punctuation stripped
    pub unique_words: usize,

    /// unique_words / word_count
    pub unique_word_ratio: f64,

    /// Mean word length in characters
    pub avg_word_length: f64,

    /// Sentence-terminator count, at least 1 for non-empty text
    pub sentence_count: usize,

    /// Composite 0-100 score
    pub quality_score: f64,
}

impl QualityMetrics {
    /// All-zero metrics, produced for empty or whitespace-only text
    pub fn zero() -> Self {
        Self {
            char_count: 0,
            word_count: 0,
            unique_words: 0,
            unique_word_ratio: 0.0,
            avg_word_length: 0.0,
            sentence_count: 0,
            quality_score: 0.0,
        }
    }
}

/// Performance metrics for a completed benchmark trial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// Average CPU utilization percentage over the trial
    pub avg_cpu_usage: f64,

    /// Average memory utilization percentage over the trial
    pub avg_memory_usage: f64,

    /// Average estimated power draw in watts
    pub avg_power_watts: f64,

    /// Peak memory use in gigabytes
    pub peak_memory_gb: f64,

    /// Energy consumed in watt-hours
    pub total_energy_wh: f64,

    /// Trial duration in seconds
    pub duration_seconds: f64,

    /// Tokens generated; None for manual trials where no inference ran
    pub tokens_generated: Option<u64>,

    /// Generation speed; None when duration or token count is zero
    pub tokens_per_second: Option<f64>,

    /// Tokens consumed by the prompt
    pub prompt_tokens: Option<u64>,

    /// Prompt plus completion tokens
    pub total_tokens: Option<u64>,
}

/// Origin of a benchmark trial's measurements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BenchmarkSource {
    /// Timed sensor sampling with no backend invoked
    #[serde(rename = "manual")]
    Manual,

    /// Local Ollama daemon
    #[serde(rename = "ollama")]
    Ollama,

    /// Any OpenAI-compatible HTTP endpoint
    #[serde(rename = "openai-compatible")]
    OpenAiCompatible,
}

impl BenchmarkSource {
    /// Stable string form, matching the serde representation
    pub fn as_str(&self) -> &'static str {
        match self {
            BenchmarkSource::Manual => "manual",
            BenchmarkSource::Ollama => "ollama",
            BenchmarkSource::OpenAiCompatible => "openai-compatible",
        }
    }

    /// Parses the stable string form
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "manual" => Some(BenchmarkSource::Manual),
            "ollama" => Some(BenchmarkSource::Ollama),
            "openai-compatible" => Some(BenchmarkSource::OpenAiCompatible),
            _ => None,
        }
    }
}

/// Terminal status of a benchmark trial
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BenchmarkStatus {
    /// Trial ran to completion and carries metrics
    #[serde(rename = "completed")]
    Completed,

    /// Trial failed and carries an error
    #[serde(rename = "failed")]
    Failed,
}

impl BenchmarkStatus {
    /// Stable string form, matching the serde representation
    pub fn as_str(&self) -> &'static str {
        match self {
            BenchmarkStatus::Completed => "completed",
            BenchmarkStatus::Failed => "failed",
        }
    }

    /// Parses the stable string form
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "completed" => Some(BenchmarkStatus::Completed),
            "failed" => Some(BenchmarkStatus::Failed),
            _ => None,
        }
    }
}

/// The persisted aggregate of one benchmark trial
///
/// Created once by the orchestrator at the end of a trial and never mutated
/// thereafter. Exactly one of {metrics present, error present} holds,
/// according to status. Deleted only by explicit user action via the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkRecord {
    /// Unique id, generated at creation
    pub id: String,

    /// Model under test, or a user label for manual trials
    pub model_name: String,

    /// Quantization label supplied by the user
    pub quantization: String,

    /// Prompt the trial was run with
    pub prompt: String,

    /// Creation time, immutable
    pub timestamp: DateTime<Utc>,

    /// Origin of the trial
    pub source: BenchmarkSource,

    /// Terminal status
    pub status: BenchmarkStatus,

    /// Performance metrics, present when status is completed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<PerformanceMetrics>,

    /// Response quality metrics, present for completed backend-driven trials
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<QualityMetrics>,

    /// Full response text for completed backend-driven trials
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_text: Option<String>,

    /// First 200 characters of the response, with an ellipsis if truncated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_preview: Option<String>,

    /// Error text, present when status is failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_round_trip() {
        for source in [
            BenchmarkSource::Manual,
            BenchmarkSource::Ollama,
            BenchmarkSource::OpenAiCompatible,
        ] {
            assert_eq!(BenchmarkSource::parse(source.as_str()), Some(source));
        }
        assert_eq!(BenchmarkSource::parse("unknown"), None);
    }

    #[test]
    fn test_status_round_trip() {
        for status in [BenchmarkStatus::Completed, BenchmarkStatus::Failed] {
            assert_eq!(BenchmarkStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(BenchmarkStatus::parse(""), None);
    }

    #[test]
    fn test_source_serializes_kebab() {
        let json = serde_json::to_string(&BenchmarkSource::OpenAiCompatible).unwrap();
        assert_eq!(json, "\"openai-compatible\"");
    }

    #[test]
    fn test_failed_inference_result() {
        let result = InferenceResult::failure("HTTP 500", 1.5);
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("HTTP 500"));
        assert_eq!(result.completion_tokens, 0);
    }
}
