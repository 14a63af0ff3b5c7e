//! Benchmark orchestration
//!
//! The orchestrator is the coordinator for benchmark trials: it samples
//! sensors, drives inference backends, combines the readings into derived
//! metrics, and persists one record per trial. Trials run synchronously
//! inside the calling request; there is no job queue and no cancellation.
//! Once a sampling window or inference call has started it runs to completion
//! or to its hard timeout.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use benchmark_store::BenchmarkStore;
use common::error::Result;
use common::models::{
    BenchmarkRecord, BenchmarkSource, BenchmarkStatus, PerformanceMetrics,
};
use common::utils::{round1, round2, truncate_preview};
use config::ConfigManager;
use inference_client::InferenceBackend;
use sensor_monitor::{estimate_energy, estimate_power, SensorReader};

use crate::clock::Clock;
use crate::quality;

/// Default manual sampling window
const DEFAULT_SAMPLE_WINDOW: Duration = Duration::from_secs(30);

/// Default number of samples across the window
const DEFAULT_SAMPLE_COUNT: u32 = 30;

/// Response preview budget in characters
const PREVIEW_CHARS: usize = 200;

/// Request body for a manual timed benchmark
#[derive(Debug, Clone, Deserialize)]
pub struct ManualBenchmarkRequest {
    /// Prompt being exercised externally while sampling runs
    pub prompt: String,

    /// User-supplied model label
    #[serde(default = "default_model_name")]
    pub model_name: String,

    /// User-supplied quantization label
    #[serde(default = "default_quantization")]
    pub quantization: String,
}

fn default_model_name() -> String {
    "Unknown Model".to_string()
}

fn default_quantization() -> String {
    "Unknown".to_string()
}

/// Coordinator for benchmark trials
pub struct BenchmarkOrchestrator {
    /// Sensor boundary
    sensor_reader: Arc<dyn SensorReader>,

    /// Record store
    store: Arc<BenchmarkStore>,

    /// Time source, injectable so tests avoid wall-clock delay
    clock: Arc<dyn Clock>,

    /// Manual-mode sampling window
    sample_window: Duration,

    /// Manual-mode sample count
    sample_count: u32,
}

impl BenchmarkOrchestrator {
    /// Creates an orchestrator, reading sampling parameters from config
    pub fn new(
        sensor_reader: Arc<dyn SensorReader>,
        store: Arc<BenchmarkStore>,
        clock: Arc<dyn Clock>,
        config_manager: &ConfigManager,
    ) -> Self {
        let sample_window = config_manager
            .get_duration("benchmark_sample_window_seconds")
            .unwrap_or(DEFAULT_SAMPLE_WINDOW);
        let sample_count = config_manager
            .get_u32("benchmark_sample_count")
            .unwrap_or(DEFAULT_SAMPLE_COUNT)
            .max(1);

        Self {
            sensor_reader,
            store,
            clock,
            sample_window,
            sample_count,
        }
    }

    /// Runs a manual timed trial
    ///
    /// Samples sensors at an even cadence across the window while the user
    /// exercises a model out-of-band, then stores averaged metrics. This is a
    /// long-lived synchronous call (the full window, 30s by default) and it
    /// always completes; there is no failure path through sampling itself.
    pub async fn run_manual(&self, request: ManualBenchmarkRequest) -> Result<BenchmarkRecord> {
        info!(
            "Starting manual benchmark for {} ({} samples over {:?})",
            request.model_name, self.sample_count, self.sample_window
        );

        let interval = self.sample_window / self.sample_count;
        let start = self.clock.monotonic();

        let mut cpu_readings = Vec::with_capacity(self.sample_count as usize);
        let mut memory_readings = Vec::with_capacity(self.sample_count as usize);
        let mut power_readings = Vec::with_capacity(self.sample_count as usize);

        for _ in 0..self.sample_count {
            let snapshot = self.sensor_reader.read();
            cpu_readings.push(snapshot.cpu_percent);
            memory_readings.push(snapshot.memory_percent);
            power_readings.push(estimate_power(&snapshot));

            self.clock.sleep(interval).await;
        }

        let elapsed = (self.clock.monotonic() - start).as_secs_f64();

        let avg_cpu = mean(&cpu_readings);
        let avg_memory = mean(&memory_readings);
        let avg_power = mean(&power_readings);
        let peak_memory_percent = memory_readings.iter().copied().fold(0.0, f64::max);
        let peak_memory_gb = self.sensor_reader.total_memory_gb() * peak_memory_percent / 100.0;
        let total_energy_wh = estimate_energy(avg_power, elapsed);

        let record = BenchmarkRecord {
            id: Uuid::new_v4().to_string(),
            model_name: request.model_name,
            quantization: request.quantization,
            prompt: request.prompt,
            timestamp: Utc::now(),
            source: BenchmarkSource::Manual,
            status: BenchmarkStatus::Completed,
            metrics: Some(PerformanceMetrics {
                avg_cpu_usage: round1(avg_cpu),
                avg_memory_usage: round1(avg_memory),
                avg_power_watts: round1(avg_power),
                peak_memory_gb: round2(peak_memory_gb),
                total_energy_wh: round2(total_energy_wh),
                duration_seconds: round1(elapsed),
                tokens_generated: None,
                tokens_per_second: None,
                prompt_tokens: None,
                total_tokens: None,
            }),
            quality: None,
            response_text: None,
            response_preview: None,
            error: None,
        };

        self.store.save(&record)?;
        info!("Manual benchmark {} completed", record.id);

        Ok(record)
    }

    /// Runs one backend-driven trial per requested model, sequentially
    ///
    /// A failing model yields a failed record and never aborts its siblings.
    /// Sensors are sampled once, immediately after each inference call,
    /// rather than averaged over it; this asymmetry with manual mode is
    /// preserved, documented behavior.
    pub async fn run_backend(
        &self,
        backend: &dyn InferenceBackend,
        models: &[String],
        prompt: &str,
        quantization: &str,
        source: BenchmarkSource,
    ) -> Result<Vec<BenchmarkRecord>> {
        let mut records = Vec::with_capacity(models.len());

        for model in models {
            info!("Benchmarking {} via {}", model, backend.name());

            let outcome = backend.run(model, prompt).await;
            let snapshot = self.sensor_reader.read();

            let record = if outcome.success {
                let power = estimate_power(&snapshot);
                let duration = outcome.duration_seconds;
                let tokens_per_second = if duration > 0.0 && outcome.completion_tokens > 0 {
                    Some(round2(outcome.completion_tokens as f64 / duration))
                } else {
                    None
                };
                let peak_memory_gb =
                    self.sensor_reader.total_memory_gb() * snapshot.memory_percent / 100.0;

                BenchmarkRecord {
                    id: Uuid::new_v4().to_string(),
                    model_name: model.clone(),
                    quantization: quantization.to_string(),
                    prompt: prompt.to_string(),
                    timestamp: Utc::now(),
                    source,
                    status: BenchmarkStatus::Completed,
                    metrics: Some(PerformanceMetrics {
                        avg_cpu_usage: round1(snapshot.cpu_percent),
                        avg_memory_usage: round1(snapshot.memory_percent),
                        avg_power_watts: round1(power),
                        peak_memory_gb: round2(peak_memory_gb),
                        total_energy_wh: round2(estimate_energy(power, duration)),
                        duration_seconds: round2(duration),
                        tokens_generated: Some(outcome.completion_tokens),
                        tokens_per_second,
                        prompt_tokens: Some(outcome.prompt_tokens),
                        total_tokens: Some(outcome.prompt_tokens + outcome.completion_tokens),
                    }),
                    quality: Some(quality::score(&outcome.text)),
                    response_preview: Some(truncate_preview(&outcome.text, PREVIEW_CHARS)),
                    response_text: Some(outcome.text),
                    error: None,
                }
            } else {
                let error = outcome
                    .error
                    .unwrap_or_else(|| "unknown inference failure".to_string());
                warn!("Benchmark of {} failed: {}", model, error);

                BenchmarkRecord {
                    id: Uuid::new_v4().to_string(),
                    model_name: model.clone(),
                    quantization: quantization.to_string(),
                    prompt: prompt.to_string(),
                    timestamp: Utc::now(),
                    source,
                    status: BenchmarkStatus::Failed,
                    metrics: None,
                    quality: None,
                    response_text: None,
                    response_preview: None,
                    error: Some(error),
                }
            };

            self.store.save(&record)?;
            records.push(record);
        }

        Ok(records)
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use common::models::{GpuSection, InferenceResult, SensorSnapshot, SystemSpecs};
    use parking_lot::Mutex;

    /// Sensor reader with fixed readings
    struct FixedSensorReader {
        cpu_percent: f64,
        memory_percent: f64,
        total_memory_gb: f64,
    }

    impl SensorReader for FixedSensorReader {
        fn read(&self) -> SensorSnapshot {
            SensorSnapshot {
                cpu_percent: self.cpu_percent,
                memory_percent: self.memory_percent,
                gpu: GpuSection::unavailable(),
            }
        }

        fn total_memory_gb(&self) -> f64 {
            self.total_memory_gb
        }

        fn system_specs(&self) -> SystemSpecs {
            SystemSpecs {
                memory_gb: self.total_memory_gb,
                cpu_brand: "test cpu".to_string(),
                cpu_cores_physical: 4,
                cpu_cores_logical: 8,
                platform: "test os".to_string(),
                architecture: "x86_64".to_string(),
                gpu_available: false,
                gpus: Vec::new(),
            }
        }
    }

    /// Virtual clock: sleeps advance simulated time instantly
    struct VirtualClock {
        now: Mutex<Duration>,
    }

    impl VirtualClock {
        fn new() -> Self {
            Self {
                now: Mutex::new(Duration::ZERO),
            }
        }
    }

    #[async_trait]
    impl Clock for VirtualClock {
        fn monotonic(&self) -> Duration {
            *self.now.lock()
        }

        async fn sleep(&self, duration: Duration) {
            *self.now.lock() += duration;
        }
    }

    /// Backend returning scripted results per model name
    struct ScriptedBackend;

    #[async_trait]
    impl InferenceBackend for ScriptedBackend {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn run(&self, model: &str, _prompt: &str) -> InferenceResult {
            if model.starts_with("bad") {
                InferenceResult::failure("HTTP 500", 0.2)
            } else {
                InferenceResult {
                    success: true,
                    text: "Tokyo is the capital of Japan. It is very large.".to_string(),
                    prompt_tokens: 8,
                    completion_tokens: 40,
                    duration_seconds: 2.0,
                    error: None,
                }
            }
        }

        async fn is_available(&self) -> bool {
            true
        }

        async fn list_models(&self) -> Result<Vec<String>> {
            Ok(vec!["good".to_string()])
        }
    }

    fn orchestrator(
        cpu: f64,
        memory: f64,
    ) -> (BenchmarkOrchestrator, Arc<BenchmarkStore>) {
        let store = Arc::new(BenchmarkStore::new_in_memory().unwrap());
        let sensor_reader = Arc::new(FixedSensorReader {
            cpu_percent: cpu,
            memory_percent: memory,
            total_memory_gb: 32.0,
        });
        let orchestrator = BenchmarkOrchestrator::new(
            sensor_reader,
            store.clone(),
            Arc::new(VirtualClock::new()),
            &ConfigManager::new().unwrap(),
        );
        (orchestrator, store)
    }

    #[tokio::test]
    async fn test_manual_trial_with_constant_readings() {
        let (orchestrator, store) = orchestrator(20.0, 50.0);

        let record = orchestrator
            .run_manual(ManualBenchmarkRequest {
                prompt: "testing".to_string(),
                model_name: "llama3:8b".to_string(),
                quantization: "Q4".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(record.status, BenchmarkStatus::Completed);
        assert_eq!(record.source, BenchmarkSource::Manual);

        let metrics = record.metrics.as_ref().unwrap();
        assert_eq!(metrics.avg_cpu_usage, 20.0);
        assert_eq!(metrics.avg_memory_usage, 50.0);
        // 50 base + 20 cpu * 2, no GPU term
        assert_eq!(metrics.avg_power_watts, 90.0);
        assert_eq!(metrics.peak_memory_gb, 16.0);
        // virtual clock: exactly the 30s window
        assert_eq!(metrics.duration_seconds, 30.0);
        assert_eq!(metrics.total_energy_wh, round2(90.0 * 30.0 / 3600.0));
        assert_eq!(metrics.tokens_generated, None);
        assert_eq!(metrics.tokens_per_second, None);

        // Persisted as returned
        let stored = store.get_by_id(&record.id).unwrap();
        assert_eq!(stored, record);
    }

    #[tokio::test]
    async fn test_manual_request_defaults() {
        let request: ManualBenchmarkRequest =
            serde_json::from_str(r#"{"prompt": "hi"}"#).unwrap();
        assert_eq!(request.model_name, "Unknown Model");
        assert_eq!(request.quantization, "Unknown");
    }

    #[tokio::test]
    async fn test_backend_trial_success_metrics() {
        let (orchestrator, store) = orchestrator(10.0, 25.0);

        let records = orchestrator
            .run_backend(
                &ScriptedBackend,
                &["good".to_string()],
                "capital of Japan?",
                "Q8",
                BenchmarkSource::Ollama,
            )
            .await
            .unwrap();

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.status, BenchmarkStatus::Completed);

        let metrics = record.metrics.as_ref().unwrap();
        // Single post-inference snapshot, not an average over the call:
        // preserved asymmetry with manual mode.
        assert_eq!(metrics.avg_cpu_usage, 10.0);
        assert_eq!(metrics.avg_power_watts, 70.0);
        assert_eq!(metrics.tokens_generated, Some(40));
        assert_eq!(metrics.tokens_per_second, Some(20.0));
        assert_eq!(metrics.prompt_tokens, Some(8));
        assert_eq!(metrics.total_tokens, Some(48));
        assert_eq!(metrics.total_energy_wh, round2(70.0 * 2.0 / 3600.0));

        assert!(record.quality.is_some());
        assert!(record.response_text.is_some());
        assert_eq!(
            record.response_preview.as_deref(),
            record.response_text.as_deref(),
            "short responses are not truncated"
        );

        assert_eq!(store.get_all().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_backend_trial_failure_has_no_metrics() {
        let (orchestrator, store) = orchestrator(10.0, 25.0);

        let records = orchestrator
            .run_backend(
                &ScriptedBackend,
                &["bad-model".to_string()],
                "hello",
                "Unknown",
                BenchmarkSource::OpenAiCompatible,
            )
            .await
            .unwrap();

        let record = &records[0];
        assert_eq!(record.status, BenchmarkStatus::Failed);
        assert_eq!(record.error.as_deref(), Some("HTTP 500"));
        assert!(record.metrics.is_none());
        assert!(record.quality.is_none());
        assert!(record.response_text.is_none());

        let stored = store.get_by_id(&record.id).unwrap();
        assert_eq!(stored.status, BenchmarkStatus::Failed);
    }

    #[tokio::test]
    async fn test_mixed_batch_is_independent() {
        let (orchestrator, store) = orchestrator(10.0, 25.0);

        let records = orchestrator
            .run_backend(
                &ScriptedBackend,
                &["bad-model".to_string(), "good".to_string()],
                "hello",
                "Unknown",
                BenchmarkSource::Ollama,
            )
            .await
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].status, BenchmarkStatus::Failed);
        assert_eq!(records[1].status, BenchmarkStatus::Completed);
        assert_eq!(store.get_all().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_long_response_preview_truncated() {
        struct VerboseBackend;

        #[async_trait]
        impl InferenceBackend for VerboseBackend {
            fn name(&self) -> &str {
                "verbose"
            }

            async fn run(&self, _model: &str, _prompt: &str) -> InferenceResult {
                InferenceResult {
                    success: true,
                    text: "x".repeat(500),
                    prompt_tokens: 1,
                    completion_tokens: 1,
                    duration_seconds: 1.0,
                    error: None,
                }
            }

            async fn is_available(&self) -> bool {
                true
            }

            async fn list_models(&self) -> Result<Vec<String>> {
                Ok(Vec::new())
            }
        }

        let (orchestrator, _store) = orchestrator(5.0, 10.0);
        let records = orchestrator
            .run_backend(
                &VerboseBackend,
                &["m".to_string()],
                "p",
                "Unknown",
                BenchmarkSource::Ollama,
            )
            .await
            .unwrap();

        let preview = records[0].response_preview.as_deref().unwrap();
        assert_eq!(preview.chars().count(), 203);
        assert!(preview.ends_with("..."));
        assert_eq!(records[0].response_text.as_deref().unwrap().len(), 500);
    }
}
