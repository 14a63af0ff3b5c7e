//! Main integration module for EnviroLLM
//!
//! Wires the sensor reader, benchmark store, orchestrator, comparison
//! engine, and inference clients together and exposes the HTTP entry point.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use api_server::AppState;
use benchmark_engine::{BenchmarkOrchestrator, ComparisonEngine, SystemClock};
use benchmark_store::BenchmarkStore;
use config::ConfigManager;
use inference_client::OllamaClient;
use sensor_monitor::{SensorReader, SystemSensorReader};

/// Default listen address
const DEFAULT_ADDRESS: &str = "0.0.0.0";

/// Default listen port
const DEFAULT_PORT: u16 = 8001;

/// Default database file, relative to the working directory
const DEFAULT_DB_PATH: &str = "envirollm.db";

/// Default Ollama daemon URL
const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Main EnviroLLM application
pub struct EnviroLlm {
    /// Configuration manager
    config_manager: Arc<ConfigManager>,

    /// Sensor reader
    sensor_reader: Arc<dyn SensorReader>,

    /// Benchmark record store
    store: Arc<BenchmarkStore>,

    /// Benchmark orchestrator
    orchestrator: Arc<BenchmarkOrchestrator>,

    /// Comparison engine
    comparison: Arc<ComparisonEngine>,

    /// Ollama client
    ollama: Arc<OllamaClient>,
}

impl EnviroLlm {
    /// Creates the application, opening the store and wiring components
    pub fn new() -> Result<Self> {
        // Initialize logging
        logging::init();

        info!("Initializing EnviroLLM");

        let config_manager = Arc::new(ConfigManager::new()?);

        let db_path = config_manager
            .get_path("database_path")
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_DB_PATH));
        let store = Arc::new(BenchmarkStore::new(&db_path)?);

        let sensor_reader: Arc<dyn SensorReader> = Arc::new(SystemSensorReader::new());

        let orchestrator = Arc::new(BenchmarkOrchestrator::new(
            sensor_reader.clone(),
            store.clone(),
            Arc::new(SystemClock::new()),
            &config_manager,
        ));

        let comparison = Arc::new(ComparisonEngine::new(store.clone()));

        let ollama_url = config_manager
            .get_string("ollama_url")
            .unwrap_or_else(|_| DEFAULT_OLLAMA_URL.to_string());
        let ollama = Arc::new(OllamaClient::new(ollama_url)?);

        info!("EnviroLLM initialized");

        Ok(Self {
            config_manager,
            sensor_reader,
            store,
            orchestrator,
            comparison,
            ollama,
        })
    }

    /// Returns the sensor reader
    pub fn get_sensor_reader(&self) -> Arc<dyn SensorReader> {
        self.sensor_reader.clone()
    }

    /// Returns the benchmark store
    pub fn get_store(&self) -> Arc<BenchmarkStore> {
        self.store.clone()
    }

    /// Listen address resolved from config
    pub fn listen_addr(&self) -> Result<SocketAddr> {
        let address = self
            .config_manager
            .get_string("server_address")
            .unwrap_or_else(|_| DEFAULT_ADDRESS.to_string());
        let port = self
            .config_manager
            .get_u16("server_port")
            .unwrap_or(DEFAULT_PORT);

        Ok(format!("{}:{}", address, port).parse()?)
    }

    /// Serves the HTTP API until the process is stopped
    pub async fn serve(&self) -> Result<()> {
        let state = Arc::new(AppState {
            sensor_reader: self.sensor_reader.clone(),
            orchestrator: self.orchestrator.clone(),
            store: self.store.clone(),
            comparison: self.comparison.clone(),
            ollama: self.ollama.clone(),
        });

        api_server::serve(state, self.listen_addr()?).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_wires_up() {
        let dir = tempfile::tempdir().unwrap();
        std::env::set_var(
            "ENVIROLLM_DATABASE_PATH",
            dir.path().join("test.db").display().to_string(),
        );

        let app = EnviroLlm::new().unwrap();
        assert_eq!(app.listen_addr().unwrap().port(), 8001);
        assert!(app.get_store().get_all().unwrap().is_empty());

        std::env::remove_var("ENVIROLLM_DATABASE_PATH");
    }
}
