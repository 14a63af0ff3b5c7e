//! System sensor reading and power estimation for EnviroLLM
//!
//! This crate provides the sensor boundary the benchmark engine samples
//! through: point-in-time CPU/memory readings via `sysinfo`, GPU readings via
//! NVML with graceful degradation, and the power/energy estimation formulas.

pub mod gpu;
pub mod power;
pub mod reader;

// Re-export commonly used types
pub use power::{estimate_energy, estimate_power};
pub use reader::{SensorReader, SystemSensorReader};
