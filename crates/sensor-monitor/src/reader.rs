//! Sensor reader implementation
//!
//! `SensorReader` is the seam the benchmark engine samples through. The
//! production implementation wraps a `sysinfo::System` behind a mutex and
//! refreshes CPU/memory counters on every read; tests substitute their own
//! implementations with fixed readings.

use parking_lot::Mutex;
use sysinfo::{CpuExt, System, SystemExt};

use common::models::{SensorSnapshot, SystemSpecs};

use crate::gpu;

const BYTES_PER_GB: f64 = 1_073_741_824.0;

/// Point-in-time access to system sensors
///
/// `read` never fails: CPU/memory counters always produce a value and the GPU
/// section degrades to an unavailable marker.
pub trait SensorReader: Send + Sync {
    /// Takes a point-in-time snapshot of CPU, memory, and GPU sensors
    fn read(&self) -> SensorSnapshot;

    /// Total system memory in gigabytes
    fn total_memory_gb(&self) -> f64;

    /// Static description of the host system
    fn system_specs(&self) -> SystemSpecs;
}

/// Production sensor reader backed by sysinfo and NVML
pub struct SystemSensorReader {
    /// System counters, refreshed per read
    system: Mutex<System>,
}

impl SystemSensorReader {
    /// Creates a reader with fully refreshed counters
    pub fn new() -> Self {
        let mut system = System::new_all();
        system.refresh_all();
        Self {
            system: Mutex::new(system),
        }
    }
}

impl Default for SystemSensorReader {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorReader for SystemSensorReader {
    fn read(&self) -> SensorSnapshot {
        let mut system = self.system.lock();
        system.refresh_cpu();
        system.refresh_memory();

        let cpu_percent = system.global_cpu_info().cpu_usage() as f64;
        let total = system.total_memory() as f64;
        let memory_percent = if total > 0.0 {
            system.used_memory() as f64 / total * 100.0
        } else {
            0.0
        };

        SensorSnapshot {
            cpu_percent,
            memory_percent,
            gpu: gpu::probe_gpus(),
        }
    }

    fn total_memory_gb(&self) -> f64 {
        let system = self.system.lock();
        system.total_memory() as f64 / BYTES_PER_GB
    }

    fn system_specs(&self) -> SystemSpecs {
        let system = self.system.lock();
        let gpu_section = gpu::probe_gpus();

        SystemSpecs {
            memory_gb: system.total_memory() as f64 / BYTES_PER_GB,
            cpu_brand: system.global_cpu_info().brand().to_string(),
            cpu_cores_physical: system.physical_core_count().unwrap_or(0),
            cpu_cores_logical: system.cpus().len(),
            platform: format!(
                "{} {}",
                system.name().unwrap_or_else(|| "Unknown".to_string()),
                system.os_version().unwrap_or_default()
            ),
            architecture: std::env::consts::ARCH.to_string(),
            gpu_available: gpu_section.available,
            gpus: gpu_section.gpus,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_produces_bounded_percentages() {
        let reader = SystemSensorReader::new();
        let snapshot = reader.read();

        assert!((0.0..=100.0).contains(&snapshot.cpu_percent));
        assert!((0.0..=100.0).contains(&snapshot.memory_percent));
    }

    #[test]
    fn test_total_memory_is_positive() {
        let reader = SystemSensorReader::new();
        assert!(reader.total_memory_gb() > 0.0);
    }

    #[test]
    fn test_system_specs_filled() {
        let reader = SystemSensorReader::new();
        let specs = reader.system_specs();

        assert!(specs.memory_gb > 0.0);
        assert!(specs.cpu_cores_logical > 0);
        assert!(!specs.architecture.is_empty());
    }
}
