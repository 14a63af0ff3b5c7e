//! NVIDIA GPU probing via NVML
//!
//! The probe never fails the caller: when the driver library is absent or any
//! device call errors, the section degrades to `available: false` with the
//! probe error attached.

use nvml_wrapper::enum_wrappers::device::TemperatureSensor;
use nvml_wrapper::Nvml;
use tracing::debug;

use common::models::{GpuReading, GpuSection};

const BYTES_PER_GB: f64 = 1_073_741_824.0;

/// Probes all NVIDIA GPUs visible to NVML
pub fn probe_gpus() -> GpuSection {
    let nvml = match Nvml::init() {
        Ok(nvml) => nvml,
        Err(e) => {
            debug!("NVML unavailable: {}", e);
            return GpuSection::failed(e.to_string());
        }
    };

    let count = match nvml.device_count() {
        Ok(count) => count,
        Err(e) => return GpuSection::failed(e.to_string()),
    };

    let mut gpus = Vec::with_capacity(count as usize);

    for index in 0..count {
        let device = match nvml.device_by_index(index) {
            Ok(device) => device,
            Err(e) => return GpuSection::failed(e.to_string()),
        };

        let name = device.name().unwrap_or_else(|_| "Unknown GPU".to_string());
        let utilization = device
            .utilization_rates()
            .map(|u| u.gpu as f64)
            .unwrap_or(0.0);
        let (memory_used_gb, memory_total_gb) = device
            .memory_info()
            .map(|m| (m.used as f64 / BYTES_PER_GB, m.total as f64 / BYTES_PER_GB))
            .unwrap_or((0.0, 0.0));
        // Power and temperature queries are unsupported on some boards
        let power_watts = device.power_usage().map(|mw| mw as f64 / 1000.0).unwrap_or(0.0);
        let temperature_c = device
            .temperature(TemperatureSensor::Gpu)
            .map(|t| t as f64)
            .unwrap_or(0.0);

        gpus.push(GpuReading {
            index,
            name,
            utilization_percent: utilization,
            memory_used_gb,
            memory_total_gb,
            power_watts,
            temperature_c,
        });
    }

    GpuSection {
        available: true,
        gpus,
        error: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_never_panics() {
        // On machines without the NVML library this exercises the degraded
        // path; on machines with it, the happy path.
        let section = probe_gpus();
        if !section.available {
            assert!(section.gpus.is_empty());
        }
    }
}
