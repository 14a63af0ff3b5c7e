//! Power and energy estimation
//!
//! Maps a sensor snapshot to an estimated instantaneous power draw. The model
//! is deliberately simple: a fixed platform base load, a linear CPU term, and
//! the GPUs' self-reported draw. Inputs arrive already clamped by the sensor
//! reader and are not re-validated here.

use common::models::SensorSnapshot;

/// Baseline platform draw in watts
pub const BASE_POWER_WATTS: f64 = 50.0;

/// Watts attributed per CPU utilization percentage point
pub const CPU_POWER_COEFFICIENT: f64 = 2.0;

/// Seconds per hour, for watt-hour conversion
const SECONDS_PER_HOUR: f64 = 3600.0;

/// Estimates instantaneous power draw for a snapshot, in watts
///
/// `base + cpu_percent * coefficient + sum(gpu power)`. With no GPUs the GPU
/// term is zero.
pub fn estimate_power(snapshot: &SensorSnapshot) -> f64 {
    let gpu_watts: f64 = snapshot.gpu.gpus.iter().map(|gpu| gpu.power_watts).sum();
    BASE_POWER_WATTS + snapshot.cpu_percent * CPU_POWER_COEFFICIENT + gpu_watts
}

/// Converts an average power draw over a duration to watt-hours
pub fn estimate_energy(avg_power_watts: f64, duration_seconds: f64) -> f64 {
    avg_power_watts * duration_seconds / SECONDS_PER_HOUR
}
