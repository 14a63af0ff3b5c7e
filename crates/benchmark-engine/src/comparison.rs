//! Benchmark comparison
//!
//! Ranks a set of stored records along derived dimensions: energy, speed,
//! quality, and quality-per-watt-hour efficiency. Reads from the store only.

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use benchmark_store::BenchmarkStore;
use common::error::{Error, Result};
use common::models::{BenchmarkRecord, BenchmarkStatus};

/// One end of a comparison dimension
#[derive(Debug, Clone, Serialize)]
pub struct DimensionEntry {
    /// Record id
    pub id: String,

    /// Model name
    pub model_name: String,

    /// Value along the dimension
    pub value: f64,
}

/// Best/worst picks along each dimension
///
/// Every dimension is independently optional: when no records qualify for a
/// dimension its keys are simply omitted, never an error.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ComparisonAnalysis {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_energy: Option<DimensionEntry>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub worst_energy: Option<DimensionEntry>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub fastest: Option<DimensionEntry>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub slowest: Option<DimensionEntry>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_quality: Option<DimensionEntry>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub worst_quality: Option<DimensionEntry>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub most_efficient: Option<DimensionEntry>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub least_efficient: Option<DimensionEntry>,
}

/// Result of comparing a set of records
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonReport {
    /// Resolved records
    pub records: Vec<BenchmarkRecord>,

    /// Number of resolved records
    pub count: usize,

    /// Best/worst analysis over completed records
    pub analysis: ComparisonAnalysis,
}

/// Comparison engine over stored benchmark records
pub struct ComparisonEngine {
    store: Arc<BenchmarkStore>,
}

impl ComparisonEngine {
    pub fn new(store: Arc<BenchmarkStore>) -> Self {
        Self { store }
    }

    /// Compares the records with the given ids
    ///
    /// Fails with a not-found error when no ids resolve. Analysis only
    /// considers completed records among the resolved set.
    pub fn compare(&self, ids: &[String]) -> Result<ComparisonReport> {
        let records = self.store.get_by_ids(ids)?;
        if records.is_empty() {
            return Err(Error::NotFound("no matching benchmarks".to_string()));
        }

        debug!("Comparing {} of {} requested records", records.len(), ids.len());

        let completed: Vec<&BenchmarkRecord> = records
            .iter()
            .filter(|record| record.status == BenchmarkStatus::Completed)
            .collect();

        let mut analysis = ComparisonAnalysis::default();

        // Energy: lower is better
        let energy = pairs(&completed, |record| {
            record.metrics.as_ref().map(|m| m.total_energy_wh)
        });
        analysis.best_energy = extreme(&energy, false);
        analysis.worst_energy = extreme(&energy, true);

        // Speed: only where tokens/second was measurable
        let speed = pairs(&completed, |record| {
            record.metrics.as_ref().and_then(|m| m.tokens_per_second)
        });
        analysis.fastest = extreme(&speed, true);
        analysis.slowest = extreme(&speed, false);

        // Quality: only where a response was scored
        let quality_values = pairs(&completed, |record| {
            record.quality.as_ref().map(|q| q.quality_score)
        });
        analysis.best_quality = extreme(&quality_values, true);
        analysis.worst_quality = extreme(&quality_values, false);

        // Efficiency: quality per watt-hour, requires energy > 0
        let efficiency = pairs(&completed, |record| {
            let quality = record.quality.as_ref()?.quality_score;
            let energy = record.metrics.as_ref()?.total_energy_wh;
            (energy > 0.0).then(|| quality / energy)
        });
        analysis.most_efficient = extreme(&efficiency, true);
        analysis.least_efficient = extreme(&efficiency, false);

        Ok(ComparisonReport {
            count: records.len(),
            records,
            analysis,
        })
    }
}

/// Extracts (record, value) pairs for records where the dimension applies
fn pairs<'a>(
    records: &[&'a BenchmarkRecord],
    value: impl Fn(&BenchmarkRecord) -> Option<f64>,
) -> Vec<(&'a BenchmarkRecord, f64)> {
    records
        .iter()
        .filter_map(|record| value(record).map(|v| (*record, v)))
        .collect()
}

/// Picks the max (or min) entry along a dimension
fn extreme(pairs: &[(&BenchmarkRecord, f64)], max: bool) -> Option<DimensionEntry> {
    let mut best: Option<&(&BenchmarkRecord, f64)> = None;

    for pair in pairs {
        let better = match best {
            None => true,
            Some((_, current)) => {
                if max {
                    pair.1 > *current
                } else {
                    pair.1 < *current
                }
            }
        };
        if better {
            best = Some(pair);
        }
    }

    best.map(|(record, value)| DimensionEntry {
        id: record.id.clone(),
        model_name: record.model_name.clone(),
        value: *value,
    })
}
