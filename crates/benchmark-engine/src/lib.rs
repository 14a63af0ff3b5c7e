//! Benchmark orchestration and derived-metrics computation for EnviroLLM
//!
//! The orchestrator coordinates sensor sampling, power estimation, inference
//! calls, and quality scoring into persisted benchmark records. The
//! comparison engine reads stored records back and ranks them along derived
//! dimensions.

pub mod clock;
pub mod comparison;
pub mod orchestrator;
pub mod quality;

// Re-export commonly used types
pub use clock::{Clock, SystemClock};
pub use comparison::{ComparisonEngine, ComparisonReport};
pub use orchestrator::{BenchmarkOrchestrator, ManualBenchmarkRequest};
pub use quality::score;
