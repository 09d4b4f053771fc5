pub mod data;
pub mod error;
pub mod aggregation;
pub mod features;
pub mod detection;
pub mod correlation;
pub mod pipeline;
pub mod report;
pub mod ingest;
pub mod utils;

// Re-export commonly used types
pub use data::{Category, Cohort, CohortCounts, Granularity, Period, RegionId, TransactionRecord};
pub use error::{AnalysisError, AnalysisResult};
pub use aggregation::{aggregate, aggregate_parallel, AggregateKey, AggregateSet, CategoryTotals};
pub use features::{
    classify_volume_tiers, derive_metrics, DivideTiers, PopulationTable, RegionMetrics, TierConfig,
    VolumeTier,
};
pub use detection::{
    AnomalyDetector, AnomalyFlag, AnomalyKind, AnomalySubject, DetectionConfig, Severity,
    SkippedEvaluation,
};
pub use correlation::{correlate, Coefficient, CorrelationResult, CorrelationSpec, Series};
pub use pipeline::{AnalysisPipeline, AnalysisReport, PipelineConfig};
pub use report::ReportSummary;
pub use utils::{AnalysisConfig, PipelineMetrics};
