pub mod engine;

pub use engine::{AnalysisPipeline, AnalysisReport, PipelineConfig, RunStats};
