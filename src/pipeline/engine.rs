use crate::aggregation::{aggregate, aggregate_parallel, AggregateSet};
use crate::correlation::{CorrelationResult, CorrelationSpec};
use crate::data::{Granularity, TransactionRecord};
use crate::detection::{AnomalyDetector, AnomalyFlag, DetectionConfig, SkippedEvaluation};
use crate::error::AnalysisResult;
use crate::features::{
    classify_volume_tiers, derive_metrics, DivideTiers, PopulationTable, RegionMetrics, TierConfig,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

/// Pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub granularity: Granularity,
    /// Aggregation threads; 1 folds on the calling thread
    pub workers: usize,
    pub detection: DetectionConfig,
    pub population: PopulationTable,
    pub correlations: Vec<CorrelationSpec>,
    pub tiers: TierConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            granularity: Granularity::Month,
            workers: 1,
            detection: DetectionConfig::default(),
            population: PopulationTable::new(),
            correlations: CorrelationSpec::defaults(),
            tiers: TierConfig::default(),
        }
    }
}

/// Counts describing the shape of one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub records: usize,
    pub aggregates: usize,
    pub gap_filled: usize,
    pub regions: usize,
    pub periods: usize,
}

/// Everything one analysis run produces
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub stats: RunStats,
    /// Ordered by region
    pub region_metrics: Vec<RegionMetrics>,
    /// Ordered by (kind, subject)
    pub anomalies: Vec<AnomalyFlag>,
    pub skipped_evaluations: Vec<SkippedEvaluation>,
    /// In configured order
    pub correlations: Vec<CorrelationResult>,
    pub divide_tiers: DivideTiers,
}

impl AnalysisReport {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// SHA-256 of the compact JSON form, hex encoded
    pub fn fingerprint(&self) -> serde_json::Result<String> {
        let canonical = serde_json::to_vec(self)?;
        let digest = Sha256::digest(&canonical);
        Ok(hex::encode(digest))
    }
}

/// Runs aggregation, feature derivation, detection and correlation in order
///
/// Each stage reads the previous stage's output and nothing else, so two
/// runs over the same records and configuration produce the same report.
pub struct AnalysisPipeline {
    config: PipelineConfig,
    detector: AnomalyDetector,
}

impl AnalysisPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        let detector = AnomalyDetector::new(config.detection.clone());
        Self { config, detector }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the full analysis
    ///
    /// Fails only on a malformed record. Evaluations that cannot be made
    /// are reported in the result instead.
    pub fn run(&self, records: &[TransactionRecord]) -> AnalysisResult<AnalysisReport> {
        info!(
            "Analyzing {} records ({:?}, {} workers)",
            records.len(),
            self.config.granularity,
            self.config.workers
        );

        // 1. Aggregate
        let aggregates = self.aggregate(records)?;

        // 2. Derive features
        let metrics = derive_metrics(&aggregates, &self.config.population);
        let divide_tiers = classify_volume_tiers(&metrics, &self.config.tiers);

        // 3. Detect anomalies
        let outcome = self.detector.detect(&aggregates, &metrics);

        // 4. Correlate
        let correlations = self.correlate(&aggregates)?;

        let stats = RunStats {
            records: records.len(),
            aggregates: aggregates.len(),
            gap_filled: aggregates.iter().filter(|a| a.gap_filled).count(),
            regions: metrics.len(),
            periods: aggregates.period_totals().len(),
        };

        info!(
            "Analysis complete: {} regions, {} anomalies, {} skipped evaluations",
            stats.regions,
            outcome.flags.len(),
            outcome.skipped.len()
        );

        Ok(AnalysisReport {
            stats,
            region_metrics: metrics.into_values().collect(),
            anomalies: outcome.flags,
            skipped_evaluations: outcome.skipped,
            correlations,
            divide_tiers,
        })
    }

    fn aggregate(&self, records: &[TransactionRecord]) -> AnalysisResult<AggregateSet> {
        if self.config.workers > 1 {
            aggregate_parallel(records, self.config.granularity, self.config.workers)
        } else {
            aggregate(records, self.config.granularity)
        }
    }

    fn correlate(&self, aggregates: &AggregateSet) -> AnalysisResult<Vec<CorrelationResult>> {
        self.config
            .correlations
            .iter()
            .map(|spec| {
                let result = spec.evaluate(aggregates)?;
                debug!(
                    "Correlation {} vs {}: {} (n = {})",
                    result.series_a_name,
                    result.series_b_name,
                    result.coefficient,
                    result.sample_size
                );
                Ok(result)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlation::{Coefficient, UndefinedReason};
    use crate::data::{Category, Cohort, RegionId};
    use crate::detection::{AnomalyKind, Severity};
    use crate::error::AnalysisError;
    use chrono::NaiveDate;

    fn record(
        district: &str,
        month: u32,
        category: Category,
        cohort: Cohort,
        count: u64,
    ) -> TransactionRecord {
        TransactionRecord::single(
            RegionId::new("Uttar Pradesh", district),
            NaiveDate::from_ymd_opt(2025, month, 15).unwrap(),
            category,
            cohort,
            count,
        )
    }

    fn sample_records() -> Vec<TransactionRecord> {
        let mut records = Vec::new();

        // Steady district with an outage in April
        for (month, count) in [(1, 100), (2, 100), (3, 100), (5, 100), (6, 100), (7, 400)] {
            records.push(record("Lucknow", month, Category::Enrolment, Cohort::Age0To5, count));
        }

        // Demographic-heavy district
        for month in 1..=7 {
            records.push(record("Sambhal", month, Category::DemographicUpdate, Cohort::Age18Plus, 250));
            records.push(record("Sambhal", month, Category::BiometricUpdate, Cohort::Age5To17, 2));
            records.push(record("Sambhal", month, Category::Enrolment, Cohort::Age0To5, 30));
        }

        records
    }

    #[test]
    fn test_full_run() {
        let pipeline = AnalysisPipeline::new(PipelineConfig::default());
        let report = pipeline.run(&sample_records()).unwrap();

        assert_eq!(report.stats.regions, 2);
        assert_eq!(report.stats.periods, 7);
        assert_eq!(report.region_metrics[0].region, RegionId::new("Uttar Pradesh", "Lucknow"));

        let lucknow_surge = report
            .anomalies
            .iter()
            .find(|f| f.kind == AnomalyKind::VelocitySurge)
            .unwrap();
        assert_eq!(lucknow_surge.severity, Severity::UndefinedDeviation);

        let divide: Vec<_> = report
            .anomalies
            .iter()
            .filter(|f| f.kind == AnomalyKind::DivideRatio)
            .collect();
        assert_eq!(divide.len(), 1);
        assert_eq!(
            divide[0].subject.region(),
            Some(&RegionId::new("Uttar Pradesh", "Sambhal"))
        );

        assert_eq!(report.correlations.len(), 2);

        // Lucknow has no adult updates at all
        assert_eq!(report.divide_tiers.below_min_volume, 1);
        assert_eq!(report.divide_tiers.low.regions, 1);
        assert_eq!(
            report.divide_tiers.regions[0].region,
            RegionId::new("Uttar Pradesh", "Sambhal")
        );
    }

    #[test]
    fn test_deterministic_output() {
        let config = PipelineConfig {
            workers: 4,
            ..PipelineConfig::default()
        };
        let records = sample_records();
        let mut reversed = records.clone();
        reversed.reverse();

        let first = AnalysisPipeline::new(config.clone()).run(&records).unwrap();
        let second = AnalysisPipeline::new(config).run(&reversed).unwrap();

        assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
        assert_eq!(first.fingerprint().unwrap(), second.fingerprint().unwrap());
        assert_eq!(first.fingerprint().unwrap().len(), 64);
    }

    #[test]
    fn test_too_few_regions_gives_undefined_correlation() {
        let records = vec![
            record("Agra", 1, Category::DemographicUpdate, Cohort::Age18Plus, 10),
            record("Agra", 1, Category::Enrolment, Cohort::Age0To5, 5),
        ];
        let report = AnalysisPipeline::new(PipelineConfig::default())
            .run(&records)
            .unwrap();

        for result in &report.correlations {
            assert_eq!(
                result.coefficient,
                Coefficient::Undefined(UndefinedReason::InsufficientSamples)
            );
        }
    }

    #[test]
    fn test_malformed_record_aborts() {
        let mut records = sample_records();
        records.push(TransactionRecord::single(
            RegionId::new("Uttar Pradesh", " "),
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            Category::Enrolment,
            Cohort::Age0To5,
            1,
        ));
        let index = records.len() - 1;

        let err = AnalysisPipeline::new(PipelineConfig::default())
            .run(&records)
            .unwrap_err();
        assert_eq!(
            err,
            AnalysisError::MalformedRecord {
                index,
                field: "region"
            }
        );
    }

    #[test]
    fn test_empty_input() {
        let report = AnalysisPipeline::new(PipelineConfig::default())
            .run(&[])
            .unwrap();

        assert!(report.region_metrics.is_empty());
        assert!(report.anomalies.is_empty());
        assert_eq!(report.correlations.len(), 2);
    }
}
