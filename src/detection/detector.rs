use super::divide::DivideRatioClassifier;
use super::flag::{AnomalyFlag, AnomalyKind, AnomalySubject, SkippedEvaluation};
use super::outage::OutageClassifier;
use super::surge::VelocitySurgeClassifier;
use crate::aggregation::AggregateSet;
use crate::data::{Period, RegionId};
use crate::features::RegionMetrics;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Detector thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Prior periods in the surge baseline
    pub baseline_window_periods: usize,
    /// Z-score above which a period surges
    pub sigma_threshold: f64,
    /// Actionable digital drive threshold (strictly greater flags)
    pub divide_ratio_threshold: f64,
    /// Descriptive threshold for report narrative only
    pub narrative_ratio_threshold: f64,
    /// Evaluate every period instead of each region's latest
    pub evaluate_all_periods: bool,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            baseline_window_periods: 6,
            sigma_threshold: 2.0,
            divide_ratio_threshold: 10.0,
            narrative_ratio_threshold: 5.0,
            evaluate_all_periods: false,
        }
    }
}

/// Flags and skipped evaluations from one detection pass
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DetectionOutcome {
    /// Ordered by (kind, subject)
    pub flags: Vec<AnomalyFlag>,
    pub skipped: Vec<SkippedEvaluation>,
}

impl DetectionOutcome {
    pub fn count(&self, kind: AnomalyKind) -> usize {
        self.flags.iter().filter(|f| f.kind == kind).count()
    }

    pub fn flags_for<'a>(&'a self, region: &'a RegionId) -> impl Iterator<Item = &'a AnomalyFlag> {
        self.flags
            .iter()
            .filter(move |f| f.subject.region() == Some(region))
    }
}

/// Runs the outage, velocity-surge and divide-ratio classifiers
///
/// Classifiers are independent: a region or period may carry flags of
/// several kinds. Surge evaluations that lack history are recorded as
/// skipped rather than failing the pass.
pub struct AnomalyDetector {
    config: DetectionConfig,
    outage: OutageClassifier,
    surge: VelocitySurgeClassifier,
    divide: DivideRatioClassifier,
}

impl AnomalyDetector {
    pub fn new(config: DetectionConfig) -> Self {
        let surge =
            VelocitySurgeClassifier::new(config.baseline_window_periods, config.sigma_threshold);
        let divide = DivideRatioClassifier::new(config.divide_ratio_threshold);

        Self {
            config,
            outage: OutageClassifier::new(),
            surge,
            divide,
        }
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    pub fn detect(
        &self,
        aggregates: &AggregateSet,
        metrics: &BTreeMap<RegionId, RegionMetrics>,
    ) -> DetectionOutcome {
        let mut outcome = DetectionOutcome::default();

        // 1. Outages first: their periods feed every baseline exclusion
        let outages = self.outage.classify(aggregates);
        outcome.flags.extend(outages.flags.iter().cloned());

        // 2. Velocity surges per region
        for (region, series) in aggregates.region_period_totals() {
            let excluded = outages.excluded_for(&region);
            for target in self.targets(&series) {
                match self.surge.evaluate(&region, &series, target, &excluded) {
                    Ok(Some(flag)) => outcome.flags.push(flag),
                    Ok(None) => {}
                    Err(err) => {
                        debug!("Skipping surge check: {}", err);
                        outcome.skipped.push(SkippedEvaluation {
                            kind: AnomalyKind::VelocitySurge,
                            subject: AnomalySubject::RegionPeriod {
                                region: region.clone(),
                                period: target,
                            },
                            reason: err,
                        });
                    }
                }
            }
        }

        // 3. Divide ratios from derived metrics
        outcome.flags.extend(self.divide.classify(metrics));

        outcome.flags.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

        debug!(
            "Detection: {} outages, {} surges, {} divide ratios, {} skipped",
            outcome.count(AnomalyKind::Outage),
            outcome.count(AnomalyKind::VelocitySurge),
            outcome.count(AnomalyKind::DivideRatio),
            outcome.skipped.len()
        );

        outcome
    }

    fn targets(&self, series: &BTreeMap<Period, u64>) -> Vec<Period> {
        if self.config.evaluate_all_periods {
            series.keys().copied().collect()
        } else {
            series.keys().next_back().copied().into_iter().collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::aggregate;
    use crate::data::{Category, Cohort, Granularity, TransactionRecord};
    use crate::detection::flag::Severity;
    use crate::features::{derive_metrics, PopulationTable};
    use chrono::NaiveDate;

    fn monthly(district: &str, category: Category, totals: &[u64]) -> Vec<TransactionRecord> {
        totals
            .iter()
            .enumerate()
            .filter(|(_, t)| **t > 0)
            .map(|(i, &t)| {
                TransactionRecord::single(
                    RegionId::new("Bihar", district),
                    NaiveDate::from_ymd_opt(2025, i as u32 + 1, 3).unwrap(),
                    category,
                    Cohort::Age18Plus,
                    t,
                )
            })
            .collect()
    }

    fn run(records: &[TransactionRecord], config: DetectionConfig) -> DetectionOutcome {
        let set = aggregate(records, Granularity::Month).unwrap();
        let metrics = derive_metrics(&set, &PopulationTable::new());
        AnomalyDetector::new(config).detect(&set, &metrics)
    }

    #[test]
    fn test_region_x_example() {
        let records = monthly("X", Category::Enrolment, &[100, 100, 100, 0, 100, 100, 400]);
        let outcome = run(&records, DetectionConfig::default());

        let april = Period::month(2025, 4).unwrap();
        let july = Period::month(2025, 7).unwrap();

        assert_eq!(outcome.count(AnomalyKind::Outage), 1);
        assert_eq!(outcome.flags[0].subject.period(), Some(april));

        let surge = outcome
            .flags
            .iter()
            .find(|f| f.kind == AnomalyKind::VelocitySurge)
            .unwrap();
        assert_eq!(surge.subject.period(), Some(july));
        assert_eq!(surge.severity, Severity::UndefinedDeviation);
        assert!(outcome.skipped.is_empty());
    }

    #[test]
    fn test_flags_of_different_kinds_coexist() {
        let mut records = monthly("Nuh", Category::DemographicUpdate, &[100, 110, 90, 105, 95, 900]);
        records.extend(monthly("Nuh", Category::BiometricUpdate, &[1, 1, 1, 1, 1, 1]));
        let outcome = run(&records, DetectionConfig::default());

        let nuh = RegionId::new("Bihar", "Nuh");
        let kinds: Vec<_> = outcome.flags_for(&nuh).map(|f| f.kind).collect();
        assert_eq!(kinds, vec![AnomalyKind::VelocitySurge, AnomalyKind::DivideRatio]);
    }

    #[test]
    fn test_insufficient_history_is_skipped_not_fatal() {
        let mut records = monthly("Araria", Category::Enrolment, &[50, 60]);
        records.extend(monthly("Pune", Category::Enrolment, &[50, 60, 55, 52]));
        let outcome = run(&records, DetectionConfig::default());

        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(
            outcome.skipped[0].subject.region(),
            Some(&RegionId::new("Bihar", "Araria"))
        );
        assert_eq!(outcome.count(AnomalyKind::VelocitySurge), 0);
    }

    #[test]
    fn test_evaluate_all_periods() {
        let records = monthly("Pune", Category::Enrolment, &[50, 60, 55, 52]);
        let config = DetectionConfig {
            evaluate_all_periods: true,
            ..DetectionConfig::default()
        };
        let outcome = run(&records, config);

        // Periods 1 and 2 lack two prior periods
        assert_eq!(outcome.skipped.len(), 2);
    }

    #[test]
    fn test_flags_are_sorted() {
        let mut records = monthly("Sitamarhi", Category::DemographicUpdate, &[300, 300, 0, 300]);
        records.extend(monthly("Araria", Category::DemographicUpdate, &[20, 30, 25, 40]));
        let outcome = run(&records, DetectionConfig::default());

        let keys: Vec<_> = outcome.flags.iter().map(|f| f.sort_key()).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
        assert_eq!(outcome.flags[0].kind, AnomalyKind::Outage);
    }

    #[test]
    fn test_drop_after_flat_history_is_not_a_surge() {
        let mut records = monthly("Sitamarhi", Category::Enrolment, &[100, 100, 100, 100, 50]);
        records.extend(monthly("Araria", Category::Enrolment, &[100, 100, 100, 100, 100]));
        let outcome = run(&records, DetectionConfig::default());

        assert_eq!(outcome.count(AnomalyKind::VelocitySurge), 0);
        assert_eq!(outcome.count(AnomalyKind::Outage), 0);
        assert!(outcome.skipped.is_empty());
    }

    #[test]
    fn test_outage_in_latest_period_is_not_also_a_surge() {
        let mut records = monthly("Sitamarhi", Category::Enrolment, &[100, 100, 100, 100]);
        // Reported, but nothing happened
        records.push(TransactionRecord::single(
            RegionId::new("Bihar", "Sitamarhi"),
            NaiveDate::from_ymd_opt(2025, 5, 3).unwrap(),
            Category::Enrolment,
            Cohort::Age18Plus,
            0,
        ));
        records.extend(monthly("Araria", Category::Enrolment, &[100, 100, 100, 100, 100]));
        let outcome = run(&records, DetectionConfig::default());

        let sitamarhi = RegionId::new("Bihar", "Sitamarhi");
        let flags: Vec<_> = outcome.flags_for(&sitamarhi).collect();
        assert_eq!(flags.len(), 1);
        assert_eq!(flags[0].kind, AnomalyKind::Outage);
        assert_eq!(flags[0].subject.period(), Period::month(2025, 5));
        assert_eq!(outcome.count(AnomalyKind::VelocitySurge), 0);
        assert!(outcome.skipped.is_empty());
    }
}

