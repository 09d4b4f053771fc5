use super::flag::{AnomalyFlag, AnomalyKind, AnomalySubject, Evidence, Severity};
use crate::data::RegionId;
use crate::features::RegionMetrics;
use std::collections::BTreeMap;

/// Flags regions whose digital drive ratio is strictly above the threshold
#[derive(Debug, Clone)]
pub struct DivideRatioClassifier {
    threshold_ratio: f64,
}

impl DivideRatioClassifier {
    pub fn new(threshold_ratio: f64) -> Self {
        Self { threshold_ratio }
    }

    pub fn classify_region(&self, metrics: &RegionMetrics) -> Option<AnomalyFlag> {
        let ratio = metrics.digital_drive_ratio;
        if ratio <= self.threshold_ratio {
            return None;
        }

        Some(AnomalyFlag {
            subject: AnomalySubject::Region {
                region: metrics.region.clone(),
            },
            kind: AnomalyKind::DivideRatio,
            severity: Severity::Score(ratio),
            evidence: Evidence::DivideRatio {
                demographic_updates: metrics.demographic_updates(),
                biometric_updates: metrics.biometric_updates(),
                ratio,
                threshold: self.threshold_ratio,
            },
        })
    }

    pub fn classify(&self, metrics: &BTreeMap<RegionId, RegionMetrics>) -> Vec<AnomalyFlag> {
        metrics
            .values()
            .filter_map(|m| self.classify_region(m))
            .collect()
    }

    pub fn threshold_ratio(&self) -> f64 {
        self.threshold_ratio
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::CategoryTotals;
    use crate::data::CohortCounts;

    fn metrics(district: &str, demographic: u64, biometric: u64) -> RegionMetrics {
        RegionMetrics::from_totals(
            RegionId::new("Haryana", district),
            CategoryTotals {
                enrolments: CohortCounts::default(),
                biometric_updates: CohortCounts::new(0, 0, biometric),
                demographic_updates: CohortCounts::new(0, 0, demographic),
            },
            None,
        )
    }

    #[test]
    fn test_flags_above_threshold() {
        let classifier = DivideRatioClassifier::new(10.0);
        let flag = classifier.classify_region(&metrics("Nuh", 199, 9)).unwrap();

        assert_eq!(flag.kind, AnomalyKind::DivideRatio);
        assert!((flag.severity.score().unwrap() - 19.9).abs() < 1e-9);
    }

    #[test]
    fn test_exact_threshold_not_flagged() {
        let classifier = DivideRatioClassifier::new(10.0);
        // 100 / (9 + 1) = 10.0
        assert!(classifier.classify_region(&metrics("Gurugram", 100, 9)).is_none());
    }

    #[test]
    fn test_classify_all_regions() {
        let classifier = DivideRatioClassifier::new(10.0);
        let all: BTreeMap<_, _> = [metrics("Nuh", 199, 9), metrics("Gurugram", 12, 11)]
            .into_iter()
            .map(|m| (m.region.clone(), m))
            .collect();

        let flags = classifier.classify(&all);
        assert_eq!(flags.len(), 1);
        assert_eq!(flags[0].subject.region(), Some(&RegionId::new("Haryana", "Nuh")));
    }
}
