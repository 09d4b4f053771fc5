use super::flag::{AnomalyFlag, AnomalyKind, AnomalySubject, Evidence, Severity};
use crate::data::{Period, RegionId};
use crate::error::{AnalysisError, AnalysisResult};
use statrs::statistics::Statistics;
use std::collections::{BTreeMap, BTreeSet};

/// Rolling baseline for one target period
#[derive(Debug, Clone, PartialEq)]
pub struct Baseline {
    /// Periods used, chronological
    pub window: Vec<Period>,
    /// Outage periods dropped from the window
    pub excluded: Vec<Period>,
    pub mean: f64,
    /// Sample standard deviation (n - 1)
    pub stddev: f64,
}

/// Velocity surge classifier
///
/// Detects a period whose activity runs far above the region's own recent
/// history.
///
/// Algorithm:
/// 1. Take the N periods before the target, in chronological order
/// 2. Drop outage periods from that window
/// 3. Compute mean and sample standard deviation of what remains
/// 4. z = (current - mean) / stddev
/// 5. Flag when z exceeds the sigma threshold
///
/// A zero-variance baseline has no numeric z: a current value above the
/// mean is flagged as an undefined deviation, anything else is not a surge.
/// A target period that is itself an outage is never evaluated.
#[derive(Debug, Clone)]
pub struct VelocitySurgeClassifier {
    /// Number of prior periods in the window
    window_periods: usize,

    /// Z-score threshold (e.g., 2.0 = 2 sigma)
    threshold_sigma: f64,
}

impl VelocitySurgeClassifier {
    /// Create new surge classifier
    ///
    /// # Arguments
    /// * `window_periods` - Prior periods in the rolling baseline (typically 6)
    /// * `threshold_sigma` - Z-score threshold for a flag (typically 2.0)
    pub fn new(window_periods: usize, threshold_sigma: f64) -> Self {
        Self {
            window_periods,
            threshold_sigma,
        }
    }

    /// Compute the baseline preceding `target`
    ///
    /// Fails with `InsufficientHistory` when fewer than two non-outage
    /// periods remain in the window.
    pub fn baseline(
        &self,
        region: &RegionId,
        series: &BTreeMap<Period, u64>,
        target: Period,
        outages: &BTreeSet<Period>,
    ) -> AnalysisResult<Baseline> {
        // BTreeMap order is chronological, so "most recent" is unambiguous
        let mut prior: Vec<(Period, u64)> = series
            .range(..target)
            .rev()
            .take(self.window_periods)
            .map(|(p, t)| (*p, *t))
            .collect();
        prior.reverse();

        let (excluded, kept): (Vec<_>, Vec<_>) =
            prior.into_iter().partition(|(p, _)| outages.contains(p));

        if kept.len() < 2 {
            return Err(AnalysisError::insufficient_history(region, target, kept.len()));
        }

        let values: Vec<f64> = kept.iter().map(|(_, t)| *t as f64).collect();
        let mean = values.iter().mean();
        let stddev = values.iter().std_dev();

        Ok(Baseline {
            window: kept.into_iter().map(|(p, _)| p).collect(),
            excluded: excluded.into_iter().map(|(p, _)| p).collect(),
            mean,
            stddev,
        })
    }

    /// Evaluate one region at one target period
    ///
    /// Returns Some(flag) when the period surges, None when it does not.
    pub fn evaluate(
        &self,
        region: &RegionId,
        series: &BTreeMap<Period, u64>,
        target: Period,
        outages: &BTreeSet<Period>,
    ) -> AnalysisResult<Option<AnomalyFlag>> {
        // Already reported as an outage
        if outages.contains(&target) {
            return Ok(None);
        }

        let baseline = self.baseline(region, series, target, outages)?;
        let current = series.get(&target).copied().unwrap_or(0);

        let (severity, z_score) = if baseline.stddev == 0.0 {
            if current as f64 <= baseline.mean {
                return Ok(None);
            }
            (Severity::UndefinedDeviation, None)
        } else {
            let z = (current as f64 - baseline.mean) / baseline.stddev;
            if z <= self.threshold_sigma {
                return Ok(None);
            }
            (Severity::Score(z), Some(z))
        };

        Ok(Some(AnomalyFlag {
            subject: AnomalySubject::RegionPeriod {
                region: region.clone(),
                period: target,
            },
            kind: AnomalyKind::VelocitySurge,
            severity,
            evidence: Evidence::VelocitySurge {
                current,
                baseline_mean: baseline.mean,
                baseline_stddev: baseline.stddev,
                z_score,
                window: baseline.window,
                excluded_outages: baseline.excluded,
            },
        }))
    }

    pub fn window_periods(&self) -> usize {
        self.window_periods
    }

    pub fn threshold_sigma(&self) -> f64 {
        self.threshold_sigma
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region() -> RegionId {
        RegionId::new("Bihar", "Sitamarhi")
    }

    fn month(m: u32) -> Period {
        Period::month(2025, m).unwrap()
    }

    fn series(totals: &[u64]) -> BTreeMap<Period, u64> {
        totals
            .iter()
            .enumerate()
            .map(|(i, &t)| (month(i as u32 + 1), t))
            .collect()
    }

    #[test]
    fn test_outage_excluded_and_undefined_deviation() {
        let series = series(&[100, 100, 100, 0, 100, 100, 400]);
        let outages: BTreeSet<Period> = [month(4)].into_iter().collect();
        let classifier = VelocitySurgeClassifier::new(6, 2.0);

        let baseline = classifier.baseline(&region(), &series, month(7), &outages).unwrap();
        assert_eq!(baseline.window, vec![month(1), month(2), month(3), month(5), month(6)]);
        assert_eq!(baseline.excluded, vec![month(4)]);
        assert_eq!(baseline.mean, 100.0);
        assert_eq!(baseline.stddev, 0.0);

        let flag = classifier
            .evaluate(&region(), &series, month(7), &outages)
            .unwrap()
            .expect("constant baseline with a jump must be flagged");
        assert_eq!(flag.kind, AnomalyKind::VelocitySurge);
        assert_eq!(flag.severity, Severity::UndefinedDeviation);
    }

    #[test]
    fn test_constant_baseline_unchanged_is_not_flagged() {
        let series = series(&[100, 100, 100, 100]);
        let classifier = VelocitySurgeClassifier::new(6, 2.0);

        let result = classifier
            .evaluate(&region(), &series, month(4), &BTreeSet::new())
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_numeric_z_score_surge() {
        // mean 100, sample stddev 10
        let series = series(&[90, 110, 90, 110, 160]);
        let classifier = VelocitySurgeClassifier::new(6, 2.0);

        let flag = classifier
            .evaluate(&region(), &series, month(5), &BTreeSet::new())
            .unwrap()
            .unwrap();

        let z = flag.severity.score().unwrap();
        let expected = 60.0 / (400.0f64 / 3.0).sqrt();
        assert!((z - expected).abs() < 1e-9);
    }

    #[test]
    fn test_below_threshold_not_flagged() {
        let series = series(&[90, 110, 90, 110, 115]);
        let classifier = VelocitySurgeClassifier::new(6, 2.0);

        let result = classifier
            .evaluate(&region(), &series, month(5), &BTreeSet::new())
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_window_limited_to_n_prior_periods() {
        let series = series(&[1000, 1000, 10, 20, 10, 20]);
        let classifier = VelocitySurgeClassifier::new(3, 2.0);

        let baseline = classifier
            .baseline(&region(), &series, month(6), &BTreeSet::new())
            .unwrap();
        assert_eq!(baseline.window, vec![month(3), month(4), month(5)]);
        assert!((baseline.mean - 40.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_insufficient_history() {
        let series = series(&[100, 0, 300]);
        let outages: BTreeSet<Period> = [month(2)].into_iter().collect();
        let classifier = VelocitySurgeClassifier::new(6, 2.0);

        let err = classifier
            .evaluate(&region(), &series, month(3), &outages)
            .unwrap_err();
        assert_eq!(
            err,
            AnalysisError::InsufficientHistory {
                region: region(),
                period: month(3),
                available: 1,
            }
        );
    }

    #[test]
    fn test_drop_is_not_a_surge() {
        let series = series(&[90, 110, 90, 110, 10]);
        let classifier = VelocitySurgeClassifier::new(6, 2.0);

        let result = classifier
            .evaluate(&region(), &series, month(5), &BTreeSet::new())
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_drop_on_constant_baseline_is_not_a_surge() {
        let series = series(&[100, 100, 100, 100, 50]);
        let classifier = VelocitySurgeClassifier::new(6, 2.0);

        let result = classifier
            .evaluate(&region(), &series, month(5), &BTreeSet::new())
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_outage_target_is_not_evaluated() {
        let series = series(&[100, 100, 100, 100, 0]);
        let outages: BTreeSet<Period> = [month(5)].into_iter().collect();
        let classifier = VelocitySurgeClassifier::new(6, 2.0);

        let result = classifier
            .evaluate(&region(), &series, month(5), &outages)
            .unwrap();
        assert!(result.is_none());

        // No history at all would otherwise be an error
        let lone = series_from(&[(5, 0)]);
        assert!(classifier
            .evaluate(&region(), &lone, month(5), &outages)
            .unwrap()
            .is_none());
    }

    fn series_from(points: &[(u32, u64)]) -> BTreeMap<Period, u64> {
        points.iter().map(|&(m, t)| (month(m), t)).collect()
    }
}
