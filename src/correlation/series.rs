use super::pearson::{align, correlate, CorrelationResult, Series, UndefinedReason};
use crate::aggregation::{AggregateSet, CategoryTotals};
use crate::error::{AnalysisError, AnalysisResult};
use crate::features::{adult_share_pct, digital_drive_ratio};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Quantities that can be extracted from category totals as a series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesKind {
    TotalEnrolments,
    InfantEnrolments,
    SchoolAgeEnrolments,
    AdultEnrolments,
    BiometricUpdates,
    DemographicUpdates,
    AdultDemographicUpdates,
    AdultBiometricUpdates,
    TotalTransactions,
    DigitalDriveRatio,
    AdultSharePct,
}

impl SeriesKind {
    pub fn name(&self) -> &'static str {
        match self {
            SeriesKind::TotalEnrolments => "total_enrolments",
            SeriesKind::InfantEnrolments => "infant_enrolments",
            SeriesKind::SchoolAgeEnrolments => "school_age_enrolments",
            SeriesKind::AdultEnrolments => "adult_enrolments",
            SeriesKind::BiometricUpdates => "biometric_updates",
            SeriesKind::DemographicUpdates => "demographic_updates",
            SeriesKind::AdultDemographicUpdates => "adult_demographic_updates",
            SeriesKind::AdultBiometricUpdates => "adult_biometric_updates",
            SeriesKind::TotalTransactions => "total_transactions",
            SeriesKind::DigitalDriveRatio => "digital_drive_ratio",
            SeriesKind::AdultSharePct => "adult_share_pct",
        }
    }

    pub fn value(&self, totals: &CategoryTotals) -> f64 {
        let enrol = &totals.enrolments;
        let bio = &totals.biometric_updates;
        let demo = &totals.demographic_updates;

        match self {
            SeriesKind::TotalEnrolments => enrol.total() as f64,
            SeriesKind::InfantEnrolments => enrol.age_0_5 as f64,
            SeriesKind::SchoolAgeEnrolments => enrol.age_5_17 as f64,
            SeriesKind::AdultEnrolments => enrol.age_18_plus as f64,
            SeriesKind::BiometricUpdates => bio.total() as f64,
            SeriesKind::DemographicUpdates => demo.total() as f64,
            SeriesKind::AdultDemographicUpdates => demo.age_18_plus as f64,
            SeriesKind::AdultBiometricUpdates => bio.age_18_plus as f64,
            SeriesKind::TotalTransactions => totals.total() as f64,
            SeriesKind::DigitalDriveRatio => digital_drive_ratio(demo.total(), bio.total()),
            SeriesKind::AdultSharePct => adult_share_pct(enrol.age_18_plus, enrol.total()),
        }
    }
}

impl fmt::Display for SeriesKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What one sample stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationAxis {
    /// One sample per region, whole-run totals
    Region,
    /// One sample per period, summed over regions
    Period,
}

impl fmt::Display for CorrelationAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CorrelationAxis::Region => f.write_str("region"),
            CorrelationAxis::Period => f.write_str("period"),
        }
    }
}

/// A configured pair of series to correlate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrelationSpec {
    pub series_a: SeriesKind,
    pub series_b: SeriesKind,
    pub axis: CorrelationAxis,
}

impl CorrelationSpec {
    /// Parent-child indicator across regions and its temporal counterpart
    pub fn defaults() -> Vec<CorrelationSpec> {
        vec![
            CorrelationSpec {
                series_a: SeriesKind::AdultDemographicUpdates,
                series_b: SeriesKind::InfantEnrolments,
                axis: CorrelationAxis::Region,
            },
            CorrelationSpec {
                series_a: SeriesKind::AdultDemographicUpdates,
                series_b: SeriesKind::InfantEnrolments,
                axis: CorrelationAxis::Period,
            },
        ]
    }

    pub fn label_a(&self) -> String {
        format!("{}@{}", self.series_a, self.axis)
    }

    pub fn label_b(&self) -> String {
        format!("{}@{}", self.series_b, self.axis)
    }

    /// Build both series from the aggregate set, paired on the axis keys
    pub fn build(&self, aggregates: &AggregateSet) -> (Series, Series) {
        let (a, b) = match self.axis {
            CorrelationAxis::Region => {
                let totals = aggregates.region_totals();
                align(&self.keyed(self.series_a, &totals), &self.keyed(self.series_b, &totals))
            }
            CorrelationAxis::Period => {
                let totals = aggregates.period_totals();
                align(&self.keyed(self.series_a, &totals), &self.keyed(self.series_b, &totals))
            }
        };

        (Series::new(self.label_a(), a), Series::new(self.label_b(), b))
    }

    /// Correlate this pair, mapping a too-small sample to an undefined result
    pub fn evaluate(&self, aggregates: &AggregateSet) -> AnalysisResult<CorrelationResult> {
        let (a, b) = self.build(aggregates);

        match correlate(&a, &b) {
            Err(AnalysisError::SampleSize {
                series_a,
                series_b,
                paired,
            }) => Ok(CorrelationResult::undefined(
                series_a,
                series_b,
                UndefinedReason::InsufficientSamples,
                paired,
            )),
            other => other,
        }
    }

    fn keyed<K: Ord + Clone>(
        &self,
        kind: SeriesKind,
        totals: &BTreeMap<K, CategoryTotals>,
    ) -> BTreeMap<K, f64> {
        totals
            .iter()
            .map(|(key, t)| (key.clone(), kind.value(t)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::aggregate;
    use crate::correlation::Coefficient;
    use crate::data::{Category, Cohort, Granularity, RegionId, TransactionRecord};
    use chrono::NaiveDate;

    fn record(
        district: &str,
        month: u32,
        category: Category,
        cohort: Cohort,
        count: u64,
    ) -> TransactionRecord {
        TransactionRecord::single(
            RegionId::new("Kerala", district),
            NaiveDate::from_ymd_opt(2025, month, 10).unwrap(),
            category,
            cohort,
            count,
        )
    }

    fn parent_child(district: &str, adult: u64, infant: u64) -> Vec<TransactionRecord> {
        vec![
            record(district, 1, Category::DemographicUpdate, Cohort::Age18Plus, adult),
            record(district, 1, Category::Enrolment, Cohort::Age0To5, infant),
        ]
    }

    #[test]
    fn test_series_kind_values() {
        let mut totals = CategoryTotals::default();
        totals.enrolments.age_0_5 = 40;
        totals.enrolments.age_18_plus = 10;
        totals.demographic_updates.age_18_plus = 30;
        totals.biometric_updates.age_5_17 = 2;

        assert_eq!(SeriesKind::InfantEnrolments.value(&totals), 40.0);
        assert_eq!(SeriesKind::TotalEnrolments.value(&totals), 50.0);
        assert_eq!(SeriesKind::AdultSharePct.value(&totals), 20.0);
        assert_eq!(SeriesKind::DigitalDriveRatio.value(&totals), 10.0);
        assert_eq!(SeriesKind::TotalTransactions.value(&totals), 82.0);
    }

    #[test]
    fn test_region_axis_parent_child() {
        let mut records = parent_child("Ernakulam", 100, 20);
        records.extend(parent_child("Idukki", 200, 40));
        records.extend(parent_child("Wayanad", 300, 60));
        let set = aggregate(&records, Granularity::Month).unwrap();

        let spec = &CorrelationSpec::defaults()[0];
        let result = spec.evaluate(&set).unwrap();

        assert_eq!(result.sample_size, 3);
        assert!((result.coefficient.value().unwrap() - 1.0).abs() < 1e-12);
        assert_eq!(result.series_a_name, "adult_demographic_updates@region");
    }

    #[test]
    fn test_single_period_is_insufficient() {
        let records = parent_child("Ernakulam", 100, 20);
        let set = aggregate(&records, Granularity::Month).unwrap();

        let spec = &CorrelationSpec::defaults()[1];
        let result = spec.evaluate(&set).unwrap();

        assert_eq!(
            result.coefficient,
            Coefficient::Undefined(UndefinedReason::InsufficientSamples)
        );
        assert_eq!(result.sample_size, 1);
    }

    #[test]
    fn test_spec_from_toml() {
        let spec: CorrelationSpec = toml::from_str(
            r#"
            series_a = "biometric_updates"
            series_b = "demographic_updates"
            axis = "period"
            "#,
        )
        .unwrap();

        assert_eq!(spec.series_a, SeriesKind::BiometricUpdates);
        assert_eq!(spec.axis, CorrelationAxis::Period);
    }
}
