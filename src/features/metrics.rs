use super::population::PopulationTable;
use crate::aggregation::{AggregateSet, CategoryTotals};
use crate::data::RegionId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Demographic updates per biometric update, smoothed
///
/// The +1 in the denominator keeps zero-biometric regions finite and damps
/// volatility in low-volume regions. Do not remove it.
pub fn digital_drive_ratio(demographic_updates: u64, biometric_updates: u64) -> f64 {
    demographic_updates as f64 / (biometric_updates as f64 + 1.0)
}

/// Share of enrolments in the 18+ cohort, as a percentage. Zero enrolments
/// give 0.
pub fn adult_share_pct(adult_enrolments: u64, total_enrolments: u64) -> f64 {
    if total_enrolments == 0 {
        return 0.0;
    }
    (adult_enrolments as f64 / total_enrolments as f64) * 100.0
}

/// Biometric updates per resident. Undefined without a population estimate.
pub fn bio_intensity(biometric_updates: u64, estimated_population: Option<u64>) -> Option<f64> {
    match estimated_population {
        Some(population) if population > 0 => {
            Some(biometric_updates as f64 / population as f64)
        }
        _ => None,
    }
}

/// Updates (biometric + demographic) per enrolment
pub fn maintenance_index(updates: u64, enrolments: u64) -> Option<f64> {
    if enrolments == 0 {
        return None;
    }
    Some(updates as f64 / enrolments as f64)
}

/// School-age biometric updates per school-age enrolment
pub fn school_age_compliance_ratio(bio_updates_5_17: u64, enrolments_5_17: u64) -> Option<f64> {
    if enrolments_5_17 == 0 {
        return None;
    }
    Some(bio_updates_5_17 as f64 / enrolments_5_17 as f64)
}

/// Derived indicators for one region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionMetrics {
    pub region: RegionId,

    /// Raw totals the indicators were derived from
    pub totals: CategoryTotals,
    pub estimated_population: Option<u64>,

    pub digital_drive_ratio: f64,
    pub adult_share_pct: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio_intensity: Option<f64>,

    pub maintenance_index: Option<f64>,
    pub school_age_compliance_ratio: Option<f64>,
}

impl RegionMetrics {
    /// Derive every indicator from one region's own totals
    pub fn from_totals(
        region: RegionId,
        totals: CategoryTotals,
        estimated_population: Option<u64>,
    ) -> Self {
        let enrolments = totals.enrolments.total();
        let biometric = totals.biometric_updates.total();
        let demographic = totals.demographic_updates.total();

        Self {
            digital_drive_ratio: digital_drive_ratio(demographic, biometric),
            adult_share_pct: adult_share_pct(totals.enrolments.age_18_plus, enrolments),
            bio_intensity: bio_intensity(biometric, estimated_population),
            maintenance_index: maintenance_index(biometric + demographic, enrolments),
            school_age_compliance_ratio: school_age_compliance_ratio(
                totals.biometric_updates.age_5_17,
                totals.enrolments.age_5_17,
            ),
            region,
            totals,
            estimated_population,
        }
    }

    pub fn total_enrolments(&self) -> u64 {
        self.totals.enrolments.total()
    }

    pub fn biometric_updates(&self) -> u64 {
        self.totals.biometric_updates.total()
    }

    pub fn demographic_updates(&self) -> u64 {
        self.totals.demographic_updates.total()
    }

    /// Compliance ratio below 1.0: enrolling faster than updating
    pub fn has_compliance_backlog(&self) -> bool {
        self.school_age_compliance_ratio
            .map(|ratio| ratio < 1.0)
            .unwrap_or(false)
    }
}

/// Derive metrics for every region in the aggregate set
pub fn derive_metrics(
    aggregates: &AggregateSet,
    population: &PopulationTable,
) -> BTreeMap<RegionId, RegionMetrics> {
    let metrics: BTreeMap<RegionId, RegionMetrics> = aggregates
        .region_totals()
        .into_iter()
        .map(|(region, totals)| {
            let estimate = population.get(&region);
            let metrics = RegionMetrics::from_totals(region.clone(), totals, estimate);
            (region, metrics)
        })
        .collect();

    let without_population = metrics.values().filter(|m| m.bio_intensity.is_none()).count();
    debug!(
        "Derived metrics for {} regions ({} without bio intensity)",
        metrics.len(),
        without_population
    );

    metrics
}
