use super::types::{Category, Cohort, CohortCounts, RegionId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One normalized identity-transaction tally
///
/// Produced by the ingest layer with region names normalized and missing
/// numeric fields already zeroed. Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub region: RegionId,
    pub date: NaiveDate,
    pub category: Category,
    #[serde(default)]
    pub cohort_counts: CohortCounts,
}

impl TransactionRecord {
    pub fn new(
        region: RegionId,
        date: NaiveDate,
        category: Category,
        cohort_counts: CohortCounts,
    ) -> Self {
        Self {
            region,
            date,
            category,
            cohort_counts,
        }
    }

    /// Record carrying a single cohort tally
    pub fn single(
        region: RegionId,
        date: NaiveDate,
        category: Category,
        cohort: Cohort,
        count: u64,
    ) -> Self {
        Self::new(region, date, category, CohortCounts::only(cohort, count))
    }

    pub fn total(&self) -> u64 {
        self.cohort_counts.total()
    }
}
