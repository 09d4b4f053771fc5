use crate::data::{Category, CohortCounts, Granularity, Period, RegionId, TransactionRecord};
use crate::error::{AnalysisError, AnalysisResult};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Composite key: region x period x category
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AggregateKey {
    pub region: RegionId,
    pub period: Period,
    pub category: Category,
}

/// Summed cohort counts for one key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionPeriodAggregate {
    pub key: AggregateKey,
    pub counts: CohortCounts,
    /// True when emitted for a period the region did not report in
    pub gap_filled: bool,
}

/// Cohort counts split by category
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTotals {
    pub enrolments: CohortCounts,
    pub biometric_updates: CohortCounts,
    pub demographic_updates: CohortCounts,
}

impl CategoryTotals {
    pub fn add(&mut self, category: Category, counts: &CohortCounts) {
        match category {
            Category::Enrolment => self.enrolments.merge(counts),
            Category::BiometricUpdate => self.biometric_updates.merge(counts),
            Category::DemographicUpdate => self.demographic_updates.merge(counts),
        }
    }

    pub fn get(&self, category: Category) -> &CohortCounts {
        match category {
            Category::Enrolment => &self.enrolments,
            Category::BiometricUpdate => &self.biometric_updates,
            Category::DemographicUpdate => &self.demographic_updates,
        }
    }

    /// Transactions across every category and cohort
    pub fn total(&self) -> u64 {
        self.enrolments.total() + self.biometric_updates.total() + self.demographic_updates.total()
    }
}

/// Keyed aggregates for one run, ordered by (region, period, category)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregateSet {
    granularity: Granularity,
    entries: BTreeMap<AggregateKey, RegionPeriodAggregate>,
}

impl AggregateSet {
    /// Build from folded buckets, zero-filling interior gaps per region
    fn from_buckets(buckets: BTreeMap<AggregateKey, CohortCounts>, granularity: Granularity) -> Self {
        let mut reported: BTreeMap<RegionId, (BTreeSet<Period>, BTreeSet<Category>)> =
            BTreeMap::new();
        for key in buckets.keys() {
            let entry = reported.entry(key.region.clone()).or_default();
            entry.0.insert(key.period);
            entry.1.insert(key.category);
        }

        let mut entries: BTreeMap<AggregateKey, RegionPeriodAggregate> = buckets
            .into_iter()
            .map(|(key, counts)| {
                let aggregate = RegionPeriodAggregate {
                    key: key.clone(),
                    counts,
                    gap_filled: false,
                };
                (key, aggregate)
            })
            .collect();

        let mut filled = 0usize;
        for (region, (periods, categories)) in reported {
            let (Some(&first), Some(&last)) = (periods.first(), periods.last()) else {
                continue;
            };

            let mut period = granularity.next(first);
            while period < last {
                if !periods.contains(&period) {
                    for &category in &categories {
                        let key = AggregateKey {
                            region: region.clone(),
                            period,
                            category,
                        };
                        entries.insert(
                            key.clone(),
                            RegionPeriodAggregate {
                                key,
                                counts: CohortCounts::default(),
                                gap_filled: true,
                            },
                        );
                        filled += 1;
                    }
                }
                period = granularity.next(period);
            }
        }

        if filled > 0 {
            debug!("Zero-filled {} aggregates for silent periods", filled);
        }

        Self {
            granularity,
            entries,
        }
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &AggregateKey) -> Option<&RegionPeriodAggregate> {
        self.entries.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegionPeriodAggregate> {
        self.entries.values()
    }

    pub fn regions(&self) -> BTreeSet<RegionId> {
        self.entries.keys().map(|k| k.region.clone()).collect()
    }

    /// Whole-run totals per region, split by category
    pub fn region_totals(&self) -> BTreeMap<RegionId, CategoryTotals> {
        let mut totals: BTreeMap<RegionId, CategoryTotals> = BTreeMap::new();
        for aggregate in self.entries.values() {
            totals
                .entry(aggregate.key.region.clone())
                .or_default()
                .add(aggregate.key.category, &aggregate.counts);
        }
        totals
    }

    /// Chronological series of all-category totals per region
    pub fn region_period_totals(&self) -> BTreeMap<RegionId, BTreeMap<Period, u64>> {
        let mut series: BTreeMap<RegionId, BTreeMap<Period, u64>> = BTreeMap::new();
        for aggregate in self.entries.values() {
            *series
                .entry(aggregate.key.region.clone())
                .or_default()
                .entry(aggregate.key.period)
                .or_insert(0) += aggregate.counts.total();
        }
        series
    }

    /// Category totals per period across all regions
    pub fn period_totals(&self) -> BTreeMap<Period, CategoryTotals> {
        let mut totals: BTreeMap<Period, CategoryTotals> = BTreeMap::new();
        for aggregate in self.entries.values() {
            totals
                .entry(aggregate.key.period)
                .or_default()
                .add(aggregate.key.category, &aggregate.counts);
        }
        totals
    }

    /// All-category totals per period across all regions
    pub fn national_period_totals(&self) -> BTreeMap<Period, u64> {
        self.period_totals()
            .into_iter()
            .map(|(period, totals)| (period, totals.total()))
            .collect()
    }
}

fn validate(index: usize, record: &TransactionRecord) -> AnalysisResult<()> {
    if !record.region.is_set() {
        return Err(AnalysisError::MalformedRecord {
            index,
            field: "region",
        });
    }
    Ok(())
}

fn key_of(record: &TransactionRecord, granularity: Granularity) -> AggregateKey {
    AggregateKey {
        region: record.region.clone(),
        period: granularity.period_of(record.date),
        category: record.category,
    }
}

/// Fold records into per-(region, period, category) aggregates
///
/// Order-independent: counts are summed into an ordered map, so any
/// permutation of `records` yields the same set. Fails on the first record
/// with an unset region.
pub fn aggregate(
    records: &[TransactionRecord],
    granularity: Granularity,
) -> AnalysisResult<AggregateSet> {
    let mut buckets: BTreeMap<AggregateKey, CohortCounts> = BTreeMap::new();

    for (index, record) in records.iter().enumerate() {
        validate(index, record)?;
        buckets
            .entry(key_of(record, granularity))
            .or_default()
            .merge(&record.cohort_counts);
    }

    debug!(
        "Aggregated {} records into {} buckets",
        records.len(),
        buckets.len()
    );

    Ok(AggregateSet::from_buckets(buckets, granularity))
}

/// Same result as [`aggregate`], folded across `workers` scoped threads
pub fn aggregate_parallel(
    records: &[TransactionRecord],
    granularity: Granularity,
    workers: usize,
) -> AnalysisResult<AggregateSet> {
    if workers <= 1 || records.len() < workers * 2 {
        return aggregate(records, granularity);
    }

    // Validate up front so the reported index does not depend on scheduling
    for (index, record) in records.iter().enumerate() {
        validate(index, record)?;
    }

    let buckets: DashMap<AggregateKey, CohortCounts> = DashMap::new();
    let chunk_size = (records.len() + workers - 1) / workers;

    crossbeam::thread::scope(|scope| {
        for chunk in records.chunks(chunk_size) {
            let buckets = &buckets;
            scope.spawn(move |_| {
                for record in chunk {
                    buckets
                        .entry(key_of(record, granularity))
                        .or_default()
                        .merge(&record.cohort_counts);
                }
            });
        }
    })
    .unwrap_or_else(|payload| std::panic::resume_unwind(payload));

    let buckets: BTreeMap<AggregateKey, CohortCounts> = buckets.into_iter().collect();

    debug!(
        "Aggregated {} records into {} buckets on {} workers",
        records.len(),
        buckets.len(),
        workers
    );

    Ok(AggregateSet::from_buckets(buckets, granularity))
}
