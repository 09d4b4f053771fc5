use super::flag::{AnomalyFlag, AnomalyKind, AnomalySubject, Evidence, Severity};
use crate::aggregation::AggregateSet;
use crate::data::{Period, RegionId};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// A zero-activity period with at least one active neighbor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutagePeriod {
    pub period: Period,
    pub previous: Option<u64>,
    pub next: Option<u64>,
}

impl OutagePeriod {
    /// Mean activity of the nonzero neighbors, i.e. what went missing
    pub fn missing_activity(&self) -> f64 {
        let active: Vec<u64> = [self.previous, self.next]
            .into_iter()
            .flatten()
            .filter(|&total| total > 0)
            .collect();
        if active.is_empty() {
            return 0.0;
        }
        active.iter().sum::<u64>() as f64 / active.len() as f64
    }

    fn into_flag(self, subject: AnomalySubject) -> AnomalyFlag {
        AnomalyFlag {
            subject,
            kind: AnomalyKind::Outage,
            severity: Severity::Score(self.missing_activity()),
            evidence: Evidence::Outage {
                total: 0,
                previous: self.previous,
                next: self.next,
            },
        }
    }
}

/// Scan a chronological series for outage periods
///
/// A period qualifies when its total is exactly zero and the period before
/// or after it in the series is nonzero. Runs of consecutive zeros only
/// qualify at their edges.
pub fn find_outages(series: &BTreeMap<Period, u64>) -> Vec<OutagePeriod> {
    let points: Vec<(Period, u64)> = series.iter().map(|(p, t)| (*p, *t)).collect();
    let mut outages = Vec::new();

    for (i, &(period, total)) in points.iter().enumerate() {
        if total != 0 {
            continue;
        }

        let previous = i.checked_sub(1).map(|j| points[j].1);
        let next = points.get(i + 1).map(|&(_, t)| t);

        let neighbor_active = previous.unwrap_or(0) > 0 || next.unwrap_or(0) > 0;
        if neighbor_active {
            outages.push(OutagePeriod {
                period,
                previous,
                next,
            });
        }
    }

    outages
}

/// Outage flags plus the periods every baseline must skip
#[derive(Debug, Clone, Default)]
pub struct OutageReport {
    pub flags: Vec<AnomalyFlag>,
    pub national: BTreeSet<Period>,
    pub regional: BTreeMap<RegionId, BTreeSet<Period>>,
}

impl OutageReport {
    /// Periods excluded from `region`'s baseline
    pub fn excluded_for(&self, region: &RegionId) -> BTreeSet<Period> {
        let mut excluded = self.national.clone();
        if let Some(periods) = self.regional.get(region) {
            excluded.extend(periods.iter().copied());
        }
        excluded
    }
}

/// Temporal outage classifier
///
/// Evaluates the system-wide series and each region's own series. A
/// regional outage that coincides with a system-wide one is flagged once,
/// at system level.
#[derive(Debug, Clone, Default)]
pub struct OutageClassifier;

impl OutageClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(&self, aggregates: &AggregateSet) -> OutageReport {
        let mut report = OutageReport::default();

        for outage in find_outages(&aggregates.national_period_totals()) {
            report.national.insert(outage.period);
            report
                .flags
                .push(outage.into_flag(AnomalySubject::Period {
                    period: outage.period,
                }));
        }

        for (region, series) in aggregates.region_period_totals() {
            let outages = find_outages(&series);
            if outages.is_empty() {
                continue;
            }

            let mut periods = BTreeSet::new();
            for outage in outages {
                periods.insert(outage.period);
                if report.national.contains(&outage.period) {
                    continue;
                }
                report.flags.push(outage.into_flag(AnomalySubject::RegionPeriod {
                    region: region.clone(),
                    period: outage.period,
                }));
            }
            report.regional.insert(region, periods);
        }

        debug!(
            "Outage scan: {} system-wide, {} regions affected, {} flags",
            report.national.len(),
            report.regional.len(),
            report.flags.len()
        );

        report
    }
}
