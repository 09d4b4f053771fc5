//! Narrative summary of an analysis report
//!
//! Rankings and counts for the console. The JSON report stays the
//! authoritative output; this view only selects from it.

use crate::correlation::CorrelationResult;
use crate::data::RegionId;
use crate::detection::{AnomalyKind, DetectionConfig};
use crate::features::TierStats;
use crate::pipeline::{AnalysisReport, RunStats};
use serde::Serialize;
use std::fmt::Write;

const TOP_N: usize = 5;
const BOX_WIDTH: usize = 48;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedRegion {
    pub region: RegionId,
    pub value: f64,
}

/// Console view of one report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSummary {
    pub stats: RunStats,
    pub top_digital_drive: Vec<RankedRegion>,
    pub narrative_threshold: f64,
    /// Regions whose digital drive ratio exceeds the narrative threshold
    pub above_narrative_threshold: Vec<RegionId>,
    pub top_adult_share: Vec<RankedRegion>,
    /// School-age compliance ratio below 1.0, worst first
    pub compliance_backlog: Vec<RankedRegion>,
    /// Median adult digital ratio per volume tier, high tier first
    pub volume_tiers: Vec<TierStats>,
    pub volume_cutoff: Option<f64>,
    pub anomaly_counts: Vec<(AnomalyKind, usize)>,
    pub skipped_evaluations: usize,
    pub correlations: Vec<CorrelationResult>,
}

impl ReportSummary {
    pub fn from_report(report: &AnalysisReport, detection: &DetectionConfig) -> Self {
        let metrics = &report.region_metrics;

        let mut by_drive: Vec<RankedRegion> = metrics
            .iter()
            .map(|m| RankedRegion {
                region: m.region.clone(),
                value: m.digital_drive_ratio,
            })
            .collect();
        rank_descending(&mut by_drive);

        let above_narrative_threshold = by_drive
            .iter()
            .filter(|r| r.value > detection.narrative_ratio_threshold)
            .map(|r| r.region.clone())
            .collect();

        let mut by_adult_share: Vec<RankedRegion> = metrics
            .iter()
            .map(|m| RankedRegion {
                region: m.region.clone(),
                value: m.adult_share_pct,
            })
            .collect();
        rank_descending(&mut by_adult_share);

        let mut compliance_backlog: Vec<RankedRegion> = metrics
            .iter()
            .filter(|m| m.has_compliance_backlog())
            .filter_map(|m| {
                m.school_age_compliance_ratio.map(|value| RankedRegion {
                    region: m.region.clone(),
                    value,
                })
            })
            .collect();
        rank_descending(&mut compliance_backlog);
        compliance_backlog.reverse();

        let anomaly_counts = AnomalyKind::ALL
            .iter()
            .map(|kind| {
                let count = report.anomalies.iter().filter(|f| f.kind == *kind).count();
                (*kind, count)
            })
            .collect();

        by_drive.truncate(TOP_N);
        by_adult_share.truncate(TOP_N);

        Self {
            stats: report.stats,
            top_digital_drive: by_drive,
            narrative_threshold: detection.narrative_ratio_threshold,
            above_narrative_threshold,
            top_adult_share: by_adult_share,
            compliance_backlog,
            volume_tiers: vec![
                report.divide_tiers.high.clone(),
                report.divide_tiers.low.clone(),
            ],
            volume_cutoff: report.divide_tiers.volume_cutoff,
            anomaly_counts,
            skipped_evaluations: report.skipped_evaluations.len(),
            correlations: report.correlations.clone(),
        }
    }

    /// Boxed text rendering
    pub fn render(&self) -> String {
        let mut out = String::new();
        let rule = "═".repeat(BOX_WIDTH);

        let _ = writeln!(out, "╔{}╗", rule);
        row(&mut out, "         IDENTITY PULSE ANALYSIS SUMMARY");
        let _ = writeln!(out, "╠{}╣", rule);
        row(&mut out, &format!("Records: {}", self.stats.records));
        row(&mut out, &format!("Regions: {}", self.stats.regions));
        row(&mut out, &format!("Periods: {}", self.stats.periods));
        row(
            &mut out,
            &format!(
                "Aggregates: {} ({} gap-filled)",
                self.stats.aggregates, self.stats.gap_filled
            ),
        );

        let _ = writeln!(out, "╠{}╣", rule);
        row(&mut out, "Top digital drive ratio:");
        for ranked in &self.top_digital_drive {
            row(&mut out, &format!("  {:<32} {:>9.2}", ranked.region.to_string(), ranked.value));
        }
        row(
            &mut out,
            &format!(
                "Regions above {:.1}: {}",
                self.narrative_threshold,
                self.above_narrative_threshold.len()
            ),
        );

        let _ = writeln!(out, "╠{}╣", rule);
        row(&mut out, "Top adult enrolment share (%):");
        for ranked in &self.top_adult_share {
            row(&mut out, &format!("  {:<32} {:>9.2}", ranked.region.to_string(), ranked.value));
        }
        row(
            &mut out,
            &format!("Compliance backlog regions: {}", self.compliance_backlog.len()),
        );
        for ranked in self.compliance_backlog.iter().take(TOP_N) {
            row(&mut out, &format!("  {:<32} {:>9.2}", ranked.region.to_string(), ranked.value));
        }

        let _ = writeln!(out, "╠{}╣", rule);
        row(&mut out, "Digital divide by volume tier:");
        for stats in &self.volume_tiers {
            let median = stats
                .median_ratio
                .map(|m| format!("{:.2}", m))
                .unwrap_or_else(|| "n/a".to_string());
            row(
                &mut out,
                &format!(
                    "  {:<19} n = {:<5} median {:>7}",
                    stats.tier.label(),
                    stats.regions,
                    median
                ),
            );
        }
        if let Some(cutoff) = self.volume_cutoff {
            row(&mut out, &format!("  Volume cutoff: {:.0}", cutoff));
        }

        let _ = writeln!(out, "╠{}╣", rule);
        for (kind, count) in &self.anomaly_counts {
            row(&mut out, &format!("{}: {}", kind.name(), count));
        }
        row(&mut out, &format!("skipped evaluations: {}", self.skipped_evaluations));

        if !self.correlations.is_empty() {
            let _ = writeln!(out, "╠{}╣", rule);
            for result in &self.correlations {
                row(
                    &mut out,
                    &format!("{} ~ {}", result.series_a_name, result.series_b_name),
                );
                let p = result
                    .p_value
                    .map(|p| format!(", p = {:.4}", p))
                    .unwrap_or_default();
                row(
                    &mut out,
                    &format!("  r = {} (n = {}{})", result.coefficient, result.sample_size, p),
                );
            }
        }

        let _ = writeln!(out, "╚{}╝", rule);
        out
    }
}

fn rank_descending(regions: &mut [RankedRegion]) {
    regions.sort_by(|a, b| {
        b.value
            .total_cmp(&a.value)
            .then_with(|| a.region.cmp(&b.region))
    });
}

fn row(out: &mut String, text: &str) {
    let inner = BOX_WIDTH - 2;
    let clipped: String = text.chars().take(inner).collect();
    let _ = writeln!(out, "║ {:<width$} ║", clipped, width = inner);
}
