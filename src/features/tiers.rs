use super::metrics::{digital_drive_ratio, RegionMetrics};
use crate::data::RegionId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Volume proxy for urban vs rural regions
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeTier {
    /// Above the volume quantile ("urban")
    High,
    /// At or below it ("rural")
    Low,
}

impl VolumeTier {
    pub fn label(&self) -> &'static str {
        match self {
            VolumeTier::High => "High volume (urban)",
            VolumeTier::Low => "Low volume (rural)",
        }
    }
}

/// Tiering thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierConfig {
    /// Regions with adult update volume at or below this are left out
    pub min_volume: u64,
    /// Volume quantile above which a region is high tier
    pub high_volume_quantile: f64,
}

impl Default for TierConfig {
    fn default() -> Self {
        Self {
            min_volume: 100,
            high_volume_quantile: 0.9,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TieredRegion {
    pub region: RegionId,
    /// Adult demographic + adult biometric updates
    pub volume: u64,
    /// Adult demographic / (adult biometric + 1)
    pub ratio: f64,
    pub tier: VolumeTier,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierStats {
    pub tier: VolumeTier,
    pub regions: usize,
    pub median_ratio: Option<f64>,
}

/// Digital divide between high- and low-volume regions
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DivideTiers {
    /// None when no region clears the minimum volume
    pub volume_cutoff: Option<f64>,
    pub below_min_volume: usize,
    /// Ordered by region
    pub regions: Vec<TieredRegion>,
    pub high: TierStats,
    pub low: TierStats,
}

impl DivideTiers {
    pub fn tier_of(&self, region: &RegionId) -> Option<VolumeTier> {
        self.regions
            .iter()
            .find(|r| &r.region == region)
            .map(|r| r.tier)
    }
}

/// Linear-interpolated quantile of an ascending slice
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }

    let position = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;

    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

/// Split regions into volume tiers and compare their adult digital ratios
///
/// Unlike the per-region indicators this depends on every region: the
/// cutoff is a quantile of the eligible regions' volumes.
pub fn classify_volume_tiers(
    metrics: &BTreeMap<RegionId, RegionMetrics>,
    config: &TierConfig,
) -> DivideTiers {
    let mut below_min_volume = 0;
    let mut eligible: Vec<(RegionId, u64, f64)> = Vec::new();

    for m in metrics.values() {
        let demographic = m.totals.demographic_updates.age_18_plus;
        let biometric = m.totals.biometric_updates.age_18_plus;
        let volume = demographic + biometric;

        if volume <= config.min_volume {
            below_min_volume += 1;
            continue;
        }
        eligible.push((m.region.clone(), volume, digital_drive_ratio(demographic, biometric)));
    }

    let mut volumes: Vec<f64> = eligible.iter().map(|(_, v, _)| *v as f64).collect();
    volumes.sort_by(f64::total_cmp);
    let volume_cutoff = quantile(&volumes, config.high_volume_quantile);

    let regions: Vec<TieredRegion> = eligible
        .into_iter()
        .map(|(region, volume, ratio)| {
            let tier = match volume_cutoff {
                Some(cutoff) if volume as f64 > cutoff => VolumeTier::High,
                _ => VolumeTier::Low,
            };
            TieredRegion {
                region,
                volume,
                ratio,
                tier,
            }
        })
        .collect();

    let high = tier_stats(&regions, VolumeTier::High);
    let low = tier_stats(&regions, VolumeTier::Low);

    debug!(
        "Volume tiers: {} high, {} low, {} below minimum volume",
        high.regions, low.regions, below_min_volume
    );

    DivideTiers {
        volume_cutoff,
        below_min_volume,
        regions,
        high,
        low,
    }
}

fn tier_stats(regions: &[TieredRegion], tier: VolumeTier) -> TierStats {
    let mut ratios: Vec<f64> = regions
        .iter()
        .filter(|r| r.tier == tier)
        .map(|r| r.ratio)
        .collect();
    ratios.sort_by(f64::total_cmp);

    TierStats {
        tier,
        regions: ratios.len(),
        median_ratio: quantile(&ratios, 0.5),
    }
}
