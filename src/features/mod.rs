pub mod metrics;
pub mod population;
pub mod tiers;

pub use metrics::{
    adult_share_pct, bio_intensity, derive_metrics, digital_drive_ratio, maintenance_index,
    school_age_compliance_ratio, RegionMetrics,
};
pub use population::PopulationTable;
pub use tiers::{classify_volume_tiers, DivideTiers, TierConfig, TierStats, TieredRegion, VolumeTier};
