pub mod types;
pub mod record;

pub use types::{Category, Cohort, CohortCounts, Granularity, Period, RegionId};
pub use record::TransactionRecord;
