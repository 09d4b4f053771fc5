pub mod aggregator;

pub use aggregator::{
    aggregate, aggregate_parallel, AggregateKey, AggregateSet, CategoryTotals,
    RegionPeriodAggregate,
};
