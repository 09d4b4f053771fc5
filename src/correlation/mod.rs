pub mod pearson;
pub mod series;

pub use pearson::{align, correlate, Coefficient, CorrelationResult, Series, UndefinedReason};
pub use series::{CorrelationAxis, CorrelationSpec, SeriesKind};
