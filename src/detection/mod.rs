pub mod flag;
pub mod outage;
pub mod surge;
pub mod divide;
pub mod detector;

pub use flag::{AnomalyFlag, AnomalyKind, AnomalySubject, Evidence, Severity, SkippedEvaluation};
pub use outage::{find_outages, OutageClassifier, OutagePeriod, OutageReport};
pub use surge::{Baseline, VelocitySurgeClassifier};
pub use divide::DivideRatioClassifier;
pub use detector::{AnomalyDetector, DetectionConfig, DetectionOutcome};
