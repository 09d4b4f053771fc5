use crate::data::{Period, RegionId};
use crate::error::AnalysisError;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    Outage,
    VelocitySurge,
    DivideRatio,
}

impl AnomalyKind {
    pub const ALL: [AnomalyKind; 3] = [
        AnomalyKind::Outage,
        AnomalyKind::VelocitySurge,
        AnomalyKind::DivideRatio,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            AnomalyKind::Outage => "outage",
            AnomalyKind::VelocitySurge => "velocity_surge",
            AnomalyKind::DivideRatio => "divide_ratio",
        }
    }
}

impl fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a flag is about
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum AnomalySubject {
    /// System-wide, all regions
    Period { period: Period },
    Region { region: RegionId },
    RegionPeriod { region: RegionId, period: Period },
}

impl AnomalySubject {
    pub fn region(&self) -> Option<&RegionId> {
        match self {
            AnomalySubject::Period { .. } => None,
            AnomalySubject::Region { region } | AnomalySubject::RegionPeriod { region, .. } => {
                Some(region)
            }
        }
    }

    pub fn period(&self) -> Option<Period> {
        match self {
            AnomalySubject::Period { period } | AnomalySubject::RegionPeriod { period, .. } => {
                Some(*period)
            }
            AnomalySubject::Region { .. } => None,
        }
    }
}

impl fmt::Display for AnomalySubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnomalySubject::Period { period } => write!(f, "all regions @ {}", period),
            AnomalySubject::Region { region } => write!(f, "{}", region),
            AnomalySubject::RegionPeriod { region, period } => write!(f, "{} @ {}", region, period),
        }
    }
}

/// Flag severity: a numeric score, or the marker for a deviation from a
/// zero-variance baseline
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Severity {
    Score(f64),
    UndefinedDeviation,
}

impl Severity {
    pub fn score(&self) -> Option<f64> {
        match self {
            Severity::Score(value) => Some(*value),
            Severity::UndefinedDeviation => None,
        }
    }

    pub fn is_undefined_deviation(&self) -> bool {
        matches!(self, Severity::UndefinedDeviation)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Score(value) => write!(f, "{:.2}", value),
            Severity::UndefinedDeviation => f.write_str("undefined-deviation"),
        }
    }
}

/// Inputs a classifier used to raise a flag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Evidence {
    Outage {
        total: u64,
        previous: Option<u64>,
        next: Option<u64>,
    },
    VelocitySurge {
        current: u64,
        baseline_mean: f64,
        baseline_stddev: f64,
        z_score: Option<f64>,
        window: Vec<Period>,
        excluded_outages: Vec<Period>,
    },
    DivideRatio {
        demographic_updates: u64,
        biometric_updates: u64,
        ratio: f64,
        threshold: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyFlag {
    pub subject: AnomalySubject,
    pub kind: AnomalyKind,
    pub severity: Severity,
    pub evidence: Evidence,
}

impl AnomalyFlag {
    /// Ordering used for reported anomaly lists
    pub fn sort_key(&self) -> (AnomalyKind, &AnomalySubject) {
        (self.kind, &self.subject)
    }
}

/// An evaluation that could not run, reported next to the flags
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedEvaluation {
    pub kind: AnomalyKind,
    pub subject: AnomalySubject,
    pub reason: AnalysisError,
}
