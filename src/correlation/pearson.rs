use crate::error::{AnalysisError, AnalysisResult};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};
use std::collections::BTreeMap;
use std::fmt;

/// Named numeric series. Non-finite values count as missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub name: String,
    pub values: Vec<f64>,
}

impl Series {
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UndefinedReason {
    /// One of the series is constant
    ZeroVariance,
    /// Fewer than two paired samples
    InsufficientSamples,
}

/// Pearson coefficient, or the reason it does not exist
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum Coefficient {
    Defined(f64),
    Undefined(UndefinedReason),
}

impl Coefficient {
    pub fn value(&self) -> Option<f64> {
        match self {
            Coefficient::Defined(r) => Some(*r),
            Coefficient::Undefined(_) => None,
        }
    }

    pub fn is_defined(&self) -> bool {
        matches!(self, Coefficient::Defined(_))
    }
}

impl fmt::Display for Coefficient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Coefficient::Defined(r) => write!(f, "{:.3}", r),
            Coefficient::Undefined(UndefinedReason::ZeroVariance) => {
                f.write_str("undefined (zero variance)")
            }
            Coefficient::Undefined(UndefinedReason::InsufficientSamples) => {
                f.write_str("undefined (insufficient samples)")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationResult {
    pub series_a_name: String,
    pub series_b_name: String,
    pub coefficient: Coefficient,
    pub sample_size: usize,
    /// Two-sided significance under Student's t, when meaningful
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p_value: Option<f64>,
}

impl CorrelationResult {
    pub fn undefined(
        series_a_name: impl Into<String>,
        series_b_name: impl Into<String>,
        reason: UndefinedReason,
        sample_size: usize,
    ) -> Self {
        Self {
            series_a_name: series_a_name.into(),
            series_b_name: series_b_name.into(),
            coefficient: Coefficient::Undefined(reason),
            sample_size,
            p_value: None,
        }
    }
}

/// Pair two keyed series on their shared keys, in key order
pub fn align<K: Ord>(a: &BTreeMap<K, f64>, b: &BTreeMap<K, f64>) -> (Vec<f64>, Vec<f64>) {
    a.iter()
        .filter_map(|(key, &x)| b.get(key).map(|&y| (x, y)))
        .unzip()
}

/// Pearson correlation of two equal-length series
///
/// Pairs where either value is missing are dropped. Fails when fewer than
/// two pairs remain. A constant series yields `Undefined(ZeroVariance)`.
pub fn correlate(a: &Series, b: &Series) -> AnalysisResult<CorrelationResult> {
    if a.values.len() != b.values.len() {
        return Err(AnalysisError::SeriesLengthMismatch {
            series_a: a.name.clone(),
            len_a: a.values.len(),
            series_b: b.name.clone(),
            len_b: b.values.len(),
        });
    }

    let pairs: Vec<(f64, f64)> = a
        .values
        .iter()
        .zip(&b.values)
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .map(|(&x, &y)| (x, y))
        .collect();

    let n = pairs.len();
    if n < 2 {
        return Err(AnalysisError::SampleSize {
            series_a: a.name.clone(),
            series_b: b.name.clone(),
            paired: n,
        });
    }

    let mean_a = pairs.iter().map(|(x, _)| x).sum::<f64>() / n as f64;
    let mean_b = pairs.iter().map(|(_, y)| y).sum::<f64>() / n as f64;

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (x, y) in &pairs {
        let dx = x - mean_a;
        let dy = y - mean_b;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    if sxx == 0.0 || syy == 0.0 {
        return Ok(CorrelationResult::undefined(
            a.name.clone(),
            b.name.clone(),
            UndefinedReason::ZeroVariance,
            n,
        ));
    }

    let r = (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0);

    Ok(CorrelationResult {
        series_a_name: a.name.clone(),
        series_b_name: b.name.clone(),
        coefficient: Coefficient::Defined(r),
        sample_size: n,
        p_value: p_value(r, n),
    })
}

/// Two-sided p-value for H0: r = 0, with n - 2 degrees of freedom
fn p_value(r: f64, n: usize) -> Option<f64> {
    if n <= 2 || r.abs() >= 1.0 {
        return None;
    }

    let df = (n - 2) as f64;
    let t = r * (df / (1.0 - r * r)).sqrt();
    let dist = StudentsT::new(0.0, 1.0, df).ok()?;
    Some(2.0 * (1.0 - dist.cdf(t.abs())))
}
