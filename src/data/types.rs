use chrono::{Datelike, Days, Duration, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Geographic reporting unit: a (state, district) pair
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RegionId {
    pub state: String,
    pub district: String,
}

impl RegionId {
    pub fn new(state: impl Into<String>, district: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            district: district.into(),
        }
    }

    /// Both halves must be non-blank for the region to be usable
    pub fn is_set(&self) -> bool {
        !self.state.trim().is_empty() && !self.district.trim().is_empty()
    }

    /// Lookup key used by population tables ("state/district", lowercase)
    pub fn lookup_key(&self) -> String {
        format!("{}/{}", self.state, self.district).to_lowercase()
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.state, self.district)
    }
}

/// Transaction category
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Enrolment,
    BiometricUpdate,
    DemographicUpdate,
}

impl Category {
    pub const ALL: [Category; 3] = [
        Category::Enrolment,
        Category::BiometricUpdate,
        Category::DemographicUpdate,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Category::Enrolment => "enrolment",
            Category::BiometricUpdate => "biometric_update",
            Category::DemographicUpdate => "demographic_update",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Age bracket used to sub-divide counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cohort {
    #[serde(rename = "age_0_5")]
    Age0To5,
    #[serde(rename = "age_5_17")]
    Age5To17,
    #[serde(rename = "age_18_plus")]
    Age18Plus,
}

impl Cohort {
    pub const ALL: [Cohort; 3] = [Cohort::Age0To5, Cohort::Age5To17, Cohort::Age18Plus];
}

/// Per-cohort tallies. Absent cohorts are zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CohortCounts {
    #[serde(default)]
    pub age_0_5: u64,
    #[serde(default)]
    pub age_5_17: u64,
    #[serde(default)]
    pub age_18_plus: u64,
}

impl CohortCounts {
    pub fn new(age_0_5: u64, age_5_17: u64, age_18_plus: u64) -> Self {
        Self {
            age_0_5,
            age_5_17,
            age_18_plus,
        }
    }

    /// Counts with a single cohort populated
    pub fn only(cohort: Cohort, count: u64) -> Self {
        let mut counts = Self::default();
        counts.add(cohort, count);
        counts
    }

    pub fn get(&self, cohort: Cohort) -> u64 {
        match cohort {
            Cohort::Age0To5 => self.age_0_5,
            Cohort::Age5To17 => self.age_5_17,
            Cohort::Age18Plus => self.age_18_plus,
        }
    }

    pub fn add(&mut self, cohort: Cohort, count: u64) {
        match cohort {
            Cohort::Age0To5 => self.age_0_5 += count,
            Cohort::Age5To17 => self.age_5_17 += count,
            Cohort::Age18Plus => self.age_18_plus += count,
        }
    }

    pub fn merge(&mut self, other: &CohortCounts) {
        self.age_0_5 += other.age_0_5;
        self.age_5_17 += other.age_5_17;
        self.age_18_plus += other.age_18_plus;
    }

    pub fn total(&self) -> u64 {
        self.age_0_5 + self.age_5_17 + self.age_18_plus
    }

    pub fn is_zero(&self) -> bool {
        self.total() == 0
    }
}

/// Calendar bucket size for periods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Day,
    Week,
    #[default]
    Month,
}

impl Granularity {
    /// Period containing `date`
    pub fn period_of(&self, date: NaiveDate) -> Period {
        let start = match self {
            Granularity::Day => date,
            Granularity::Week => {
                date - Duration::days(date.weekday().num_days_from_monday() as i64)
            }
            Granularity::Month => date.with_day(1).unwrap_or(date),
        };
        Period(start)
    }

    /// Period immediately after `period`
    pub fn next(&self, period: Period) -> Period {
        let start = match self {
            Granularity::Day => period.0.checked_add_days(Days::new(1)).unwrap_or(NaiveDate::MAX),
            Granularity::Week => period.0.checked_add_days(Days::new(7)).unwrap_or(NaiveDate::MAX),
            Granularity::Month => period
                .0
                .checked_add_months(Months::new(1))
                .unwrap_or(NaiveDate::MAX),
        };
        Period(start)
    }
}

/// Start date of a calendar bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Period(pub NaiveDate);

impl Period {
    /// First day of the given month; None for an invalid month
    pub fn month(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(Period)
    }

    pub fn start(&self) -> NaiveDate {
        self.0
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}
