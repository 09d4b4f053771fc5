use super::normalize::{normalize_district, normalize_state};
use crate::data::{Category, CohortCounts, RegionId, TransactionRecord};
use crate::features::PopulationTable;
use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

const DATE_FORMAT: &str = "%d-%m-%Y";

/// Source dataset, recognized by a marker in the file name
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DatasetKind {
    Enrolment,
    Biometric,
    Demographic,
}

impl DatasetKind {
    pub const ALL: [DatasetKind; 3] = [
        DatasetKind::Enrolment,
        DatasetKind::Biometric,
        DatasetKind::Demographic,
    ];

    pub fn file_marker(&self) -> &'static str {
        match self {
            DatasetKind::Enrolment => "api_data_aadhar_enrolment",
            DatasetKind::Biometric => "api_data_aadhar_biometric",
            DatasetKind::Demographic => "api_data_aadhar_demographic",
        }
    }

    pub fn category(&self) -> Category {
        match self {
            DatasetKind::Enrolment => Category::Enrolment,
            DatasetKind::Biometric => Category::BiometricUpdate,
            DatasetKind::Demographic => Category::DemographicUpdate,
        }
    }

    /// Columns feeding (age_0_5, age_5_17, age_18_plus)
    fn cohort_columns(&self) -> [Option<&'static str>; 3] {
        match self {
            DatasetKind::Enrolment => [Some("age_0_5"), Some("age_5_17"), Some("age_18_greater")],
            DatasetKind::Biometric => [None, Some("bio_age_5_17"), Some("bio_age_17_")],
            DatasetKind::Demographic => [None, Some("demo_age_5_17"), Some("demo_age_17_")],
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        if !name.ends_with(".csv") {
            return None;
        }
        Self::ALL
            .into_iter()
            .find(|kind| name.contains(kind.file_marker()))
    }
}

/// Row accounting for one load
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub files: usize,
    pub rows: usize,
    pub records: usize,
    pub bad_dates: usize,
    pub blank_regions: usize,
}

impl IngestStats {
    fn merge(&mut self, other: IngestStats) {
        self.files += other.files;
        self.rows += other.rows;
        self.records += other.records;
        self.bad_dates += other.bad_dates;
        self.blank_regions += other.blank_regions;
    }
}

/// Recursively find dataset files under `dir`, sorted by path
pub fn discover(dir: &Path) -> Result<Vec<(DatasetKind, PathBuf)>> {
    let mut found = Vec::new();

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to walk {}", dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        if let Some(kind) = DatasetKind::from_path(entry.path()) {
            found.push((kind, entry.into_path()));
        }
    }

    debug!("Discovered {} dataset files under {}", found.len(), dir.display());
    Ok(found)
}

/// Parse one dataset from any reader
///
/// Rows with an unparseable date or a blank state/district are dropped and
/// counted. Blank or unparseable counts are zero.
pub fn read_records<R: Read>(
    reader: R,
    kind: DatasetKind,
) -> Result<(Vec<TransactionRecord>, IngestStats)> {
    let mut csv = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = csv.headers().context("Failed to read CSV header")?.clone();
    let column = |name: &str| headers.iter().position(|h| h == name);

    let (date_idx, state_idx, district_idx) =
        match (column("date"), column("state"), column("district")) {
            (Some(d), Some(s), Some(t)) => (d, s, t),
            _ => bail!("CSV header must contain date, state and district columns"),
        };
    let cohort_idx = kind.cohort_columns().map(|name| name.and_then(|n| column(n)));

    let mut records = Vec::new();
    let mut stats = IngestStats::default();

    for (line, row) in csv.records().enumerate() {
        let row = row.with_context(|| format!("Malformed CSV row {}", line + 2))?;
        stats.rows += 1;

        let raw_date = row.get(date_idx).unwrap_or_default();
        let date = match NaiveDate::parse_from_str(raw_date, DATE_FORMAT) {
            Ok(date) => date,
            Err(_) => {
                debug!("Dropping row {}: unparseable date '{}'", line + 2, raw_date);
                stats.bad_dates += 1;
                continue;
            }
        };

        let region = RegionId::new(
            normalize_state(row.get(state_idx).unwrap_or_default()),
            normalize_district(row.get(district_idx).unwrap_or_default()),
        );
        if !region.is_set() {
            debug!("Dropping row {}: blank state or district", line + 2);
            stats.blank_regions += 1;
            continue;
        }

        let count = |idx: Option<usize>| idx.and_then(|i| row.get(i)).map(parse_count).unwrap_or(0);
        let counts = CohortCounts::new(
            count(cohort_idx[0]),
            count(cohort_idx[1]),
            count(cohort_idx[2]),
        );

        records.push(TransactionRecord::new(region, date, kind.category(), counts));
    }

    stats.records = records.len();
    Ok((records, stats))
}

pub fn load_file(path: &Path, kind: DatasetKind) -> Result<(Vec<TransactionRecord>, IngestStats)> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let (records, mut stats) =
        read_records(file, kind).with_context(|| format!("Failed to parse {}", path.display()))?;
    stats.files = 1;
    Ok((records, stats))
}

/// Load every dataset file under `dir`
///
/// Files that fail to parse are skipped with a warning.
pub fn load_directory(dir: &Path) -> Result<(Vec<TransactionRecord>, IngestStats)> {
    let files = discover(dir)?;
    if files.is_empty() {
        bail!("No dataset files found under {}", dir.display());
    }

    let mut records = Vec::new();
    let mut stats = IngestStats::default();

    for (kind, path) in files {
        match load_file(&path, kind) {
            Ok((mut loaded, file_stats)) => {
                debug!("{}: {} records", path.display(), loaded.len());
                records.append(&mut loaded);
                stats.merge(file_stats);
            }
            Err(e) => warn!("Skipping {}: {:#}", path.display(), e),
        }
    }

    info!(
        "Loaded {} records from {} files ({} bad dates, {} blank regions dropped)",
        stats.records, stats.files, stats.bad_dates, stats.blank_regions
    );

    Ok((records, stats))
}

#[derive(Debug, Deserialize)]
struct PopulationRow {
    state: String,
    district: String,
    population: u64,
}

/// Load a `state,district,population` CSV
pub fn load_population(path: &Path) -> Result<PopulationTable> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    let mut table = PopulationTable::new();
    for row in reader.deserialize() {
        let row: PopulationRow =
            row.with_context(|| format!("Malformed population row in {}", path.display()))?;
        let region = RegionId::new(normalize_state(&row.state), normalize_district(&row.district));
        table.insert(&region, row.population);
    }

    info!("Loaded population estimates for {} regions", table.len());
    Ok(table)
}

fn parse_count(raw: &str) -> u64 {
    if raw.is_empty() {
        return 0;
    }
    raw.parse::<u64>()
        .ok()
        .or_else(|| {
            raw.parse::<f64>()
                .ok()
                .filter(|v| v.is_finite() && *v >= 0.0)
                .map(|v| v as u64)
        })
        .unwrap_or(0)
}
