use crate::data::RegionId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Externally supplied population estimates, matched case-insensitively
/// on "state/district"
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, u64>", into = "BTreeMap<String, u64>")]
pub struct PopulationTable {
    estimates: BTreeMap<String, u64>,
}

impl PopulationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, region: &RegionId, population: u64) {
        self.estimates.insert(region.lookup_key(), population);
    }

    pub fn get(&self, region: &RegionId) -> Option<u64> {
        self.estimates.get(&region.lookup_key()).copied()
    }

    pub fn len(&self) -> usize {
        self.estimates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.estimates.is_empty()
    }

    /// Merge another table in; entries in `other` win
    pub fn extend(&mut self, other: PopulationTable) {
        self.estimates.extend(other.estimates);
    }
}

impl From<BTreeMap<String, u64>> for PopulationTable {
    fn from(raw: BTreeMap<String, u64>) -> Self {
        let estimates = raw
            .into_iter()
            .map(|(key, value)| (normalize_key(&key), value))
            .collect();
        Self { estimates }
    }
}

impl From<PopulationTable> for BTreeMap<String, u64> {
    fn from(table: PopulationTable) -> Self {
        table.estimates
    }
}

impl FromIterator<(RegionId, u64)> for PopulationTable {
    fn from_iter<I: IntoIterator<Item = (RegionId, u64)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (region, population) in iter {
            table.insert(&region, population);
        }
        table
    }
}

fn normalize_key(key: &str) -> String {
    match key.split_once('/') {
        Some((state, district)) => format!("{}/{}", state.trim(), district.trim()).to_lowercase(),
        None => key.trim().to_lowercase(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let mut raw = BTreeMap::new();
        raw.insert("Bihar / SITAMARHI".to_string(), 3_423_574);
        let table = PopulationTable::from(raw);

        assert_eq!(table.get(&RegionId::new("Bihar", "Sitamarhi")), Some(3_423_574));
        assert_eq!(table.get(&RegionId::new("Bihar", "Araria")), None);
    }

    #[test]
    fn test_deserialize_from_toml_table() {
        let table: PopulationTable = toml::from_str("\"Assam/Dhubri\" = 1949258").unwrap();
        assert_eq!(table.get(&RegionId::new("Assam", "Dhubri")), Some(1_949_258));
    }
}
