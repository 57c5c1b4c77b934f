//! Conflict dataset store.
//!
//! Holds the historical conflict records loaded once at startup. The dataset
//! is sorted by start year at construction and never mutated afterwards;
//! views and the narrative share it through an `Rc`.

pub mod format;
pub mod loader;
pub mod queries;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use format::{format_number, format_year_range};
pub use loader::{DataSource, LoadError};

/// Category of a conflict.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ConflictType {
    Interstate,
    CivilWar,
    Colonial,
    Other(String),
}

impl ConflictType {
    /// The three categories every chart legend shows, in legend order.
    pub fn canonical() -> [ConflictType; 3] {
        [ConflictType::Interstate, ConflictType::CivilWar, ConflictType::Colonial]
    }

    /// Display name, identical to the dataset spelling.
    pub fn name(&self) -> &str {
        match self {
            ConflictType::Interstate => "Interstate",
            ConflictType::CivilWar => "Civil War",
            ConflictType::Colonial => "Colonial",
            ConflictType::Other(name) => name,
        }
    }

    /// Legend color as RGB.
    pub fn color(&self) -> (u8, u8, u8) {
        match self {
            ConflictType::Interstate => (0xe7, 0x4c, 0x3c),
            ConflictType::CivilWar => (0xf3, 0x9c, 0x12),
            ConflictType::Colonial => (0x9b, 0x59, 0xb6),
            ConflictType::Other(_) => (0x95, 0xa5, 0xa6),
        }
    }
}

impl From<String> for ConflictType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Interstate" => ConflictType::Interstate,
            "Civil War" => ConflictType::CivilWar,
            "Colonial" => ConflictType::Colonial,
            _ => ConflictType::Other(value),
        }
    }
}

impl From<&str> for ConflictType {
    fn from(value: &str) -> Self {
        ConflictType::from(value.to_string())
    }
}

impl From<ConflictType> for String {
    fn from(value: ConflictType) -> Self {
        value.name().to_string()
    }
}

impl fmt::Display for ConflictType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One historical conflict.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConflictRecord {
    /// Unique name, used as the selection key across views
    #[serde(rename = "conflict_name")]
    pub name: String,
    pub start_year: i32,
    pub end_year: i32,
    pub total_deaths: u64,
    pub military_deaths: u64,
    pub civilian_deaths: u64,
    pub conflict_type: ConflictType,
    pub geographic_region: String,
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
    /// Share of deaths that were military (derived at load)
    #[serde(skip)]
    pub military_pct: f64,
    /// Share of deaths that were civilian (derived at load)
    #[serde(skip)]
    pub civilian_pct: f64,
}

impl ConflictRecord {
    /// Build a record and compute its derived shares.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        start_year: i32,
        end_year: i32,
        total_deaths: u64,
        military_deaths: u64,
        civilian_deaths: u64,
        conflict_type: ConflictType,
        geographic_region: impl Into<String>,
    ) -> Self {
        let mut record = Self {
            name: name.into(),
            start_year,
            end_year,
            total_deaths,
            military_deaths,
            civilian_deaths,
            conflict_type,
            geographic_region: geographic_region.into(),
            latitude: 0.0,
            longitude: 0.0,
            military_pct: 0.0,
            civilian_pct: 0.0,
        };
        record.compute_shares();
        record
    }

    /// Place the record on the map.
    pub fn at(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = latitude;
        self.longitude = longitude;
        self
    }

    /// Fill `military_pct` / `civilian_pct`. A conflict with no recorded
    /// deaths gets 0.0 for both.
    pub fn compute_shares(&mut self) {
        if self.total_deaths == 0 {
            self.military_pct = 0.0;
            self.civilian_pct = 0.0;
        } else {
            let total = self.total_deaths as f64;
            self.military_pct = self.military_deaths as f64 / total;
            self.civilian_pct = self.civilian_deaths as f64 / total;
        }
    }

    /// Midpoint of the conflict in years.
    pub fn midpoint_year(&self) -> f64 {
        (self.start_year + self.end_year) as f64 / 2.0
    }

    /// Number of calendar years the conflict touches (inclusive).
    pub fn duration_years(&self) -> i32 {
        (self.end_year - self.start_year + 1).max(1)
    }

    /// Whether the conflict overlaps `[start, end]` at all.
    pub fn overlaps(&self, start: i32, end: i32) -> bool {
        self.start_year <= end && self.end_year >= start
    }

    /// Whether the conflict was active during `year`.
    pub fn active_in(&self, year: i32) -> bool {
        self.overlaps(year, year)
    }
}

/// The loaded dataset, sorted ascending by start year.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Dataset {
    records: Vec<ConflictRecord>,
}

impl Dataset {
    /// Sort (stable, by start year) and derive shares.
    pub fn from_records(mut records: Vec<ConflictRecord>) -> Self {
        records.sort_by_key(|r| r.start_year);
        for record in &mut records {
            record.compute_shares();
        }
        Self { records }
    }

    /// Parse the JSON array format used by the dataset file.
    pub fn from_json_str(json: &str) -> Result<Self, LoadError> {
        let records: Vec<ConflictRecord> = serde_json::from_str(json)?;
        if records.is_empty() {
            return Err(LoadError::Empty);
        }
        if let Some(r) = records.iter().find(|r| r.start_year > r.end_year) {
            return Err(LoadError::InvalidRecord { name: r.name.clone(), start: r.start_year, end: r.end_year });
        }
        Ok(Self::from_records(records))
    }

    /// Load from a file path or URL.
    pub fn load(source: &DataSource) -> Result<Self, LoadError> {
        loader::load_dataset(source)
    }

    pub fn records(&self) -> &[ConflictRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConflictRecord> {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sorts_and_derives_shares() {
        let json = r#"[
            {"conflict_name": "B", "start_year": 1939, "end_year": 1945,
             "total_deaths": 5000, "military_deaths": 1000, "civilian_deaths": 4000,
             "conflict_type": "Interstate", "geographic_region": "Europe",
             "latitude": 50.0, "longitude": 10.0},
            {"conflict_name": "A", "start_year": 1900, "end_year": 1918,
             "total_deaths": 1000, "military_deaths": 600, "civilian_deaths": 400,
             "conflict_type": "Civil War", "geographic_region": "Asia",
             "latitude": 30.0, "longitude": 100.0}
        ]"#;
        let dataset = Dataset::from_json_str(json).unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.records()[0].name, "A");
        assert_eq!(dataset.records()[0].conflict_type, ConflictType::CivilWar);
        assert!((dataset.records()[1].civilian_pct - 0.8).abs() < 1e-9);
        assert_eq!(dataset.records()[1].name, "B");
    }

    #[test]
    fn test_unknown_type_is_kept() {
        let t = ConflictType::from("Revolution");
        assert_eq!(t, ConflictType::Other("Revolution".to_string()));
        assert_eq!(t.name(), "Revolution");
        assert_eq!(t.color(), (0x95, 0xa5, 0xa6));
    }

    #[test]
    fn test_zero_deaths_has_zero_shares() {
        let r = ConflictRecord::new("Quiet", 1800, 1801, 0, 0, 0, ConflictType::Colonial, "Africa");
        assert_eq!(r.military_pct, 0.0);
        assert_eq!(r.civilian_pct, 0.0);
    }

    #[test]
    fn test_overlap_not_containment() {
        let r = ConflictRecord::new("WW2", 1939, 1945, 1, 1, 0, ConflictType::Interstate, "Europe");
        assert!(r.overlaps(1940, 1942));
        assert!(r.overlaps(1945, 1960));
        assert!(!r.overlaps(1946, 1960));
        assert_eq!(r.duration_years(), 7);
        assert_eq!(r.midpoint_year(), 1942.0);
    }

    #[test]
    fn test_empty_array_is_error() {
        assert!(matches!(Dataset::from_json_str("[]"), Err(LoadError::Empty)));
    }
}
