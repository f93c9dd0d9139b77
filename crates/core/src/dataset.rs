//! City records and the sources they are loaded from.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{de, Deserialize, Deserializer, Serialize};
use tracing::{debug, info};

use crate::error::DatasetError;

/// A single entry of the cities dataset.
///
/// Only `name` takes part in the game; the other fields are carried along so
/// front-ends can show them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityRecord {
    /// City name as spelled in the dataset.
    pub name: String,
    /// Number of inhabitants.
    #[serde(default)]
    pub population: u64,
    /// Federal subject (region) the city belongs to.
    #[serde(default)]
    pub subject: String,
    /// Federal district.
    #[serde(default)]
    pub district: String,
    /// Geographic position.
    #[serde(default)]
    pub coords: Coords,
}

impl CityRecord {
    /// Build a record with a name and empty metadata.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            population: 0,
            subject: String::new(),
            district: String::new(),
            coords: Coords::default(),
        }
    }
}

/// Latitude/longitude pair. Datasets in the wild store these either as
/// numbers or as numeric strings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Coords {
    /// Latitude in degrees.
    #[serde(deserialize_with = "deserialize_coordinate")]
    pub lat: f64,
    /// Longitude in degrees.
    #[serde(deserialize_with = "deserialize_coordinate")]
    pub lon: f64,
}

fn deserialize_coordinate<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(value) => Ok(value),
        Raw::Text(text) => text
            .trim()
            .parse::<f64>()
            .map_err(|_| de::Error::custom(format!("invalid coordinate '{text}'"))),
    }
}

/// Anything able to produce the list of city records for a session.
pub trait DatasetSource {
    /// Load every record, in dataset order.
    fn load(&self) -> Result<Vec<CityRecord>, DatasetError>;

    /// Human readable location used in logs and messages.
    fn describe(&self) -> String;
}

/// Reads a JSON array of records from disk.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    /// Source reading the file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the dataset file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DatasetSource for JsonFileSource {
    fn load(&self) -> Result<Vec<CityRecord>, DatasetError> {
        let contents = fs::read_to_string(&self.path).map_err(|source| DatasetError::Read {
            path: self.path.clone(),
            source,
        })?;
        let records = parse_records(&contents, &self.describe())?;
        info!(path = %self.path.display(), total = records.len(), "Dataset loaded");
        Ok(records)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Downloads the dataset over HTTP with the blocking reqwest client.
///
/// Must not be called from inside an async context; front-ends run sessions
/// on a blocking worker.
#[derive(Debug, Clone)]
pub struct HttpSource {
    url: String,
}

impl HttpSource {
    /// Source downloading from `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl DatasetSource for HttpSource {
    fn load(&self) -> Result<Vec<CityRecord>, DatasetError> {
        let fetch_error = |source: reqwest::Error| DatasetError::Fetch {
            url: self.url.clone(),
            source,
        };
        let body = reqwest::blocking::get(&self.url)
            .and_then(|response| response.error_for_status())
            .and_then(|response| response.text())
            .map_err(fetch_error)?;
        let records = parse_records(&body, &self.url)?;
        info!(url = %self.url, total = records.len(), "Dataset downloaded");
        Ok(records)
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

/// Records held in memory, mostly useful for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    records: Vec<CityRecord>,
}

impl StaticSource {
    /// Source serving `records` as given.
    pub fn new(records: Vec<CityRecord>) -> Self {
        Self { records }
    }

    /// Records with the given names and no metadata.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(names.into_iter().map(CityRecord::named).collect())
    }
}

impl DatasetSource for StaticSource {
    fn load(&self) -> Result<Vec<CityRecord>, DatasetError> {
        Ok(self.records.clone())
    }

    fn describe(&self) -> String {
        format!("{} in-memory records", self.records.len())
    }
}

/// Pick a source for a configured location: URLs go over HTTP, anything else
/// is treated as a file path.
pub fn source_for(location: &str) -> Box<dyn DatasetSource + Send> {
    let trimmed = location.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        debug!(url = trimmed, "Using HTTP dataset source");
        Box::new(HttpSource::new(trimmed))
    } else {
        debug!(path = trimmed, "Using file dataset source");
        Box::new(JsonFileSource::new(trimmed))
    }
}

fn parse_records(contents: &str, location: &str) -> Result<Vec<CityRecord>, DatasetError> {
    serde_json::from_str(contents).map_err(|source| DatasetError::Parse {
        location: location.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tempfile::tempdir;

    const SAMPLE: &str = r#"[
        {
            "coords": {"lat": "52.65", "lon": "90.08333"},
            "district": "Сибирский",
            "name": "Абаза",
            "population": 17111,
            "subject": "Хакасия"
        },
        {
            "coords": {"lat": 55.7558, "lon": 37.6173},
            "district": "Центральный",
            "name": "Москва",
            "population": 12655050,
            "subject": "Москва"
        }
    ]"#;

    #[test]
    fn reads_records_with_string_and_numeric_coordinates() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("cities.json");
        fs::write(&path, SAMPLE)?;

        let records = JsonFileSource::new(&path).load()?;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "Абаза");
        assert_eq!(records[0].subject, "Хакасия");
        assert!((records[0].coords.lat - 52.65).abs() < 1e-9);
        assert_eq!(records[1].population, 12_655_050);
        assert!((records[1].coords.lon - 37.6173).abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn metadata_fields_are_optional() -> Result<()> {
        let records = parse_records(r#"[{"name": "Тверь"}]"#, "inline")?;
        assert_eq!(records, vec![CityRecord::named("Тверь")]);
        Ok(())
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = JsonFileSource::new("/definitely/not/here.json")
            .load()
            .unwrap_err();
        assert!(matches!(err, DatasetError::Read { .. }));
    }

    #[test]
    fn malformed_payload_is_a_parse_error() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json")?;

        let err = JsonFileSource::new(&path).load().unwrap_err();
        assert!(matches!(err, DatasetError::Parse { .. }));
        Ok(())
    }

    #[test]
    fn bundled_dataset_parses() -> Result<()> {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../data/cities.json");
        let records = JsonFileSource::new(path).load()?;
        assert!(records.len() > 50);
        assert!(records.iter().all(|record| !record.name.trim().is_empty()));
        assert!(records.iter().any(|record| record.name == "Москва"));
        Ok(())
    }

    #[test]
    fn source_selection_follows_the_scheme() {
        assert!(source_for("https://example.com/cities.json")
            .describe()
            .starts_with("https://"));
        assert_eq!(source_for(" data/cities.json ").describe(), "data/cities.json");
    }
}
