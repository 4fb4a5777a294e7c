//! Administrative zones and their raw feature metrics.
//!
//! A zone has a unique name, seven raw metrics (densities per km² or
//! accessibility counts) and a representative centroid. Unknown metrics are
//! stored as `0.0`, matching how the data collector fills gaps.

use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, Trim};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::geodesy::Coordinate;

/// Number of raw metrics tracked per zone.
pub const METRIC_COUNT: usize = 7;

/// Raw feature metric, in the fixed column order used by every table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    RoadDensity,
    TransitDensity,
    HealthcareAccessibility,
    EducationAccessibility,
    EmergencyServicesDensity,
    RetailDensity,
    EmploymentCentersDensity,
}

impl Metric {
    pub const ALL: [Metric; METRIC_COUNT] = [
        Metric::RoadDensity,
        Metric::TransitDensity,
        Metric::HealthcareAccessibility,
        Metric::EducationAccessibility,
        Metric::EmergencyServicesDensity,
        Metric::RetailDensity,
        Metric::EmploymentCentersDensity,
    ];

    /// snake_case key, also the SQLite column name.
    pub fn key(self) -> &'static str {
        match self {
            Metric::RoadDensity => "road_density",
            Metric::TransitDensity => "transit_density",
            Metric::HealthcareAccessibility => "healthcare_accessibility",
            Metric::EducationAccessibility => "education_accessibility",
            Metric::EmergencyServicesDensity => "emergency_services_density",
            Metric::RetailDensity => "retail_density",
            Metric::EmploymentCentersDensity => "employment_centers_density",
        }
    }

    /// Column header used by the feature CSV export.
    pub fn label(self) -> &'static str {
        match self {
            Metric::RoadDensity => "Road Density",
            Metric::TransitDensity => "Public Transport Density",
            Metric::HealthcareAccessibility => "Healthcare Accessibility",
            Metric::EducationAccessibility => "Education Accessibility",
            Metric::EmergencyServicesDensity => "Emergency Services Density",
            Metric::RetailDensity => "Retail Density",
            Metric::EmploymentCentersDensity => "Employment Centers Density",
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// Resolve a metric from its key or its CSV label (case, spacing and
    /// punctuation are ignored).
    pub fn from_name(name: &str) -> Option<Metric> {
        let wanted = normalize_header(name);
        Metric::ALL.into_iter().find(|metric| {
            normalize_header(metric.key()) == wanted || normalize_header(metric.label()) == wanted
        })
    }
}

/// Raw metrics for a single zone.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneFeatures {
    pub name: String,
    metrics: [f64; METRIC_COUNT],
}

impl ZoneFeatures {
    /// Build a feature row. `None` and NaN are the "unknown" sentinel and
    /// become `0.0`; negative or infinite values are rejected.
    pub fn new(name: impl Into<String>, values: [Option<f64>; METRIC_COUNT]) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Error::invalid_dataset("zone name cannot be empty"));
        }

        let mut metrics = [0.0; METRIC_COUNT];
        for (metric, value) in Metric::ALL.into_iter().zip(values) {
            let value = match value {
                None => 0.0,
                Some(v) if v.is_nan() => 0.0,
                Some(v) if v.is_infinite() || v < 0.0 => {
                    return Err(Error::invalid_dataset(format!(
                        "zone '{name}' has invalid {} value {v}",
                        metric.key()
                    )));
                }
                Some(v) => v,
            };
            metrics[metric.index()] = value;
        }

        Ok(Self { name, metrics })
    }

    /// Convenience constructor for fully-known rows.
    pub fn from_values(name: impl Into<String>, values: [f64; METRIC_COUNT]) -> Result<Self> {
        Self::new(name, values.map(Some))
    }

    pub fn metric(&self, metric: Metric) -> f64 {
        self.metrics[metric.index()]
    }

    pub fn values(&self) -> &[f64; METRIC_COUNT] {
        &self.metrics
    }
}

/// Feature rows keyed by zone name, plus the centroid of each zone.
#[derive(Debug, Clone, Default)]
pub struct ZoneTable {
    zones: BTreeMap<String, ZoneFeatures>,
    centroids: BTreeMap<String, Coordinate>,
}

impl ZoneTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a zone. Names must be unique.
    pub fn insert(&mut self, features: ZoneFeatures, centroid: Option<Coordinate>) -> Result<()> {
        if self.zones.contains_key(&features.name) {
            return Err(Error::invalid_dataset(format!(
                "duplicate zone name '{}'",
                features.name
            )));
        }
        if let Some(centroid) = centroid {
            self.centroids.insert(features.name.clone(), centroid);
        }
        self.zones.insert(features.name.clone(), features);
        Ok(())
    }

    /// Iterate over zones in name order.
    pub fn features(&self) -> impl Iterator<Item = &ZoneFeatures> {
        self.zones.values()
    }

    pub fn get(&self, name: &str) -> Option<&ZoneFeatures> {
        self.zones.get(name)
    }

    pub fn centroid(&self, name: &str) -> Option<Coordinate> {
        self.centroids.get(name).copied()
    }

    pub fn centroids(&self) -> &BTreeMap<String, Coordinate> {
        &self.centroids
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    /// Replace every feature row with those of `other`, keeping the centroids
    /// already known for this table. Zones without a centroid stay in the
    /// livability table but cannot be ranked against a destination.
    pub fn with_features_from(mut self, other: ZoneTable) -> Self {
        for name in other.zones.keys() {
            if !self.centroids.contains_key(name) {
                warn!(zone = %name, "replacement feature row has no known centroid");
            }
        }
        self.zones = other.zones;
        for (name, centroid) in other.centroids {
            self.centroids.insert(name, centroid);
        }
        self
    }

    /// Load feature rows from a CSV file.
    pub fn from_csv_path(path: &Path) -> Result<Self> {
        let file = fs::File::open(path).map_err(|err| Error::DataUnavailable {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;
        Self::from_csv_reader(file)
    }

    /// Load feature rows from CSV with a `Place` column followed by the seven
    /// metric columns (labels or snake_case keys). Empty cells are unknown.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = ReaderBuilder::new().trim(Trim::Fields).from_reader(reader);
        let headers = csv_reader.headers()?.clone();

        let name_column = headers
            .iter()
            .position(|h| matches!(normalize_header(h).as_str(), "place" | "zone" | "name"))
            .ok_or_else(|| Error::invalid_dataset("feature CSV is missing a 'Place' column"))?;

        let mut columns = [None; METRIC_COUNT];
        for (i, header) in headers.iter().enumerate() {
            if let Some(metric) = Metric::from_name(header) {
                columns[metric.index()] = Some(i);
            }
        }
        let missing: Vec<&str> = Metric::ALL
            .into_iter()
            .filter(|m| columns[m.index()].is_none())
            .map(Metric::label)
            .collect();
        if !missing.is_empty() {
            return Err(Error::invalid_dataset(format!(
                "feature CSV missing required columns: {}",
                missing.join(", ")
            )));
        }

        let mut table = ZoneTable::new();
        for (line, record) in csv_reader.records().enumerate() {
            let record = record?;
            let name = record.get(name_column).unwrap_or_default().to_string();

            let mut values = [None; METRIC_COUNT];
            for metric in Metric::ALL {
                let cell = columns[metric.index()]
                    .and_then(|i| record.get(i))
                    .unwrap_or_default();
                values[metric.index()] = parse_cell(cell).map_err(|message| {
                    Error::invalid_dataset(format!(
                        "row {} column '{}': {message}",
                        line + 2,
                        metric.label()
                    ))
                })?;
            }

            table.insert(ZoneFeatures::new(name, values)?, None)?;
        }

        debug!(zones = table.len(), "loaded zone features from CSV");
        Ok(table)
    }
}

fn parse_cell(cell: &str) -> std::result::Result<Option<f64>, String> {
    if cell.is_empty() || cell.eq_ignore_ascii_case("nan") || cell.eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    cell.parse::<f64>()
        .map(Some)
        .map_err(|err| format!("'{cell}' is not a number ({err})"))
}

fn normalize_header(s: &str) -> String {
    s.to_ascii_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_CSV: &str = "\
Place,Road Density,Public Transport Density,Healthcare Accessibility,Education Accessibility,Emergency Services Density,Retail Density,Employment Centers Density
1er arrondissement,12.5,0.4,3.1,5.0,0.2,8.0,1.5
2ème arrondissement,9.0,,2.0,4.0,0.1,6.5,0.5
";

    #[test]
    fn csv_loads_with_missing_cells_as_zero() {
        let table = ZoneTable::from_csv_reader(SAMPLE_CSV.as_bytes()).unwrap();
        assert_eq!(table.len(), 2);
        let second = table.get("2ème arrondissement").unwrap();
        assert_eq!(second.metric(Metric::TransitDensity), 0.0);
        assert_eq!(second.metric(Metric::RetailDensity), 6.5);
    }

    #[test]
    fn csv_accepts_snake_case_headers_in_any_order() {
        let csv = "\
zone,retail_density,road_density,transit_density,healthcare_accessibility,education_accessibility,emergency_services_density,employment_centers_density
A,1,2,3,4,5,6,7
";
        let table = ZoneTable::from_csv_reader(csv.as_bytes()).unwrap();
        let a = table.get("A").unwrap();
        assert_eq!(a.metric(Metric::RetailDensity), 1.0);
        assert_eq!(a.metric(Metric::RoadDensity), 2.0);
        assert_eq!(a.metric(Metric::EmploymentCentersDensity), 7.0);
    }

    #[test]
    fn csv_missing_column_is_reported() {
        let csv = "Place,Road Density\nA,1\n";
        let err = ZoneTable::from_csv_reader(csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("Retail Density"));
    }

    #[test]
    fn csv_duplicate_zone_is_rejected() {
        let csv = "\
Place,Road Density,Public Transport Density,Healthcare Accessibility,Education Accessibility,Emergency Services Density,Retail Density,Employment Centers Density
A,1,1,1,1,1,1,1
A,2,2,2,2,2,2,2
";
        let err = ZoneTable::from_csv_reader(csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("duplicate zone name 'A'"));
    }

    #[test]
    fn negative_metric_is_rejected() {
        let err = ZoneFeatures::new("A", [Some(-1.0), None, None, None, None, None, None])
            .unwrap_err();
        assert!(err.to_string().contains("road_density"));
    }

    #[test]
    fn nan_metric_is_unknown() {
        let zone =
            ZoneFeatures::new("A", [Some(f64::NAN), None, None, None, None, None, None]).unwrap();
        assert_eq!(zone.metric(Metric::RoadDensity), 0.0);
    }

    #[test]
    fn metric_names_resolve() {
        assert_eq!(
            Metric::from_name("Public Transport Density"),
            Some(Metric::TransitDensity)
        );
        assert_eq!(
            Metric::from_name("employment_centers_density"),
            Some(Metric::EmploymentCentersDensity)
        );
        assert_eq!(Metric::from_name("parks"), None);
    }

    #[test]
    fn replacing_features_keeps_centroids() {
        let mut stored = ZoneTable::new();
        stored
            .insert(
                ZoneFeatures::from_values("A", [1.0; METRIC_COUNT]).unwrap(),
                Some(Coordinate::new(6.37, 2.40)),
            )
            .unwrap();
        let replacement = ZoneTable::from_csv_reader(
            "Place,Road Density,Public Transport Density,Healthcare Accessibility,Education Accessibility,Emergency Services Density,Retail Density,Employment Centers Density\nA,9,9,9,9,9,9,9\n"
                .as_bytes(),
        )
        .unwrap();

        let merged = stored.with_features_from(replacement);
        assert_eq!(merged.get("A").unwrap().metric(Metric::RoadDensity), 9.0);
        assert_eq!(merged.centroid("A"), Some(Coordinate::new(6.37, 2.40)));
    }
}
