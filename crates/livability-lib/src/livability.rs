//! Livability index computation.
//!
//! Each metric column is min-max scaled across all zones to `[1, 10]`, the
//! scaled columns are combined with per-metric weights, and the composite is
//! scaled to `[1, 10]` once more before rounding to an integer index.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::zones::{Metric, ZoneTable, METRIC_COUNT};

/// Lower bound of the normalized scale.
pub const INDEX_MIN: f64 = 1.0;
/// Upper bound of the normalized scale.
pub const INDEX_MAX: f64 = 10.0;
/// Value assigned when every zone shares the same raw value.
pub const INDEX_MIDPOINT: f64 = (INDEX_MIN + INDEX_MAX) / 2.0;

const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Per-metric weights. Always sum to 1.0 once constructed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LivabilityWeights {
    values: [f64; METRIC_COUNT],
}

impl Default for LivabilityWeights {
    fn default() -> Self {
        Self {
            values: [0.125, 0.1875, 0.125, 0.125, 0.125, 0.1875, 0.125],
        }
    }
}

impl LivabilityWeights {
    /// Weights in [`Metric::ALL`] order.
    pub fn new(values: [f64; METRIC_COUNT]) -> Result<Self> {
        for (metric, value) in Metric::ALL.into_iter().zip(values) {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::weight_mismatch(format!(
                    "weight for {} must be a finite non-negative number, got {value}",
                    metric.key()
                )));
            }
        }

        let sum: f64 = values.iter().sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(Error::weight_mismatch(format!(
                "weights must sum to 1.0, got {sum}"
            )));
        }

        Ok(Self { values })
    }

    /// Build weights from a metric-name map. Every metric must appear exactly
    /// once and no other keys are allowed.
    pub fn from_map(map: &BTreeMap<String, f64>) -> Result<Self> {
        let mut values = [None; METRIC_COUNT];
        for (name, &weight) in map {
            let metric = Metric::from_name(name)
                .ok_or_else(|| Error::weight_mismatch(format!("unknown metric '{name}'")))?;
            if values[metric.index()].replace(weight).is_some() {
                return Err(Error::weight_mismatch(format!(
                    "metric {} given more than once",
                    metric.key()
                )));
            }
        }

        let missing: Vec<&str> = Metric::ALL
            .into_iter()
            .filter(|metric| values[metric.index()].is_none())
            .map(Metric::key)
            .collect();
        if !missing.is_empty() {
            return Err(Error::weight_mismatch(format!(
                "missing weights for: {}",
                missing.join(", ")
            )));
        }

        Self::new(values.map(|value| value.unwrap_or_default()))
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let map: BTreeMap<String, f64> = serde_json::from_str(json)?;
        Self::from_map(&map)
    }

    pub fn from_json_path(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn weight(&self, metric: Metric) -> f64 {
        self.values[metric.index()]
    }

    pub fn values(&self) -> &[f64; METRIC_COUNT] {
        &self.values
    }

    pub fn to_map(&self) -> BTreeMap<String, f64> {
        Metric::ALL
            .into_iter()
            .map(|metric| (metric.key().to_string(), self.weight(metric)))
            .collect()
    }
}

impl Serialize for LivabilityWeights {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.to_map().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for LivabilityWeights {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let map = BTreeMap::<String, f64>::deserialize(deserializer)?;
        Self::from_map(&map).map_err(serde::de::Error::custom)
    }
}

/// Score breakdown for one zone.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZoneScore {
    pub name: String,
    /// Per-metric values scaled to `[1, 10]`, in [`Metric::ALL`] order.
    pub normalized: [f64; METRIC_COUNT],
    /// Weighted sum of `normalized`.
    pub composite: f64,
    /// Final integer index in `1..=10`.
    pub index: u8,
}

/// Livability index for every zone of a region.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LivabilityIndex {
    scores: BTreeMap<String, ZoneScore>,
}

impl LivabilityIndex {
    pub fn get(&self, name: &str) -> Option<u8> {
        self.scores.get(name).map(|score| score.index)
    }

    pub fn score(&self, name: &str) -> Option<&ZoneScore> {
        self.scores.get(name)
    }

    /// Scores in zone-name order.
    pub fn iter(&self) -> impl Iterator<Item = &ZoneScore> {
        self.scores.values()
    }

    /// Scores ordered by composite (highest first), then by name.
    pub fn ranked(&self) -> Vec<&ZoneScore> {
        let mut scores: Vec<&ZoneScore> = self.scores.values().collect();
        scores.sort_by(|a, b| {
            b.composite
                .total_cmp(&a.composite)
                .then_with(|| a.name.cmp(&b.name))
        });
        scores
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

/// Compute the livability index for every zone in `zones`.
pub fn compute_index(zones: &ZoneTable, weights: &LivabilityWeights) -> Result<LivabilityIndex> {
    let rows: Vec<_> = zones.features().collect();
    if rows.is_empty() {
        return Ok(LivabilityIndex::default());
    }

    let mut normalized = vec![[0.0; METRIC_COUNT]; rows.len()];
    for metric in Metric::ALL {
        let column: Vec<f64> = rows.iter().map(|row| row.metric(metric)).collect();
        for (row, value) in normalized.iter_mut().zip(min_max_scale(&column)) {
            row[metric.index()] = value;
        }
    }

    let composites: Vec<f64> = normalized
        .iter()
        .map(|row| {
            Metric::ALL
                .into_iter()
                .map(|metric| row[metric.index()] * weights.weight(metric))
                .sum()
        })
        .collect();

    let scaled = min_max_scale(&composites);

    let mut scores = BTreeMap::new();
    for (((row, normalized), composite), scaled) in
        rows.iter().zip(normalized).zip(&composites).zip(scaled)
    {
        if !composite.is_finite() || !scaled.is_finite() {
            return Err(Error::ComputationFailure {
                message: format!("non-finite livability composite for zone '{}'", row.name),
            });
        }
        let index = scaled.round_ties_even().clamp(INDEX_MIN, INDEX_MAX) as u8;
        scores.insert(
            row.name.clone(),
            ZoneScore {
                name: row.name.clone(),
                normalized,
                composite: *composite,
                index,
            },
        );
    }

    debug!(zones = scores.len(), "computed livability index");
    Ok(LivabilityIndex { scores })
}

/// Min-max scale `values` to `[INDEX_MIN, INDEX_MAX]`.
fn min_max_scale(values: &[f64]) -> Vec<f64> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;

    if range.is_nan() || range <= 0.0 {
        return vec![INDEX_MIDPOINT; values.len()];
    }

    values
        .iter()
        .map(|value| INDEX_MIN + (value - min) / range * (INDEX_MAX - INDEX_MIN))
        .collect()
}
