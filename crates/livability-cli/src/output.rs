//! Text and JSON renderers for CLI results.

use std::io::{self, Write};

use clap::ValueEnum;
use serde::Serialize;

use livability_lib::{LivabilityIndex, PathResult, PlaceRoute};

/// Output format for commands that support more than plain text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// One place in the JSON output of `places`.
#[derive(Debug, Clone, Serialize)]
pub struct PlaceRow {
    pub place: String,
    pub living_index: u8,
    pub distance: f64,
    pub score: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub route_length_m: Option<f64>,
    pub optimal_path: Option<Vec<[f64; 2]>>,
}

impl From<&PlaceRoute> for PlaceRow {
    fn from(entry: &PlaceRoute) -> Self {
        let length = entry
            .route
            .as_deref()
            .and_then(PathResult::route)
            .map(|route| route.length_m);
        Self {
            place: entry.place.place.clone(),
            living_index: entry.place.living_index,
            distance: entry.place.distance_km,
            score: entry.place.score,
            latitude: entry.place.centroid.lat,
            longitude: entry.place.centroid.lng,
            route_length_m: length,
            optimal_path: entry.optimal_path(),
        }
    }
}

/// Table of zones ordered by composite score.
pub fn render_index<W: Write>(out: &mut W, index: &LivabilityIndex) -> io::Result<()> {
    let width = index
        .iter()
        .map(|score| score.name.chars().count())
        .max()
        .unwrap_or(0)
        .max("Zone".len());

    writeln!(out, "{:<width$}  {:>9}  {:>5}", "Zone", "Composite", "Index")?;
    for score in index.ranked() {
        writeln!(
            out,
            "{:<width$}  {:>9.3}  {:>5}",
            score.name, score.composite, score.index
        )?;
    }
    Ok(())
}

pub fn render_places_text<W: Write>(out: &mut W, places: &[PlaceRoute]) -> io::Result<()> {
    if places.is_empty() {
        writeln!(out, "No places could be ranked for this destination.")?;
        return Ok(());
    }

    for (position, entry) in places.iter().enumerate() {
        let place = &entry.place;
        writeln!(
            out,
            "{}. {} (index {}, {:.3} km, score {:.3})",
            position + 1,
            place.place,
            place.living_index,
            place.distance_km,
            place.score
        )?;
        match entry.route.as_deref() {
            Some(PathResult::Found(route)) => writeln!(
                out,
                "   route: {} hops, {:.0} m",
                route.hop_count(),
                route.length_m
            )?,
            Some(PathResult::NoPath) => writeln!(out, "   route: no path")?,
            None => writeln!(out, "   route: unavailable")?,
        }
    }
    Ok(())
}

pub fn render_places_json<W: Write>(out: &mut W, places: &[PlaceRoute]) -> io::Result<()> {
    let rows: Vec<PlaceRow> = places.iter().map(PlaceRow::from).collect();
    serde_json::to_writer_pretty(&mut *out, &rows)?;
    writeln!(out)
}

pub fn render_route<W: Write>(out: &mut W, result: &PathResult) -> io::Result<()> {
    let Some(route) = result.route() else {
        writeln!(out, "No path between the two locations.")?;
        return Ok(());
    };

    writeln!(
        out,
        "Route: {} hops, {:.0} m",
        route.hop_count(),
        route.length_m
    )?;
    for (node, coordinate) in route.nodes.iter().zip(&route.coordinates) {
        writeln!(out, "- {node} ({:.6}, {:.6})", coordinate.lat, coordinate.lng)?;
    }
    Ok(())
}
