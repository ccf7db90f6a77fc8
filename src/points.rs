//! Named intersection points and their distance along a route.
//!
//! Point files are KML documents whose placemarks carry a `name` and a
//! `coordinates` string (`lon,lat[,alt]`), or GeoJSON feature collections of
//! named `Point` features. Points are expected in one fixed geographic order;
//! the origin flips with travel direction.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use geo::{Distance, Geodesic, Point};
use geojson::GeoJson;
use quick_xml::Reader;
use quick_xml::events::Event;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CompareError, Result};
use crate::stats::round_to;

const METERS_PER_MILE: f64 = 1609.344;

/// Decimals kept on distances; matches the speed-contour distance bins.
pub const DISTANCE_DECIMALS: i32 = 2;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntersectionPoint {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl IntersectionPoint {
    fn point(&self) -> Point<f64> {
        Point::new(self.longitude, self.latitude)
    }
}

/// An intersection labelled with its distance from the route origin.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistanceLabel {
    pub name: String,
    pub distance_miles: f64,
}

/// Direction of travel along a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Northbound,
    Southbound,
    Eastbound,
    Westbound,
}

impl Direction {
    /// Northbound and eastbound routes measure from the last listed point.
    pub fn origin_is_last(&self) -> bool {
        matches!(self, Direction::Northbound | Direction::Eastbound)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Direction::Northbound => "Northbound",
            Direction::Southbound => "Southbound",
            Direction::Eastbound => "Eastbound",
            Direction::Westbound => "Westbound",
        };
        f.write_str(s)
    }
}

impl FromStr for Direction {
    type Err = CompareError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "northbound" | "nb" | "north" => Ok(Direction::Northbound),
            "southbound" | "sb" | "south" => Ok(Direction::Southbound),
            "eastbound" | "eb" | "east" => Ok(Direction::Eastbound),
            "westbound" | "wb" | "west" => Ok(Direction::Westbound),
            _ => Err(CompareError::Config(format!("unknown direction '{s}'"))),
        }
    }
}

/// Reads a point file, picking the format from the extension or content.
pub fn load_points(path: &Path) -> Result<Vec<IntersectionPoint>> {
    let text = std::fs::read_to_string(path)?;
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    let points = match ext.as_deref() {
        Some("geojson") | Some("json") => parse_geojson(&text)?,
        Some("kml") => parse_kml(&text)?,
        _ if text.trim_start().starts_with('{') => parse_geojson(&text)?,
        _ => parse_kml(&text)?,
    };
    debug!(path = %path.display(), count = points.len(), "Loaded intersection points");
    Ok(points)
}

#[derive(Clone, Copy)]
enum KmlField {
    Name,
    Coordinates,
}

/// Parses every `Placemark` in a KML document, in document order.
///
/// # Errors
///
/// Returns [`CompareError::Point`] naming the placemark when its name or
/// coordinates are missing or malformed, and [`CompareError::PointFile`] for
/// XML syntax errors.
pub fn parse_kml(text: &str) -> Result<Vec<IntersectionPoint>> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut points = Vec::new();
    let mut in_placemark = false;
    let mut field: Option<KmlField> = None;
    let mut name: Option<String> = None;
    let mut coordinates: Option<String> = None;

    loop {
        let event = reader.read_event().map_err(|e| {
            CompareError::PointFile(format!(
                "XML error at byte {}: {e}",
                reader.buffer_position()
            ))
        })?;
        match event {
            Event::Start(e) => match e.local_name().as_ref() {
                b"Placemark" => {
                    in_placemark = true;
                    name = None;
                    coordinates = None;
                }
                b"name" if in_placemark && name.is_none() => field = Some(KmlField::Name),
                b"coordinates" if in_placemark && coordinates.is_none() => {
                    field = Some(KmlField::Coordinates)
                }
                _ => {}
            },
            Event::Text(t) => {
                if let Some(f) = field {
                    let s = t
                        .unescape()
                        .map_err(|e| CompareError::PointFile(e.to_string()))?
                        .into_owned();
                    append_field(f, s, &mut name, &mut coordinates);
                }
            }
            Event::CData(c) => {
                if let Some(f) = field {
                    let s = String::from_utf8_lossy(&c.into_inner()).into_owned();
                    append_field(f, s, &mut name, &mut coordinates);
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"name" | b"coordinates" => field = None,
                b"Placemark" => {
                    in_placemark = false;
                    let label = name
                        .take()
                        .map(|n| n.trim().to_string())
                        .filter(|n| !n.is_empty())
                        .ok_or_else(|| CompareError::Point {
                            name: format!("placemark #{}", points.len() + 1),
                            detail: "missing name".into(),
                        })?;
                    let coords = coordinates.take().ok_or_else(|| CompareError::Point {
                        name: label.clone(),
                        detail: "missing coordinates".into(),
                    })?;
                    points.push(point_from_coordinates(label, &coords)?);
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(points)
}

fn append_field(
    field: KmlField,
    text: String,
    name: &mut Option<String>,
    coordinates: &mut Option<String>,
) {
    let slot = match field {
        KmlField::Name => name,
        KmlField::Coordinates => coordinates,
    };
    slot.get_or_insert_with(String::new).push_str(&text);
}

/// Reads the first `lon,lat[,alt]` tuple of a KML coordinates string.
fn point_from_coordinates(name: String, raw: &str) -> Result<IntersectionPoint> {
    let bad = |detail: String| CompareError::Point {
        name: name.clone(),
        detail,
    };
    let tuple = raw
        .split_whitespace()
        .next()
        .ok_or_else(|| bad("empty coordinates".into()))?;
    let mut parts = tuple.split(',');
    let mut next_number = |axis: &str| -> Result<f64> {
        let part = parts
            .next()
            .ok_or_else(|| bad(format!("coordinates '{tuple}' have no {axis}")))?;
        part.trim()
            .parse::<f64>()
            .map_err(|_| bad(format!("{axis} '{part}' is not a number")))
    };
    let longitude = next_number("longitude")?;
    let latitude = next_number("latitude")?;
    validated(name.clone(), latitude, longitude)
}

fn validated(name: String, latitude: f64, longitude: f64) -> Result<IntersectionPoint> {
    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        return Err(CompareError::Point {
            name,
            detail: format!("coordinates ({latitude}, {longitude}) out of range"),
        });
    }
    Ok(IntersectionPoint {
        name,
        latitude,
        longitude,
    })
}

/// Parses named `Point` features from a GeoJSON document.
///
/// Features with other geometry types are skipped.
pub fn parse_geojson(text: &str) -> Result<Vec<IntersectionPoint>> {
    let geojson: GeoJson = text
        .parse()
        .map_err(|e: geojson::Error| CompareError::PointFile(e.to_string()))?;
    let features = match geojson {
        GeoJson::FeatureCollection(fc) => fc.features,
        GeoJson::Feature(f) => vec![f],
        GeoJson::Geometry(_) => {
            return Err(CompareError::PointFile(
                "bare geometry has no point names".into(),
            ));
        }
    };

    let mut points = Vec::new();
    for (idx, feature) in features.into_iter().enumerate() {
        let name = feature
            .property("name")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| CompareError::Point {
                name: format!("feature #{}", idx + 1),
                detail: "missing name".into(),
            })?;
        let Some(geometry) = feature.geometry else {
            return Err(CompareError::Point {
                name,
                detail: "missing coordinates".into(),
            });
        };
        if let geojson::Value::Point(position) = geometry.value {
            match position.as_slice() {
                [lon, lat, ..] => points.push(validated(name, *lat, *lon)?),
                _ => {
                    return Err(CompareError::Point {
                        name,
                        detail: "point has fewer than two coordinates".into(),
                    });
                }
            }
        }
    }
    Ok(points)
}

/// Geodesic distance in miles from the direction's origin to every point.
///
/// The origin is the last point for northbound/eastbound travel and the
/// first for southbound/westbound. Distances are rounded to
/// [`DISTANCE_DECIMALS`] places so they line up with contour distance bins.
pub fn distances_from_origin(
    points: &[IntersectionPoint],
    direction: Direction,
) -> Result<Vec<DistanceLabel>> {
    if points.len() < 2 {
        return Err(CompareError::PointFile(format!(
            "at least 2 points are required, found {}",
            points.len()
        )));
    }
    let origin = if direction.origin_is_last() {
        &points[points.len() - 1]
    } else {
        &points[0]
    };
    let origin = origin.point();

    Ok(points
        .iter()
        .map(|p| DistanceLabel {
            name: p.name.clone(),
            distance_miles: round_to(
                Geodesic.distance(origin, p.point()) / METERS_PER_MILE,
                DISTANCE_DECIMALS,
            ),
        })
        .collect())
}
