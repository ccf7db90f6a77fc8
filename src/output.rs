//! Presentation-ready tables and chart data, plus CSV/JSON persistence.
//!
//! Nothing here computes statistics; it only reshapes aggregation output into
//! rows with display labels and rounding, and matrices a chart renderer can
//! consume directly.

use std::fs::File;
use std::path::Path;

use csv::WriterBuilder;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::analyzers::contours::ContourTable;
use crate::analyzers::time_of_day::TimeOfDayProfile;
use crate::analyzers::types::SummaryRow;
use crate::config::RouteSettings;
use crate::error::{CompareError, Result};
use crate::model::{MeasurementRecord, RouteId, WindowLabel};
use crate::points::{DistanceLabel, distances_from_origin, load_points};
use crate::stats::round_to;

pub const NOT_AVAILABLE: &str = "N/A";

/// Summary column labels, in display order.
pub const SUMMARY_COLUMNS: [&str; 8] = [
    "Route ID",
    "Mean Window 1",
    "Mean Window 2",
    "Change",
    "%Change",
    "P-Value",
    "Sample Size Window 1",
    "Sample Size Window 2",
];

const DISPLAY_DECIMALS: i32 = 2;

fn display_number(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.2}", round_to(v, DISPLAY_DECIMALS)),
        None => NOT_AVAILABLE.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryTableRow {
    #[serde(rename = "Route ID")]
    pub route_id: RouteId,
    #[serde(rename = "Mean Window 1")]
    pub mean_a: String,
    #[serde(rename = "Mean Window 2")]
    pub mean_b: String,
    #[serde(rename = "Change")]
    pub change: String,
    #[serde(rename = "%Change")]
    pub pct_change: String,
    #[serde(rename = "P-Value")]
    pub p_value: String,
    #[serde(rename = "Sample Size Window 1")]
    pub n_a: usize,
    #[serde(rename = "Sample Size Window 2")]
    pub n_b: usize,
}

impl SummaryTableRow {
    fn cells(&self) -> [String; 8] {
        [
            self.route_id.to_string(),
            self.mean_a.clone(),
            self.mean_b.clone(),
            self.change.clone(),
            self.pct_change.clone(),
            self.p_value.clone(),
            self.n_a.to_string(),
            self.n_b.to_string(),
        ]
    }
}

impl From<&SummaryRow> for SummaryTableRow {
    fn from(row: &SummaryRow) -> Self {
        Self {
            route_id: row.route_id,
            mean_a: display_number(row.mean_a),
            mean_b: display_number(row.mean_b),
            change: display_number(row.diff),
            pct_change: display_number(row.pct_change),
            p_value: row.p_value.to_string(),
            n_a: row.n_a,
            n_b: row.n_b,
        }
    }
}

pub fn summary_table(rows: &[SummaryRow]) -> Vec<SummaryTableRow> {
    rows.iter().map(SummaryTableRow::from).collect()
}

/// Renders the summary as a left-aligned plain-text table for the terminal.
pub fn format_summary_table(rows: &[SummaryTableRow]) -> String {
    let body: Vec<[String; 8]> = rows.iter().map(SummaryTableRow::cells).collect();
    let mut widths = SUMMARY_COLUMNS.map(str::len);
    for cells in &body {
        for (width, cell) in widths.iter_mut().zip(cells) {
            *width = (*width).max(cell.len());
        }
    }

    let line = |cells: &[String]| {
        cells
            .iter()
            .zip(widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let header: Vec<String> = SUMMARY_COLUMNS.iter().map(|s| s.to_string()).collect();
    let mut out = line(&header[..]);
    for cells in &body {
        out.push('\n');
        out.push_str(&line(&cells[..]));
    }
    out
}

/// Long-format time-of-day row: one per (route, window, minute of day).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeOfDayRow {
    pub route_id: RouteId,
    pub window: String,
    pub time_of_day: String,
    pub min: f64,
    pub mean: f64,
    pub max: f64,
    pub count: usize,
}

pub fn time_of_day_table(profile: &TimeOfDayProfile) -> Vec<TimeOfDayRow> {
    profile
        .bins()
        .map(|(key, bin)| TimeOfDayRow {
            route_id: key.route_id,
            window: key.window.to_string(),
            time_of_day: key.minute_of_day.to_string(),
            min: bin.min,
            mean: bin.mean,
            max: bin.max,
            count: bin.count,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub time_of_day: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BandRange {
    pub time_of_day: String,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartLine {
    pub name: String,
    pub points: Vec<ChartPoint>,
}

/// Dual-line-plus-band chart data for one route.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeOfDayChart {
    pub route_id: RouteId,
    pub lines: Vec<ChartLine>,
    /// Min–max range of Window 2.
    pub band: Vec<BandRange>,
}

pub fn time_of_day_charts(profile: &TimeOfDayProfile) -> Vec<TimeOfDayChart> {
    profile
        .routes()
        .into_iter()
        .map(|route_id| {
            let chart = profile.chart(route_id);
            let lines = WindowLabel::ALL
                .into_iter()
                .map(|window| ChartLine {
                    name: window.to_string(),
                    points: chart
                        .line(window)
                        .map(|p| ChartPoint {
                            time_of_day: p.minute_of_day.to_string(),
                            value: p.mean,
                        })
                        .collect(),
                })
                .collect();
            let band = chart
                .band()
                .map(|p| BandRange {
                    time_of_day: p.minute_of_day.to_string(),
                    min: p.min,
                    max: p.max,
                })
                .collect();
            TimeOfDayChart {
                route_id,
                lines,
                band,
            }
        })
        .collect()
}

/// Raw series point for scatter plots, timestamp in site-local RFC 3339.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeseriesRow {
    pub route_id: RouteId,
    pub window: String,
    pub timestamp: String,
    pub value: f64,
}

pub fn timeseries_table(records: &[MeasurementRecord]) -> Vec<TimeseriesRow> {
    records
        .iter()
        .map(|r| TimeseriesRow {
            route_id: r.route_id(),
            window: r.window().to_string(),
            timestamp: r.timestamp().to_rfc3339(),
            value: r.value(),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxisTick {
    pub label: String,
    pub position: f64,
}

impl From<&DistanceLabel> for AxisTick {
    fn from(label: &DistanceLabel) -> Self {
        Self {
            label: format!("{} ({:.2} mi)", label.name, label.distance_miles),
            position: label.distance_miles,
        }
    }
}

/// Speed difference (Window 2 minus Window 1) over hour × distance.
///
/// `values[i][j]` is the difference at `distances[i]` and `hours[j]`; cells
/// with data in only one window are `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Heatmap {
    pub route_id: RouteId,
    pub title: String,
    pub hours: Vec<u32>,
    pub distances: Vec<f64>,
    pub values: Vec<Vec<Option<f64>>>,
    pub ticks: Vec<AxisTick>,
    pub x_title: String,
    pub y_title: String,
    pub colorbar_title: String,
    /// Distance grows downward.
    pub reversed_y: bool,
}

impl Heatmap {
    pub fn new(route_id: RouteId, title: String, table: &ContourTable, labels: &[DistanceLabel]) -> Self {
        let hours = table.hours();
        let bins = table.distances();
        let values = bins
            .iter()
            .map(|&bin| {
                hours
                    .iter()
                    .map(|&hour| table.cell(hour, bin).and_then(|c| c.diff))
                    .collect()
            })
            .collect();

        Self {
            route_id,
            title,
            hours,
            distances: bins.iter().map(|b| b.miles()).collect(),
            values,
            ticks: labels.iter().map(AxisTick::from).collect(),
            x_title: "Hour of Day".to_string(),
            y_title: "Distance (miles)".to_string(),
            colorbar_title: "Speed Difference (mph)".to_string(),
            reversed_y: true,
        }
    }
}

/// A route's heatmap, or why it could not be drawn.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum HeatmapOutput {
    Ready(Heatmap),
    Unavailable { route_id: RouteId, reason: String },
}

impl HeatmapOutput {
    pub fn route_id(&self) -> RouteId {
        match self {
            HeatmapOutput::Ready(h) => h.route_id,
            HeatmapOutput::Unavailable { route_id, .. } => *route_id,
        }
    }
}

/// Builds one route's heatmap.
///
/// Missing speed data, direction, or point file, and unreadable point data,
/// all produce [`HeatmapOutput::Unavailable`] with a warning instead of an
/// error so the remaining routes still render.
pub fn heatmap_for_route(
    route_id: RouteId,
    table: Option<&ContourTable>,
    settings: Option<&RouteSettings>,
) -> HeatmapOutput {
    match try_heatmap(route_id, table, settings) {
        Ok(heatmap) => {
            debug!(route_id = %route_id, "Heatmap ready");
            HeatmapOutput::Ready(heatmap)
        }
        Err(reason) => {
            warn!(route_id = %route_id, reason = %reason, "Heatmap unavailable");
            HeatmapOutput::Unavailable { route_id, reason }
        }
    }
}

fn try_heatmap(
    route_id: RouteId,
    table: Option<&ContourTable>,
    settings: Option<&RouteSettings>,
) -> std::result::Result<Heatmap, String> {
    let table = table
        .filter(|t| !t.is_empty())
        .ok_or_else(|| "no speed contour data".to_string())?;
    let settings = settings.ok_or_else(|| "no route settings".to_string())?;
    let direction = settings
        .direction
        .ok_or_else(|| "no direction selected".to_string())?;
    let path = settings
        .points
        .as_deref()
        .ok_or_else(|| "no point file".to_string())?;

    let labels = load_points(path)
        .and_then(|points| distances_from_origin(&points, direction))
        .map_err(|e| format!("{}: {e}", path.display()))?;

    let title = format!("Speed Difference Heatmap - {direction}");
    Ok(Heatmap::new(route_id, title, table, &labels))
}

/// Writes rows to a fresh CSV file with a header line.
pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    debug!(path = %path.display(), rows = rows.len(), "Writing CSV");
    let file = File::create(path)?;
    let mut writer = WriterBuilder::new().has_headers(true).from_writer(file);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    debug!(path = %path.display(), "Writing JSON");
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, value).map_err(CompareError::from)
}

/// Logs a value as pretty-printed JSON.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
