//! Parser for the upstream route series JSON.
//!
//! Layout:
//!
//! ```json
//! {"error": false,
//!  "series": {"all": {"avg_travel_time": {"data": [[1725170400, 6.4], ...]}}}}
//! ```
//!
//! Speed contour entries carry a list of `[distance, speed]` pairs in place of
//! the scalar value.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{CompareError, Result};
use crate::model::{MeasurementRecord, Metric, RouteId, WindowLabel};
use crate::window::SiteClock;

/// One flattened observation before window tagging and localization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawObservation {
    /// Unix seconds, UTC.
    pub timestamp: i64,
    pub value: f64,
    pub distance: Option<f64>,
}

impl RawObservation {
    /// Localizes the timestamp to the site and tags the originating window.
    pub fn into_record(
        self,
        route_id: RouteId,
        window: WindowLabel,
        clock: &SiteClock,
    ) -> Result<MeasurementRecord> {
        let ts = clock
            .from_unix(self.timestamp)
            .ok_or_else(|| CompareError::ResponseShape {
                route_id,
                detail: format!("timestamp {} out of range", self.timestamp),
            })?;
        Ok(MeasurementRecord::new(
            route_id,
            ts,
            self.value,
            self.distance,
            window,
        ))
    }
}

#[derive(Debug, Deserialize)]
struct SeriesResponse {
    series: Option<SeriesGroups>,
}

#[derive(Debug, Deserialize)]
struct SeriesGroups {
    all: HashMap<String, MetricSeries>,
}

#[derive(Debug, Deserialize)]
struct MetricSeries {
    data: Vec<(f64, EntryValue)>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EntryValue {
    Scalar(Option<f64>),
    Contour(Vec<(f64, Option<f64>)>),
}

/// Checks the error flag and flattens the metric's data array.
///
/// # Errors
///
/// [`CompareError::Upstream`] when the body has `error: true`, carrying the
/// upstream `msg`. [`CompareError::ResponseShape`] when the metric series is
/// missing or an entry does not match the metric.
///
/// Entries whose value is `null` are skipped.
pub fn parse_series(body: &Value, route_id: RouteId, metric: Metric) -> Result<Vec<RawObservation>> {
    let shape = |detail: String| CompareError::ResponseShape { route_id, detail };

    // Error bodies may carry any `series`; only the flag and message matter.
    if body.get("error").and_then(Value::as_bool) == Some(true) {
        let message = body
            .get("msg")
            .and_then(Value::as_str)
            .unwrap_or("No message provided");
        return Err(CompareError::Upstream {
            route_id,
            message: message.to_string(),
        });
    }

    let response = SeriesResponse::deserialize(body).map_err(|e| shape(e.to_string()))?;

    let mut groups = response
        .series
        .ok_or_else(|| shape("missing 'series'".into()))?;
    let series = groups
        .all
        .remove(metric.name())
        .ok_or_else(|| shape(format!("missing series for '{}'", metric.name())))?;

    let mut observations = Vec::with_capacity(series.data.len());
    for (ts, entry) in series.data {
        let timestamp = ts as i64;
        match (metric, entry) {
            (Metric::TravelTime, EntryValue::Scalar(Some(value))) => {
                observations.push(RawObservation {
                    timestamp,
                    value,
                    distance: None,
                });
            }
            (Metric::Speed, EntryValue::Contour(bins)) => {
                observations.extend(bins.into_iter().filter_map(|(distance, speed)| {
                    speed.map(|value| RawObservation {
                        timestamp,
                        value,
                        distance: Some(distance),
                    })
                }));
            }
            (_, EntryValue::Scalar(None)) => {}
            (Metric::TravelTime, EntryValue::Contour(_)) => {
                return Err(shape(format!("entry at {timestamp} has contour bins, expected a scalar")));
            }
            (Metric::Speed, EntryValue::Scalar(Some(_))) => {
                return Err(shape(format!("entry at {timestamp} has a scalar, expected contour bins")));
            }
        }
    }

    Ok(observations)
}
