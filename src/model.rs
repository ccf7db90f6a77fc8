//! Core record types flowing from the fetcher into the aggregation modes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::window::SiteInstant;

/// Customer route number configured in the upstream system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouteId(pub u32);

impl fmt::Display for RouteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RouteId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(RouteId)
    }
}

/// Which side of the comparison a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WindowLabel {
    /// The "before" window.
    #[serde(rename = "window1")]
    WindowA,
    /// The "after" window.
    #[serde(rename = "window2")]
    WindowB,
}

impl WindowLabel {
    pub const ALL: [WindowLabel; 2] = [WindowLabel::WindowA, WindowLabel::WindowB];
}

impl fmt::Display for WindowLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindowLabel::WindowA => f.write_str("Window 1"),
            WindowLabel::WindowB => f.write_str("Window 2"),
        }
    }
}

/// Upstream metric series requested per route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Metric {
    /// `avg_travel_time` at 5-minute granularity, in minutes.
    TravelTime,
    /// `avg_speed` contours at hourly granularity, in mph per distance bin.
    Speed,
}

impl Metric {
    pub fn name(&self) -> &'static str {
        match self {
            Metric::TravelTime => "avg_travel_time",
            Metric::Speed => "avg_speed",
        }
    }

    pub fn granularity(&self) -> &'static str {
        match self {
            Metric::TravelTime => "5min",
            Metric::Speed => "hour",
        }
    }

    /// Endpoint path relative to the API base URL.
    pub fn endpoint(&self) -> &'static str {
        match self {
            Metric::TravelTime => "route/timeseries/",
            Metric::Speed => "route/spatial/contours/",
        }
    }
}

/// One observation for a route, tagged with its originating window.
///
/// Records are only built by the fetch stage after the timestamp has been
/// re-localized to the observation site, so every downstream consumer sees a
/// site-local instant.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementRecord {
    route_id: RouteId,
    timestamp: SiteInstant,
    value: f64,
    distance: Option<f64>,
    window: WindowLabel,
}

impl MeasurementRecord {
    pub fn new(
        route_id: RouteId,
        timestamp: SiteInstant,
        value: f64,
        distance: Option<f64>,
        window: WindowLabel,
    ) -> Self {
        Self {
            route_id,
            timestamp,
            value,
            distance,
            window,
        }
    }

    pub fn route_id(&self) -> RouteId {
        self.route_id
    }

    pub fn timestamp(&self) -> &SiteInstant {
        &self.timestamp
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    /// Distance along the route in miles; only present for speed contours.
    pub fn distance(&self) -> Option<f64> {
        self.distance
    }

    pub fn window(&self) -> WindowLabel {
        self.window
    }
}
