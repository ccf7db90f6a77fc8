//! Data types produced by the aggregation modes.

use std::fmt;

use serde::Serialize;

use crate::model::{RouteId, WindowLabel};
use crate::stats::PValue;

/// Whole-window comparison for one route.
///
/// Means are `None` when the window kept no observations; `diff` and
/// `pct_change` are `None` whenever they cannot be formed (a missing mean,
/// or a zero `mean_a` for the percentage).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub route_id: RouteId,
    pub mean_a: Option<f64>,
    pub mean_b: Option<f64>,
    pub diff: Option<f64>,
    pub pct_change: Option<f64>,
    pub p_value: PValue,
    pub n_a: usize,
    pub n_b: usize,
}

/// Minutes since local midnight, `0..1440`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct MinuteOfDay(u16);

impl MinuteOfDay {
    pub const MIDNIGHT: MinuteOfDay = MinuteOfDay(0);
    pub const MAX: MinuteOfDay = MinuteOfDay(24 * 60 - 1);

    /// `None` outside a single day.
    pub fn new(minutes: u16) -> Option<Self> {
        (minutes <= Self::MAX.0).then_some(Self(minutes))
    }

    pub fn from_hm(hour: u32, minute: u32) -> Option<Self> {
        if hour >= 24 || minute >= 60 {
            return None;
        }
        Some(Self((hour * 60 + minute) as u16))
    }

    pub fn minutes(&self) -> u16 {
        self.0
    }

    pub fn hour(&self) -> u16 {
        self.0 / 60
    }
}

impl fmt::Display for MinuteOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

/// Grouping key for the time-of-day profile; the calendar date is not part of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDayKey {
    pub route_id: RouteId,
    pub window: WindowLabel,
    pub minute_of_day: MinuteOfDay,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimeOfDayBin {
    pub min: f64,
    pub mean: f64,
    pub max: f64,
    pub count: usize,
}

/// A point on a window's mean line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinePoint {
    pub minute_of_day: MinuteOfDay,
    pub mean: f64,
}

/// A point on the comparison window's min–max band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandPoint {
    pub minute_of_day: MinuteOfDay,
    pub min: f64,
    pub max: f64,
}

/// Along-route distance rounded to hundredths of a mile.
///
/// Stored as an integer count of hundredths so equal rounded distances
/// always compare and hash equal. Rounds like [`round_to`], so a bin and a
/// point-file tick for the same raw distance land on the same value.
///
/// [`round_to`]: crate::stats::round_to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DistanceBin(i64);

impl DistanceBin {
    pub fn from_miles(miles: f64) -> Self {
        Self((miles * 100.0).round_ties_even() as i64)
    }

    pub fn miles(&self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl Serialize for DistanceBin {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.miles())
    }
}

impl fmt::Display for DistanceBin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.miles())
    }
}

/// One (hour, distance) cell of a route's speed contour with both windows
/// pivoted into columns.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ContourCell {
    pub hour: u32,
    pub distance_bin: DistanceBin,
    pub speed_a: Option<f64>,
    pub speed_b: Option<f64>,
    pub diff: Option<f64>,
    pub percent_change: Option<f64>,
}
