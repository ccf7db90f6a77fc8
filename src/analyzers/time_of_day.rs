//! 24-hour profiles built by collapsing every retained date onto its time of day.

use std::collections::BTreeMap;

use chrono::Timelike;

use crate::analyzers::types::{BandPoint, LinePoint, MinuteOfDay, TimeOfDayBin, TimeOfDayKey};
use crate::model::{MeasurementRecord, RouteId, WindowLabel};

/// Min/mean/max per (route, window, minute of day).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeOfDayProfile {
    bins: BTreeMap<TimeOfDayKey, TimeOfDayBin>,
}

struct Accumulator {
    min: f64,
    max: f64,
    sum: f64,
    count: usize,
}

impl TimeOfDayProfile {
    pub fn from_records(records: &[MeasurementRecord]) -> Self {
        let mut acc: BTreeMap<TimeOfDayKey, Accumulator> = BTreeMap::new();

        for record in records {
            let ts = record.timestamp();
            let Some(minute_of_day) = MinuteOfDay::from_hm(ts.hour(), ts.minute()) else {
                continue;
            };
            let key = TimeOfDayKey {
                route_id: record.route_id(),
                window: record.window(),
                minute_of_day,
            };
            let value = record.value();
            acc.entry(key)
                .and_modify(|a| {
                    a.min = a.min.min(value);
                    a.max = a.max.max(value);
                    a.sum += value;
                    a.count += 1;
                })
                .or_insert(Accumulator {
                    min: value,
                    max: value,
                    sum: value,
                    count: 1,
                });
        }

        let bins = acc
            .into_iter()
            .map(|(key, a)| {
                let bin = TimeOfDayBin {
                    min: a.min,
                    mean: a.sum / a.count as f64,
                    max: a.max,
                    count: a.count,
                };
                (key, bin)
            })
            .collect();
        Self { bins }
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    pub fn get(&self, key: &TimeOfDayKey) -> Option<&TimeOfDayBin> {
        self.bins.get(key)
    }

    /// All bins ordered by route, window, then minute of day.
    pub fn bins(&self) -> impl Iterator<Item = (&TimeOfDayKey, &TimeOfDayBin)> {
        self.bins.iter()
    }

    /// Routes present in the profile, ascending.
    pub fn routes(&self) -> Vec<RouteId> {
        let mut routes: Vec<RouteId> = self.bins.keys().map(|k| k.route_id).collect();
        routes.dedup();
        routes
    }

    pub fn chart(&self, route_id: RouteId) -> ProfileChart<'_> {
        ProfileChart {
            profile: self,
            route_id,
        }
    }

    fn window_bins(
        &self,
        route_id: RouteId,
        window: WindowLabel,
    ) -> impl Iterator<Item = (&TimeOfDayKey, &TimeOfDayBin)> {
        let first = TimeOfDayKey {
            route_id,
            window,
            minute_of_day: MinuteOfDay::MIDNIGHT,
        };
        let last = TimeOfDayKey {
            route_id,
            window,
            minute_of_day: MinuteOfDay::MAX,
        };
        self.bins.range(first..=last)
    }
}

/// Chart view of one route: a mean line per window and a min–max band for
/// the comparison window only.
///
/// The view is `Copy` and every accessor returns a fresh iterator over the
/// profile, so a renderer can walk the series as many times as it needs.
#[derive(Debug, Clone, Copy)]
pub struct ProfileChart<'a> {
    profile: &'a TimeOfDayProfile,
    route_id: RouteId,
}

impl<'a> ProfileChart<'a> {
    pub fn line(self, window: WindowLabel) -> impl Iterator<Item = LinePoint> + 'a {
        self.profile
            .window_bins(self.route_id, window)
            .map(|(key, bin)| LinePoint {
                minute_of_day: key.minute_of_day,
                mean: bin.mean,
            })
    }

    /// Min–max band of Window B.
    pub fn band(self) -> impl Iterator<Item = BandPoint> + 'a {
        self.profile
            .window_bins(self.route_id, WindowLabel::WindowB)
            .map(|(key, bin)| BandPoint {
                minute_of_day: key.minute_of_day,
                min: bin.min,
                max: bin.max,
            })
    }
}
