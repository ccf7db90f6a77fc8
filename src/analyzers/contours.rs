use std::collections::BTreeMap;

use chrono::Timelike;
use serde::Serialize;

use crate::analyzers::types::{ContourCell, DistanceBin};
use crate::model::{MeasurementRecord, RouteId, WindowLabel};
use crate::stats::percent_change;

/// Hour-by-distance speed grid for one route, both windows pivoted side by side.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContourTable {
    cells: Vec<ContourCell>,
}

impl ContourTable {
    /// Cells ordered by hour, then distance.
    pub fn cells(&self) -> &[ContourCell] {
        &self.cells
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Distinct hours, ascending.
    pub fn hours(&self) -> Vec<u32> {
        let mut hours: Vec<u32> = self.cells.iter().map(|c| c.hour).collect();
        hours.dedup();
        hours
    }

    /// Distinct distance bins, ascending.
    pub fn distances(&self) -> Vec<DistanceBin> {
        let mut bins: Vec<DistanceBin> = self.cells.iter().map(|c| c.distance_bin).collect();
        bins.sort();
        bins.dedup();
        bins
    }

    pub fn cell(&self, hour: u32, distance_bin: DistanceBin) -> Option<&ContourCell> {
        self.cells
            .binary_search_by(|c| (c.hour, c.distance_bin).cmp(&(hour, distance_bin)))
            .ok()
            .map(|i| &self.cells[i])
    }
}

#[derive(Default)]
struct Sums {
    a: (f64, usize),
    b: (f64, usize),
}

impl Sums {
    fn add(&mut self, window: WindowLabel, value: f64) {
        let slot = match window {
            WindowLabel::WindowA => &mut self.a,
            WindowLabel::WindowB => &mut self.b,
        };
        slot.0 += value;
        slot.1 += 1;
    }

    fn mean(slot: (f64, usize)) -> Option<f64> {
        (slot.1 > 0).then(|| slot.0 / slot.1 as f64)
    }
}

/// Mean speed per (route, local hour, rounded distance) for each window.
///
/// Records without a distance are ignored. A cell observed in only one window
/// keeps that window's mean and leaves the other side, the difference and the
/// percent change empty.
pub fn speed_contours(records: &[MeasurementRecord]) -> BTreeMap<RouteId, ContourTable> {
    let mut grouped: BTreeMap<RouteId, BTreeMap<(u32, DistanceBin), Sums>> = BTreeMap::new();

    for record in records {
        let Some(distance) = record.distance() else {
            continue;
        };
        let hour = record.timestamp().hour();
        grouped
            .entry(record.route_id())
            .or_default()
            .entry((hour, DistanceBin::from_miles(distance)))
            .or_default()
            .add(record.window(), record.value());
    }

    grouped
        .into_iter()
        .map(|(route_id, cells)| {
            let cells = cells
                .into_iter()
                .map(|((hour, distance_bin), sums)| {
                    let speed_a = Sums::mean(sums.a);
                    let speed_b = Sums::mean(sums.b);
                    let (diff, pct) = match (speed_a, speed_b) {
                        (Some(a), Some(b)) => (Some(b - a), percent_change(a, b)),
                        _ => (None, None),
                    };
                    ContourCell {
                        hour,
                        distance_bin,
                        speed_a,
                        speed_b,
                        diff,
                        percent_change: pct,
                    }
                })
                .collect();
            (route_id, ContourTable { cells })
        })
        .collect()
}
