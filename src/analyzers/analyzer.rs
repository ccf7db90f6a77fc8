use std::collections::BTreeMap;

use tracing::info;

use crate::analyzers::contours::{ContourTable, speed_contours};
use crate::analyzers::summary::summarize;
use crate::analyzers::time_of_day::TimeOfDayProfile;
use crate::analyzers::types::SummaryRow;
use crate::filter::FilterCriteria;
use crate::model::{MeasurementRecord, RouteId};

/// Everything the three aggregation modes produce for one comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub summary: Vec<SummaryRow>,
    pub time_of_day: TimeOfDayProfile,
    pub contours: BTreeMap<RouteId, ContourTable>,
    /// Filtered travel-time records, kept for scatter output.
    pub timeseries: Vec<MeasurementRecord>,
}

/// Filters each record set once, then runs every aggregation mode on the
/// filtered records.
#[tracing::instrument(skip_all, fields(routes = routes.len()))]
pub fn compare(
    routes: &[RouteId],
    travel_times: &[MeasurementRecord],
    speeds: &[MeasurementRecord],
    criteria: &FilterCriteria,
) -> Report {
    let travel_times = criteria.apply(travel_times);
    let speeds = criteria.apply(speeds);

    let summary = summarize(routes, &travel_times);
    let time_of_day = TimeOfDayProfile::from_records(&travel_times);
    let contours = speed_contours(&speeds);

    info!(
        travel_time_records = travel_times.len(),
        speed_records = speeds.len(),
        contour_routes = contours.len(),
        "Comparison aggregated"
    );

    Report {
        summary,
        time_of_day,
        contours,
        timeseries: travel_times,
    }
}
