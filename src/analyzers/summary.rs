use std::collections::HashMap;

use crate::analyzers::types::SummaryRow;
use crate::model::{MeasurementRecord, RouteId, WindowLabel};
use crate::stats::{PValue, mean, percent_change, student_t_test};

#[derive(Default)]
struct WindowValues {
    a: Vec<f64>,
    b: Vec<f64>,
}

/// Builds one summary row per requested route, in the order given.
///
/// Routes with no retained observations in a window still get a row; the
/// missing side's mean, the difference, and the p-value come back as
/// sentinels instead of errors.
pub fn summarize(routes: &[RouteId], records: &[MeasurementRecord]) -> Vec<SummaryRow> {
    let mut by_route: HashMap<RouteId, WindowValues> = HashMap::new();
    for record in records {
        let values = by_route.entry(record.route_id()).or_default();
        match record.window() {
            WindowLabel::WindowA => values.a.push(record.value()),
            WindowLabel::WindowB => values.b.push(record.value()),
        }
    }

    routes
        .iter()
        .map(|&route_id| {
            let values = by_route.remove(&route_id).unwrap_or_default();
            summary_row(route_id, &values)
        })
        .collect()
}

fn summary_row(route_id: RouteId, values: &WindowValues) -> SummaryRow {
    let mean_a = mean(&values.a);
    let mean_b = mean(&values.b);
    let (diff, pct_change) = match (mean_a, mean_b) {
        (Some(a), Some(b)) => (Some(b - a), percent_change(a, b)),
        _ => (None, None),
    };
    let p_value = student_t_test(&values.a, &values.b)
        .map(|t| PValue::Value(t.p_value))
        .unwrap_or(PValue::NotApplicable);

    SummaryRow {
        route_id,
        mean_a,
        mean_b,
        diff,
        pct_change,
        p_value,
        n_a: values.a.len(),
        n_b: values.b.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::{LocalWallClock, SiteClock};
    use approx::assert_abs_diff_eq;

    fn record(route: u32, window: WindowLabel, day: u32, value: f64) -> MeasurementRecord {
        let clock = SiteClock::default();
        let month = if window == WindowLabel::WindowA { 9 } else { 10 };
        let ts = clock
            .localize(LocalWallClock::parse(&format!("2024-{month:02}-{day:02} 08:00:00")).unwrap())
            .unwrap();
        MeasurementRecord::new(RouteId(route), ts, value, None, window)
    }

    #[test]
    fn test_diff_and_pct_change() {
        let records = vec![
            record(1, WindowLabel::WindowA, 2, 10.0),
            record(1, WindowLabel::WindowA, 3, 12.0),
            record(1, WindowLabel::WindowB, 2, 8.0),
            record(1, WindowLabel::WindowB, 3, 9.0),
        ];
        let rows = summarize(&[RouteId(1)], &records);
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.mean_a, Some(11.0));
        assert_eq!(row.mean_b, Some(8.5));
        assert_eq!(row.diff, Some(8.5 - 11.0));
        assert_abs_diff_eq!(row.pct_change.unwrap(), -2.5 / 11.0 * 100.0, epsilon = 1e-12);
        assert!(row.pct_change.unwrap().signum() == row.diff.unwrap().signum());
        let p = row.p_value.value().unwrap();
        assert!((0.0..=1.0).contains(&p));
        assert_eq!((row.n_a, row.n_b), (2, 2));
    }

    #[test]
    fn test_rows_follow_requested_order() {
        let records = vec![
            record(2, WindowLabel::WindowA, 2, 5.0),
            record(1, WindowLabel::WindowA, 2, 6.0),
        ];
        let rows = summarize(&[RouteId(2), RouteId(1), RouteId(3)], &records);
        let ids: Vec<_> = rows.iter().map(|r| r.route_id).collect();
        assert_eq!(ids, [RouteId(2), RouteId(1), RouteId(3)]);
        assert_eq!(rows[2].n_a, 0);
        assert_eq!(rows[2].n_b, 0);
    }

    #[test]
    fn test_empty_window_yields_sentinels() {
        let records = vec![
            record(1, WindowLabel::WindowB, 2, 8.0),
            record(1, WindowLabel::WindowB, 3, 9.0),
        ];
        let row = &summarize(&[RouteId(1)], &records)[0];
        assert_eq!(row.n_a, 0);
        assert_eq!(row.mean_a, None);
        assert_eq!(row.diff, None);
        assert_eq!(row.pct_change, None);
        assert_eq!(row.p_value, PValue::NotApplicable);
    }

    #[test]
    fn test_zero_baseline_mean_has_no_pct_change() {
        let records = vec![
            record(1, WindowLabel::WindowA, 2, 0.0),
            record(1, WindowLabel::WindowA, 3, 0.0),
            record(1, WindowLabel::WindowB, 2, 1.0),
            record(1, WindowLabel::WindowB, 3, 2.0),
        ];
        let row = &summarize(&[RouteId(1)], &records)[0];
        assert_eq!(row.diff, Some(1.5));
        assert_eq!(row.pct_change, None);
        assert!(row.p_value.value().is_some());
    }

    #[test]
    fn test_zero_variance_has_no_p_value() {
        let records = vec![
            record(1, WindowLabel::WindowA, 2, 4.0),
            record(1, WindowLabel::WindowA, 3, 4.0),
            record(1, WindowLabel::WindowB, 2, 4.0),
        ];
        let row = &summarize(&[RouteId(1)], &records)[0];
        assert_eq!(row.diff, Some(0.0));
        assert_eq!(row.p_value, PValue::NotApplicable);
    }
}
