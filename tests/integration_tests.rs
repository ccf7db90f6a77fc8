use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Weekday};
use corridor_compare::config::RouteConfig;
use corridor_compare::fetch::auth::{AccessToken, Credentials};
use corridor_compare::filter::FilterCriteria;
use corridor_compare::model::{Metric, RouteId, WindowLabel};
use corridor_compare::output::{HeatmapOutput, heatmap_for_route, summary_table};
use corridor_compare::services::{SeriesQuery, TrafficApi};
use corridor_compare::session::{ComparisonRequest, Session};
use corridor_compare::stats::PValue;
use corridor_compare::window::{DateSpan, SiteClock, WindowPair};
use corridor_compare::{CompareError, Result};
use serde_json::{Value, json};

const FAILING_ROUTE: RouteId = RouteId(99);

/// Hourly synthetic series; window 2 runs two minutes slower and 5 mph
/// slower than window 1.
#[derive(Default)]
struct SyntheticApi {
    series_calls: AtomicUsize,
}

#[async_trait]
impl TrafficApi for SyntheticApi {
    async fn authenticate(&self, credentials: &Credentials) -> Result<AccessToken> {
        if credentials.password.is_empty() {
            return Err(CompareError::Auth("empty password".into()));
        }
        Ok(AccessToken::new("test-token"))
    }

    async fn get_series(&self, query: &SeriesQuery, _token: &AccessToken) -> Result<Value> {
        self.series_calls.fetch_add(1, Ordering::SeqCst);
        if query.route_id == FAILING_ROUTE {
            return Ok(json!({"error": true, "msg": "Route 99 is not configured"}));
        }

        let offset = match query.window.label() {
            WindowLabel::WindowA => 0.0,
            WindowLabel::WindowB => 2.0,
        };
        let start = query.window.start().timestamp();
        let end = query.window.end().timestamp();

        let data: Vec<Value> = (0..)
            .map(|k: i64| (k, start + k * 3600))
            .take_while(|&(_, ts)| ts < end)
            .map(|(k, ts)| {
                let wobble = (k % 3) as f64;
                match query.metric {
                    Metric::TravelTime => json!([ts, 10.0 + offset + wobble]),
                    Metric::Speed => json!([
                        ts,
                        [
                            [0.0, 40.0 - 2.5 * offset + wobble],
                            [0.64, 35.0 - 2.5 * offset],
                            [1.13, null]
                        ]
                    ]),
                }
            })
            .collect();

        Ok(json!({
            "error": false,
            "series": {"all": {query.metric.name(): {"data": data}}}
        }))
    }
}

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn sept_oct_request(routes: &[u32]) -> ComparisonRequest {
    let a: DateSpan = "2024-09-01:2024-09-30".parse().unwrap();
    let b: DateSpan = "2024-10-01:2024-10-31".parse().unwrap();
    let windows = WindowPair::from_dates(a, b, &SiteClock::default()).unwrap();
    ComparisonRequest::new(
        routes.iter().copied().map(RouteId),
        windows,
        Credentials::new("analyst", "hunter2"),
    )
}

fn all_of_september() -> Vec<NaiveDate> {
    NaiveDate::from_ymd_opt(2024, 9, 1)
        .unwrap()
        .iter_days()
        .take_while(|d| d.month() == 9)
        .collect()
}

#[tokio::test]
async fn test_two_routes_full_windows() {
    let mut session = Session::new(SyntheticApi::default(), SiteClock::default());
    let request = sept_oct_request(&[13236, 13237]);

    let rows = session
        .summary(&request, &FilterCriteria::default())
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
    for row in &rows {
        assert!(row.n_a > 0);
        assert!(row.n_b > 0);
        // 30 and 31 full local days of hourly samples
        assert_eq!(row.n_a, 30 * 24);
        assert_eq!(row.n_b, 31 * 24);
        let diff = row.diff.unwrap();
        assert!((diff - (row.mean_b.unwrap() - row.mean_a.unwrap())).abs() < 1e-9);
        assert_eq!(row.pct_change.unwrap().signum(), diff.signum());
        let p = row.p_value.value().unwrap();
        assert!((0.0..=1.0).contains(&p));
        assert!(p < 1e-4);
    }

    let table = summary_table(&rows);
    assert_eq!(table[0].route_id, RouteId(13236));
    // Below 0.0001 the p-value is shown in scientific notation.
    assert!(table[0].p_value.contains('e'));

    // 2 routes x 2 windows, one upstream comparison fetch
    assert_eq!(session.fetch_count(), 1);
}

#[tokio::test]
async fn test_excluding_all_of_window_a_gives_sentinels() {
    let mut session = Session::new(SyntheticApi::default(), SiteClock::default());
    let request = sept_oct_request(&[13236, 13237]);

    session
        .summary(&request, &FilterCriteria::default())
        .await
        .unwrap();
    let criteria = FilterCriteria::new(
        [
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
            Weekday::Sat,
            Weekday::Sun,
        ],
        all_of_september(),
    );
    let rows = session.summary(&request, &criteria).await.unwrap();

    for row in &rows {
        assert_eq!(row.n_a, 0);
        assert!(row.n_b > 0);
        assert_eq!(row.mean_a, None);
        assert_eq!(row.diff, None);
        assert_eq!(row.p_value, PValue::NotApplicable);
    }
    let table = summary_table(&rows);
    assert_eq!(table[0].mean_a, "N/A");
    assert_eq!(table[0].p_value, "N/A");

    // The filter change was served from cache.
    assert_eq!(session.fetch_count(), 1);
    assert_eq!(session.api().series_calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_weekday_filter_applies_to_site_local_dates() {
    let mut session = Session::new(SyntheticApi::default(), SiteClock::default());
    let request = sept_oct_request(&[13236]);
    let criteria = FilterCriteria::new([Weekday::Mon], Vec::<NaiveDate>::new());

    let report = session.report(&request, &criteria).await.unwrap();
    assert!(!report.timeseries.is_empty());
    assert!(
        report
            .timeseries
            .iter()
            .all(|r| r.timestamp().weekday() == Weekday::Mon)
    );
    // Five Mondays in September 2024, four in October.
    assert_eq!(report.summary[0].n_a, 5 * 24);
    assert_eq!(report.summary[0].n_b, 4 * 24);
}

#[tokio::test]
async fn test_heatmap_without_points_is_unavailable_others_render() {
    let mut session = Session::new(SyntheticApi::default(), SiteClock::default());
    let request = sept_oct_request(&[13236, 13237]);
    let route_config = RouteConfig::load(&fixture("routes.json")).unwrap();

    let report = session
        .report(&request, &FilterCriteria::default())
        .await
        .unwrap();
    assert_eq!(report.summary.len(), 2);

    let heatmaps: Vec<HeatmapOutput> = request
        .routes()
        .iter()
        .map(|&id| heatmap_for_route(id, report.contours.get(&id), route_config.get(id)))
        .collect();

    let HeatmapOutput::Ready(ready) = &heatmaps[0] else {
        panic!("route 13236 should have a heatmap: {:?}", heatmaps[0]);
    };
    assert_eq!(ready.title, "Speed Difference Heatmap - Northbound");
    assert_eq!(ready.hours.len(), 24);
    assert_eq!(ready.distances, [0.0, 0.64]);
    // Null speeds at 1.13 mi never produce a bin.
    assert!(ready.values.iter().flatten().all(|v| v.is_some()));
    assert!(ready.values[1].iter().all(|v| (v.unwrap() + 5.0).abs() < 1e-9));

    // Northbound measures from the last point.
    assert_eq!(ready.ticks.len(), 3);
    assert_eq!(ready.ticks[2].label, "State St & 1300 S (0.00 mi)");
    assert!(ready.ticks[0].position > ready.ticks[1].position);

    assert!(matches!(
        &heatmaps[1],
        HeatmapOutput::Unavailable { route_id: RouteId(13237), .. }
    ));
}

#[tokio::test]
async fn test_upstream_error_aborts_and_names_route() {
    let mut session = Session::new(SyntheticApi::default(), SiteClock::default());
    let request = sept_oct_request(&[13236, 99, 13237]);

    let err = session
        .summary(&request, &FilterCriteria::default())
        .await
        .unwrap_err();
    assert!(matches!(err, CompareError::Upstream { route_id: FAILING_ROUTE, .. }));
    assert_eq!(
        err.to_string(),
        "Error fetching response for route_id 99: Route 99 is not configured"
    );
    assert_eq!(session.fetch_count(), 0);
}

#[tokio::test]
async fn test_auth_failure_surfaces() {
    let mut session = Session::new(SyntheticApi::default(), SiteClock::default());
    let a: DateSpan = "2024-09-01:2024-09-30".parse().unwrap();
    let b: DateSpan = "2024-10-01:2024-10-31".parse().unwrap();
    let windows = WindowPair::from_dates(a, b, &SiteClock::default()).unwrap();
    let request = ComparisonRequest::new([RouteId(1)], windows, Credentials::new("analyst", ""));

    let err = session
        .time_of_day(&request, &FilterCriteria::default())
        .await
        .unwrap_err();
    assert!(matches!(err, CompareError::Auth(_)));
}
