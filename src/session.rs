//! A comparison session: memoized upstream fetches feeding the aggregation modes.
//!
//! Raw records are cached per metric under the parameters that shaped the
//! upstream request. Filter criteria are not part of the key, so narrowing
//! weekdays or excluding dates reuses what was already fetched.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::{debug, info};

use crate::analyzers::{self, ContourTable, Report, TimeOfDayProfile};
use crate::analyzers::types::SummaryRow;
use crate::error::Result;
use crate::fetch::auth::Credentials;
use crate::fetch::fetch_comparison;
use crate::filter::FilterCriteria;
use crate::model::{MeasurementRecord, Metric, RouteId};
use crate::services::traffic_api::TrafficApi;
use crate::window::{SiteClock, WindowPair};

/// What to compare: routes, the two windows, and the account to fetch with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparisonRequest {
    routes: Vec<RouteId>,
    pub windows: WindowPair,
    pub credentials: Credentials,
}

impl ComparisonRequest {
    /// Duplicate route ids are dropped; first-seen order is kept for output.
    pub fn new(
        routes: impl IntoIterator<Item = RouteId>,
        windows: WindowPair,
        credentials: Credentials,
    ) -> Self {
        let mut unique = Vec::new();
        for route in routes {
            if !unique.contains(&route) {
                unique.push(route);
            }
        }
        Self {
            routes: unique,
            windows,
            credentials,
        }
    }

    pub fn routes(&self) -> &[RouteId] {
        &self.routes
    }

    fn fetch_key(&self, metric: Metric) -> FetchKey {
        let mut routes = self.routes.clone();
        routes.sort();
        FetchKey {
            metric,
            routes,
            windows: self.windows,
            credentials: self.credentials.clone(),
        }
    }
}

/// Everything that changes the upstream response.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct FetchKey {
    metric: Metric,
    routes: Vec<RouteId>,
    windows: WindowPair,
    credentials: Credentials,
}

struct CacheEntry {
    key: FetchKey,
    records: Arc<Vec<MeasurementRecord>>,
}

pub struct Session<A> {
    api: A,
    clock: SiteClock,
    cache: HashMap<Metric, CacheEntry>,
    fetches: usize,
}

impl<A: TrafficApi> Session<A> {
    pub fn new(api: A, clock: SiteClock) -> Self {
        Self {
            api,
            clock,
            cache: HashMap::new(),
            fetches: 0,
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Number of comparison fetches issued upstream so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches
    }

    /// Unfiltered records for `metric`, fetched at most once per key.
    pub async fn records(
        &mut self,
        metric: Metric,
        request: &ComparisonRequest,
    ) -> Result<Arc<Vec<MeasurementRecord>>> {
        let key = request.fetch_key(metric);
        if let Some(entry) = self.cache.get(&metric) {
            if entry.key == key {
                debug!(metric = metric.name(), "Fetch cache hit");
                return Ok(Arc::clone(&entry.records));
            }
        }

        info!(
            metric = metric.name(),
            routes = request.routes.len(),
            "Fetching from upstream"
        );
        let records = fetch_comparison(
            &self.api,
            &request.credentials,
            &request.routes,
            &request.windows,
            metric,
            &self.clock,
        )
        .await?;
        self.fetches += 1;

        let records = Arc::new(records);
        self.cache.insert(
            metric,
            CacheEntry {
                key,
                records: Arc::clone(&records),
            },
        );
        Ok(records)
    }

    pub async fn travel_times(
        &mut self,
        request: &ComparisonRequest,
    ) -> Result<Arc<Vec<MeasurementRecord>>> {
        self.records(Metric::TravelTime, request).await
    }

    pub async fn speeds(
        &mut self,
        request: &ComparisonRequest,
    ) -> Result<Arc<Vec<MeasurementRecord>>> {
        self.records(Metric::Speed, request).await
    }

    pub async fn summary(
        &mut self,
        request: &ComparisonRequest,
        criteria: &FilterCriteria,
    ) -> Result<Vec<SummaryRow>> {
        let records = self.travel_times(request).await?;
        Ok(analyzers::summarize(request.routes(), &criteria.apply(&records)))
    }

    pub async fn time_of_day(
        &mut self,
        request: &ComparisonRequest,
        criteria: &FilterCriteria,
    ) -> Result<TimeOfDayProfile> {
        let records = self.travel_times(request).await?;
        Ok(TimeOfDayProfile::from_records(&criteria.apply(&records)))
    }

    pub async fn speed_contours(
        &mut self,
        request: &ComparisonRequest,
        criteria: &FilterCriteria,
    ) -> Result<BTreeMap<RouteId, ContourTable>> {
        let records = self.speeds(request).await?;
        Ok(analyzers::speed_contours(&criteria.apply(&records)))
    }

    /// Runs every mode, fetching each metric at most once.
    pub async fn report(
        &mut self,
        request: &ComparisonRequest,
        criteria: &FilterCriteria,
    ) -> Result<Report> {
        let travel_times = self.travel_times(request).await?;
        let speeds = self.speeds(request).await?;
        Ok(analyzers::compare(
            request.routes(),
            &travel_times,
            &speeds,
            criteria,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompareError;
    use crate::fetch::auth::AccessToken;
    use crate::services::traffic_api::SeriesQuery;
    use crate::window::DateSpan;
    use async_trait::async_trait;
    use chrono::{NaiveDate, Weekday};
    use serde_json::{Value, json};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingApi {
        series_calls: AtomicUsize,
    }

    #[async_trait]
    impl TrafficApi for CountingApi {
        async fn authenticate(&self, _credentials: &Credentials) -> Result<AccessToken> {
            Ok(AccessToken::new("token"))
        }

        async fn get_series(&self, query: &SeriesQuery, _token: &AccessToken) -> Result<Value> {
            self.series_calls.fetch_add(1, Ordering::SeqCst);
            // Two days inside the window at 14:00 UTC.
            let start = query.window.start().timestamp() + 8 * 3600;
            let data = match query.metric {
                Metric::TravelTime => json!([[start, 5.0], [start + 86_400, 7.0]]),
                Metric::Speed => json!([[start, [[0.5, 30.0], [1.0, 35.0]]]]),
            };
            Ok(json!({"error": false, "series": {"all": {query.metric.name(): {"data": data}}}}))
        }
    }

    fn request(routes: &[u32], username: &str) -> ComparisonRequest {
        let a: DateSpan = "2024-09-01:2024-09-30".parse().unwrap();
        let b: DateSpan = "2024-10-01:2024-10-31".parse().unwrap();
        let windows = WindowPair::from_dates(a, b, &SiteClock::default()).unwrap();
        ComparisonRequest::new(
            routes.iter().copied().map(RouteId),
            windows,
            Credentials::new(username, "secret"),
        )
    }

    fn calls(session: &Session<CountingApi>) -> usize {
        session.api.series_calls.load(Ordering::SeqCst)
    }

    #[tokio::test]
    async fn test_filter_changes_reuse_cached_fetch() {
        let mut session = Session::new(CountingApi::default(), SiteClock::default());
        let req = request(&[1, 2], "user");

        let all = session.summary(&req, &FilterCriteria::default()).await.unwrap();
        assert_eq!(session.fetch_count(), 1);
        // 2 routes x 2 windows
        assert_eq!(calls(&session), 4);
        assert_eq!(all.len(), 2);

        let weekdays_only = FilterCriteria::new(
            [Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Fri],
            [NaiveDate::from_ymd_opt(2024, 9, 3).unwrap()],
        );
        session.summary(&req, &weekdays_only).await.unwrap();
        session.time_of_day(&req, &weekdays_only).await.unwrap();
        assert_eq!(session.fetch_count(), 1);
        assert_eq!(calls(&session), 4);
    }

    #[tokio::test]
    async fn test_key_changes_refetch() {
        let mut session = Session::new(CountingApi::default(), SiteClock::default());
        let criteria = FilterCriteria::default();

        session.summary(&request(&[1], "user"), &criteria).await.unwrap();
        session.summary(&request(&[1, 2], "user"), &criteria).await.unwrap();
        assert_eq!(session.fetch_count(), 2);
        session.summary(&request(&[1, 2], "other"), &criteria).await.unwrap();
        assert_eq!(session.fetch_count(), 3);

        // Route order does not change the fetched set.
        session.summary(&request(&[2, 1], "other"), &criteria).await.unwrap();
        assert_eq!(session.fetch_count(), 3);
    }

    #[tokio::test]
    async fn test_metrics_cached_independently() {
        let mut session = Session::new(CountingApi::default(), SiteClock::default());
        let req = request(&[1], "user");
        let criteria = FilterCriteria::default();

        let report = session.report(&req, &criteria).await.unwrap();
        assert_eq!(session.fetch_count(), 2);
        assert_eq!(report.summary[0].n_a, 2);
        assert_eq!(report.contours[&RouteId(1)].cells().len(), 2);

        session.speed_contours(&req, &criteria).await.unwrap();
        session.summary(&req, &criteria).await.unwrap();
        assert_eq!(session.fetch_count(), 2);
    }

    struct FailingApi;

    #[async_trait]
    impl TrafficApi for FailingApi {
        async fn authenticate(&self, _credentials: &Credentials) -> Result<AccessToken> {
            Ok(AccessToken::new("token"))
        }

        async fn get_series(&self, _query: &SeriesQuery, _token: &AccessToken) -> Result<Value> {
            Ok(json!({"error": true, "msg": "route not found"}))
        }
    }

    #[tokio::test]
    async fn test_failed_fetch_is_not_cached() {
        let mut session = Session::new(FailingApi, SiteClock::default());
        let req = request(&[9], "user");
        let err = session
            .summary(&req, &FilterCriteria::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CompareError::Upstream { route_id: RouteId(9), .. }));
        assert_eq!(session.fetch_count(), 0);
        assert!(session.cache.is_empty());
    }

    #[test]
    fn test_request_dedups_routes() {
        let req = request(&[3, 1, 3], "user");
        assert_eq!(req.routes(), [RouteId(3), RouteId(1)]);
    }
}
