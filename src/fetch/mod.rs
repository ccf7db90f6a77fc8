//! HTTP plumbing and the per-window series fetcher.

mod basic;
mod client;
pub mod auth;
#[cfg(test)]
pub(crate) mod testing;

pub use basic::BasicClient;
pub use client::HttpClient;

use reqwest::Url;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{CompareError, Result};
use crate::model::{MeasurementRecord, Metric, RouteId};
use crate::parser::parse_series;
use crate::services::traffic_api::{SeriesQuery, TrafficApi};
use crate::window::{SiteClock, TimeWindow, WindowPair};
use auth::Credentials;

/// GETs `url` and decodes the body as JSON.
///
/// Non-success responses are passed through when they carry the upstream
/// error envelope, so the route's own message reaches the operator.
pub async fn fetch_json<C: HttpClient + ?Sized>(
    client: &C,
    url: Url,
    route_id: RouteId,
) -> Result<Value> {
    let req = reqwest::Request::new(reqwest::Method::GET, url);

    let resp = client.execute(req).await?;
    let status = resp.status();
    let text = resp.text().await?;
    let parsed = serde_json::from_str::<Value>(&text);

    if status.is_success() {
        return parsed.map_err(|e| CompareError::ResponseShape {
            route_id,
            detail: format!("body is not JSON: {e}"),
        });
    }
    match parsed {
        Ok(body) if body.get("error").and_then(Value::as_bool) == Some(true) => Ok(body),
        _ => Err(CompareError::Upstream {
            route_id,
            message: format!("HTTP {status}: {text}"),
        }),
    }
}

/// Fetches `metric` for every route over one window.
///
/// Routes are requested one after another; the first upstream or parse error
/// aborts the whole window and nothing fetched so far is returned.
#[tracing::instrument(
    skip_all,
    fields(metric = metric.name(), window = %window.label(), routes = routes.len())
)]
pub async fn fetch_window<A: TrafficApi + ?Sized>(
    api: &A,
    credentials: &Credentials,
    routes: &[RouteId],
    window: &TimeWindow,
    metric: Metric,
    clock: &SiteClock,
) -> Result<Vec<MeasurementRecord>> {
    let token = api.authenticate(credentials).await?;
    let mut records = Vec::new();

    for &route_id in routes {
        let query = SeriesQuery::new(route_id, metric, *window);
        let body = api.get_series(&query, &token).await?;
        let observations = parse_series(&body, route_id, metric)?;
        debug!(route_id = %route_id, observations = observations.len(), "Route series parsed");

        for observation in observations {
            records.push(observation.into_record(route_id, window.label(), clock)?);
        }
    }

    Ok(records)
}

/// Fetches both windows and concatenates them, window A first.
pub async fn fetch_comparison<A: TrafficApi + ?Sized>(
    api: &A,
    credentials: &Credentials,
    routes: &[RouteId],
    windows: &WindowPair,
    metric: Metric,
    clock: &SiteClock,
) -> Result<Vec<MeasurementRecord>> {
    let mut records = Vec::new();
    for window in windows.iter() {
        records.extend(fetch_window(api, credentials, routes, window, metric, clock).await?);
    }
    info!(metric = metric.name(), records = records.len(), "Comparison data fetched");
    Ok(records)
}
