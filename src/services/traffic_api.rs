//! Trait and query type for the upstream traffic-data API.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::fetch::auth::{AccessToken, Credentials};
use crate::model::{Metric, RouteId};
use crate::window::TimeWindow;

pub const ROUTE_ID_TYPE: &str = "customer_route_number";

/// One per-route series request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeriesQuery {
    pub route_id: RouteId,
    pub metric: Metric,
    pub window: TimeWindow,
}

impl SeriesQuery {
    pub fn new(route_id: RouteId, metric: Metric, window: TimeWindow) -> Self {
        Self {
            route_id,
            metric,
            window,
        }
    }

    /// Query parameters in the order the upstream documents them.
    pub fn query_pairs(&self, customer_key: &str) -> Vec<(&'static str, String)> {
        vec![
            ("customer_key", customer_key.to_string()),
            ("route_id", self.route_id.to_string()),
            ("route_id_type", ROUTE_ID_TYPE.to_string()),
            ("s_timestamp", self.window.query_start()),
            ("e_timestamp", self.window.query_end()),
            ("metrics", self.metric.name().to_string()),
            ("holidays", "false".to_string()),
            ("granularity", self.metric.granularity().to_string()),
        ]
    }
}

/// Abstraction over the traffic-data provider.
///
/// Implementations return the raw JSON body; interpreting the error flag
/// and series layout is left to [`crate::parser::parse_series`].
#[async_trait]
pub trait TrafficApi: Send + Sync {
    /// Exchanges account credentials for an access token.
    async fn authenticate(&self, credentials: &Credentials) -> Result<AccessToken>;

    /// Fetches one route's series for one window.
    async fn get_series(&self, query: &SeriesQuery, token: &AccessToken) -> Result<Value>;
}
