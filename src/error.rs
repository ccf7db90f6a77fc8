//! Error type shared by the fetch, normalize, and point-parsing stages.

use crate::model::RouteId;

/// Result alias used across the library.
pub type Result<T> = std::result::Result<T, CompareError>;

#[derive(Debug, thiserror::Error)]
pub enum CompareError {
    /// The upstream API answered with its error flag set for a route.
    #[error("Error fetching response for route_id {route_id}: {message}")]
    Upstream { route_id: RouteId, message: String },

    /// The upstream body did not have the expected series layout.
    #[error("Unexpected response shape for route_id {route_id}: {detail}")]
    ResponseShape { route_id: RouteId, detail: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Invalid time window: {0}")]
    InvalidWindow(String),

    /// A wall-clock time that does not exist (or is ambiguous) at the site.
    #[error("Cannot localize {wall_clock} in {timezone}")]
    Localize { wall_clock: String, timezone: String },

    #[error("Invalid point '{name}': {detail}")]
    Point { name: String, detail: String },

    #[error("Invalid point file: {0}")]
    PointFile(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl CompareError {
    /// Route named by the error, when it is tied to a single route.
    pub fn route_id(&self) -> Option<RouteId> {
        match self {
            CompareError::Upstream { route_id, .. } | CompareError::ResponseShape { route_id, .. } => {
                Some(*route_id)
            }
            _ => None,
        }
    }
}
