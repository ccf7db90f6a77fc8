pub mod traffic_api;

pub use traffic_api::{SeriesQuery, TrafficApi};
