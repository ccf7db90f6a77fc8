pub mod analyzers;
pub mod config;
pub mod error;
pub mod fetch;
pub mod filter;
pub mod infra;
pub mod model;
pub mod output;
pub mod parser;
pub mod points;
pub mod services;
pub mod session;
pub mod stats;
pub mod window;

pub use error::{CompareError, Result};
