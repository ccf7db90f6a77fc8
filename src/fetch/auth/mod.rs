//! Credentials and the bearer-token request wrapper.

mod bearer;
mod credentials;

pub use bearer::{AccessToken, BearerToken};
pub use credentials::Credentials;
