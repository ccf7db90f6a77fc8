//! Concrete upstream providers.

pub mod clearguide;
