//! Aggregation of filtered measurement records.
//!
//! Three modes share one filtered input: a per-route summary with a
//! two-sample t-test, a 24-hour time-of-day profile, and hour-by-distance
//! speed contours.

pub mod analyzer;
pub mod contours;
pub mod summary;
pub mod time_of_day;
pub mod types;

pub use analyzer::{Report, compare};
pub use contours::{ContourTable, speed_contours};
pub use summary::summarize;
pub use time_of_day::{ProfileChart, TimeOfDayProfile};
