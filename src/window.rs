//! Comparison windows and the single localize/convert step for timestamps.
//!
//! Three timestamp kinds cross this module and are kept apart by type:
//!
//! - [`LocalWallClock`]: a naive wall-clock reading typed in by the operator,
//!   with no zone attached.
//! - [`UtcInstant`]: what the upstream API is queried with.
//! - [`SiteInstant`]: an instant expressed in the observation site's zone,
//!   used for display and calendar-date filtering.
//!
//! Only [`SiteClock`] converts between them.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::{CompareError, Result};
use crate::model::WindowLabel;

pub type UtcInstant = DateTime<Utc>;
pub type SiteInstant = DateTime<Tz>;

/// Format used both for operator input and for upstream query parameters.
pub const WALL_CLOCK_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A naive wall-clock reading at the observation site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct LocalWallClock(NaiveDateTime);

impl LocalWallClock {
    /// Parses `YYYY-MM-DD HH:MM:SS`.
    pub fn parse(s: &str) -> Result<Self> {
        NaiveDateTime::parse_from_str(s.trim(), WALL_CLOCK_FORMAT)
            .map(Self)
            .map_err(|e| CompareError::InvalidWindow(format!("'{s}': {e}")))
    }

    /// 00:00:00 on `date`.
    pub fn start_of_day(date: NaiveDate) -> Self {
        Self(date.and_time(NaiveTime::MIN))
    }

    /// 23:59:59 on `date`.
    pub fn end_of_day(date: NaiveDate) -> Self {
        Self(date.and_hms_opt(23, 59, 59).unwrap_or_else(|| date.and_time(NaiveTime::MIN)))
    }

    pub fn naive(&self) -> NaiveDateTime {
        self.0
    }
}

impl fmt::Display for LocalWallClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(WALL_CLOCK_FORMAT))
    }
}

/// The observation site's timezone and the conversions through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SiteClock {
    tz: Tz,
}

impl SiteClock {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Attaches the site zone to a wall-clock reading.
    ///
    /// A reading repeated by a fall-back transition resolves to the standard
    /// time (second) occurrence. A reading inside a spring-forward gap does not
    /// exist at the site and is rejected.
    pub fn localize(&self, wall: LocalWallClock) -> Result<SiteInstant> {
        match self.tz.from_local_datetime(&wall.0) {
            LocalResult::Single(dt) => Ok(dt),
            LocalResult::Ambiguous(_, standard) => Ok(standard),
            LocalResult::None => Err(CompareError::Localize {
                wall_clock: wall.to_string(),
                timezone: self.tz.name().to_string(),
            }),
        }
    }

    pub fn to_utc(&self, instant: &SiteInstant) -> UtcInstant {
        instant.with_timezone(&Utc)
    }

    pub fn to_site(&self, instant: &UtcInstant) -> SiteInstant {
        instant.with_timezone(&self.tz)
    }

    /// Converts an upstream unix timestamp (seconds) straight to site time.
    pub fn from_unix(&self, secs: i64) -> Option<SiteInstant> {
        DateTime::from_timestamp(secs, 0).map(|utc| self.to_site(&utc))
    }
}

impl Default for SiteClock {
    fn default() -> Self {
        Self::new(chrono_tz::America::Denver)
    }
}

/// An inclusive date span typed as `YYYY-MM-DD:YYYY-MM-DD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateSpan {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl FromStr for DateSpan {
    type Err = CompareError;

    fn from_str(s: &str) -> Result<Self> {
        let (start, end) = s
            .split_once(':')
            .or_else(|| s.split_once(".."))
            .ok_or_else(|| CompareError::InvalidWindow(format!("expected START:END, got '{s}'")))?;
        let parse = |d: &str| {
            NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d")
                .map_err(|e| CompareError::InvalidWindow(format!("'{d}': {e}")))
        };
        Ok(DateSpan {
            start: parse(start)?,
            end: parse(end.trim_start_matches('.'))?,
        })
    }
}

/// One side of the comparison, held in UTC once converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeWindow {
    label: WindowLabel,
    start: UtcInstant,
    end: UtcInstant,
}

impl TimeWindow {
    pub fn new(label: WindowLabel, start: UtcInstant, end: UtcInstant) -> Result<Self> {
        if start >= end {
            return Err(CompareError::InvalidWindow(format!(
                "{label} starts at {start} which is not before its end {end}"
            )));
        }
        Ok(Self { label, start, end })
    }

    /// Localizes both boundaries at the site and converts them to UTC.
    pub fn from_wall_clock(
        label: WindowLabel,
        start: LocalWallClock,
        end: LocalWallClock,
        clock: &SiteClock,
    ) -> Result<Self> {
        let start = clock.to_utc(&clock.localize(start)?);
        let end = clock.to_utc(&clock.localize(end)?);
        Self::new(label, start, end)
    }

    /// Expands a date span to full local days: start 00:00:00, end 23:59:59.
    pub fn from_dates(label: WindowLabel, span: DateSpan, clock: &SiteClock) -> Result<Self> {
        Self::from_wall_clock(
            label,
            LocalWallClock::start_of_day(span.start),
            LocalWallClock::end_of_day(span.end),
            clock,
        )
    }

    pub fn label(&self) -> WindowLabel {
        self.label
    }

    pub fn start(&self) -> UtcInstant {
        self.start
    }

    pub fn end(&self) -> UtcInstant {
        self.end
    }

    /// Upstream `s_timestamp` value.
    pub fn query_start(&self) -> String {
        self.start.format(WALL_CLOCK_FORMAT).to_string()
    }

    /// Upstream `e_timestamp` value.
    pub fn query_end(&self) -> String {
        self.end.format(WALL_CLOCK_FORMAT).to_string()
    }
}

/// The "before" and "after" windows of one comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowPair {
    a: TimeWindow,
    b: TimeWindow,
}

impl WindowPair {
    pub fn new(a: TimeWindow, b: TimeWindow) -> Result<Self> {
        if a.label != WindowLabel::WindowA || b.label != WindowLabel::WindowB {
            return Err(CompareError::InvalidWindow(
                "window pair must be labelled (Window 1, Window 2)".into(),
            ));
        }
        Ok(Self { a, b })
    }

    pub fn from_dates(a: DateSpan, b: DateSpan, clock: &SiteClock) -> Result<Self> {
        Self::new(
            TimeWindow::from_dates(WindowLabel::WindowA, a, clock)?,
            TimeWindow::from_dates(WindowLabel::WindowB, b, clock)?,
        )
    }

    pub fn get(&self, label: WindowLabel) -> &TimeWindow {
        match label {
            WindowLabel::WindowA => &self.a,
            WindowLabel::WindowB => &self.b,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &TimeWindow> {
        [&self.a, &self.b].into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_localize_round_trip() {
        let clock = SiteClock::default();
        for s in [
            "2024-09-01 00:00:00",
            "2024-10-31 23:59:59",
            "2024-01-15 12:30:00",
            "2024-07-04 06:05:00",
        ] {
            let wall = LocalWallClock::parse(s).unwrap();
            let utc = clock.to_utc(&clock.localize(wall).unwrap());
            let back = clock.to_site(&utc);
            assert_eq!(back.naive_local(), wall.naive(), "round trip of {s}");
        }
    }

    #[test]
    fn test_denver_offsets_across_dst() {
        let clock = SiteClock::default();
        let summer = clock
            .to_utc(&clock.localize(LocalWallClock::parse("2024-09-01 00:00:00").unwrap()).unwrap());
        assert_eq!(summer.hour(), 6);
        let winter = clock
            .to_utc(&clock.localize(LocalWallClock::parse("2024-12-01 00:00:00").unwrap()).unwrap());
        assert_eq!(winter.hour(), 7);
    }

    #[test]
    fn test_spring_forward_gap_is_rejected() {
        let clock = SiteClock::default();
        let wall = LocalWallClock::parse("2024-03-10 02:30:00").unwrap();
        assert!(matches!(clock.localize(wall), Err(CompareError::Localize { .. })));
    }

    #[test]
    fn test_fall_back_resolves_to_standard_time() {
        let clock = SiteClock::default();
        let wall = LocalWallClock::parse("2024-11-03 01:30:00").unwrap();
        let utc = clock.to_utc(&clock.localize(wall).unwrap());
        // MST is UTC-7
        assert_eq!(utc.hour(), 8);
    }

    #[test]
    fn test_from_dates_expands_full_days() {
        let clock = SiteClock::default();
        let span = DateSpan {
            start: date(2024, 9, 1),
            end: date(2024, 9, 30),
        };
        let w = TimeWindow::from_dates(WindowLabel::WindowA, span, &clock).unwrap();
        assert_eq!(w.query_start(), "2024-09-01 06:00:00");
        assert_eq!(w.query_end(), "2024-10-01 05:59:59");
    }

    #[test]
    fn test_single_day_window_is_valid() {
        let clock = SiteClock::default();
        let span = DateSpan {
            start: date(2024, 9, 1),
            end: date(2024, 9, 1),
        };
        assert!(TimeWindow::from_dates(WindowLabel::WindowA, span, &clock).is_ok());
    }

    #[test]
    fn test_reversed_window_is_rejected() {
        let clock = SiteClock::default();
        let span = DateSpan {
            start: date(2024, 9, 30),
            end: date(2024, 9, 1),
        };
        assert!(matches!(
            TimeWindow::from_dates(WindowLabel::WindowA, span, &clock),
            Err(CompareError::InvalidWindow(_))
        ));
    }

    #[test]
    fn test_date_span_parsing() {
        let span: DateSpan = "2024-09-01:2024-09-30".parse().unwrap();
        assert_eq!(span.start, date(2024, 9, 1));
        assert_eq!(span.end, date(2024, 9, 30));

        let dotted: DateSpan = "2024-10-01..2024-10-31".parse().unwrap();
        assert_eq!(dotted.end, date(2024, 10, 31));

        assert!("2024-09-01".parse::<DateSpan>().is_err());
    }

    #[test]
    fn test_window_pair_rejects_swapped_labels() {
        let clock = SiteClock::default();
        let span = DateSpan {
            start: date(2024, 9, 1),
            end: date(2024, 9, 2),
        };
        let a = TimeWindow::from_dates(WindowLabel::WindowA, span, &clock).unwrap();
        let b = TimeWindow::from_dates(WindowLabel::WindowB, span, &clock).unwrap();
        assert!(WindowPair::new(b, a).is_err());
        let pair = WindowPair::new(a, b).unwrap();
        assert_eq!(pair.get(WindowLabel::WindowB).label(), WindowLabel::WindowB);
        assert_eq!(pair.iter().count(), 2);
    }
}
