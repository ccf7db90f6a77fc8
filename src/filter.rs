//! Day-of-week and excluded-date filtering.

use std::collections::HashSet;

use chrono::{Datelike, NaiveDate, Weekday};

use crate::error::{CompareError, Result};
use crate::model::MeasurementRecord;

pub const ALL_WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Which site-local calendar days survive into the aggregations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterCriteria {
    included_weekdays: HashSet<Weekday>,
    excluded_dates: HashSet<NaiveDate>,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            included_weekdays: ALL_WEEKDAYS.into_iter().collect(),
            excluded_dates: HashSet::new(),
        }
    }
}

impl FilterCriteria {
    pub fn new(
        included_weekdays: impl IntoIterator<Item = Weekday>,
        excluded_dates: impl IntoIterator<Item = NaiveDate>,
    ) -> Self {
        Self {
            included_weekdays: included_weekdays.into_iter().collect(),
            excluded_dates: excluded_dates.into_iter().collect(),
        }
    }

    /// Builds criteria from operator strings: weekday names (`Mon`, `monday`)
    /// and ISO dates. An empty weekday list means all seven days.
    pub fn parse(weekdays: &[String], excluded_dates: &[String]) -> Result<Self> {
        let included: HashSet<Weekday> = if weekdays.is_empty() {
            ALL_WEEKDAYS.into_iter().collect()
        } else {
            weekdays
                .iter()
                .map(|d| {
                    d.trim()
                        .parse::<Weekday>()
                        .map_err(|_| CompareError::Config(format!("unknown weekday '{d}'")))
                })
                .collect::<Result<_>>()?
        };
        let excluded = excluded_dates
            .iter()
            .map(|d| {
                NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d")
                    .map_err(|e| CompareError::Config(format!("excluded date '{d}': {e}")))
            })
            .collect::<Result<HashSet<_>>>()?;
        Ok(Self {
            included_weekdays: included,
            excluded_dates: excluded,
        })
    }

    pub fn included_weekdays(&self) -> &HashSet<Weekday> {
        &self.included_weekdays
    }

    pub fn excluded_dates(&self) -> &HashSet<NaiveDate> {
        &self.excluded_dates
    }

    /// Whether a record's site-local calendar date passes both predicates.
    pub fn retains(&self, record: &MeasurementRecord) -> bool {
        let date = record.timestamp().date_naive();
        self.included_weekdays.contains(&date.weekday()) && !self.excluded_dates.contains(&date)
    }

    /// Returns the retained records, preserving order.
    pub fn apply(&self, records: &[MeasurementRecord]) -> Vec<MeasurementRecord> {
        records.iter().filter(|r| self.retains(r)).cloned().collect()
    }
}
