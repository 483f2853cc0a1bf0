//! Calendar view kinds and date navigation.
//!
//! Weeks start on Monday. Navigation always lands on the first day of the
//! period, matching what the calendar widget reports as the view's current
//! start.

use std::str::FromStr;

use chrono::{Datelike, Duration, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::CalendarError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CalendarView {
    #[default]
    #[serde(rename = "dayGridMonth")]
    Month,
    #[serde(rename = "timeGridWeek")]
    Week,
    #[serde(rename = "timeGridDay")]
    Day,
}

impl CalendarView {
    pub const ALL: [CalendarView; 3] = [CalendarView::Month, CalendarView::Week, CalendarView::Day];

    /// Widget view name.
    pub fn as_str(self) -> &'static str {
        match self {
            CalendarView::Month => "dayGridMonth",
            CalendarView::Week => "timeGridWeek",
            CalendarView::Day => "timeGridDay",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CalendarView::Month => "Month",
            CalendarView::Week => "Week",
            CalendarView::Day => "Day",
        }
    }

    /// First day of the period containing `date`.
    pub fn current_start(self, date: NaiveDate) -> NaiveDate {
        match self {
            CalendarView::Month => date.with_day(1).unwrap_or(date),
            CalendarView::Week => {
                date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
            }
            CalendarView::Day => date,
        }
    }

    /// Start of the following period.
    pub fn next(self, date: NaiveDate) -> NaiveDate {
        let start = self.current_start(date);
        match self {
            CalendarView::Month => start.checked_add_months(Months::new(1)).unwrap_or(start),
            CalendarView::Week => start + Duration::days(7),
            CalendarView::Day => start + Duration::days(1),
        }
    }

    /// Start of the preceding period.
    pub fn prev(self, date: NaiveDate) -> NaiveDate {
        let start = self.current_start(date);
        match self {
            CalendarView::Month => start.checked_sub_months(Months::new(1)).unwrap_or(start),
            CalendarView::Week => start - Duration::days(7),
            CalendarView::Day => start - Duration::days(1),
        }
    }

    /// Start of the period containing `today`.
    pub fn today(self, today: NaiveDate) -> NaiveDate {
        self.current_start(today)
    }

    /// Half-open `[start, end)` range of days shown for `date`.
    pub fn visible_range(self, date: NaiveDate) -> (NaiveDate, NaiveDate) {
        (self.current_start(date), self.next(date))
    }
}

impl std::fmt::Display for CalendarView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CalendarView {
    type Err = CalendarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CalendarView::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| CalendarError::InvalidView(s.to_string()))
    }
}
