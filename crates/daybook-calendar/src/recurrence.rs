//! Recurrence expansion for recurring events.
//!
//! A recurring event stores one base entry plus a [`RecurrenceRule`]. The
//! expander turns that into concrete, transient occurrences inside a time
//! window by handing an RFC 5545 rule to the `rrule` evaluator. Wall-clock
//! times follow the calendar zone, so a daily 09:00 event stays at 09:00 local
//! time across DST changes.
//!
//! `byweekday` combined with `MONTHLY` is passed through untouched. The
//! evaluator reads it as "every such weekday within each month".

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use rrule::RRuleSet;

use crate::types::{Event, RecurrenceRule};

/// Upper bound on occurrences returned for one window.
const MAX_OCCURRENCES: u16 = 1000;

const RRULE_WEEKDAYS: [&str; 7] = ["SU", "MO", "TU", "WE", "TH", "FR", "SA"];

/// Expands recurring events within a calendar zone.
#[derive(Debug, Clone)]
pub struct Expander {
    zone: Tz,
    default_until: DateTime<Utc>,
}

impl Expander {
    /// `default_until` bounds rules that have no `until` of their own.
    pub fn new(zone: Tz, default_until: DateTime<Utc>) -> Self {
        Self {
            zone,
            default_until,
        }
    }

    /// Expander whose default bound is the last second of `year` in `zone`.
    pub fn for_year(zone: Tz, year: i32) -> Self {
        Self::new(zone, end_of_year(zone, year))
    }

    pub fn zone(&self) -> Tz {
        self.zone
    }

    pub fn default_until(&self) -> DateTime<Utc> {
        self.default_until
    }

    /// Occurrences of `event` starting inside `[window_start, window_end]`.
    ///
    /// Non-recurring events produce nothing. A rule the evaluator rejects is
    /// logged and produces nothing.
    pub fn expand(
        &self,
        event: &Event,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Vec<Event> {
        let Some(rule) = event.recurrence() else {
            return Vec::new();
        };
        if window_end < window_start {
            return Vec::new();
        }

        let text = self.rrule_text(event.start, rule);
        let rrule_set: RRuleSet = match text.parse() {
            Ok(set) => set,
            Err(e) => {
                tracing::warn!(event_id = %event.id, rule = %text, "Skipping unusable recurrence rule: {}", e);
                return Vec::new();
            }
        };

        // Widen by a second on each side so the window stays inclusive
        // whatever the evaluator does at the edges; filtered exactly below.
        let tz: rrule::Tz = Utc.into();
        let after = (window_start - Duration::seconds(1)).with_timezone(&tz);
        let before = (window_end + Duration::seconds(1)).with_timezone(&tz);

        let result = rrule_set.after(after).before(before).all(MAX_OCCURRENCES);
        if result.limited {
            tracing::debug!(event_id = %event.id, "Occurrence limit reached for window");
        }

        result
            .dates
            .iter()
            .map(|dt| dt.with_timezone(&Utc))
            .filter(|start| *start >= window_start && *start <= window_end)
            .map(|start| event.occurrence_at(start))
            .collect()
    }

    /// Build the DTSTART + RRULE text understood by the `rrule` crate.
    fn rrule_text(&self, start: DateTime<Utc>, rule: &RecurrenceRule) -> String {
        let dtstart = if self.zone == Tz::UTC {
            format!("DTSTART:{}", start.format("%Y%m%dT%H%M%SZ"))
        } else {
            format!(
                "DTSTART;TZID={}:{}",
                self.zone.name(),
                start.with_timezone(&self.zone).format("%Y%m%dT%H%M%S")
            )
        };

        let until = rule.until.unwrap_or(self.default_until);
        let mut parts = vec![
            format!("FREQ={}", rule.frequency.as_rrule()),
            format!("INTERVAL={}", rule.interval.max(1)),
            format!("UNTIL={}", until.format("%Y%m%dT%H%M%SZ")),
        ];

        let days = weekday_codes(&rule.byweekday);
        if !days.is_empty() {
            parts.push(format!("BYDAY={}", days.join(",")));
        }

        format!("{}\nRRULE:{}", dtstart, parts.join(";"))
    }
}

/// Map 0 = Sunday .. 6 = Saturday to RFC 5545 day codes, dropping anything else.
fn weekday_codes(days: &[u8]) -> Vec<&'static str> {
    days.iter()
        .filter_map(|&d| {
            let code = RRULE_WEEKDAYS.get(usize::from(d)).copied();
            if code.is_none() {
                tracing::warn!(weekday = d, "Ignoring weekday index outside 0..=6");
            }
            code
        })
        .collect()
}

/// 23:59:59 on 31 December of `year` in `zone`, as UTC.
pub fn end_of_year(zone: Tz, year: i32) -> DateTime<Utc> {
    let naive = NaiveDate::from_ymd_opt(year, 12, 31)
        .and_then(|d| d.and_hms_opt(23, 59, 59))
        .unwrap_or_default();

    zone.from_local_datetime(&naive)
        .latest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| naive.and_utc())
}
