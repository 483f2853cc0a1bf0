//! Upcoming-event selection for a single calendar day.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::recurrence::Expander;
use crate::types::Event;

/// Every event or occurrence that starts on `date`, sorted by start.
///
/// Recurring events are expanded over the whole calendar day; other events are
/// kept verbatim when their start falls on that day in the expander's zone.
pub fn select_for(expander: &Expander, events: &[Event], date: NaiveDate) -> Vec<Event> {
    let zone = expander.zone();
    let (day_start, day_end) = day_bounds(zone, date);

    let mut upcoming: Vec<Event> = Vec::new();
    for event in events {
        if event.recurrence().is_some() {
            upcoming.extend(expander.expand(event, day_start, day_end));
        } else if local_date(zone, event.start) == date {
            upcoming.push(event.clone());
        }
    }

    upcoming.sort_by_key(|e| e.start);
    upcoming
}

/// `[date 00:00:00.000, date 23:59:59.999]` in `zone`, as UTC instants.
pub fn day_bounds(zone: Tz, date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = local_instant(zone, date.and_time(NaiveTime::MIN), true);
    let last_ms = NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN);
    let end = local_instant(zone, date.and_time(last_ms), false);
    (start, end)
}

/// Calendar date of `instant` in `zone`.
pub fn local_date(zone: Tz, instant: DateTime<Utc>) -> NaiveDate {
    instant.with_timezone(&zone).date_naive()
}

/// Resolve a wall-clock time, stepping past DST gaps.
fn local_instant(zone: Tz, naive: NaiveDateTime, earliest: bool) -> DateTime<Utc> {
    let resolved = zone.from_local_datetime(&naive);
    let picked = if earliest {
        resolved.earliest()
    } else {
        resolved.latest()
    };

    match picked {
        Some(dt) => dt.with_timezone(&Utc),
        None => {
            // Inside a gap: no wall time exists, move an hour toward the day's interior.
            let shifted = if earliest {
                naive + Duration::hours(1)
            } else {
                naive - Duration::hours(1)
            };
            zone.from_local_datetime(&shifted)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|| naive.and_utc())
        }
    }
}
