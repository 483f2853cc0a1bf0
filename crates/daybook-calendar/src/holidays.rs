//! Public holiday import.
//!
//! Holidays are fetched once per calendar year from Google's public holiday
//! calendars and merged into the store as read-only events. A year is only
//! marked as fetched after every country succeeded, so a failed attempt is
//! retried the next time that year is viewed.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use daybook_core::HolidayConfig;

use crate::client::HolidayClient;
use crate::error::CalendarError;
use crate::store::EventStore;
use crate::types::{ApiHoliday, Event, EventKind};

pub use daybook_core::config::FALLBACK_COUNTRY;

const HOLIDAY_CALENDAR_IDS: [(&str, &str); 9] = [
    ("vn", "vi.vietnamese#holiday@group.v.calendar.google.com"),
    ("us", "en.usa#holiday@group.v.calendar.google.com"),
    ("jp", "en.japanese#holiday@group.v.calendar.google.com"),
    ("in", "en.indian#holiday@group.v.calendar.google.com"),
    ("fr", "fr.french#holiday@group.v.calendar.google.com"),
    ("de", "de.german#holiday@group.v.calendar.google.com"),
    ("uk", "en.uk#holiday@group.v.calendar.google.com"),
    ("cn", "zh.chinese#holiday@group.v.calendar.google.com"),
    ("sg", "en.singapore#holiday@group.v.calendar.google.com"),
];

/// Google calendar id for a country code, if the code is known.
pub fn calendar_id(country: &str) -> Option<&'static str> {
    let code = country.to_ascii_lowercase();
    HOLIDAY_CALENDAR_IDS
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, id)| *id)
}

/// Calendar id for `country`, falling back to the Vietnamese calendar.
pub fn calendar_id_or_default(country: &str) -> &'static str {
    calendar_id(country)
        .or_else(|| calendar_id(FALLBACK_COUNTRY))
        .unwrap_or(HOLIDAY_CALENDAR_IDS[0].1)
}

/// Turn API items into read-only holiday events.
///
/// Ids are prefixed with the country code so two sources never collide.
/// Items without a usable start are skipped.
pub fn map_holidays(items: &[ApiHoliday], country: &str, zone: Tz) -> Vec<Event> {
    let country = country.to_ascii_lowercase();
    items
        .iter()
        .filter_map(|item| {
            let Some(start) = holiday_start(item, zone) else {
                tracing::warn!(country = %country, item_id = %item.id, "Skipping holiday without a start");
                return None;
            };
            let summary = item.summary.clone().unwrap_or_default();

            Some(Event {
                id: format!("{}-{}", country, item.id),
                title: format!("[{}] {}", country.to_ascii_uppercase(), summary),
                description: Some(summary),
                start,
                end: start + Duration::hours(23),
                kind: EventKind::Holiday,
                meeting: None,
                client: None,
            })
        })
        .collect()
}

/// `dateTime` if present, else the all-day `date` at midnight in `zone`.
fn holiday_start(item: &ApiHoliday, zone: Tz) -> Option<DateTime<Utc>> {
    let time = item.start.as_ref()?;

    if let Some(dt) = time
        .date_time
        .as_deref()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
    {
        return Some(dt.with_timezone(&Utc));
    }

    let date = NaiveDate::parse_from_str(time.date.as_deref()?, "%Y-%m-%d").ok()?;
    zone.from_local_datetime(&date.and_hms_opt(0, 0, 0)?)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

/// `[year-01-01T00:00:00Z, year-12-31T23:59:59Z]`.
pub fn year_window(year: i32) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let start = Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).single()?;
    let end = Utc.with_ymd_and_hms(year, 12, 31, 23, 59, 59).single()?;
    Some((start, end))
}

/// Outcome of [`HolidaySync::ensure_year`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The year was already loaded; nothing was requested.
    Skipped,
    /// This many holiday events were merged.
    Merged(usize),
}

/// Loads holidays for the viewed year, at most once per year.
#[derive(Debug, Clone)]
pub struct HolidaySync {
    client: HolidayClient,
    countries: Vec<String>,
    zone: Tz,
    fetched_year: Option<i32>,
}

impl HolidaySync {
    pub fn new(client: HolidayClient, countries: Vec<String>, zone: Tz) -> Self {
        for country in &countries {
            if calendar_id(country).is_none() {
                tracing::warn!(
                    country = %country,
                    "No holiday calendar for country, using '{}'",
                    FALLBACK_COUNTRY
                );
            }
        }

        Self {
            client,
            countries,
            zone,
            fetched_year: None,
        }
    }

    pub fn from_config(config: &HolidayConfig, zone: Tz) -> Result<Self, CalendarError> {
        let client = HolidayClient::from_config(config)?;
        Ok(Self::new(client, config.countries.clone(), zone))
    }

    pub fn fetched_year(&self) -> Option<i32> {
        self.fetched_year
    }

    /// Fetch and merge holidays for `year` unless that year is already loaded.
    ///
    /// Countries are requested concurrently. On any failure the store is left
    /// untouched and the year stays unfetched.
    pub async fn ensure_year(
        &mut self,
        year: i32,
        store: &mut EventStore,
    ) -> Result<SyncOutcome, CalendarError> {
        if self.fetched_year == Some(year) {
            return Ok(SyncOutcome::Skipped);
        }

        let (time_min, time_max) = year_window(year)
            .ok_or_else(|| CalendarError::InvalidEventData(format!("Year out of range: {}", year)))?;

        let handles: Vec<_> = self
            .countries
            .iter()
            .map(|country| {
                let client = self.client.clone();
                let country = country.to_ascii_lowercase();
                tokio::spawn(async move {
                    let calendar = calendar_id_or_default(&country);
                    let items = client.list_holidays(calendar, time_min, time_max).await?;
                    Ok::<_, CalendarError>((country, items))
                })
            })
            .collect();

        let mut incoming = Vec::new();
        for handle in handles {
            let (country, items) = handle
                .await
                .map_err(|e| CalendarError::ApiError(format!("Holiday task failed: {}", e)))??;
            incoming.extend(map_holidays(&items, &country, self.zone));
        }

        store.merge(&incoming);
        self.fetched_year = Some(year);
        tracing::info!(year, count = incoming.len(), "Holidays merged");

        Ok(SyncOutcome::Merged(incoming.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ApiEventTime;

    fn item(id: &str, summary: &str, date: Option<&str>, date_time: Option<&str>) -> ApiHoliday {
        ApiHoliday {
            id: id.into(),
            summary: Some(summary.into()),
            start: Some(ApiEventTime {
                date: date.map(String::from),
                date_time: date_time.map(String::from),
            }),
        }
    }

    #[test]
    fn test_calendar_id_lookup() {
        assert_eq!(
            calendar_id("SG"),
            Some("en.singapore#holiday@group.v.calendar.google.com")
        );
        assert!(calendar_id("xx").is_none());
        assert_eq!(
            calendar_id_or_default("xx"),
            "vi.vietnamese#holiday@group.v.calendar.google.com"
        );
    }

    #[test]
    fn test_every_configurable_country_has_calendar() {
        for country in daybook_core::config::HOLIDAY_COUNTRIES {
            assert!(calendar_id(country).is_some(), "missing calendar for {}", country);
        }
        assert_eq!(
            HOLIDAY_CALENDAR_IDS.len(),
            daybook_core::config::HOLIDAY_COUNTRIES.len()
        );
    }

    #[test]
    fn test_map_all_day_holiday_in_zone() {
        let zone: Tz = "Asia/Ho_Chi_Minh".parse().unwrap();
        let events = map_holidays(&[item("tet", "Tết", Some("2024-02-10"), None)], "vn", zone);

        assert_eq!(events.len(), 1);
        let e = &events[0];
        assert_eq!(e.id, "vn-tet");
        assert_eq!(e.title, "[VN] Tết");
        assert_eq!(e.description.as_deref(), Some("Tết"));
        assert_eq!(e.start, Utc.with_ymd_and_hms(2024, 2, 9, 17, 0, 0).unwrap());
        assert_eq!(e.duration(), Duration::hours(23));
        assert!(!e.editable());
    }

    #[test]
    fn test_map_prefers_date_time() {
        let events = map_holidays(
            &[item("x", "Eve", Some("2024-12-24"), Some("2024-12-24T18:00:00+08:00"))],
            "sg",
            Tz::UTC,
        );
        assert_eq!(events[0].start, Utc.with_ymd_and_hms(2024, 12, 24, 10, 0, 0).unwrap());
    }

    #[test]
    fn test_map_skips_items_without_start() {
        let mut broken = item("b", "Broken", None, None);
        broken.start = None;
        let unparseable = item("u", "Bad", Some("24/12/2024"), None);

        assert!(map_holidays(&[broken, unparseable], "vn", Tz::UTC).is_empty());
    }

    #[test]
    fn test_year_window() {
        let (start, end) = year_window(2025).unwrap();
        assert_eq!(start.to_rfc3339(), "2025-01-01T00:00:00+00:00");
        assert_eq!(end.to_rfc3339(), "2025-12-31T23:59:59+00:00");
    }
}
