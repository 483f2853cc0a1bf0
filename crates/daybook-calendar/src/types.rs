//! Calendar event types and data structures.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Calendar event as held by the event store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: EventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meeting: Option<Meeting>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<Client>,
}

/// What kind of entry an event is. Only recurring events carry a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum EventKind {
    Appointment,
    Event,
    RecurringEvent { recurrence: RecurrenceRule },
    Holiday,
}

/// Fieldless event type, used for theming and form choices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventType {
    Appointment,
    Event,
    RecurringEvent,
    Holiday,
}

impl EventType {
    pub fn as_str(self) -> &'static str {
        match self {
            EventType::Appointment => "appointment",
            EventType::Event => "event",
            EventType::RecurringEvent => "recurring-event",
            EventType::Holiday => "holiday",
        }
    }

    /// Static color theme for this type.
    pub fn theme(self) -> Theme {
        match self {
            EventType::Appointment => Theme {
                background: "#FFE4C8",
                text: "#0F4C81",
            },
            EventType::Event => Theme {
                background: "#E8F5E9",
                text: "#0F4C81",
            },
            EventType::RecurringEvent => Theme {
                background: "#5684AE",
                text: "#FFE4C8",
            },
            EventType::Holiday => Theme {
                background: "#E3F2FD",
                text: "#1976D2",
            },
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Presentation colors derived from an event's type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    pub background: &'static str,
    pub text: &'static str,
}

impl Theme {
    pub fn border(&self) -> &'static str {
        self.text
    }
}

/// Recurrence frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
}

impl Frequency {
    /// RFC 5545 FREQ value.
    pub fn as_rrule(self) -> &'static str {
        match self {
            Frequency::Daily => "DAILY",
            Frequency::Weekly => "WEEKLY",
            Frequency::Monthly => "MONTHLY",
        }
    }
}

/// Simple recurrence rule attached to a recurring event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurrenceRule {
    pub frequency: Frequency,
    #[serde(default = "default_interval")]
    pub interval: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub until: Option<DateTime<Utc>>,
    /// Weekday indices, 0 = Sunday .. 6 = Saturday.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub byweekday: Vec<u8>,
}

fn default_interval() -> u16 {
    1
}

impl RecurrenceRule {
    pub fn new(frequency: Frequency) -> Self {
        Self {
            frequency,
            interval: 1,
            until: None,
            byweekday: Vec::new(),
        }
    }

    pub fn every(mut self, interval: u16) -> Self {
        self.interval = interval;
        self
    }

    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    pub fn on_weekdays(mut self, days: impl IntoIterator<Item = u8>) -> Self {
        self.byweekday = days.into_iter().collect();
        self
    }
}

/// Online meeting attached to an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meeting {
    pub link: String,
}

/// Client an appointment is booked with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub avatar: String,
}

impl EventKind {
    pub fn event_type(&self) -> EventType {
        match self {
            EventKind::Appointment => EventType::Appointment,
            EventKind::Event => EventType::Event,
            EventKind::RecurringEvent { .. } => EventType::RecurringEvent,
            EventKind::Holiday => EventType::Holiday,
        }
    }
}

impl Event {
    pub fn event_type(&self) -> EventType {
        self.kind.event_type()
    }

    /// Holidays come from an external source and are read-only.
    pub fn editable(&self) -> bool {
        !matches!(self.kind, EventKind::Holiday)
    }

    pub fn recurrence(&self) -> Option<&RecurrenceRule> {
        match &self.kind {
            EventKind::RecurringEvent { recurrence } => Some(recurrence),
            _ => None,
        }
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn theme(&self) -> Theme {
        self.event_type().theme()
    }

    /// A transient copy of this event starting at `start`, keeping its duration.
    pub fn occurrence_at(&self, start: DateTime<Utc>) -> Event {
        Event {
            id: occurrence_id(&self.id, start),
            start,
            end: start + self.duration(),
            ..self.clone()
        }
    }
}

/// `<base>-<ISO 8601 UTC timestamp with milliseconds>`.
pub fn occurrence_id(base_id: &str, start: DateTime<Utc>) -> String {
    format!(
        "{}-{}",
        base_id,
        start.to_rfc3339_opts(SecondsFormat::Millis, true)
    )
}

// API Response Types

/// Google Calendar API response for an event list.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HolidayListResponse {
    #[serde(default)]
    pub items: Vec<ApiHoliday>,
    pub next_page_token: Option<String>,
}

/// A single item from a public holiday calendar.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHoliday {
    pub id: String,
    pub summary: Option<String>,
    pub start: Option<ApiEventTime>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiEventTime {
    pub date_time: Option<String>,
    pub date: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 5, h, m, 0).unwrap()
    }

    fn sample(kind: EventKind) -> Event {
        Event {
            id: "e1".into(),
            title: "Standup".into(),
            description: Some("Daily session".into()),
            start: at(9, 0),
            end: at(9, 30),
            kind,
            meeting: None,
            client: None,
        }
    }

    #[test]
    fn test_holiday_is_not_editable() {
        assert!(!sample(EventKind::Holiday).editable());
        assert!(sample(EventKind::Appointment).editable());
        assert!(sample(EventKind::RecurringEvent {
            recurrence: RecurrenceRule::new(Frequency::Daily)
        })
        .editable());
    }

    #[test]
    fn test_theme_by_type() {
        let theme = sample(EventKind::RecurringEvent {
            recurrence: RecurrenceRule::new(Frequency::Weekly),
        })
        .theme();
        assert_eq!(theme.background, "#5684AE");
        assert_eq!(theme.border(), "#FFE4C8");
        assert_eq!(EventType::Holiday.theme().text, "#1976D2");
    }

    #[test]
    fn test_occurrence_keeps_duration_and_synthesizes_id() {
        let base = sample(EventKind::Event);
        let occ = base.occurrence_at(at(14, 0));
        assert_eq!(occ.id, "e1-2024-01-05T14:00:00.000Z");
        assert_eq!(occ.duration(), Duration::minutes(30));
        assert_eq!(occ.title, base.title);
    }

    #[test]
    fn test_event_json_shape() {
        let event = sample(EventKind::RecurringEvent {
            recurrence: RecurrenceRule::new(Frequency::Weekly).on_weekdays([1, 3]),
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "recurring-event");
        assert_eq!(json["recurrence"]["frequency"], "WEEKLY");
        assert_eq!(json["recurrence"]["byweekday"], serde_json::json!([1, 3]));

        let back: Event = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_recurrence_interval_defaults_to_one() {
        let rule: RecurrenceRule = serde_json::from_str(r#"{"frequency": "DAILY"}"#).unwrap();
        assert_eq!(rule.interval, 1);
        assert!(rule.until.is_none());
        assert!(rule.byweekday.is_empty());
    }

    #[test]
    fn test_holiday_api_item_parses() {
        let json = r#"{
            "items": [
                {"id": "20240101_abc", "summary": "New Year's Day", "start": {"date": "2024-01-01"}}
            ]
        }"#;
        let resp: HolidayListResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.items.len(), 1);
        let start = resp.items[0].start.as_ref().unwrap();
        assert_eq!(start.date.as_deref(), Some("2024-01-01"));
        assert!(start.date_time.is_none());
    }
}
