//! Add/edit event forms.
//!
//! A submission is validated as a whole; every failing field is reported and
//! nothing reaches the store unless the whole form is valid.

use chrono::{DateTime, Utc};
use url::Url;

use crate::store::NewEvent;
use crate::types::{Client, Event, EventKind, EventType, Frequency, Meeting, RecurrenceRule};

/// Which dialog the form belongs to. Only the edit dialog accepts holidays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Add,
    Edit,
}

/// Recurrence fields as entered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecurrenceInput {
    pub frequency: Option<Frequency>,
    pub interval: Option<u32>,
    pub until: Option<DateTime<Utc>>,
    pub byweekday: Vec<u8>,
}

/// Raw form values.
#[derive(Debug, Clone, PartialEq)]
pub struct EventForm {
    pub title: String,
    pub description: String,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub event_type: EventType,
    pub client_id: Option<String>,
    pub meeting: Option<String>,
    pub recurrence: Option<RecurrenceInput>,
}

impl EventForm {
    /// Empty add form over a selected range.
    pub fn for_range(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            start: Some(start),
            end: Some(end),
            event_type: EventType::Appointment,
            client_id: None,
            meeting: None,
            recurrence: None,
        }
    }

    /// Edit form prefilled from an existing event.
    pub fn from_event(event: &Event) -> Self {
        Self {
            title: event.title.clone(),
            description: event.description.clone().unwrap_or_default(),
            start: Some(event.start),
            end: Some(event.end),
            event_type: event.event_type(),
            client_id: event.client.as_ref().map(|c| c.id.clone()),
            meeting: event.meeting.as_ref().map(|m| m.link.clone()),
            recurrence: event.recurrence().map(|r| RecurrenceInput {
                frequency: Some(r.frequency),
                interval: Some(u32::from(r.interval)),
                until: r.until,
                byweekday: r.byweekday.clone(),
            }),
        }
    }

    pub fn validate(&self, mode: FormMode, clients: &[Client]) -> Result<NewEvent, FormErrors> {
        let mut errors = FormErrors::default();

        let title = self.title.trim();
        if title.is_empty() {
            errors.add("title", "Must provide a title for this event.");
        }

        let description = self.description.trim();
        if description.is_empty() {
            errors.add("description", "Must provide a description for this event.");
        }

        if self.start.is_none() {
            errors.add("start", "Please select a start time");
        }
        if self.end.is_none() {
            errors.add("end", "Please select an end time");
        }
        if let (Some(start), Some(end)) = (self.start, self.end) {
            if end < start {
                errors.add("end", "End time must not be before the start time");
            }
        }

        let meeting = match self.meeting.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(link) => match Url::parse(link) {
                Ok(_) => Some(Meeting {
                    link: link.to_string(),
                }),
                Err(_) => {
                    errors.add("meeting", "Please enter a valid URL");
                    None
                }
            },
        };

        let client = match self.client_id.as_deref() {
            None | Some("") => None,
            Some(id) => {
                let found = clients.iter().find(|c| c.id == id).cloned();
                if found.is_none() {
                    errors.add("clientId", format!("Unknown client: {}", id));
                }
                found
            }
        };

        let kind = match self.event_type {
            EventType::Appointment => Some(EventKind::Appointment),
            EventType::Event => Some(EventKind::Event),
            EventType::Holiday if mode == FormMode::Edit => Some(EventKind::Holiday),
            EventType::Holiday => {
                errors.add("type", "Holidays cannot be created manually");
                None
            }
            EventType::RecurringEvent => self
                .recurrence_rule(&mut errors)
                .map(|recurrence| EventKind::RecurringEvent { recurrence }),
        };

        match (errors.is_empty(), self.start, self.end, kind) {
            (true, Some(start), Some(end), Some(kind)) => Ok(NewEvent {
                title: title.to_string(),
                description: Some(description.to_string()),
                start,
                end,
                kind,
                meeting,
                client,
            }),
            _ => Err(errors),
        }
    }

    fn recurrence_rule(&self, errors: &mut FormErrors) -> Option<RecurrenceRule> {
        let Some(input) = &self.recurrence else {
            errors.add("recurrence.frequency", "Please choose how often this event repeats");
            return None;
        };

        let frequency = input.frequency;
        if frequency.is_none() {
            errors.add("recurrence.frequency", "Please choose how often this event repeats");
        }

        let interval = match input.interval {
            None => Some(1),
            Some(0) => {
                errors.add("recurrence.interval", "Interval must be at least 1");
                None
            }
            Some(n) => match u16::try_from(n) {
                Ok(n) => Some(n),
                Err(_) => {
                    errors.add("recurrence.interval", "Interval is too large");
                    None
                }
            },
        };

        if input.byweekday.iter().any(|d| *d > 6) {
            errors.add("recurrence.byweekday", "Weekdays must be between 0 (Sunday) and 6 (Saturday)");
        }

        let mut byweekday = input.byweekday.clone();
        byweekday.sort_unstable();
        byweekday.dedup();

        Some(RecurrenceRule {
            frequency: frequency?,
            interval: interval?,
            until: input.until,
            byweekday,
        })
    }
}

/// A single invalid field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// All field errors from one submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors {
    pub errors: Vec<FieldError>,
}

impl FormErrors {
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// First message reported for `field`.
    pub fn for_field(&self, field: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }
}

impl std::fmt::Display for FormErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let joined = self
            .errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        f.write_str(&joined)
    }
}

impl std::error::Error for FormErrors {}
