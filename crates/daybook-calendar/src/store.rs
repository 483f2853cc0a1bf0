//! In-memory event store.
//!
//! Owns the canonical event list. Ids are unique: inserting an event whose id
//! already exists replaces it in place.

use chrono::{DateTime, Utc};

use crate::error::CalendarError;
use crate::types::{Client, Event, EventKind, Meeting};

/// Event data without an id, as produced by the add form.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub title: String,
    pub description: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub kind: EventKind,
    pub meeting: Option<Meeting>,
    pub client: Option<Client>,
}

impl NewEvent {
    pub fn with_id(self, id: impl Into<String>) -> Event {
        Event {
            id: id.into(),
            title: self.title,
            description: self.description,
            start: self.start,
            end: self.end,
            kind: self.kind,
            meeting: self.meeting,
            client: self.client,
        }
    }
}

/// Partial update; `None` leaves a field unchanged.
///
/// `meeting` and `client` use a nested option so they can be cleared.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub kind: Option<EventKind>,
    pub meeting: Option<Option<Meeting>>,
    pub client: Option<Option<Client>>,
}

impl From<NewEvent> for EventPatch {
    fn from(event: NewEvent) -> Self {
        Self {
            title: Some(event.title),
            description: Some(event.description),
            start: Some(event.start),
            end: Some(event.end),
            kind: Some(event.kind),
            meeting: Some(event.meeting),
            client: Some(event.client),
        }
    }
}

/// Replace every `existing` event whose id appears in `incoming`, then append
/// `incoming`. Re-merging the same batch is a no-op.
pub fn merge(existing: &[Event], incoming: &[Event]) -> Vec<Event> {
    existing
        .iter()
        .filter(|e| !incoming.iter().any(|n| n.id == e.id))
        .chain(incoming.iter())
        .cloned()
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_events(events: Vec<Event>) -> Self {
        let mut store = Self::new();
        for event in events {
            store.insert(event);
        }
        store
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Event> {
        self.events.iter().find(|e| e.id == id)
    }

    /// Store a new event under a freshly generated id and return the id.
    pub fn add(&mut self, event: NewEvent) -> String {
        let id = loop {
            let candidate = uuid::Uuid::new_v4().simple().to_string();
            if self.get(&candidate).is_none() {
                break candidate;
            }
        };
        tracing::debug!(event_id = %id, title = %event.title, "Adding event");
        self.events.push(event.with_id(id.clone()));
        id
    }

    /// Store an event with a caller-chosen id, replacing any event with that id.
    pub fn insert(&mut self, event: Event) {
        match self.events.iter_mut().find(|e| e.id == event.id) {
            Some(slot) => *slot = event,
            None => self.events.push(event),
        }
    }

    pub fn update(&mut self, id: &str, patch: EventPatch) -> Result<&Event, CalendarError> {
        let event = self
            .events
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| CalendarError::EventNotFound(id.to_string()))?;

        if let Some(title) = patch.title {
            event.title = title;
        }
        if let Some(description) = patch.description {
            event.description = description;
        }
        if let Some(start) = patch.start {
            event.start = start;
        }
        if let Some(end) = patch.end {
            event.end = end;
        }
        if let Some(kind) = patch.kind {
            event.kind = kind;
        }
        if let Some(meeting) = patch.meeting {
            event.meeting = meeting;
        }
        if let Some(client) = patch.client {
            event.client = client;
        }

        if event.end < event.start {
            tracing::warn!(event_id = %id, "Update left end before start; clamping end");
            event.end = event.start;
        }

        Ok(event)
    }

    /// Apply a drag or resize from the calendar widget.
    pub fn reschedule(
        &mut self,
        id: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<&Event, CalendarError> {
        self.update(
            id,
            EventPatch {
                start,
                end,
                ..EventPatch::default()
            },
        )
    }

    pub fn delete(&mut self, id: &str) -> Result<Event, CalendarError> {
        let index = self
            .events
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| CalendarError::EventNotFound(id.to_string()))?;
        Ok(self.events.remove(index))
    }

    /// Upsert externally sourced events by id.
    pub fn merge(&mut self, incoming: &[Event]) {
        self.events = merge(&self.events, incoming);
    }
}
