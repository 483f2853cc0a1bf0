//! Calendar core for Daybook.
//!
//! Recurrence expansion, the daily agenda, the in-memory event store and
//! public-holiday import from Google Calendar.

pub mod client;
pub mod error;
pub mod form;
pub mod holidays;
pub mod recurrence;
pub mod state;
pub mod store;
pub mod types;
pub mod upcoming;
pub mod view;

pub use client::HolidayClient;
pub use error::CalendarError;
pub use form::{EventForm, FieldError, FormErrors, FormMode, RecurrenceInput};
pub use holidays::{HolidaySync, SyncOutcome};
pub use recurrence::Expander;
pub use state::{CalendarState, Modal};
pub use store::{merge, EventPatch, EventStore, NewEvent};
pub use types::{Client, Event, EventKind, EventType, Frequency, Meeting, RecurrenceRule, Theme};
pub use upcoming::select_for;
pub use view::CalendarView;
