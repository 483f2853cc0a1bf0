//! Calendar screen state.
//!
//! `CalendarState` is the single owner of everything the calendar screen
//! shows: the stored events, the current view and date, the agenda for the
//! selected day, and which dialog is open. Every mutation goes through
//! `&mut self` and leaves the agenda up to date.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};

use crate::error::CalendarError;
use crate::form::{EventForm, FormErrors, FormMode};
use crate::holidays::{HolidaySync, SyncOutcome};
use crate::recurrence::Expander;
use crate::store::{EventPatch, EventStore};
use crate::types::{Client, Event, EventKind};
use crate::upcoming::{day_bounds, local_date, select_for};
use crate::view::CalendarView;

/// The dialog currently open over the calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Modal {
    #[default]
    None,
    Add,
    Edit,
    Delete,
}

#[derive(Debug)]
pub struct CalendarState {
    store: EventStore,
    expander: Expander,
    clients: Vec<Client>,
    view: CalendarView,
    viewed_date: NaiveDate,
    today: NaiveDate,
    selected_date: NaiveDate,
    upcoming: Vec<Event>,
    selected_event: Option<Event>,
    previous_event: Option<Event>,
    selection: Option<(DateTime<Utc>, DateTime<Utc>)>,
    modal: Modal,
}

impl CalendarState {
    pub fn new(store: EventStore, expander: Expander, view: CalendarView, today: NaiveDate) -> Self {
        let mut state = Self {
            store,
            expander,
            clients: Vec::new(),
            view,
            viewed_date: view.current_start(today),
            today,
            selected_date: today,
            upcoming: Vec::new(),
            selected_event: None,
            previous_event: None,
            selection: None,
            modal: Modal::None,
        };
        state.refresh_upcoming();
        state
    }

    /// Client directory used to resolve `client_id` on forms.
    pub fn with_clients(mut self, clients: Vec<Client>) -> Self {
        self.clients = clients;
        self
    }

    pub fn store(&self) -> &EventStore {
        &self.store
    }

    pub fn expander(&self) -> &Expander {
        &self.expander
    }

    pub fn clients(&self) -> &[Client] {
        &self.clients
    }

    pub fn view(&self) -> CalendarView {
        self.view
    }

    pub fn viewed_date(&self) -> NaiveDate {
        self.viewed_date
    }

    pub fn selected_date(&self) -> NaiveDate {
        self.selected_date
    }

    pub fn upcoming(&self) -> &[Event] {
        &self.upcoming
    }

    pub fn selected_event(&self) -> Option<&Event> {
        self.selected_event.as_ref()
    }

    pub fn selection(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        self.selection
    }

    pub fn modal(&self) -> Modal {
        self.modal
    }

    /// Prefilled form for whichever dialog is open.
    pub fn form(&self) -> Option<EventForm> {
        match self.modal {
            Modal::Add => self
                .selection
                .map(|(start, end)| EventForm::for_range(start, end)),
            Modal::Edit | Modal::Delete => self.selected_event.as_ref().map(EventForm::from_event),
            Modal::None => None,
        }
    }

    // ---- Add ----

    /// A date range was selected on the grid.
    pub fn select_range(&mut self, start: DateTime<Utc>, end: DateTime<Utc>) {
        self.selection = Some((start, end));
        self.modal = Modal::Add;
    }

    /// Validate and store a new event. The dialog stays open on error.
    pub fn submit_add(&mut self, form: &EventForm) -> Result<String, CalendarError> {
        let event = form.validate(FormMode::Add, &self.clients)?;
        let id = self.store.add(event);
        tracing::info!(event_id = %id, "Event added");

        self.selection = None;
        self.modal = Modal::None;
        self.refresh_upcoming();
        Ok(id)
    }

    // ---- Edit ----

    /// An event (or one occurrence of a recurring event) was clicked.
    pub fn click_event(&mut self, id: &str) -> Result<(), CalendarError> {
        let (event, _) = self.resolve(id)?;
        self.previous_event = Some(event.clone());
        self.selected_event = Some(event);
        self.modal = Modal::Edit;
        Ok(())
    }

    /// Drag or resize callback.
    ///
    /// Moving an occurrence shifts its whole series by the same offset. The
    /// version before the change is kept so [`cancel_edit`](Self::cancel_edit)
    /// can undo it.
    pub fn change_event(
        &mut self,
        id: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<(), CalendarError> {
        let (event, occurrence_start) = self.resolve(id)?;
        if !event.editable() {
            return Err(CalendarError::ReadOnly(event.id));
        }

        let (start, end) = match occurrence_start {
            Some(anchor) => {
                let occurrence_end = anchor + event.duration();
                (
                    start.map(|s| event.start + (s - anchor)),
                    end.map(|e| event.end + (e - occurrence_end)),
                )
            }
            None => (start, end),
        };

        let updated = self.store.reschedule(&event.id, start, end)?.clone();
        self.previous_event = Some(event);
        self.selected_event = Some(updated);
        self.modal = Modal::Edit;
        self.refresh_upcoming();
        Ok(())
    }

    /// Close the edit dialog, undoing any drag/resize made since it opened.
    pub fn cancel_edit(&mut self) {
        if let Some(previous) = self.previous_event.take() {
            if previous.editable() {
                self.store.insert(previous);
            }
        }
        self.selected_event = None;
        self.modal = Modal::None;
        self.refresh_upcoming();
    }

    /// Apply the edit form to the selected event.
    pub fn submit_edit(&mut self, form: &EventForm) -> Result<(), CalendarError> {
        let selected = self
            .selected_event
            .as_ref()
            .ok_or(CalendarError::NoSelection)?;
        let event = form.validate(FormMode::Edit, &self.clients)?;

        // Only an imported holiday may keep the holiday type.
        if selected.editable() && event.kind == EventKind::Holiday {
            let mut errors = FormErrors::default();
            errors.add("type", "Holidays cannot be created manually");
            return Err(errors.into());
        }

        if selected.editable() {
            let id = selected.id.clone();
            self.store.update(&id, EventPatch::from(event))?;
            tracing::info!(event_id = %id, "Event updated");
        }

        self.selected_event = None;
        self.previous_event = None;
        self.modal = Modal::None;
        self.refresh_upcoming();
        Ok(())
    }

    // ---- Delete ----

    pub fn request_delete(&mut self) -> Result<(), CalendarError> {
        let selected = self
            .selected_event
            .as_ref()
            .ok_or(CalendarError::NoSelection)?;
        if !selected.editable() {
            return Err(CalendarError::ReadOnly(selected.id.clone()));
        }
        self.modal = Modal::Delete;
        Ok(())
    }

    pub fn confirm_delete(&mut self) -> Result<Event, CalendarError> {
        if self.modal != Modal::Delete {
            return Err(CalendarError::NoSelection);
        }
        let selected = self.selected_event.take().ok_or(CalendarError::NoSelection)?;
        let removed = self.store.delete(&selected.id)?;
        tracing::info!(event_id = %removed.id, "Event deleted");

        self.previous_event = None;
        self.modal = Modal::None;
        self.refresh_upcoming();
        Ok(removed)
    }

    /// Back to the edit dialog.
    pub fn cancel_delete(&mut self) {
        if self.modal == Modal::Delete {
            self.modal = Modal::Edit;
        }
    }

    // ---- Navigation ----

    pub fn set_view(&mut self, view: CalendarView) {
        self.view = view;
        self.viewed_date = view.current_start(self.viewed_date);
        self.follow_view();
    }

    pub fn prev(&mut self) {
        self.viewed_date = self.view.prev(self.viewed_date);
        self.follow_view();
    }

    pub fn next(&mut self) {
        self.viewed_date = self.view.next(self.viewed_date);
        self.follow_view();
    }

    /// Jump to the period containing `now`.
    pub fn today(&mut self, now: DateTime<Utc>) {
        self.today = local_date(self.expander.zone(), now);
        self.viewed_date = self.view.today(self.today);
        self.follow_view();
    }

    /// Show the agenda for `date`.
    pub fn select_date(&mut self, date: NaiveDate) {
        self.selected_date = date;
        self.refresh_upcoming();
    }

    /// Events and occurrences that start inside the visible range.
    pub fn visible_events(&self) -> Vec<Event> {
        let zone = self.expander.zone();
        let (first, end_exclusive) = self.view.visible_range(self.viewed_date);
        let (window_start, _) = day_bounds(zone, first);
        let (_, window_end) = day_bounds(zone, end_exclusive - Duration::days(1));

        let mut visible = Vec::new();
        for event in self.store.events() {
            if event.recurrence().is_some() {
                visible.extend(self.expander.expand(event, window_start, window_end));
            } else if event.start >= window_start && event.start <= window_end {
                visible.push(event.clone());
            }
        }
        visible.sort_by_key(|e| e.start);
        visible
    }

    // ---- Holidays ----

    /// Load holidays for the viewed year. Returns `false` if the fetch failed.
    pub async fn refresh_holidays(&mut self, sync: &mut HolidaySync) -> bool {
        let year = self.viewed_date.year();
        match sync.ensure_year(year, &mut self.store).await {
            Ok(SyncOutcome::Merged(_)) => {
                self.refresh_upcoming();
                true
            }
            Ok(SyncOutcome::Skipped) => true,
            Err(e) => {
                tracing::warn!(year, error = %e, "Failed to load holidays");
                false
            }
        }
    }

    fn follow_view(&mut self) {
        self.selected_date = match self.view {
            CalendarView::Day => self.viewed_date,
            _ => self.today,
        };
        self.refresh_upcoming();
    }

    fn refresh_upcoming(&mut self) {
        self.upcoming = select_for(&self.expander, self.store.events(), self.selected_date);
    }

    /// Stored event for `id`, accepting occurrence ids of recurring events.
    ///
    /// For an occurrence, also returns that occurrence's start.
    fn resolve(&self, id: &str) -> Result<(Event, Option<DateTime<Utc>>), CalendarError> {
        if let Some(event) = self.store.get(id) {
            return Ok((event.clone(), None));
        }

        self.store
            .events()
            .iter()
            .filter(|e| e.recurrence().is_some())
            .find_map(|e| {
                let suffix = id.strip_prefix(e.id.as_str())?.strip_prefix('-')?;
                let start = DateTime::parse_from_rfc3339(suffix).ok()?;
                Some((e.clone(), Some(start.with_timezone(&Utc))))
            })
            .ok_or_else(|| CalendarError::EventNotFound(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EventType, Frequency, RecurrenceRule};
    use chrono::TimeZone;
    use chrono_tz::Tz;

    fn at(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, h, 0, 0).unwrap()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn state() -> CalendarState {
        CalendarState::new(
            EventStore::new(),
            Expander::for_year(Tz::UTC, 2024),
            CalendarView::Month,
            day(5),
        )
    }

    fn form(title: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> EventForm {
        EventForm {
            title: title.into(),
            description: "details".into(),
            ..EventForm::for_range(start, end)
        }
    }

    fn holiday() -> Event {
        Event {
            id: "vn-tet".into(),
            title: "[VN] Tết".into(),
            description: Some("Tết".into()),
            start: at(5, 0),
            end: at(5, 23),
            kind: EventKind::Holiday,
            meeting: None,
            client: None,
        }
    }

    #[test]
    fn test_add_flow_refreshes_agenda() {
        let mut state = state();
        state.select_range(at(5, 9), at(5, 10));
        assert_eq!(state.modal(), Modal::Add);
        assert_eq!(state.form().unwrap().start, Some(at(5, 9)));

        let id = state.submit_add(&form("Standup", at(5, 9), at(5, 10))).unwrap();
        assert_eq!(state.modal(), Modal::None);
        assert_eq!(state.upcoming().len(), 1);
        assert_eq!(state.upcoming()[0].id, id);
    }

    #[test]
    fn test_invalid_add_keeps_dialog_open() {
        let mut state = state();
        state.select_range(at(5, 9), at(5, 10));
        let result = state.submit_add(&EventForm::for_range(at(5, 9), at(5, 10)));

        assert!(matches!(result, Err(CalendarError::InvalidForm(_))));
        assert_eq!(state.modal(), Modal::Add);
        assert!(state.store().is_empty());
    }

    #[test]
    fn test_drag_then_cancel_restores() {
        let mut state = state();
        let id = state.submit_add(&form("Call", at(5, 9), at(5, 10))).unwrap();

        state.change_event(&id, Some(at(6, 9)), Some(at(6, 10))).unwrap();
        assert_eq!(state.modal(), Modal::Edit);
        assert_eq!(state.store().get(&id).unwrap().start, at(6, 9));
        assert!(state.upcoming().is_empty());

        state.cancel_edit();
        assert_eq!(state.store().get(&id).unwrap().start, at(5, 9));
        assert_eq!(state.upcoming().len(), 1);
        assert_eq!(state.modal(), Modal::None);
    }

    #[test]
    fn test_submit_edit_applies_form() {
        let mut state = state();
        let id = state.submit_add(&form("Old", at(5, 9), at(5, 10))).unwrap();

        state.click_event(&id).unwrap();
        let mut edit = state.form().unwrap();
        edit.title = "New".into();
        state.submit_edit(&edit).unwrap();

        assert_eq!(state.store().get(&id).unwrap().title, "New");
        assert_eq!(state.upcoming()[0].title, "New");
    }

    #[test]
    fn test_holiday_is_read_only() {
        let mut state = state();
        state.store.insert(holiday());
        state.refresh_upcoming();

        assert!(matches!(
            state.change_event("vn-tet", Some(at(6, 0)), None),
            Err(CalendarError::ReadOnly(_))
        ));

        state.click_event("vn-tet").unwrap();
        assert!(state.request_delete().is_err());

        let mut edit = state.form().unwrap();
        edit.title = "Renamed".into();
        state.submit_edit(&edit).unwrap();
        assert_eq!(state.store().get("vn-tet").unwrap().title, "[VN] Tết");
    }

    #[test]
    fn test_edit_cannot_turn_event_into_holiday() {
        let mut state = state();
        let id = state.submit_add(&form("Mine", at(5, 9), at(5, 10))).unwrap();

        state.click_event(&id).unwrap();
        let mut edit = state.form().unwrap();
        edit.event_type = EventType::Holiday;

        let result = state.submit_edit(&edit);
        assert!(matches!(
            result,
            Err(CalendarError::InvalidForm(ref errors)) if errors.for_field("type").is_some()
        ));
        assert_eq!(state.modal(), Modal::Edit);

        let stored = state.store().get(&id).unwrap();
        assert_eq!(stored.kind, EventKind::Appointment);
        assert!(stored.editable());
        assert!(state.request_delete().is_ok());
    }

    #[test]
    fn test_delete_flow() {
        let mut state = state();
        let id = state.submit_add(&form("Gone", at(5, 9), at(5, 10))).unwrap();

        state.click_event(&id).unwrap();
        state.request_delete().unwrap();
        assert_eq!(state.modal(), Modal::Delete);

        state.cancel_delete();
        assert_eq!(state.modal(), Modal::Edit);

        state.request_delete().unwrap();
        let removed = state.confirm_delete().unwrap();
        assert_eq!(removed.id, id);
        assert!(state.upcoming().is_empty());
        assert_eq!(state.modal(), Modal::None);
    }

    #[test]
    fn test_occurrence_click_and_drag_moves_series() {
        let mut state = state();
        let mut daily = form("Standup", at(1, 9), at(1, 10));
        daily.event_type = EventType::RecurringEvent;
        daily.recurrence = Some(crate::form::RecurrenceInput {
            frequency: Some(Frequency::Daily),
            ..Default::default()
        });
        let id = state.submit_add(&daily).unwrap();

        let occurrence = state.upcoming()[0].id.clone();
        assert_eq!(occurrence, format!("{}-2024-01-05T09:00:00.000Z", id));

        state.click_event(&occurrence).unwrap();
        assert_eq!(state.selected_event().unwrap().id, id);

        state
            .change_event(&occurrence, Some(at(5, 11)), Some(at(5, 12)))
            .unwrap();
        let base = state.store().get(&id).unwrap();
        assert_eq!(base.start, at(1, 11));
        assert_eq!(base.end, at(1, 12));
        assert_eq!(
            base.recurrence(),
            Some(&RecurrenceRule::new(Frequency::Daily))
        );
    }

    #[test]
    fn test_agenda_follows_view() {
        let mut state = state();
        state.submit_add(&form("Tomorrow", at(6, 9), at(6, 10))).unwrap();
        assert!(state.upcoming().is_empty());

        state.set_view(CalendarView::Day);
        state.today(at(5, 12));
        state.next();
        assert_eq!(state.viewed_date(), day(6));
        assert_eq!(state.upcoming().len(), 1);

        state.set_view(CalendarView::Week);
        assert_eq!(state.selected_date(), day(5));
        assert!(state.upcoming().is_empty());

        state.select_date(day(6));
        assert_eq!(state.upcoming().len(), 1);
    }

    #[test]
    fn test_visible_events_expand_over_range() {
        let mut state = state();
        let mut weekly = form("Gym", at(1, 7), at(1, 8));
        weekly.event_type = EventType::RecurringEvent;
        weekly.recurrence = Some(crate::form::RecurrenceInput {
            frequency: Some(Frequency::Weekly),
            ..Default::default()
        });
        state.submit_add(&weekly).unwrap();
        state.submit_add(&form("Once", at(20, 9), at(20, 10))).unwrap();

        // January 2024: Mondays 1, 8, 15, 22, 29 plus the single event.
        let visible = state.visible_events();
        assert_eq!(visible.len(), 6);
        assert!(visible.windows(2).all(|w| w[0].start <= w[1].start));

        state.next();
        assert_eq!(state.visible_events().len(), 4);
    }
}
