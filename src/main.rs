use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate, Utc};
use chrono_tz::Tz;
use daybook_calendar::{
    upcoming::local_date, CalendarError, CalendarState, CalendarView, EventStore, Expander,
    HolidaySync,
};
use daybook_core::{AppError, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize core
    daybook_core::init()?;

    let (config, _validation) = Config::load_validated()?;

    let zone: Tz = config.calendar.time_zone.parse().map_err(|_| {
        AppError::from(CalendarError::InvalidTimeZone(
            config.calendar.time_zone.clone(),
        ))
    })?;
    let view: CalendarView = config.calendar.default_view.parse().map_err(AppError::from)?;

    let today = local_date(zone, Utc::now());
    let date = match std::env::args().nth(1) {
        Some(arg) => NaiveDate::parse_from_str(&arg, "%Y-%m-%d")
            .with_context(|| format!("Expected a date as YYYY-MM-DD, got '{}'", arg))?,
        None => today,
    };

    let until_year = config.recurrence.default_until_year.unwrap_or(today.year());
    let expander = Expander::for_year(zone, until_year);

    let mut state = CalendarState::new(EventStore::new(), expander, view, date);

    match HolidaySync::from_config(&config.holidays, zone) {
        Ok(mut sync) => {
            if !state.refresh_holidays(&mut sync).await {
                println!("Holidays could not be loaded; showing local events only.");
            }
        }
        Err(CalendarError::MissingApiKey) => {
            tracing::warn!(
                "No holiday API key configured; set {} to enable holidays",
                daybook_core::config::API_KEY_ENV
            );
        }
        Err(e) => return Err(AppError::from(e).into()),
    }

    state.select_date(date);
    tracing::info!(%date, events = state.upcoming().len(), "Agenda ready");

    println!("Daybook - {} ({})", date.format("%A, %B %-d, %Y"), zone);
    if state.upcoming().is_empty() {
        println!("  No events.");
    }
    for event in state.upcoming() {
        let start = event.start.with_timezone(&zone);
        let end = event.end.with_timezone(&zone);
        println!(
            "  {}-{}  {:<16} {}",
            start.format("%H:%M"),
            end.format("%H:%M"),
            event.event_type().as_str(),
            event.title
        );
    }

    Ok(())
}
