//! Calendar-specific error types.

use daybook_core::{AppError, ConfigError, ReqwestErrorExt};
use thiserror::Error;

use crate::form::FormErrors;

#[derive(Error, Debug)]
pub enum CalendarError {
    #[error("No API key configured for holiday calendars")]
    MissingApiKey,

    #[error("API key rejected: {0}")]
    InvalidApiKey(String),

    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    #[error("Event not found: {0}")]
    EventNotFound(String),

    #[error("Invalid event data: {0}")]
    InvalidEventData(String),

    #[error("Invalid form: {0}")]
    InvalidForm(#[from] FormErrors),

    #[error("Holidays are read-only: {0}")]
    ReadOnly(String),

    #[error("No event selected")]
    NoSelection,

    #[error("Unknown time zone: {0}")]
    InvalidTimeZone(String),

    #[error("Unknown calendar view: {0}")]
    InvalidView(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

impl CalendarError {
    /// User-friendly error message for UI display.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::MissingApiKey => "Holiday calendars are not configured.",
            Self::InvalidApiKey(_) => "The calendar API key was rejected. Check your settings.",
            Self::RateLimited(_) => "Too many requests. Please wait and try again.",
            Self::EventNotFound(_) => "Event not found",
            Self::InvalidEventData(_) => "The event is invalid.",
            Self::InvalidForm(_) => "Please fix the highlighted fields.",
            Self::ReadOnly(_) => "Holidays cannot be changed.",
            Self::NoSelection => "Select an event first.",
            Self::InvalidTimeZone(_) => "The configured time zone is not recognized.",
            Self::InvalidView(_) => "The configured calendar view is not recognized.",
            Self::ApiError(_) => "Could not load holidays.",
            Self::NetworkError(_) => "Network error. Check your connection.",
        }
    }

    /// Whether this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited(_) | Self::NetworkError(_))
    }
}

impl From<CalendarError> for AppError {
    fn from(err: CalendarError) -> Self {
        match err {
            CalendarError::NetworkError(e) => AppError::Network(e.into_network_error()),
            CalendarError::InvalidTimeZone(_) | CalendarError::InvalidView(_) => {
                AppError::Config(ConfigError::Invalid(err.to_string()))
            }
            other => AppError::Calendar {
                user_message: other.user_message(),
                message: other.to_string(),
            },
        }
    }
}
