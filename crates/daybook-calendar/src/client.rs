//! Google Calendar API client for public holiday calendars.

use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use daybook_core::HolidayConfig;
use tracing::instrument;

use crate::error::CalendarError;
use crate::types::{ApiHoliday, HolidayListResponse};

const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";
const DEFAULT_MAX_RESULTS: u32 = 100;

#[derive(Clone)]
pub struct HolidayClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    max_results: u32,
}

impl std::fmt::Debug for HolidayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HolidayClient")
            .field("base_url", &self.base_url)
            .field("max_results", &self.max_results)
            .finish_non_exhaustive()
    }
}

impl HolidayClient {
    pub fn new(api_key: &str) -> Result<Self, CalendarError> {
        Self::with_base_url(api_key, CALENDAR_API_BASE)
    }

    pub fn with_base_url(api_key: &str, base_url: &str) -> Result<Self, CalendarError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            max_results: DEFAULT_MAX_RESULTS,
        })
    }

    /// Build a client from the `[holidays]` config section.
    pub fn from_config(config: &HolidayConfig) -> Result<Self, CalendarError> {
        let api_key = config
            .resolved_api_key()
            .ok_or(CalendarError::MissingApiKey)?;
        let client = Self::with_base_url(&api_key, &config.api_base_url)?;
        Ok(client.max_results(config.max_results))
    }

    pub fn max_results(mut self, max_results: u32) -> Self {
        self.max_results = max_results.max(1);
        self
    }

    /// List the events of a public calendar within `[time_min, time_max]`.
    #[instrument(skip(self), level = "info")]
    pub async fn list_holidays(
        &self,
        calendar_id: &str,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> Result<Vec<ApiHoliday>, CalendarError> {
        let url = format!(
            "{}/calendars/{}/events?key={}&maxResults={}&singleEvents=true&orderBy=startTime&timeMin={}&timeMax={}",
            self.base_url,
            urlencoding::encode(calendar_id),
            urlencoding::encode(&self.api_key),
            self.max_results,
            urlencoding::encode(&time_min.to_rfc3339_opts(SecondsFormat::Millis, true)),
            urlencoding::encode(&time_max.to_rfc3339_opts(SecondsFormat::Millis, true)),
        );

        let response = self
            .client
            .get(&url)
            .header("Content-Type", "application/json")
            .send()
            .await?;

        let resp: HolidayListResponse = self.handle_response(response).await?;
        tracing::debug!(count = resp.items.len(), "Fetched holiday items");
        Ok(resp.items)
    }

    /// Helper to handle API responses and errors.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, CalendarError> {
        let status = response.status();

        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| CalendarError::ApiError(format!("JSON parse error: {}", e)))
        } else if matches!(status.as_u16(), 400 | 401 | 403) {
            let text = response.text().await.unwrap_or_default();
            Err(CalendarError::InvalidApiKey(format!("{}: {}", status, text)))
        } else if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            Err(CalendarError::RateLimited(retry_after))
        } else {
            let text = response.text().await.unwrap_or_default();
            Err(CalendarError::ApiError(format!("{}: {}", status, text)))
        }
    }
}
