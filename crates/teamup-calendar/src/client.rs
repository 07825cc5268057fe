//! Teamup API client.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use chrono::NaiveDate;
use tracing::instrument;

use crate::error::TeamupError;
use crate::types::*;

/// Remote calendar capability the cache coordinator depends on.
pub trait CalendarSource {
    /// Sub-calendar directory: id to display name.
    fn list_subcalendars(
        &self,
        calendar_id: &str,
    ) -> impl Future<Output = Result<HashMap<i64, String>, TeamupError>> + Send;

    /// Events whose window falls within `start_date..=end_date`.
    fn list_events(
        &self,
        calendar_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> impl Future<Output = Result<Vec<ApiEvent>, TeamupError>> + Send;
}

pub struct TeamupClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl TeamupClient {
    /// Create a client against `base_url` with a request timeout.
    pub fn new(api_key: &str, base_url: &str, timeout: Duration) -> Result<Self, TeamupError> {
        let mut builder = reqwest::Client::builder();
        if !timeout.is_zero() {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Helper to issue an authenticated GET.
    async fn get(&self, url: &str) -> Result<reqwest::Response, TeamupError> {
        let response = self
            .client
            .get(url)
            .header("Teamup-Token", &self.api_key)
            .header("Content-Type", "application/json")
            .send()
            .await?;
        Ok(response)
    }

    /// Helper to handle API responses and errors.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, TeamupError> {
        let status = response.status();

        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| TeamupError::ApiError(format!("JSON parse error: {}", e)))
        } else if status.as_u16() == 401 {
            Err(TeamupError::AuthRequired)
        } else if status.as_u16() == 403 {
            Err(TeamupError::Forbidden)
        } else if status.as_u16() == 404 {
            let text = response.text().await.unwrap_or_default();
            Err(TeamupError::CalendarNotFound(text))
        } else if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            Err(TeamupError::RateLimited(retry_after))
        } else {
            let text = response.text().await.unwrap_or_default();
            Err(TeamupError::ApiError(format!("{}: {}", status, text)))
        }
    }
}

impl CalendarSource for TeamupClient {
    #[instrument(skip(self), level = "info")]
    async fn list_subcalendars(
        &self,
        calendar_id: &str,
    ) -> Result<HashMap<i64, String>, TeamupError> {
        let url = format!(
            "{}/{}/subcalendars",
            self.base_url,
            urlencoding::encode(calendar_id),
        );

        let response = self.get(&url).await?;
        let resp: SubcalendarListResponse = self.handle_response(response).await?;

        Ok(resp
            .subcalendars
            .into_iter()
            .map(|sub| (sub.id, sub.name))
            .collect())
    }

    #[instrument(skip(self), level = "info")]
    async fn list_events(
        &self,
        calendar_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<ApiEvent>, TeamupError> {
        let url = format!(
            "{}/{}/events?startDate={}&endDate={}",
            self.base_url,
            urlencoding::encode(calendar_id),
            start_date.format("%Y-%m-%d"),
            end_date.format("%Y-%m-%d"),
        );

        let response = self.get(&url).await?;
        let resp: EventListResponse = self.handle_response(response).await?;
        tracing::debug!(count = resp.events.len(), "Fetched events");
        Ok(resp.events)
    }
}
