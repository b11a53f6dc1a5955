//! Google Calendar provider client
//!
//! Implements the [`CalendarProvider`] and [`OAuthApi`] ports against
//! Google Calendar v3. A rejected sync token (HTTP 410 GONE) surfaces as
//! [`DaybridgeError::SyncTokenGone`] so the engine can discard the stored
//! token; a delete against an already-gone event
//! surfaces as [`DaybridgeError::Conflict`], which the engine treats as
//! success.

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use daybridge_core::{
    CalendarListing, CalendarProvider, EventPage, EventQuery, OAuthApi, RemoteCalendarEvent,
};
use daybridge_domain::{DaybridgeError, EventDraft, Result, TokenSet};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{DEFAULT_GOOGLE_API_BASE, DEFAULT_GOOGLE_OAUTH_BASE};
use crate::errors::InfraError;

const MAX_RESULTS: &str = "250";

/// HTTP client for the Google Calendar v3 API.
pub struct GoogleCalendarClient {
    client: Client,
    base_url: String,
}

impl GoogleCalendarClient {
    /// Create a client against the production API.
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_GOOGLE_API_BASE)
    }

    /// Create a client against a custom base URL (tests, staging).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn events_url(&self, calendar_id: &str) -> String {
        format!("{}/calendars/{}/events", self.base_url, urlencoding::encode(calendar_id))
    }
}

impl Default for GoogleCalendarClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CalendarProvider for GoogleCalendarClient {
    async fn list_calendars(&self, access_token: &str) -> Result<Vec<CalendarListing>> {
        let url = format!("{}/users/me/calendarList", self.base_url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(InfraError::from)?;

        if !response.status().is_success() {
            return Err(api_error("calendar list", response).await);
        }

        let listing: GoogleCalendarList = response.json().await.map_err(InfraError::from)?;

        Ok(listing
            .items
            .into_iter()
            .map(|c| CalendarListing {
                id: c.id,
                summary: c.summary.unwrap_or_default(),
                primary: c.primary.unwrap_or(false),
            })
            .collect())
    }

    async fn fetch_events(
        &self,
        access_token: &str,
        calendar_id: &str,
        query: &EventQuery,
    ) -> Result<EventPage> {
        let mut params: Vec<(&str, String)> = vec![("maxResults", MAX_RESULTS.to_string())];

        // syncToken is mutually exclusive with the window/ordering params.
        match query.sync_token.as_deref() {
            Some(token) => params.push(("syncToken", token.to_string())),
            None => {
                params.push(("singleEvents", "true".to_string()));
                params.push(("orderBy", "startTime".to_string()));
                if let Some(time_min) = query.time_min {
                    params.push(("timeMin", time_min.to_rfc3339()));
                }
                if let Some(time_max) = query.time_max {
                    params.push(("timeMax", time_max.to_rfc3339()));
                }
            }
        }
        if let Some(page_token) = query.page_token.as_deref() {
            params.push(("pageToken", page_token.to_string()));
        }

        debug!(calendar_id, sync_token = query.sync_token.is_some(), "fetching calendar events");

        let response = self
            .client
            .get(self.events_url(calendar_id))
            .bearer_auth(access_token)
            .query(&params)
            .send()
            .await
            .map_err(InfraError::from)?;

        if response.status() == StatusCode::GONE {
            // The stored sync token is no longer usable; the engine clears
            // it and retries with a full pull.
            return Err(DaybridgeError::SyncTokenGone(format!("calendar {calendar_id}")));
        }
        if !response.status().is_success() {
            return Err(api_error("events fetch", response).await);
        }

        let page: GoogleEventsResponse = response.json().await.map_err(InfraError::from)?;

        let mut events = Vec::with_capacity(page.items.len());
        let mut skipped = 0usize;
        for item in page.items {
            match convert_event(item) {
                Ok(event) => events.push(event),
                Err(reason) => {
                    skipped += 1;
                    warn!(error = %reason, "skipping provider calendar event due to parse failure");
                }
            }
        }
        if skipped > 0 {
            warn!(skipped, kept = events.len(), "dropped malformed calendar events");
        }

        Ok(EventPage {
            events,
            next_sync_token: page.next_sync_token,
            next_page_token: page.next_page_token,
        })
    }

    async fn create_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        draft: &EventDraft,
    ) -> Result<RemoteCalendarEvent> {
        let response = self
            .client
            .post(self.events_url(calendar_id))
            .bearer_auth(access_token)
            .json(&event_body(draft))
            .send()
            .await
            .map_err(InfraError::from)?;

        if !response.status().is_success() {
            return Err(api_error("event create", response).await);
        }

        let item: GoogleEvent = response.json().await.map_err(InfraError::from)?;
        convert_event(item).map_err(DaybridgeError::Provider)
    }

    async fn update_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        external_id: &str,
        draft: &EventDraft,
    ) -> Result<RemoteCalendarEvent> {
        let url = format!(
            "{}/{}",
            self.events_url(calendar_id),
            urlencoding::encode(external_id)
        );

        let response = self
            .client
            .put(&url)
            .bearer_auth(access_token)
            .json(&event_body(draft))
            .send()
            .await
            .map_err(InfraError::from)?;

        if !response.status().is_success() {
            return Err(api_error("event update", response).await);
        }

        let item: GoogleEvent = response.json().await.map_err(InfraError::from)?;
        convert_event(item).map_err(DaybridgeError::Provider)
    }

    async fn delete_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        external_id: &str,
    ) -> Result<()> {
        let url = format!(
            "{}/{}",
            self.events_url(calendar_id),
            urlencoding::encode(external_id)
        );

        let response = self
            .client
            .delete(&url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(InfraError::from)?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::GONE | StatusCode::NOT_FOUND => Err(DaybridgeError::Conflict(
                format!("event {external_id} already gone on the remote side"),
            )),
            _ => Err(api_error("event delete", response).await),
        }
    }
}

/// HTTP client for Google's OAuth 2.0 token endpoints.
pub struct GoogleOAuthClient {
    client: Client,
    base_url: String,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

impl GoogleOAuthClient {
    /// Create a client against the production OAuth endpoints.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self::with_base_url(client_id, client_secret, redirect_uri, DEFAULT_GOOGLE_OAUTH_BASE)
    }

    /// Create a client against a custom base URL (tests, staging).
    pub fn with_base_url(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: redirect_uri.into(),
        }
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> Result<TokenSet> {
        let response = self
            .client
            .post(format!("{}/token", self.base_url))
            .form(form)
            .send()
            .await
            .map_err(InfraError::from)?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text =
                response.text().await.unwrap_or_else(|_| "unknown error".to_string());
            return Err(DaybridgeError::Auth(format!(
                "token request failed ({status}): {error_text}"
            )));
        }

        let token: GoogleTokenResponse = response.json().await.map_err(InfraError::from)?;

        Ok(TokenSet {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            token_type: token.token_type.unwrap_or_else(|| "Bearer".to_string()),
            expires_at: Utc::now() + Duration::seconds(token.expires_in),
            scope: token.scope,
        })
    }
}

#[async_trait]
impl OAuthApi for GoogleOAuthClient {
    async fn exchange_code(&self, code: &str) -> Result<TokenSet> {
        self.token_request(&[
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
            ("code", code),
        ])
        .await
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenSet> {
        self.token_request(&[
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ])
        .await
    }

    async fn revoke_token(&self, access_token: &str) -> Result<()> {
        let response = self
            .client
            .post(format!("{}/revoke", self.base_url))
            .form(&[("token", access_token)])
            .send()
            .await
            .map_err(InfraError::from)?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(DaybridgeError::Auth(format!("token revocation failed ({status})")));
        }
        Ok(())
    }
}

async fn api_error(operation: &str, response: reqwest::Response) -> DaybridgeError {
    let status = response.status();
    let error_text = response.text().await.unwrap_or_else(|_| "unknown error".to_string());
    DaybridgeError::Provider(format!("{operation} failed ({status}): {error_text}"))
}

fn convert_event(item: GoogleEvent) -> std::result::Result<RemoteCalendarEvent, String> {
    let metadata = serde_json::to_value(&item).unwrap_or(serde_json::Value::Null);

    let all_day = item.start.as_ref().is_some_and(|s| s.date.is_some());
    let cancelled = item.status.as_deref() == Some("cancelled");

    // Cancellation tombstones from an incremental pull carry only id and
    // status; the engine soft deletes by external id, so the times are
    // irrelevant.
    let start_time = match parse_event_time(item.start.as_ref(), all_day) {
        Ok(time) => time,
        Err(_) if cancelled => Utc::now(),
        Err(e) => return Err(format!("event {}: invalid start: {e}", item.id)),
    };
    let end_time = match parse_event_time(item.end.as_ref(), all_day) {
        Ok(time) => time,
        Err(_) if cancelled => start_time,
        Err(e) => return Err(format!("event {}: invalid end: {e}", item.id)),
    };

    let attendees = item
        .attendees
        .unwrap_or_default()
        .into_iter()
        .filter_map(|a| {
            let email = a.email.trim().to_string();
            if email.is_empty() {
                None
            } else {
                Some(email)
            }
        })
        .collect();

    Ok(RemoteCalendarEvent {
        external_id: item.id,
        title: item.summary.filter(|s| !s.trim().is_empty()).unwrap_or_else(|| {
            "Untitled Event".to_string()
        }),
        description: item.description,
        start_time,
        end_time,
        all_day,
        location: item.location,
        attendees,
        status: item.status,
        etag: item.etag,
        sequence: item.sequence.unwrap_or(0),
        metadata,
    })
}

fn parse_event_time(
    value: Option<&GoogleEventTime>,
    all_day: bool,
) -> std::result::Result<DateTime<Utc>, String> {
    let Some(value) = value else {
        return Err("missing time field".to_string());
    };

    if all_day {
        let date = value.date.as_deref().ok_or("missing all-day date")?;
        let parsed = date
            .parse::<NaiveDate>()
            .map_err(|e| format!("invalid all-day date '{date}': {e}"))?;
        let midnight =
            parsed.and_hms_opt(0, 0, 0).ok_or_else(|| format!("invalid all-day date '{date}'"))?;
        return Ok(midnight.and_utc());
    }

    let date_time = value.date_time.as_deref().ok_or("missing dateTime")?;
    DateTime::parse_from_rfc3339(date_time)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("invalid timestamp '{date_time}': {e}"))
}

fn event_body(draft: &EventDraft) -> GoogleEventBody {
    let (start, end) = if draft.all_day {
        (
            GoogleEventTimeBody {
                date: Some(draft.start_time.date_naive().to_string()),
                date_time: None,
                time_zone: None,
            },
            GoogleEventTimeBody {
                date: Some(draft.end_time.date_naive().to_string()),
                date_time: None,
                time_zone: None,
            },
        )
    } else {
        (
            GoogleEventTimeBody {
                date: None,
                date_time: Some(draft.start_time.to_rfc3339()),
                time_zone: Some(draft.timezone.clone()),
            },
            GoogleEventTimeBody {
                date: None,
                date_time: Some(draft.end_time.to_rfc3339()),
                time_zone: Some(draft.timezone.clone()),
            },
        )
    };

    GoogleEventBody {
        summary: draft.title.clone(),
        description: draft.description.clone(),
        location: draft.location.clone(),
        start,
        end,
        attendees: draft
            .attendees
            .iter()
            .map(|email| GoogleAttendee { email: email.clone() })
            .collect(),
    }
}

/* -------------------------------------------------------------------------- */
/* Wire types */
/* -------------------------------------------------------------------------- */

#[derive(Debug, Deserialize)]
struct GoogleCalendarList {
    #[serde(default)]
    items: Vec<GoogleCalendarListEntry>,
}

#[derive(Debug, Deserialize)]
struct GoogleCalendarListEntry {
    id: String,
    summary: Option<String>,
    primary: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct GoogleEventsResponse {
    #[serde(default)]
    items: Vec<GoogleEvent>,
    #[serde(rename = "nextSyncToken")]
    next_sync_token: Option<String>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GoogleEvent {
    id: String,
    summary: Option<String>,
    description: Option<String>,
    location: Option<String>,
    status: Option<String>,
    etag: Option<String>,
    sequence: Option<i64>,
    start: Option<GoogleEventTime>,
    end: Option<GoogleEventTime>,
    attendees: Option<Vec<GoogleAttendee>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GoogleEventTime {
    #[serde(rename = "dateTime")]
    date_time: Option<String>,
    date: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GoogleAttendee {
    email: String,
}

#[derive(Debug, Serialize)]
struct GoogleEventBody {
    summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<String>,
    start: GoogleEventTimeBody,
    end: GoogleEventTimeBody,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attendees: Vec<GoogleAttendee>,
}

#[derive(Debug, Serialize)]
struct GoogleEventTimeBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    date: Option<String>,
    #[serde(rename = "dateTime", skip_serializing_if = "Option::is_none")]
    date_time: Option<String>,
    #[serde(rename = "timeZone", skip_serializing_if = "Option::is_none")]
    time_zone: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleTokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: i64,
    token_type: Option<String>,
    scope: Option<String>,
}
