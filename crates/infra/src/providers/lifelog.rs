//! Lifelog API client
//!
//! Implements the [`LifelogProvider`] port against the lifelog HTTP API.
//! Authentication is a static `X-API-Key` header; paging is an opaque
//! cursor scoped to one date query.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use daybridge_core::{LifelogPage, LifelogProvider};
use daybridge_domain::{DaybridgeError, LifelogEntry, Result};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use super::DEFAULT_LIFELOG_BASE;
use crate::errors::InfraError;

/// Capture recordings can be large; the API is slow on heavy days.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// HTTP client for the lifelog capture API.
pub struct LifelogApiClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl LifelogApiClient {
    /// Create a client against the production API.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_base_url(api_key, DEFAULT_LIFELOG_BASE)
    }

    /// Create a client against a custom base URL (tests, staging).
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(InfraError::from)?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl LifelogProvider for LifelogApiClient {
    async fn list_by_date(
        &self,
        date: NaiveDate,
        timezone: &str,
        cursor: Option<&str>,
        limit: Option<u32>,
    ) -> Result<LifelogPage> {
        let url = format!("{}/v1/lifelogs", self.base_url);

        let mut query: Vec<(&str, String)> = vec![
            ("date", date.to_string()),
            ("timezone", timezone.to_string()),
            ("includeMarkdown", "true".to_string()),
        ];
        if let Some(cursor) = cursor {
            query.push(("cursor", cursor.to_string()));
        }
        if let Some(limit) = limit {
            query.push(("limit", limit.to_string()));
        }

        debug!(%date, timezone, cursor, "fetching lifelogs");

        let response = self
            .client
            .get(&url)
            .header("X-API-Key", &self.api_key)
            .query(&query)
            .send()
            .await
            .map_err(InfraError::from)?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text =
                response.text().await.unwrap_or_else(|_| "unknown error".to_string());
            return Err(DaybridgeError::Provider(format!(
                "lifelog API error ({status}): {error_text}"
            )));
        }

        let envelope: LifelogEnvelope = response.json().await.map_err(InfraError::from)?;

        let raw_entries = envelope.data.lifelogs;
        let meta = envelope.meta.lifelogs;

        let mut entries = Vec::with_capacity(raw_entries.len());
        let mut skipped = 0usize;
        for raw in raw_entries {
            match convert_entry(raw) {
                Ok(entry) => entries.push(entry),
                Err(reason) => {
                    skipped += 1;
                    warn!(%date, error = %reason, "skipping malformed lifelog entry");
                }
            }
        }

        if skipped > 0 {
            warn!(skipped, kept = entries.len(), "dropped malformed lifelog entries");
        }

        let next_cursor = meta.next_cursor.filter(|c| !c.is_empty());
        let has_more = next_cursor.is_some();
        let count = meta.count.unwrap_or(entries.len() as i64);

        Ok(LifelogPage { entries, next_cursor, count, has_more })
    }
}

fn convert_entry(raw: RawLifelog) -> std::result::Result<LifelogEntry, String> {
    let created_at = parse_timestamp(&raw.start_time)
        .map_err(|e| format!("entry {}: invalid startTime: {e}", raw.id))?;
    let updated_at = match raw.end_time.as_deref() {
        Some(end) => {
            parse_timestamp(end).map_err(|e| format!("entry {}: invalid endTime: {e}", raw.id))?
        }
        None => created_at,
    };

    let markdown = raw.markdown.unwrap_or_default();
    let title = raw
        .title
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| first_line_of(&markdown).to_string());

    // Lifelog content arrives pre-transcribed; the markdown body doubles as
    // the transcript text.
    let transcript_text = if markdown.is_empty() { None } else { Some(markdown.clone()) };

    Ok(LifelogEntry {
        id: raw.id,
        title,
        content: markdown.clone(),
        markdown,
        created_at,
        updated_at,
        audio_url: raw.audio_url,
        transcript_text,
    })
}

fn first_line_of(markdown: &str) -> &str {
    markdown.lines().next().map(|l| l.trim_start_matches('#').trim()).unwrap_or("")
}

fn parse_timestamp(value: &str) -> std::result::Result<DateTime<Utc>, String> {
    let trimmed = value.trim();
    let has_explicit_timezone = trimmed.ends_with('Z')
        || trimmed
            .rfind('T')
            .is_some_and(|idx| trimmed[idx + 1..].chars().any(|c| matches!(c, '+' | '-')));

    let candidate = if has_explicit_timezone { trimmed.to_string() } else { format!("{trimmed}Z") };

    DateTime::parse_from_rfc3339(&candidate)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("invalid timestamp '{value}': {e}"))
}

#[derive(Debug, Deserialize)]
struct LifelogEnvelope {
    data: LifelogData,
    #[serde(default)]
    meta: LifelogMeta,
}

#[derive(Debug, Deserialize)]
struct LifelogData {
    #[serde(default)]
    lifelogs: Vec<RawLifelog>,
}

#[derive(Debug, Default, Deserialize)]
struct LifelogMeta {
    #[serde(default)]
    lifelogs: LifelogPageMeta,
}

#[derive(Debug, Default, Deserialize)]
struct LifelogPageMeta {
    #[serde(rename = "nextCursor")]
    next_cursor: Option<String>,
    count: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct RawLifelog {
    id: String,
    title: Option<String>,
    markdown: Option<String>,
    #[serde(rename = "startTime")]
    start_time: String,
    #[serde(rename = "endTime")]
    end_time: Option<String>,
    #[serde(rename = "audioUrl")]
    audio_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_without_offset_are_treated_as_utc() {
        let parsed = parse_timestamp("2026-08-27T09:00:00").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2026-08-27T09:00:00+00:00");
    }

    #[test]
    fn missing_title_falls_back_to_first_markdown_line() {
        let raw = RawLifelog {
            id: "ll-1".to_string(),
            title: None,
            markdown: Some("# Morning walk\n\nDetails.".to_string()),
            start_time: "2026-08-27T09:00:00Z".to_string(),
            end_time: None,
            audio_url: None,
        };

        let entry = convert_entry(raw).unwrap();
        assert_eq!(entry.title, "Morning walk");
        assert_eq!(entry.transcript_text.as_deref(), Some("# Morning walk\n\nDetails."));
    }
}
