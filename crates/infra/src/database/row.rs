//! Column conversion helpers shared by the repositories.
//!
//! Timestamps are persisted as RFC 3339 TEXT in UTC, dates as `YYYY-MM-DD`
//! TEXT, and list/JSON columns as serialized JSON TEXT. Parse failures
//! surface as rusqlite conversion errors so `query_map` closures stay
//! uniform.

use chrono::{DateTime, NaiveDate, Utc};
use daybridge_domain::{EventSource, EventSyncStatus};
use rusqlite::types::Type;

pub(crate) fn timestamp_to_sql(value: &DateTime<Utc>) -> String {
    value.to_rfc3339()
}

pub(crate) fn timestamp_opt_to_sql(value: &Option<DateTime<Utc>>) -> Option<String> {
    value.as_ref().map(timestamp_to_sql)
}

pub(crate) fn date_opt_to_sql(value: &Option<NaiveDate>) -> Option<String> {
    value.map(|d| d.to_string())
}

pub(crate) fn timestamp_from_sql(idx: usize, value: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn timestamp_opt_from_sql(
    idx: usize,
    value: Option<String>,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    value.map(|v| timestamp_from_sql(idx, v)).transpose()
}

pub(crate) fn date_opt_from_sql(
    idx: usize,
    value: Option<String>,
) -> rusqlite::Result<Option<NaiveDate>> {
    value
        .map(|v| {
            v.parse::<NaiveDate>().map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
            })
        })
        .transpose()
}

pub(crate) fn json_from_sql(idx: usize, value: String) -> rusqlite::Result<serde_json::Value> {
    serde_json::from_str(&value)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn string_list_from_sql(idx: usize, value: String) -> rusqlite::Result<Vec<String>> {
    serde_json::from_str(&value)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn source_from_sql(idx: usize, value: String) -> rusqlite::Result<EventSource> {
    EventSource::parse(&value).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("unknown event source: {value}").into(),
        )
    })
}

pub(crate) fn status_from_sql(idx: usize, value: String) -> rusqlite::Result<EventSyncStatus> {
    EventSyncStatus::parse(&value).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("unknown sync status: {value}").into(),
        )
    })
}
