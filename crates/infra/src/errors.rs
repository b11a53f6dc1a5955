//! Conversions from external infrastructure errors into domain errors.

use daybridge_domain::DaybridgeError;
use reqwest::Error as HttpError;
use rusqlite::Error as SqlError;

/// Error newtype that keeps conversions on the infrastructure side and can
/// be converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub DaybridgeError);

impl From<InfraError> for DaybridgeError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<DaybridgeError> for InfraError {
    fn from(value: DaybridgeError) -> Self {
        InfraError(value)
    }
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → DaybridgeError */
/* -------------------------------------------------------------------------- */

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        let mapped = match value {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match (err.code, err.extended_code) {
                    (ErrorCode::DatabaseBusy, _) => {
                        DaybridgeError::Database("database is busy".into())
                    }
                    (ErrorCode::DatabaseLocked, _) => {
                        DaybridgeError::Database("database is locked".into())
                    }
                    (ErrorCode::ConstraintViolation, 2067) => {
                        DaybridgeError::Database("unique constraint violation".into())
                    }
                    (ErrorCode::ConstraintViolation, 787) => {
                        DaybridgeError::Database("foreign key constraint violation".into())
                    }
                    _ => DaybridgeError::Database(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            RE::QueryReturnedNoRows => {
                DaybridgeError::NotFound("no rows returned by query".into())
            }
            RE::FromSqlConversionFailure(_, _, cause) => {
                DaybridgeError::Database(format!("failed to convert sqlite value: {cause}"))
            }
            RE::InvalidColumnType(_, _, ty) => {
                DaybridgeError::Database(format!("invalid column type: {ty}"))
            }
            RE::Utf8Error(_) => {
                DaybridgeError::Database("invalid UTF-8 returned from sqlite".into())
            }
            RE::InvalidQuery => DaybridgeError::Database("invalid SQL query".into()),
            other => DaybridgeError::Database(other.to_string()),
        };

        InfraError(mapped)
    }
}

/* -------------------------------------------------------------------------- */
/* r2d2::Error → DaybridgeError */
/* -------------------------------------------------------------------------- */

impl From<r2d2::Error> for InfraError {
    fn from(value: r2d2::Error) -> Self {
        InfraError(DaybridgeError::Database(format!("connection pool error: {value}")))
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → DaybridgeError */
/* -------------------------------------------------------------------------- */

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        let mapped = if value.is_timeout() {
            DaybridgeError::Provider(format!("request timed out: {value}"))
        } else if value.is_connect() {
            DaybridgeError::Provider(format!("connection failed: {value}"))
        } else if value.is_decode() {
            DaybridgeError::Provider(format!("response body could not be decoded: {value}"))
        } else {
            DaybridgeError::Provider(value.to_string())
        };

        InfraError(mapped)
    }
}

/* -------------------------------------------------------------------------- */
/* serde_json::Error → DaybridgeError */
/* -------------------------------------------------------------------------- */

impl From<serde_json::Error> for InfraError {
    fn from(value: serde_json::Error) -> Self {
        InfraError(DaybridgeError::Database(format!("json (de)serialization failed: {value}")))
    }
}
