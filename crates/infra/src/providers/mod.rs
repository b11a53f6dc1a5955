//! HTTP clients for the remote providers.
//!
//! Base URLs are injectable so tests can point the clients at a local mock
//! server; production callers use the defaults.

pub mod google;
pub mod lifelog;

pub use google::{GoogleCalendarClient, GoogleOAuthClient};
pub use lifelog::LifelogApiClient;

/// Production lifelog API base URL.
pub const DEFAULT_LIFELOG_BASE: &str = "https://api.lifelog.ai";

/// Production Google Calendar API base URL.
pub const DEFAULT_GOOGLE_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// Production Google OAuth endpoint base URL.
pub const DEFAULT_GOOGLE_OAUTH_BASE: &str = "https://oauth2.googleapis.com";
