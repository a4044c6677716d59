//! Supabase client: the data-access layer of the site.
//!
//! One `reqwest::Client` talks to the three hosted services of a Supabase
//! project:
//!
//! - [`rest`] - `PostgREST` tables (`/rest/v1`)
//! - [`storage`] - object storage (`/storage/v1`)
//! - [`auth`] - `GoTrue` email/password auth (`/auth/v1`)
//!
//! Entity operations built on top live in [`services`], [`projects`],
//! [`contacts`] and [`media`]. Every call names its [`Caller`]: the anon
//! key for public reads and the contact form, or the signed-in admin's
//! access token so row-level security applies.

pub mod auth;
pub mod contacts;
pub mod media;
pub mod projects;
pub mod rest;
pub mod services;
pub mod storage;

use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::config::SupabaseConfig;

pub use auth::{AuthEvent, AuthSession, AuthUser};
pub use rest::Query;
pub use services::{Direction, Visibility};
pub use storage::StorageObject;

/// Table holding the services section.
pub const SERVICES_TABLE: &str = "services";
/// Table holding portfolio projects.
pub const PROJECTS_TABLE: &str = "projects_portfolio";
/// Table holding contact form messages.
pub const CONTACTS_TABLE: &str = "contacts";

/// Capacity of the auth event channel. Slow subscribers lag, never block.
const AUTH_EVENT_CAPACITY: usize = 32;

/// Errors that can occur when talking to Supabase.
#[derive(Debug, Error)]
pub enum SupabaseError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Missing or expired credentials.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The row or object does not exist.
    #[error("Not found")]
    NotFound,

    /// A unique constraint rejected the write.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Uploads must be images.
    #[error("Unsupported file type: {0}")]
    UnsupportedType(String),

    /// Email/password sign-in was rejected.
    #[error("{0}")]
    InvalidCredentials(String),

    /// The client could not be built from configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl SupabaseError {
    /// Build an error from a non-success response body.
    ///
    /// The hosted services disagree on field names: `PostgREST` uses
    /// `message`, `GoTrue` uses `msg` or `error_description`, storage uses
    /// `message` or `error`.
    pub(crate) fn from_body(status: StatusCode, body: &str) -> Self {
        #[derive(Deserialize)]
        struct ErrorBody {
            message: Option<String>,
            msg: Option<String>,
            error_description: Option<String>,
            error: Option<String>,
            code: Option<serde_json::Value>,
            #[serde(rename = "statusCode")]
            status_code: Option<serde_json::Value>,
        }

        let parsed = serde_json::from_str::<ErrorBody>(body).ok();
        let message = parsed
            .as_ref()
            .and_then(|b| {
                b.message
                    .clone()
                    .or_else(|| b.msg.clone())
                    .or_else(|| b.error_description.clone())
                    .or_else(|| b.error.clone())
            })
            .unwrap_or_else(|| body.trim().to_string());

        // Storage reports missing objects as 400 with statusCode "404".
        let embedded_404 = parsed
            .as_ref()
            .and_then(|b| b.status_code.as_ref())
            .is_some_and(|c| c.as_str() == Some("404") || c.as_u64() == Some(404));
        let unique_violation = parsed
            .as_ref()
            .and_then(|b| b.code.as_ref())
            .is_some_and(|c| c.as_str() == Some("23505"));

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Self::Unauthorized(message),
            StatusCode::NOT_FOUND => Self::NotFound,
            _ if embedded_404 => Self::NotFound,
            StatusCode::CONFLICT => Self::Conflict(message),
            _ if unique_violation => Self::Conflict(message),
            _ => Self::Api {
                status: status.as_u16(),
                message,
            },
        }
    }

    /// Message fit to show an admin after a failed action.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Http(_) => "The content service could not be reached.".to_string(),
            Self::Api { message, .. }
            | Self::Conflict(message)
            | Self::InvalidCredentials(message) => message.clone(),
            Self::Unauthorized(_) => "Your session has expired. Please sign in again.".to_string(),
            Self::NotFound => "It no longer exists.".to_string(),
            Self::Parse(_) | Self::Config(_) => {
                "The content service sent an unexpected response.".to_string()
            }
            Self::UnsupportedType(_) => {
                "Only PNG, JPEG, WebP, GIF or AVIF images can be uploaded.".to_string()
            }
        }
    }

    /// Whether the error means the admin's token is no longer accepted.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }
}

/// Whose credentials a request is made with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Caller<'a> {
    /// The anon key; public reads and the contact form.
    Anonymous,
    /// A signed-in admin's access token.
    Admin(&'a str),
}

/// Supabase API client.
///
/// Cheap to clone; all clones share one connection pool and one auth event
/// channel.
#[derive(Clone)]
pub struct SupabaseClient {
    inner: Arc<SupabaseClientInner>,
}

struct SupabaseClientInner {
    http: reqwest::Client,
    base_url: String,
    anon_key: SecretString,
    bucket: String,
    auth_events: broadcast::Sender<AuthEvent>,
}

impl SupabaseClient {
    /// Create a new Supabase client.
    ///
    /// # Errors
    ///
    /// Returns error if the anon key is not a valid header value or the
    /// HTTP client fails to build.
    pub fn new(config: &SupabaseConfig) -> Result<Self, SupabaseError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "apikey",
            HeaderValue::from_str(config.anon_key())
                .map_err(|e| SupabaseError::Config(format!("Invalid anon key format: {e}")))?,
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(concat!("studio-site/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let (auth_events, _) = broadcast::channel(AUTH_EVENT_CAPACITY);

        Ok(Self {
            inner: Arc::new(SupabaseClientInner {
                http,
                base_url: config.url.trim_end_matches('/').to_string(),
                anon_key: config.anon_key.clone(),
                bucket: config.media_bucket.clone(),
                auth_events,
            }),
        })
    }

    /// Storage bucket holding project media.
    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.inner.bucket
    }

    /// Receive auth state changes (sign-in, token refresh, sign-out).
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.inner.auth_events.subscribe()
    }

    pub(crate) fn emit(&self, event: AuthEvent) {
        // No receivers is fine.
        let _ = self.inner.auth_events.send(event);
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{path}", self.inner.base_url)
    }

    /// Start a request with the caller's bearer token.
    pub(crate) fn request(&self, method: Method, url: &str, caller: Caller<'_>) -> RequestBuilder {
        let token = match caller {
            Caller::Anonymous => self.inner.anon_key.expose_secret(),
            Caller::Admin(token) => token,
        };
        self.inner.http.request(method, url).bearer_auth(token)
    }
}

/// Turn a non-success response into a [`SupabaseError`].
pub(crate) async fn check(response: Response) -> Result<Response, SupabaseError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(SupabaseError::from_body(status, &body))
}

/// Decode a JSON body.
pub(crate) async fn json<T: serde::de::DeserializeOwned>(
    response: Response,
) -> Result<T, SupabaseError> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| SupabaseError::Parse(e.to_string()))
}

#[cfg(test)]
pub(crate) mod test_support {
    use httpmock::MockServer;
    use secrecy::SecretString;

    use super::SupabaseClient;
    use crate::config::SupabaseConfig;

    pub const ANON_KEY: &str = "header.payload.anon";
    pub const ADMIN_TOKEN: &str = "header.payload.admin";

    pub fn config_for(server: &MockServer) -> SupabaseConfig {
        SupabaseConfig {
            url: server.base_url(),
            anon_key: SecretString::from(ANON_KEY),
            media_bucket: "project-previews".to_string(),
        }
    }

    #[allow(clippy::expect_used)]
    pub fn client_for(server: &MockServer) -> SupabaseClient {
        SupabaseClient::new(&config_for(server)).expect("client builds")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_from_postgrest_body() {
        let err = SupabaseError::from_body(
            StatusCode::BAD_REQUEST,
            r#"{"code":"22P02","message":"invalid input syntax for type uuid"}"#,
        );
        assert!(matches!(
            err,
            SupabaseError::Api { status: 400, ref message } if message == "invalid input syntax for type uuid"
        ));
    }

    #[test]
    fn test_error_from_gotrue_body() {
        let err = SupabaseError::from_body(
            StatusCode::BAD_REQUEST,
            r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#,
        );
        assert_eq!(err.to_string(), "API error: 400 - Invalid login credentials");

        let err = SupabaseError::from_body(StatusCode::UNAUTHORIZED, r#"{"msg":"JWT expired"}"#);
        assert!(err.is_unauthorized());
    }

    #[test]
    fn test_error_from_storage_body() {
        let err = SupabaseError::from_body(
            StatusCode::BAD_REQUEST,
            r#"{"statusCode":"404","error":"not_found","message":"Object not found"}"#,
        );
        assert!(matches!(err, SupabaseError::NotFound));
    }

    #[test]
    fn test_error_unique_violation() {
        let err = SupabaseError::from_body(
            StatusCode::CONFLICT,
            r#"{"code":"23505","message":"duplicate key value violates unique constraint"}"#,
        );
        assert!(matches!(err, SupabaseError::Conflict(_)));
    }

    #[test]
    fn test_error_plain_text_body() {
        let err = SupabaseError::from_body(StatusCode::BAD_GATEWAY, "upstream down\n");
        assert_eq!(err.to_string(), "API error: 502 - upstream down");
    }
}
