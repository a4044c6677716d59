//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. Route handlers return `Result<T, AppError>`
//! when a failure should abort the page; list fetches on content pages log
//! and fall back to empty sections instead.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::supabase::SupabaseError;

/// Application-level error type for the site.
#[derive(Debug, Error)]
pub enum AppError {
    /// Supabase request failed.
    #[error("Supabase error: {0}")]
    Supabase(#[from] SupabaseError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),
}

impl AppError {
    const fn status(&self) -> StatusCode {
        match self {
            Self::Supabase(err) => match err {
                SupabaseError::NotFound => StatusCode::NOT_FOUND,
                SupabaseError::Unauthorized(_) | SupabaseError::InvalidCredentials(_) => {
                    StatusCode::UNAUTHORIZED
                }
                SupabaseError::Conflict(_) => StatusCode::CONFLICT,
                SupabaseError::UnsupportedType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
                _ => StatusCode::BAD_GATEWAY,
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture upstream failures to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Supabase(err) => match err {
                SupabaseError::NotFound => "Not found".to_string(),
                SupabaseError::Unauthorized(_) | SupabaseError::InvalidCredentials(_) => {
                    "Please sign in again".to_string()
                }
                SupabaseError::Conflict(_) => "That record already exists".to_string(),
                SupabaseError::UnsupportedType(_) => err.to_string(),
                _ => "External service error".to_string(),
            },
            Self::NotFound(_) => self.to_string(),
        };

        (status, message).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context for the signed-in admin.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}
