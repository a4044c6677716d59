//! Session-related types for admin authentication.
//!
//! Types stored in the session for authentication state.

use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use uuid::Uuid;

use crate::supabase::{AuthSession, Caller};

/// Refresh the access token when it has less than this many seconds left.
pub const REFRESH_MARGIN_SECONDS: i64 = 60;

/// Session-stored admin identity and hosted-auth tokens.
#[derive(Clone, Serialize, Deserialize)]
pub struct AdminSession {
    pub user_id: Uuid,
    pub email: Option<String>,
    pub access_token: String,
    pub refresh_token: String,
    /// Unix timestamp at which `access_token` expires.
    pub expires_at: i64,
}

impl std::fmt::Debug for AdminSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminSession")
            .field("user_id", &self.user_id)
            .field("email", &self.email)
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl AdminSession {
    /// Build the stored session from a fresh grant.
    #[must_use]
    pub fn from_auth(auth: &AuthSession, now: i64) -> Self {
        Self {
            user_id: auth.user.id,
            email: auth.user.email.clone(),
            access_token: auth.access_token.clone(),
            refresh_token: auth.refresh_token.clone(),
            expires_at: auth.expires_at_or(now),
        }
    }

    /// Whether the access token is expired or about to be.
    #[must_use]
    pub const fn needs_refresh(&self, now: i64) -> bool {
        self.expires_at - now <= REFRESH_MARGIN_SECONDS
    }

    /// Credentials for hosted calls made on this admin's behalf.
    #[must_use]
    pub fn caller(&self) -> Caller<'_> {
        Caller::Admin(&self.access_token)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlashKind {
    Success,
    Error,
}

/// One-shot message shown on the next admin page after a redirect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Error,
            message: message.into(),
        }
    }

    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self.kind, FlashKind::Error)
    }

    /// Queue a flash for the next page.
    ///
    /// Failing to store it only loses the message, so errors are logged.
    pub async fn set(self, session: &Session) {
        if let Err(e) = session.insert(session_keys::FLASH, self).await {
            tracing::warn!(error = %e, "Failed to store flash message");
        }
    }

    /// Take the pending flash, if any.
    pub async fn take(session: &Session) -> Option<Self> {
        session
            .remove::<Self>(session_keys::FLASH)
            .await
            .ok()
            .flatten()
    }
}

/// Session keys for admin authentication data.
pub mod session_keys {
    /// Key for the signed-in admin.
    pub const ADMIN: &str = "admin";

    /// Key for the pending flash message.
    pub const FLASH: &str = "flash";
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(expires_at: i64) -> AdminSession {
        AdminSession {
            user_id: Uuid::nil(),
            email: Some("owner@studio.dev".to_string()),
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            expires_at,
        }
    }

    #[test]
    fn test_needs_refresh() {
        assert!(!session(1_000).needs_refresh(900));
        assert!(session(1_000).needs_refresh(940));
        assert!(session(1_000).needs_refresh(2_000));
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let debug_output = format!("{:?}", session(0));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("access\""));
        assert!(!debug_output.contains("refresh\""));
    }

    #[test]
    fn test_caller_uses_access_token() {
        assert_eq!(session(0).caller(), Caller::Admin("access"));
    }
}
