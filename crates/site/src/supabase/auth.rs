//! Email/password authentication over `/auth/v1`.
//!
//! Successful sign-ins, token refreshes and sign-outs are broadcast as
//! [`AuthEvent`]s; see [`SupabaseClient::subscribe`].

use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::broadcast;
use tracing::instrument;
use uuid::Uuid;

use super::{Caller, SupabaseClient, SupabaseError, check, json};

/// A signed-in user as reported by the auth service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
}

/// Tokens issued by a password or refresh-token grant.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    /// Lifetime of the access token in seconds.
    pub expires_in: i64,
    /// Unix timestamp of expiry; older servers omit it.
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: AuthUser,
}

impl AuthSession {
    /// Unix timestamp at which the access token expires.
    #[must_use]
    pub fn expires_at_or(&self, now: i64) -> i64 {
        self.expires_at.unwrap_or(now + self.expires_in)
    }
}

/// Auth state changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn(AuthUser),
    TokenRefreshed(Uuid),
    SignedOut,
}

impl SupabaseClient {
    fn auth_url(&self, path: &str) -> String {
        self.url(&format!("/auth/v1/{path}"))
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCredentials` with the provider's message when the
    /// pair is rejected, or any request error.
    #[instrument(skip(self, password))]
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, SupabaseError> {
        let response = self
            .request(
                Method::POST,
                &self.auth_url("token?grant_type=password"),
                Caller::Anonymous,
            )
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;

        let session: AuthSession = match check(response).await {
            Ok(response) => json(response).await?,
            Err(SupabaseError::Api { status: 400, message }) | Err(SupabaseError::Unauthorized(message)) => {
                return Err(SupabaseError::InvalidCredentials(message));
            }
            Err(e) => return Err(e),
        };

        tracing::info!(user_id = %session.user.id, "Admin signed in");
        self.emit(AuthEvent::SignedIn(session.user.clone()));
        Ok(session)
    }

    /// Exchange a refresh token for a new session.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` when the refresh token is spent or revoked.
    #[instrument(skip_all)]
    pub async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, SupabaseError> {
        let response = self
            .request(
                Method::POST,
                &self.auth_url("token?grant_type=refresh_token"),
                Caller::Anonymous,
            )
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await?;

        let session: AuthSession = match check(response).await {
            Ok(response) => json(response).await?,
            Err(SupabaseError::Api { status: 400, message }) => {
                return Err(SupabaseError::Unauthorized(message));
            }
            Err(e) => return Err(e),
        };

        tracing::debug!(user_id = %session.user.id, "Access token refreshed");
        self.emit(AuthEvent::TokenRefreshed(session.user.id));
        Ok(session)
    }

    /// Revoke the session at the provider.
    ///
    /// An already expired or unknown token counts as signed out.
    ///
    /// # Errors
    ///
    /// Returns error if the provider is unreachable or fails.
    #[instrument(skip_all)]
    pub async fn sign_out(&self, access_token: &str) -> Result<(), SupabaseError> {
        let response = self
            .request(Method::POST, &self.auth_url("logout"), Caller::Admin(access_token))
            .send()
            .await?;

        match response.status() {
            s if s.is_success() => {}
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => {
                tracing::debug!(status = %response.status(), "Session already gone at provider");
            }
            _ => {
                check(response).await?;
            }
        }

        self.emit(AuthEvent::SignedOut);
        Ok(())
    }

    /// Fetch the user an access token belongs to.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` if the token is invalid or expired.
    #[instrument(skip_all)]
    pub async fn get_user(&self, access_token: &str) -> Result<AuthUser, SupabaseError> {
        let response = self
            .request(Method::GET, &self.auth_url("user"), Caller::Admin(access_token))
            .send()
            .await?;
        json(check(response).await?).await
    }
}

/// Log auth state changes until the client is dropped.
pub async fn log_auth_events(mut events: broadcast::Receiver<AuthEvent>) {
    loop {
        match events.recv().await {
            Ok(AuthEvent::SignedIn(user)) => {
                tracing::info!(
                    target: "studio_site::audit",
                    user_id = %user.id,
                    email = user.email.as_deref().unwrap_or_default(),
                    "signed in"
                );
            }
            Ok(AuthEvent::TokenRefreshed(user_id)) => {
                tracing::debug!(target: "studio_site::audit", %user_id, "token refreshed");
            }
            Ok(AuthEvent::SignedOut) => {
                tracing::info!(target: "studio_site::audit", "signed out");
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Auth event log fell behind");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
