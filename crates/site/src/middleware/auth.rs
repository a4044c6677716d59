//! Session guard for the admin panel.
//!
//! A signed-in admin is whoever holds an [`AdminSession`] in their session.
//! There are no roles: presence of a session is the authorization.

use axum::{
    extract::{FromRequestParts, OriginalUri},
    http::{HeaderMap, Method, StatusCode, Uri, header::ACCEPT, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::models::{AdminSession, session_keys};
use crate::state::AppState;

/// Extractor that requires a signed-in admin.
///
/// Refreshes the hosted access token when it is about to expire, so
/// handlers can call Supabase with [`AdminSession::caller`] directly.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(RequireSession(admin): RequireSession) -> impl IntoResponse {
///     format!("Hello, {}!", admin.user_id)
/// }
/// ```
pub struct RequireSession(pub AdminSession);

/// Error returned when a page needs a session and there is none.
#[derive(Debug, PartialEq, Eq)]
pub enum AuthRejection {
    /// Redirect to the login page (for HTML requests).
    RedirectToLogin(String),
    /// Unauthorized response (for JSON requests).
    Unauthorized,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin(location) => Redirect::to(&location).into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
        }
    }
}

impl FromRequestParts<AppState> for RequireSession {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let reject = || {
            if wants_json(&parts.headers) {
                AuthRejection::Unauthorized
            } else {
                // Nested routers see the URI with the admin prefix stripped
                let uri = parts
                    .extensions
                    .get::<OriginalUri>()
                    .map_or(&parts.uri, |original| &original.0);
                AuthRejection::RedirectToLogin(login_location(
                    &state.admin().login_path,
                    &parts.method,
                    uri,
                ))
            }
        };

        // Set by SessionManagerLayer
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or(AuthRejection::Unauthorized)?;

        let Some(admin) = session
            .get::<AdminSession>(session_keys::ADMIN)
            .await
            .ok()
            .flatten()
        else {
            return Err(reject());
        };

        let now = chrono::Utc::now().timestamp();
        if !admin.needs_refresh(now) {
            return Ok(Self(admin));
        }

        match state.supabase().refresh_session(&admin.refresh_token).await {
            Ok(auth) => {
                let refreshed = AdminSession::from_auth(&auth, now);
                if let Err(e) = set_admin_session(&session, &refreshed).await {
                    tracing::warn!(error = %e, "Failed to store refreshed tokens");
                }
                Ok(Self(refreshed))
            }
            Err(e) if e.is_unauthorized() => {
                tracing::info!(user_id = %admin.user_id, "Session revoked at provider");
                if let Err(e) = clear_admin_session(&session).await {
                    tracing::warn!(error = %e, "Failed to clear revoked session");
                }
                Err(reject())
            }
            // Provider unreachable: keep going while the old token still works.
            Err(e) if admin.expires_at > now => {
                tracing::warn!(error = %e, "Token refresh failed, using current token");
                Ok(Self(admin))
            }
            Err(e) => {
                tracing::warn!(error = %e, "Token refresh failed after expiry");
                Err(reject())
            }
        }
    }
}

/// Whether the client asked for JSON rather than a page.
fn wants_json(headers: &HeaderMap) -> bool {
    headers
        .get(ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.contains("application/json") && !accept.contains("text/html"))
}

/// Login URL that returns to the requested page after sign-in.
///
/// Only GET requests are worth returning to; a POST target would replay
/// nothing useful after the redirect.
fn login_location(login_path: &str, method: &Method, uri: &Uri) -> String {
    if method != Method::GET {
        return login_path.to_string();
    }
    let next = uri.path_and_query().map_or("/", |pq| pq.as_str());
    format!("{login_path}?next={}", urlencoding::encode(next))
}

/// Store the signed-in admin in the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_admin_session(
    session: &Session,
    admin: &AdminSession,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::ADMIN, admin).await
}

/// Start a fresh session for a newly signed-in admin.
///
/// Cycles the session id first so a pre-login cookie can't be reused.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn begin_admin_session(
    session: &Session,
    admin: &AdminSession,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    set_admin_session(session, admin).await
}

/// Drop everything in the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_admin_session(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}
