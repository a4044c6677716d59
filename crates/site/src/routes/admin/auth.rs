//! Sign-in and sign-out.
//!
//! Credentials go straight to hosted auth; the site keeps only the
//! resulting tokens in the server-side session.

use askama::Template;
use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use studio_core::Email;
use tower_sessions::Session;
use tracing::instrument;

use super::render;
use crate::error::{clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{begin_admin_session, clear_admin_session};
use crate::models::{AdminSession, Flash, session_keys};
use crate::state::AppState;
use crate::supabase::SupabaseError;

/// Sign-in page template.
#[derive(Template)]
#[template(path = "admin/login.html")]
pub struct LoginTemplate {
    pub login_path: String,
    pub email: String,
    pub next: String,
    pub error: Option<String>,
    pub notice: Option<Flash>,
}

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub next: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub next: String,
}

/// Keep a post-login redirect inside the admin panel.
fn safe_next(state: &AppState, next: Option<&str>) -> String {
    let admin = state.admin();
    next.filter(|target| admin.contains(target))
        .map_or_else(|| admin.path.clone(), str::to_string)
}

/// Render the sign-in page.
///
/// An admin who is already signed in goes straight to the dashboard.
#[instrument(skip_all)]
pub async fn login_page(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<LoginQuery>,
) -> Response {
    let signed_in = session
        .get::<AdminSession>(session_keys::ADMIN)
        .await
        .ok()
        .flatten()
        .is_some();
    let next = safe_next(&state, query.next.as_deref());
    if signed_in {
        return Redirect::to(&next).into_response();
    }

    render(&LoginTemplate {
        login_path: state.admin().login_path.clone(),
        email: String::new(),
        next,
        error: None,
        notice: Flash::take(&session).await,
    })
}

/// Sign in with email and password.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Response {
    let next = safe_next(&state, Some(form.next.as_str()));
    let rejected = |status: StatusCode, error: &str| {
        (
            status,
            render(&LoginTemplate {
                login_path: state.admin().login_path.clone(),
                email: form.email.clone(),
                next: next.clone(),
                error: Some(error.to_string()),
                notice: None,
            }),
        )
            .into_response()
    };

    let Ok(email) = Email::parse(&form.email) else {
        return rejected(StatusCode::UNPROCESSABLE_ENTITY, "Enter a valid email address.");
    };
    if form.password.is_empty() {
        return rejected(StatusCode::UNPROCESSABLE_ENTITY, "Enter your password.");
    }

    let auth = match state
        .supabase()
        .sign_in_with_password(email.as_str(), &form.password)
        .await
    {
        Ok(auth) => auth,
        Err(SupabaseError::InvalidCredentials(message)) => {
            tracing::warn!(email_domain = email.domain(), "Sign-in rejected");
            return rejected(StatusCode::UNAUTHORIZED, &message);
        }
        Err(e) => {
            tracing::error!(error = %e, "Sign-in failed");
            return rejected(
                StatusCode::BAD_GATEWAY,
                "Sign-in is unavailable right now. Please try again shortly.",
            );
        }
    };

    let admin = AdminSession::from_auth(&auth, chrono::Utc::now().timestamp());
    if let Err(e) = begin_admin_session(&session, &admin).await {
        tracing::error!(error = %e, "Failed to store admin session");
        return rejected(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Sign-in could not be completed. Please try again.",
        );
    }
    set_sentry_user(&admin.user_id, admin.email.as_deref());

    Redirect::to(&next).into_response()
}

/// Sign out and clear the session.
///
/// The hosted sign-out is best effort: the local session is dropped even
/// when revoking the token fails.
#[instrument(skip_all)]
pub async fn logout(State(state): State<AppState>, session: Session) -> impl IntoResponse {
    if let Ok(Some(admin)) = session.get::<AdminSession>(session_keys::ADMIN).await
        && let Err(e) = state.supabase().sign_out(&admin.access_token).await
    {
        tracing::warn!(error = %e, "Hosted sign-out failed");
    }

    if let Err(e) = clear_admin_session(&session).await {
        tracing::error!(error = %e, "Failed to clear admin session");
    }
    clear_sentry_user();

    Flash::success("You have been signed out.").set(&session).await;
    Redirect::to(&state.admin().login_path)
}
