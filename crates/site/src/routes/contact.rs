//! Contact form route handler.
//!
//! Submissions are validated here and stored with the anon key; the admin
//! inbox reads them back. The route sits behind a per-IP rate limiter.

use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use studio_core::ContactDraft;
use tracing::instrument;

use super::home::{ContactFormView, render_home};
use crate::state::AppState;

/// Where a successful submission lands: the form, showing a thank-you.
pub const SENT_LOCATION: &str = "/?sent=1#contact";

/// Submit the contact form.
///
/// POST /contact
///
/// Invalid input re-renders the page with field errors (422). A failed
/// insert keeps what the visitor typed and asks them to retry (502).
#[instrument(skip_all)]
pub async fn submit(State(state): State<AppState>, Form(draft): Form<ContactDraft>) -> Response {
    let input = match draft.validate() {
        Ok(input) => input,
        Err(errors) => {
            tracing::debug!(fields = errors.len(), "Contact form rejected");
            let form = ContactFormView {
                draft,
                errors,
                ..ContactFormView::default()
            };
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                render_home(&state, form).await,
            )
                .into_response();
        }
    };

    match state.supabase().submit_contact(&input).await {
        Ok(()) => {
            tracing::info!(email_domain = input.email.domain(), "Contact message received");
            Redirect::to(SENT_LOCATION).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to store contact message");
            let form = ContactFormView {
                draft,
                failure: Some(
                    "Your message could not be sent. Please try again in a moment.".to_string(),
                ),
                ..ContactFormView::default()
            };
            (StatusCode::BAD_GATEWAY, render_home(&state, form).await).into_response()
        }
    }
}
