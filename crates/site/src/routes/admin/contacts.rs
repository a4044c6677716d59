//! Contact inbox route handlers.

use askama::Template;
use axum::{
    Form, Router,
    extract::{Path, Query, State},
    response::Response,
    routing::{get, post},
};
use serde::Deserialize;
use studio_core::{ContactMessage, ContactStatus};
use tower_sessions::Session;
use tracing::instrument;
use uuid::Uuid;

use super::{AdminShell, SelectOption, failure, format_date, redirect_with, render};
use crate::filters;
use crate::middleware::RequireSession;
use crate::models::Flash;
use crate::state::AppState;

const SECTION: &str = "contacts";

/// Build the contacts router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/contacts", get(index))
        .route("/contacts/{id}", get(show))
        .route("/contacts/{id}/status", post(set_status))
        .route("/contacts/{id}/delete", post(delete))
}

/// Inbox row for templates.
#[derive(Debug, Clone)]
pub struct ContactRow {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub summary: String,
    pub status: &'static str,
    pub is_new: bool,
    pub received: String,
}

impl From<&ContactMessage> for ContactRow {
    fn from(message: &ContactMessage) -> Self {
        Self {
            id: message.id,
            name: message.name.clone(),
            email: message.email.clone(),
            summary: message.summary(),
            status: message.status.as_str(),
            is_new: message.status == ContactStatus::New,
            received: format_date(&message.created_at),
        }
    }
}

/// Status filter tab.
#[derive(Debug, Clone)]
pub struct StatusTab {
    pub label: &'static str,
    pub query: &'static str,
    pub active: bool,
}

/// Inbox template.
#[derive(Template)]
#[template(path = "admin/contacts/index.html")]
pub struct ContactsIndexTemplate {
    pub shell: AdminShell,
    pub tabs: Vec<StatusTab>,
    pub messages: Vec<ContactRow>,
    pub load_error: Option<String>,
}

/// Message detail template.
#[derive(Template)]
#[template(path = "admin/contacts/show.html")]
pub struct ContactShowTemplate {
    pub shell: AdminShell,
    pub message: ContactMessage,
    pub received: String,
    pub status_options: Vec<SelectOption>,
}

#[derive(Debug, Deserialize)]
pub struct InboxQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub status: String,
}

fn tabs(current: Option<ContactStatus>) -> Vec<StatusTab> {
    let all = StatusTab {
        label: "All",
        query: "",
        active: current.is_none(),
    };
    std::iter::once(all)
        .chain(ContactStatus::ALL.iter().map(|&status| StatusTab {
            label: match status {
                ContactStatus::New => "New",
                ContactStatus::Read => "Read",
                ContactStatus::Replied => "Replied",
                ContactStatus::Archived => "Archived",
            },
            query: status.as_str(),
            active: current == Some(status),
        }))
        .collect()
}

fn list_path(state: &AppState) -> String {
    state.admin().href("/contacts")
}

/// Inbox page handler.
///
/// An unknown `status` filter shows everything.
#[instrument(skip_all)]
pub async fn index(
    RequireSession(admin): RequireSession,
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<InboxQuery>,
) -> Response {
    let status = query
        .status
        .as_deref()
        .and_then(|s| s.parse::<ContactStatus>().ok());

    let (messages, load_error) = match state
        .supabase()
        .list_contacts(admin.caller(), status)
        .await
    {
        Ok(messages) => (messages.iter().map(ContactRow::from).collect(), None),
        Err(e) => {
            tracing::error!(error = %e, "Failed to fetch contact messages");
            (Vec::new(), Some(e.user_message()))
        }
    };

    render(&ContactsIndexTemplate {
        shell: AdminShell::load(&state, &admin, &session, SECTION).await,
        tabs: tabs(status),
        messages,
        load_error,
    })
}

/// Message detail handler.
///
/// Opening a new message marks it read.
#[instrument(skip_all, fields(contact_id = %id))]
pub async fn show(
    RequireSession(admin): RequireSession,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Response {
    let mut message = match state.supabase().get_contact(admin.caller(), id).await {
        Ok(Some(message)) => message,
        Ok(None) => {
            return redirect_with(
                &session,
                &list_path(&state),
                Flash::error("That message no longer exists."),
            )
            .await;
        }
        Err(e) => {
            return redirect_with(&session, &list_path(&state), failure("load the message", &e))
                .await;
        }
    };

    if message.status == ContactStatus::New {
        match state
            .supabase()
            .set_contact_status(admin.caller(), id, ContactStatus::Read)
            .await
        {
            Ok(updated) => message = updated,
            Err(e) => tracing::warn!(error = %e, "Failed to mark message read"),
        }
    }

    render(&ContactShowTemplate {
        shell: AdminShell::load(&state, &admin, &session, SECTION).await,
        received: message.created_at.format("%b %-d, %Y at %H:%M UTC").to_string(),
        status_options: SelectOption::list(
            ContactStatus::ALL,
            ContactStatus::as_str,
            message.status.as_str(),
        ),
        message,
    })
}

/// Change a message's status.
#[instrument(skip_all, fields(contact_id = %id))]
pub async fn set_status(
    RequireSession(admin): RequireSession,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Form(form): Form<StatusForm>,
) -> Response {
    let back = state.admin().href(&format!("/contacts/{id}"));
    let Ok(status) = form.status.parse::<ContactStatus>() else {
        return redirect_with(&session, &back, Flash::error("Pick a valid status.")).await;
    };

    let flash = match state
        .supabase()
        .set_contact_status(admin.caller(), id, status)
        .await
    {
        Ok(message) => Flash::success(format!("Marked as {}.", message.status)),
        Err(e) => failure("update the status", &e),
    };
    redirect_with(&session, &back, flash).await
}

/// Delete a message.
#[instrument(skip_all, fields(contact_id = %id))]
pub async fn delete(
    RequireSession(admin): RequireSession,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Response {
    let flash = match state.supabase().delete_contact(admin.caller(), id).await {
        Ok(()) => {
            tracing::info!("Contact message deleted");
            Flash::success("Message deleted.")
        }
        Err(e) => failure("delete the message", &e),
    };
    redirect_with(&session, &list_path(&state), flash).await
}
