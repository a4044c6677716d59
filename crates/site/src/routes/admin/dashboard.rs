//! Dashboard route handler.

use askama::Template;
use axum::{extract::State, response::Response};
use studio_core::ContactStatus;
use tower_sessions::Session;
use tracing::instrument;

use super::{AdminShell, render};
use crate::filters;
use crate::middleware::RequireSession;
use crate::state::AppState;
use crate::supabase::SupabaseError;

/// Dashboard counters, ready for display.
#[derive(Debug, Clone)]
pub struct DashboardMetrics {
    pub services: String,
    pub projects: String,
    pub new_messages: String,
    pub media_files: String,
}

/// Dashboard template.
#[derive(Template)]
#[template(path = "admin/dashboard.html")]
pub struct DashboardTemplate {
    pub shell: AdminShell,
    pub metrics: DashboardMetrics,
}

/// A count for display; unavailable counts show as a dash.
fn counted(what: &str, result: Result<u64, SupabaseError>) -> String {
    result.map_or_else(
        |e| {
            tracing::error!(error = %e, "Failed to count {what}");
            "–".to_string()
        },
        |n| n.to_string(),
    )
}

/// Dashboard page handler.
#[instrument(skip_all)]
pub async fn index(
    RequireSession(admin): RequireSession,
    State(state): State<AppState>,
    session: Session,
) -> Response {
    let caller = admin.caller();
    let supabase = state.supabase();

    let (services, projects, new_messages, media) = tokio::join!(
        supabase.count_services(caller),
        supabase.count_projects(caller),
        supabase.count_contacts(caller, Some(ContactStatus::New)),
        supabase.list_media(caller),
    );

    let metrics = DashboardMetrics {
        services: counted("services", services),
        projects: counted("projects", projects),
        new_messages: counted("new messages", new_messages),
        media_files: counted("media", media.map(|items| items.len() as u64)),
    };

    render(&DashboardTemplate {
        shell: AdminShell::load(&state, &admin, &session, "dashboard").await,
        metrics,
    })
}
