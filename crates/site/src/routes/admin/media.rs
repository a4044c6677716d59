//! Media library route handlers.
//!
//! The library is a view over the storage bucket, one folder per project.

use askama::Template;
use axum::{
    Form, Router,
    extract::{Multipart, State},
    response::Response,
    routing::{get, post},
};
use serde::Deserialize;
use studio_core::{MediaFolder, Slug, group_by_folder};
use tower_sessions::Session;
use tracing::instrument;

use super::{AdminShell, failure, read_upload, redirect_with, render};
use crate::filters;
use crate::middleware::RequireSession;
use crate::models::Flash;
use crate::state::AppState;
use crate::supabase::SupabaseError;

const SECTION: &str = "media";

/// Build the media router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/media", get(index))
        .route("/media/upload", post(upload))
        .route("/media/delete", post(delete))
}

/// Upload target in the folder picker.
#[derive(Debug, Clone)]
pub struct FolderOption {
    pub slug: String,
    pub name: String,
}

/// Media library template.
#[derive(Template)]
#[template(path = "admin/media/index.html")]
pub struct MediaIndexTemplate {
    pub shell: AdminShell,
    pub folders: Vec<MediaFolder>,
    pub projects: Vec<FolderOption>,
    pub load_error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteForm {
    pub path: String,
}

fn list_path(state: &AppState) -> String {
    state.admin().href("/media")
}

/// Media library page handler.
#[instrument(skip_all)]
pub async fn index(
    RequireSession(admin): RequireSession,
    State(state): State<AppState>,
    session: Session,
) -> Response {
    let supabase = state.supabase();
    let (media, projects) = tokio::join!(
        supabase.list_media(admin.caller()),
        supabase.list_projects(admin.caller()),
    );

    let mut load_error = None;
    let folders = match media {
        Ok(items) => group_by_folder(items),
        Err(e) => {
            tracing::error!(error = %e, "Failed to list media");
            load_error = Some(e.user_message());
            Vec::new()
        }
    };
    let projects = match projects {
        Ok(projects) => projects
            .iter()
            .map(|p| FolderOption {
                slug: p.id.to_string(),
                name: p.name.clone(),
            })
            .collect(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to fetch projects");
            Vec::new()
        }
    };

    render(&MediaIndexTemplate {
        shell: AdminShell::load(&state, &admin, &session, SECTION).await,
        folders,
        projects,
        load_error,
    })
}

/// Upload a file into a project's folder.
#[instrument(skip_all)]
pub async fn upload(
    RequireSession(admin): RequireSession,
    State(state): State<AppState>,
    session: Session,
    multipart: Multipart,
) -> Response {
    let back = list_path(&state);
    let upload = match read_upload(multipart).await {
        Ok(upload) => upload,
        Err(message) => return redirect_with(&session, &back, Flash::error(message)).await,
    };
    let Some(folder) = upload
        .fields
        .get("project")
        .and_then(|raw| Slug::parse(raw).ok())
    else {
        return redirect_with(&session, &back, Flash::error("Choose a project folder.")).await;
    };

    let flash = match state
        .supabase()
        .upload_media(
            admin.caller(),
            &folder,
            &upload.filename,
            upload.bytes,
            &upload.content_type,
        )
        .await
    {
        Ok(item) => {
            tracing::info!(path = %item.path(), "Media uploaded");
            Flash::success(format!("Uploaded {}.", item.path()))
        }
        Err(e) => failure("upload the file", &e),
    };
    redirect_with(&session, &back, flash).await
}

/// Delete a stored file.
#[instrument(skip_all, fields(path = %form.path))]
pub async fn delete(
    RequireSession(admin): RequireSession,
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<DeleteForm>,
) -> Response {
    let flash = match state
        .supabase()
        .delete_media(admin.caller(), &form.path)
        .await
    {
        Ok(()) => Flash::success(format!("Deleted {}.", form.path)),
        Err(SupabaseError::NotFound) => Flash::error("That file no longer exists."),
        Err(e) => failure("delete the file", &e),
    };
    redirect_with(&session, &list_path(&state), flash).await
}
