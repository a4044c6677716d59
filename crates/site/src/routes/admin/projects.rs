//! Portfolio project management route handlers.
//!
//! A project's slug is fixed once created: it names the project's folder in
//! the storage bucket.

use askama::Template;
use axum::{
    Form, Router,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use studio_core::{ColorAccent, Project, ProjectDraft, ProjectType, Slug, ValidationErrors};
use tower_sessions::Session;
use tracing::instrument;

use super::{AdminShell, SelectOption, failure, format_date, read_upload, redirect_with, render};
use crate::filters;
use crate::middleware::RequireSession;
use crate::models::{AdminSession, Flash};
use crate::routes::home::type_label;
use crate::state::AppState;
use crate::supabase::SupabaseError;

const SECTION: &str = "projects";

/// Build the projects router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/projects", get(index).post(create))
        .route("/projects/new", get(new_project))
        .route("/projects/{slug}", post(update))
        .route("/projects/{slug}/edit", get(edit))
        .route("/projects/{slug}/delete", post(delete))
        .route("/projects/{slug}/preview", post(upload_preview))
        .route("/projects/{slug}/preview/delete", post(delete_preview))
}

/// Project row for the list page.
#[derive(Debug, Clone)]
pub struct ProjectRow {
    pub slug: String,
    pub name: String,
    pub type_label: &'static str,
    pub is_flagship: bool,
    pub technologies: String,
    pub preview_url: Option<String>,
    pub created: String,
}

impl From<&Project> for ProjectRow {
    fn from(project: &Project) -> Self {
        Self {
            slug: project.id.to_string(),
            name: project.name.clone(),
            type_label: type_label(project.project_type),
            is_flagship: project.is_flagship,
            technologies: project.technologies.join(", "),
            preview_url: project.preview_url.clone(),
            created: format_date(&project.created_at),
        }
    }
}

/// Projects list template.
#[derive(Template)]
#[template(path = "admin/projects/index.html")]
pub struct ProjectsIndexTemplate {
    pub shell: AdminShell,
    pub projects: Vec<ProjectRow>,
    pub load_error: Option<String>,
}

/// Project form state for templates.
#[derive(Debug, Clone, Default)]
pub struct ProjectFormView {
    pub draft: ProjectDraft,
    pub errors: ValidationErrors,
}

impl ProjectFormView {
    pub fn error(&self, field: &str) -> Option<&str> {
        self.errors.first(field)
    }

    pub fn id(&self) -> &str {
        self.draft.id.as_deref().unwrap_or_default()
    }

    pub fn hook(&self) -> &str {
        self.draft.hook.as_deref().unwrap_or_default()
    }

    pub fn story(&self) -> &str {
        self.draft.story.as_deref().unwrap_or_default()
    }

    pub fn benefit(&self) -> &str {
        self.draft.benefit.as_deref().unwrap_or_default()
    }

    pub fn is_flagship(&self) -> bool {
        self.draft.is_flagship()
    }

    pub fn type_options(&self) -> Vec<SelectOption> {
        let current = self
            .draft
            .project_type
            .as_deref()
            .unwrap_or(ProjectType::default().as_str());
        SelectOption::list(ProjectType::ALL, ProjectType::as_str, current)
    }

    pub fn color_options(&self) -> Vec<SelectOption> {
        let current = self
            .draft
            .color
            .as_deref()
            .unwrap_or(ColorAccent::default().as_str());
        SelectOption::list(ColorAccent::ALL, ColorAccent::as_str, current)
    }
}

/// New/edit project template.
///
/// `slug` is set when editing; the preview panel only shows then.
#[derive(Template)]
#[template(path = "admin/projects/form.html")]
pub struct ProjectFormTemplate {
    pub shell: AdminShell,
    pub heading: &'static str,
    pub action: String,
    pub slug: Option<String>,
    pub preview_url: Option<String>,
    pub form: ProjectFormView,
    pub error: Option<String>,
}

impl ProjectFormTemplate {
    async fn new(
        state: &AppState,
        admin: &AdminSession,
        session: &Session,
        existing: Option<(&Slug, Option<String>)>,
        form: ProjectFormView,
        error: Option<String>,
    ) -> Self {
        let shell = AdminShell::load(state, admin, session, SECTION).await;
        match existing {
            Some((slug, preview_url)) => Self {
                heading: "Edit project",
                action: shell.href(&format!("/projects/{slug}")),
                slug: Some(slug.to_string()),
                preview_url,
                shell,
                form,
                error,
            },
            None => Self {
                heading: "New project",
                action: shell.href("/projects"),
                slug: None,
                preview_url: None,
                shell,
                form,
                error,
            },
        }
    }
}

fn list_path(state: &AppState) -> String {
    state.admin().href("/projects")
}

fn edit_path(state: &AppState, slug: &Slug) -> String {
    state.admin().href(&format!("/projects/{slug}/edit"))
}

/// Parse the slug path segment, or redirect back to the list.
async fn parse_slug(state: &AppState, session: &Session, raw: &str) -> Result<Slug, Response> {
    match Slug::parse(raw) {
        Ok(slug) => Ok(slug),
        Err(_) => Err(redirect_with(
            session,
            &list_path(state),
            Flash::error("That project no longer exists."),
        )
        .await),
    }
}

/// Projects list page handler.
#[instrument(skip_all)]
pub async fn index(
    RequireSession(admin): RequireSession,
    State(state): State<AppState>,
    session: Session,
) -> Response {
    let (projects, load_error) = match state.supabase().list_projects(admin.caller()).await {
        Ok(projects) => (projects.iter().map(ProjectRow::from).collect(), None),
        Err(e) => {
            tracing::error!(error = %e, "Failed to fetch projects");
            (Vec::new(), Some(e.user_message()))
        }
    };

    render(&ProjectsIndexTemplate {
        shell: AdminShell::load(&state, &admin, &session, SECTION).await,
        projects,
        load_error,
    })
}

/// New project form handler.
#[instrument(skip_all)]
pub async fn new_project(
    RequireSession(admin): RequireSession,
    State(state): State<AppState>,
    session: Session,
) -> Response {
    let page =
        ProjectFormTemplate::new(&state, &admin, &session, None, ProjectFormView::default(), None)
            .await;
    render(&page)
}

/// Create project handler.
///
/// A slug that is already taken is reported on the slug field.
#[instrument(skip_all)]
pub async fn create(
    RequireSession(admin): RequireSession,
    State(state): State<AppState>,
    session: Session,
    Form(draft): Form<ProjectDraft>,
) -> Response {
    let input = match draft.validate() {
        Ok(input) => input,
        Err(errors) => {
            let form = ProjectFormView { draft, errors };
            let page = ProjectFormTemplate::new(&state, &admin, &session, None, form, None).await;
            return (StatusCode::UNPROCESSABLE_ENTITY, render(&page)).into_response();
        }
    };

    match state.supabase().create_project(admin.caller(), &input).await {
        Ok(project) => {
            tracing::info!(slug = %project.id, "Project created");
            redirect_with(
                &session,
                &edit_path(&state, &project.id),
                Flash::success(format!(
                    "Created \u{201c}{}\u{201d}. Add a preview image below.",
                    project.name
                )),
            )
            .await
        }
        Err(SupabaseError::Conflict(_)) => {
            let mut errors = ValidationErrors::new();
            errors.add("id", format!("A project with slug \u{201c}{}\u{201d} already exists.", input.id));
            let form = ProjectFormView { draft, errors };
            let page = ProjectFormTemplate::new(&state, &admin, &session, None, form, None).await;
            (StatusCode::CONFLICT, render(&page)).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to create project");
            let form = ProjectFormView {
                draft,
                errors: ValidationErrors::new(),
            };
            let page = ProjectFormTemplate::new(
                &state,
                &admin,
                &session,
                None,
                form,
                Some(e.user_message()),
            )
            .await;
            (StatusCode::BAD_GATEWAY, render(&page)).into_response()
        }
    }
}

/// Edit project form handler.
#[instrument(skip_all, fields(slug = %slug))]
pub async fn edit(
    RequireSession(admin): RequireSession,
    State(state): State<AppState>,
    session: Session,
    Path(slug): Path<String>,
) -> Response {
    let slug = match parse_slug(&state, &session, &slug).await {
        Ok(slug) => slug,
        Err(response) => return response,
    };

    match state.supabase().get_project(admin.caller(), &slug).await {
        Ok(Some(project)) => {
            let form = ProjectFormView {
                draft: ProjectDraft::from(&project),
                errors: ValidationErrors::new(),
            };
            let page = ProjectFormTemplate::new(
                &state,
                &admin,
                &session,
                Some((&slug, project.preview_url)),
                form,
                None,
            )
            .await;
            render(&page)
        }
        Ok(None) => {
            redirect_with(
                &session,
                &list_path(&state),
                Flash::error("That project no longer exists."),
            )
            .await
        }
        Err(e) => redirect_with(&session, &list_path(&state), failure("load the project", &e)).await,
    }
}

/// Update project handler.
#[instrument(skip_all, fields(slug = %slug))]
pub async fn update(
    RequireSession(admin): RequireSession,
    State(state): State<AppState>,
    session: Session,
    Path(slug): Path<String>,
    Form(draft): Form<ProjectDraft>,
) -> Response {
    let slug = match parse_slug(&state, &session, &slug).await {
        Ok(slug) => slug,
        Err(response) => return response,
    };

    let input = match draft.validate_update(&slug) {
        Ok(input) => input,
        Err(errors) => {
            let preview_url = current_preview(&state, &admin, &slug).await;
            let form = ProjectFormView { draft, errors };
            let page = ProjectFormTemplate::new(
                &state,
                &admin,
                &session,
                Some((&slug, preview_url)),
                form,
                None,
            )
            .await;
            return (StatusCode::UNPROCESSABLE_ENTITY, render(&page)).into_response();
        }
    };

    match state
        .supabase()
        .update_project(admin.caller(), &slug, &input)
        .await
    {
        Ok(project) => {
            redirect_with(
                &session,
                &list_path(&state),
                Flash::success(format!("Saved \u{201c}{}\u{201d}.", project.name)),
            )
            .await
        }
        Err(SupabaseError::NotFound) => {
            redirect_with(
                &session,
                &list_path(&state),
                Flash::error("That project no longer exists."),
            )
            .await
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to update project");
            let preview_url = current_preview(&state, &admin, &slug).await;
            let form = ProjectFormView {
                draft,
                errors: ValidationErrors::new(),
            };
            let page = ProjectFormTemplate::new(
                &state,
                &admin,
                &session,
                Some((&slug, preview_url)),
                form,
                Some(e.user_message()),
            )
            .await;
            (StatusCode::BAD_GATEWAY, render(&page)).into_response()
        }
    }
}

/// Preview URL to show beside a re-rendered form.
async fn current_preview(state: &AppState, admin: &AdminSession, slug: &Slug) -> Option<String> {
    state
        .supabase()
        .get_project(admin.caller(), slug)
        .await
        .ok()
        .flatten()
        .and_then(|p| p.preview_url)
}

/// Delete project handler.
///
/// Removes the row, then the project's media folder.
#[instrument(skip_all, fields(slug = %slug))]
pub async fn delete(
    RequireSession(admin): RequireSession,
    State(state): State<AppState>,
    session: Session,
    Path(slug): Path<String>,
) -> Response {
    let slug = match parse_slug(&state, &session, &slug).await {
        Ok(slug) => slug,
        Err(response) => return response,
    };

    let flash = match state.supabase().delete_project(admin.caller(), &slug).await {
        Ok(()) => {
            tracing::info!("Project deleted");
            Flash::success(format!("Deleted project \u{201c}{slug}\u{201d}."))
        }
        Err(e) => failure("delete the project", &e),
    };
    redirect_with(&session, &list_path(&state), flash).await
}

/// Upload a new preview image for a project.
#[instrument(skip_all, fields(slug = %slug))]
pub async fn upload_preview(
    RequireSession(admin): RequireSession,
    State(state): State<AppState>,
    session: Session,
    Path(slug): Path<String>,
    multipart: Multipart,
) -> Response {
    let slug = match parse_slug(&state, &session, &slug).await {
        Ok(slug) => slug,
        Err(response) => return response,
    };
    let back = edit_path(&state, &slug);

    let upload = match read_upload(multipart).await {
        Ok(upload) => upload,
        Err(message) => return redirect_with(&session, &back, Flash::error(message)).await,
    };

    let flash = match state
        .supabase()
        .upload_preview(
            admin.caller(),
            &slug,
            &upload.filename,
            upload.bytes,
            &upload.content_type,
        )
        .await
    {
        Ok(_) => Flash::success("Preview image updated."),
        Err(e) => failure("upload the preview", &e),
    };
    redirect_with(&session, &back, flash).await
}

/// Remove a project's preview image.
#[instrument(skip_all, fields(slug = %slug))]
pub async fn delete_preview(
    RequireSession(admin): RequireSession,
    State(state): State<AppState>,
    session: Session,
    Path(slug): Path<String>,
) -> Response {
    let slug = match parse_slug(&state, &session, &slug).await {
        Ok(slug) => slug,
        Err(response) => return response,
    };

    let flash = match state.supabase().delete_preview(admin.caller(), &slug).await {
        Ok(_) => Flash::success("Preview image removed."),
        Err(e) => failure("remove the preview", &e),
    };
    redirect_with(&session, &edit_path(&state, &slug), flash).await
}
