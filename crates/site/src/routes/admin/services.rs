//! Services management route handlers.

use askama::Template;
use axum::{
    Form, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use studio_core::{Service, ServiceDraft, ValidationErrors};
use tower_sessions::Session;
use tracing::instrument;
use uuid::Uuid;

use super::{AdminShell, failure, redirect_with, render};
use crate::filters;
use crate::middleware::RequireSession;
use crate::models::{AdminSession, Flash};
use crate::state::AppState;
use crate::supabase::{Direction, SupabaseError, Visibility};

const SECTION: &str = "services";

/// Build the services router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/services", get(index).post(create))
        .route("/services/new", get(new_service))
        .route("/services/{id}", post(update))
        .route("/services/{id}/edit", get(edit))
        .route("/services/{id}/delete", post(delete))
        .route("/services/{id}/visibility", post(set_visibility))
        .route("/services/{id}/move", post(move_service))
}

/// Services list template.
#[derive(Template)]
#[template(path = "admin/services/index.html")]
pub struct ServicesIndexTemplate {
    pub shell: AdminShell,
    pub services: Vec<Service>,
    pub load_error: Option<String>,
}

/// Service form state for templates.
#[derive(Debug, Clone, Default)]
pub struct ServiceFormView {
    pub draft: ServiceDraft,
    pub errors: ValidationErrors,
}

impl ServiceFormView {
    pub fn error(&self, field: &str) -> Option<&str> {
        self.errors.first(field)
    }

    pub fn icon(&self) -> &str {
        self.draft.icon.as_deref().unwrap_or_default()
    }

    pub fn cta_label(&self) -> &str {
        self.draft.cta_label.as_deref().unwrap_or_default()
    }

    pub fn cta_url(&self) -> &str {
        self.draft.cta_url.as_deref().unwrap_or_default()
    }

    pub fn position(&self) -> &str {
        self.draft.position.as_deref().unwrap_or_default()
    }

    pub fn is_public(&self) -> bool {
        self.draft.is_public()
    }
}

/// New/edit service template.
#[derive(Template)]
#[template(path = "admin/services/form.html")]
pub struct ServiceFormTemplate {
    pub shell: AdminShell,
    pub heading: &'static str,
    pub action: String,
    pub form: ServiceFormView,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VisibilityForm {
    pub is_public: bool,
}

#[derive(Debug, Deserialize)]
pub struct MoveForm {
    pub direction: Direction,
}

fn list_path(state: &AppState) -> String {
    state.admin().href("/services")
}

async fn form_page(
    state: &AppState,
    admin: &AdminSession,
    session: &Session,
    id: Option<Uuid>,
    form: ServiceFormView,
    error: Option<String>,
) -> ServiceFormTemplate {
    let (heading, action) = match id {
        Some(id) => ("Edit service", state.admin().href(&format!("/services/{id}"))),
        None => ("New service", list_path(state)),
    };
    ServiceFormTemplate {
        shell: AdminShell::load(state, admin, session, SECTION).await,
        heading,
        action,
        form,
        error,
    }
}

/// Services list page handler.
#[instrument(skip_all)]
pub async fn index(
    RequireSession(admin): RequireSession,
    State(state): State<AppState>,
    session: Session,
) -> Response {
    let (services, load_error) = match state
        .supabase()
        .list_services(admin.caller(), Visibility::All)
        .await
    {
        Ok(services) => (services, None),
        Err(e) => {
            tracing::error!(error = %e, "Failed to fetch services");
            (Vec::new(), Some(e.user_message()))
        }
    };

    render(&ServicesIndexTemplate {
        shell: AdminShell::load(&state, &admin, &session, SECTION).await,
        services,
        load_error,
    })
}

/// New service form handler.
///
/// New services default to public and to the end of the list.
#[instrument(skip_all)]
pub async fn new_service(
    RequireSession(admin): RequireSession,
    State(state): State<AppState>,
    session: Session,
) -> Response {
    let next_position = state
        .supabase()
        .count_services(admin.caller())
        .await
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to count services");
            0
        });

    let form = ServiceFormView {
        draft: ServiceDraft {
            position: Some(next_position.to_string()),
            is_public: Some("on".to_string()),
            ..ServiceDraft::default()
        },
        errors: ValidationErrors::new(),
    };
    render(&form_page(&state, &admin, &session, None, form, None).await)
}

/// Create service handler.
#[instrument(skip_all)]
pub async fn create(
    RequireSession(admin): RequireSession,
    State(state): State<AppState>,
    session: Session,
    Form(draft): Form<ServiceDraft>,
) -> Response {
    let input = match draft.validate() {
        Ok(input) => input,
        Err(errors) => {
            let form = ServiceFormView { draft, errors };
            let page = form_page(&state, &admin, &session, None, form, None).await;
            return (StatusCode::UNPROCESSABLE_ENTITY, render(&page)).into_response();
        }
    };

    match state.supabase().create_service(admin.caller(), &input).await {
        Ok(service) => {
            tracing::info!(service_id = %service.id, "Service created");
            redirect_with(
                &session,
                &list_path(&state),
                Flash::success(format!("Created \u{201c}{}\u{201d}.", service.title)),
            )
            .await
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to create service");
            let form = ServiceFormView {
                draft,
                errors: ValidationErrors::new(),
            };
            let page = form_page(&state, &admin, &session, None, form, Some(e.user_message())).await;
            (StatusCode::BAD_GATEWAY, render(&page)).into_response()
        }
    }
}

/// Edit service form handler.
#[instrument(skip_all, fields(service_id = %id))]
pub async fn edit(
    RequireSession(admin): RequireSession,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Response {
    match state.supabase().get_service(admin.caller(), id).await {
        Ok(Some(service)) => {
            let form = ServiceFormView {
                draft: ServiceDraft::from(&service),
                errors: ValidationErrors::new(),
            };
            render(&form_page(&state, &admin, &session, Some(id), form, None).await)
        }
        Ok(None) => {
            redirect_with(
                &session,
                &list_path(&state),
                Flash::error("That service no longer exists."),
            )
            .await
        }
        Err(e) => redirect_with(&session, &list_path(&state), failure("load the service", &e)).await,
    }
}

/// Update service handler.
#[instrument(skip_all, fields(service_id = %id))]
pub async fn update(
    RequireSession(admin): RequireSession,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Form(draft): Form<ServiceDraft>,
) -> Response {
    let input = match draft.validate() {
        Ok(input) => input,
        Err(errors) => {
            let form = ServiceFormView { draft, errors };
            let page = form_page(&state, &admin, &session, Some(id), form, None).await;
            return (StatusCode::UNPROCESSABLE_ENTITY, render(&page)).into_response();
        }
    };

    match state
        .supabase()
        .update_service(admin.caller(), id, &input)
        .await
    {
        Ok(service) => {
            redirect_with(
                &session,
                &list_path(&state),
                Flash::success(format!("Saved \u{201c}{}\u{201d}.", service.title)),
            )
            .await
        }
        Err(SupabaseError::NotFound) => {
            redirect_with(
                &session,
                &list_path(&state),
                Flash::error("That service no longer exists."),
            )
            .await
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to update service");
            let form = ServiceFormView {
                draft,
                errors: ValidationErrors::new(),
            };
            let page =
                form_page(&state, &admin, &session, Some(id), form, Some(e.user_message())).await;
            (StatusCode::BAD_GATEWAY, render(&page)).into_response()
        }
    }
}

/// Delete service handler.
#[instrument(skip_all, fields(service_id = %id))]
pub async fn delete(
    RequireSession(admin): RequireSession,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Response {
    let flash = match state.supabase().delete_service(admin.caller(), id).await {
        Ok(()) => {
            tracing::info!("Service deleted");
            Flash::success("Service deleted.")
        }
        Err(e) => failure("delete the service", &e),
    };
    redirect_with(&session, &list_path(&state), flash).await
}

/// Show or hide a service on the public site.
#[instrument(skip_all, fields(service_id = %id))]
pub async fn set_visibility(
    RequireSession(admin): RequireSession,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Form(form): Form<VisibilityForm>,
) -> Response {
    let flash = match state
        .supabase()
        .set_service_visibility(admin.caller(), id, form.is_public)
        .await
    {
        Ok(service) if service.is_public => {
            Flash::success(format!("\u{201c}{}\u{201d} is now public.", service.title))
        }
        Ok(service) => Flash::success(format!("\u{201c}{}\u{201d} is now hidden.", service.title)),
        Err(e) => failure("change visibility", &e),
    };
    redirect_with(&session, &list_path(&state), flash).await
}

/// Move a service one step up or down.
#[instrument(skip_all, fields(service_id = %id))]
pub async fn move_service(
    RequireSession(admin): RequireSession,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Form(form): Form<MoveForm>,
) -> Response {
    match state
        .supabase()
        .move_service(admin.caller(), id, form.direction)
        .await
    {
        Ok(()) => axum::response::Redirect::to(&list_path(&state)).into_response(),
        Err(e) => redirect_with(&session, &list_path(&state), failure("reorder services", &e)).await,
    }
}
