//! Home page route handler.
//!
//! The whole public site is one page: services, the portfolio grid and the
//! contact form. Each section is fetched independently and an unavailable
//! section renders empty instead of failing the page.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Query, State};
use serde::Deserialize;
use studio_core::{ContactDraft, Project, ProjectType, Service, ValidationErrors};
use tracing::instrument;

use crate::filters;
use crate::supabase::{Caller, Visibility};
use crate::state::AppState;

/// Portfolio card view for templates.
#[derive(Debug, Clone)]
pub struct ProjectCard {
    pub slug: String,
    pub name: String,
    pub hook: String,
    pub technologies: Vec<String>,
    pub type_label: &'static str,
    pub accent_class: String,
    pub is_flagship: bool,
    pub preview_url: Option<String>,
}

impl From<&Project> for ProjectCard {
    fn from(project: &Project) -> Self {
        Self {
            slug: project.id.to_string(),
            name: project.name.clone(),
            hook: project.hook.clone().unwrap_or_default(),
            technologies: project.technologies.clone(),
            type_label: type_label(project.project_type),
            accent_class: project.color.css_class(),
            is_flagship: project.is_flagship,
            preview_url: project.preview_url.clone(),
        }
    }
}

/// Badge text for a project type.
#[must_use]
pub const fn type_label(project_type: ProjectType) -> &'static str {
    match project_type {
        ProjectType::Production => "Shipped",
        ProjectType::Concept => "Concept",
    }
}

/// Contact form state: submitted values, field errors and the outcome.
#[derive(Debug, Clone, Default)]
pub struct ContactFormView {
    pub draft: ContactDraft,
    pub errors: ValidationErrors,
    pub sent: bool,
    pub failure: Option<String>,
}

impl ContactFormView {
    pub fn error(&self, field: &str) -> Option<&str> {
        self.errors.first(field)
    }

    pub fn phone(&self) -> &str {
        self.draft.phone.as_deref().unwrap_or_default()
    }

    pub fn subject(&self) -> &str {
        self.draft.subject.as_deref().unwrap_or_default()
    }
}

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub services: Vec<Service>,
    pub projects: Vec<ProjectCard>,
    pub form: ContactFormView,
}

#[derive(Debug, Deserialize)]
pub struct HomeQuery {
    /// Set after a successful contact submission.
    pub sent: Option<String>,
}

/// Display the home page.
#[instrument(skip(state))]
pub async fn home(State(state): State<AppState>, Query(query): Query<HomeQuery>) -> HomeTemplate {
    let form = ContactFormView {
        sent: query.sent.is_some(),
        ..ContactFormView::default()
    };
    render_home(&state, form).await
}

/// Build the home page around a contact form state.
pub async fn render_home(state: &AppState, form: ContactFormView) -> HomeTemplate {
    let supabase = state.supabase();
    let (services, projects) = tokio::join!(
        supabase.list_services(Caller::Anonymous, Visibility::Public),
        supabase.list_projects(Caller::Anonymous),
    );

    let services = services.unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to fetch services");
        Vec::new()
    });
    let projects = projects.map_or_else(
        |e| {
            tracing::error!(error = %e, "Failed to fetch projects");
            Vec::new()
        },
        |projects| projects.iter().map(ProjectCard::from).collect(),
    );

    HomeTemplate {
        services,
        projects,
        form,
    }
}
