//! Portfolio detail page.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Path, State};
use chrono::Datelike;
use studio_core::{Project, Slug};
use tracing::instrument;

use super::home::type_label;
use crate::error::{AppError, Result};
use crate::filters;
use crate::state::AppState;
use crate::supabase::Caller;

/// Full project view for the detail page.
#[derive(Debug, Clone)]
pub struct ProjectView {
    pub name: String,
    pub hook: Option<String>,
    pub story: Option<String>,
    pub benefit: Option<String>,
    pub technologies: Vec<String>,
    pub type_label: &'static str,
    pub accent_class: String,
    pub preview_url: Option<String>,
    pub year: i32,
}

impl From<Project> for ProjectView {
    fn from(project: Project) -> Self {
        Self {
            type_label: type_label(project.project_type),
            accent_class: project.color.css_class(),
            year: project.created_at.year(),
            name: project.name,
            hook: project.hook,
            story: project.story,
            benefit: project.benefit,
            technologies: project.technologies,
            preview_url: project.preview_url,
        }
    }
}

/// Project detail template.
#[derive(Template, WebTemplate)]
#[template(path = "portfolio/show.html")]
pub struct ProjectTemplate {
    pub project: ProjectView,
}

/// Display one project.
///
/// GET /portfolio/{slug}
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<ProjectTemplate> {
    let slug = Slug::parse(&slug).map_err(|_| AppError::NotFound(format!("project {slug}")))?;
    let project = state
        .supabase()
        .get_project(Caller::Anonymous, &slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("project {slug}")))?;

    Ok(ProjectTemplate {
        project: project.into(),
    })
}
