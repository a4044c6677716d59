//! Admin panel route handlers.
//!
//! Every page except sign-in takes [`RequireSession`]. Mutations follow
//! post/redirect/get: the handler stores a [`Flash`] and redirects back to
//! the list it came from.
//!
//! [`RequireSession`]: crate::middleware::RequireSession

pub mod auth;
pub mod contacts;
pub mod dashboard;
pub mod media;
pub mod projects;
pub mod services;

use std::collections::BTreeMap;

use askama::Template;
use axum::{
    Router,
    extract::{DefaultBodyLimit, Multipart},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use tower_sessions::Session;

use crate::config::AdminRoutes;
use crate::middleware::login_rate_limiter;
use crate::models::{AdminSession, Flash};
use crate::state::AppState;
use crate::supabase::SupabaseError;

/// Largest accepted request body on admin pages (image uploads).
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Build the admin router.
///
/// The sign-in page sits at `login_path` outside the guarded pages; the
/// rest is nested under `path`.
pub fn router(admin: &AdminRoutes) -> Router<AppState> {
    let pages = Router::new()
        .route("/", get(dashboard::index))
        .route("/logout", post(auth::logout))
        .merge(services::router())
        .merge(projects::router())
        .merge(contacts::router())
        .merge(media::router())
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES));

    Router::new()
        .route(
            &admin.login_path,
            get(auth::login_page).merge(post(auth::login).layer(login_rate_limiter())),
        )
        .nest(&admin.path, pages)
}

/// Layout data shared by every admin page.
#[derive(Debug, Clone)]
pub struct AdminShell {
    pub admin_path: String,
    pub email: String,
    /// Sidebar entry to highlight.
    pub section: &'static str,
    pub flash: Option<Flash>,
}

impl AdminShell {
    /// Build the layout, consuming any pending flash.
    pub async fn load(
        state: &AppState,
        admin: &AdminSession,
        session: &Session,
        section: &'static str,
    ) -> Self {
        Self {
            admin_path: state.admin().path.clone(),
            email: admin.email.clone().unwrap_or_default(),
            section,
            flash: Flash::take(session).await,
        }
    }

    /// Link to an admin page.
    pub fn href(&self, suffix: &str) -> String {
        format!("{}{suffix}", self.admin_path)
    }

    pub fn is_active(&self, section: &str) -> bool {
        self.section == section
    }
}

/// An `<option>` of a select box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub value: &'static str,
    pub label: String,
    pub selected: bool,
}

impl SelectOption {
    /// Options for every value, marking the current one.
    pub fn list<T: Copy>(
        all: &[T],
        value: impl Fn(T) -> &'static str,
        current: &str,
    ) -> Vec<Self> {
        all.iter()
            .map(|&item| Self {
                value: value(item),
                label: capitalize(value(item)),
                selected: value(item) == current,
            })
            .collect()
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

/// Date shown in admin lists, e.g. `Mar 4, 2025`.
pub fn format_date(at: &chrono::DateTime<chrono::Utc>) -> String {
    at.format("%b %-d, %Y").to_string()
}

/// Render an admin template into a response.
pub fn render<T: Template>(template: &T) -> Response {
    match template.render() {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::error!("Template render error: {e}");
            (
                axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                "Internal Server Error",
            )
                .into_response()
        }
    }
}

/// Store a flash and redirect.
pub async fn redirect_with(session: &Session, to: &str, flash: Flash) -> Response {
    flash.set(session).await;
    Redirect::to(to).into_response()
}

/// Flash for a failed hosted call.
pub fn failure(action: &str, error: &SupabaseError) -> Flash {
    tracing::error!(error = %error, "Failed to {action}");
    Flash::error(format!("Could not {action}. {}", error.user_message()))
}

/// A file posted from an upload form, with the other fields beside it.
#[derive(Debug)]
pub struct Upload {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
    pub fields: BTreeMap<String, String>,
}

/// Read a multipart form with one `file` field.
///
/// # Errors
///
/// Returns a user-facing message if the body is malformed or no file was
/// chosen.
pub async fn read_upload(mut multipart: Multipart) -> Result<Upload, String> {
    let mut file = None;
    let mut fields = BTreeMap::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| e.body_text())? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            let filename = field.file_name().unwrap_or("upload").to_string();
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let bytes = field.bytes().await.map_err(|e| e.body_text())?;
            // Browsers post an empty part when no file is chosen.
            if !bytes.is_empty() {
                file = Some((filename, content_type, bytes.to_vec()));
            }
        } else {
            let value = field.text().await.map_err(|e| e.body_text())?;
            fields.insert(name, value);
        }
    }

    let (filename, content_type, bytes) = file.ok_or("Choose a file to upload.")?;
    Ok(Upload {
        filename,
        content_type,
        bytes,
        fields,
    })
}
