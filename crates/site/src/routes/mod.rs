//! HTTP route handlers for the site.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                      - Liveness
//! GET  /health/ready                - Readiness (session database)
//!
//! # Public site
//! GET  /                            - Services, portfolio and contact form
//! GET  /portfolio/{slug}            - Project detail
//! POST /contact                     - Contact form submission (rate limited)
//!
//! # Admin (prefix from ADMIN_PATH)
//! GET  {login}                      - Sign-in page
//! POST {login}                      - Sign in (rate limited)
//! POST {admin}/logout               - Sign out
//! GET  {admin}                      - Dashboard
//! ...  {admin}/services             - Services CRUD, visibility and order
//! ...  {admin}/projects             - Projects CRUD and preview images
//! ...  {admin}/contacts             - Contact inbox
//! ...  {admin}/media                - Storage browser
//! ```

pub mod admin;
pub mod contact;
pub mod health;
pub mod home;
pub mod portfolio;

use axum::{
    Router,
    routing::{get, post},
};

use crate::config::AdminRoutes;
use crate::middleware::contact_rate_limiter;
use crate::state::AppState;

/// Public site routes.
fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .route("/portfolio/{slug}", get(portfolio::show))
        .route(
            "/contact",
            post(contact::submit).layer(contact_rate_limiter()),
        )
}

/// Health checks.
fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
}

/// Build the application router.
///
/// Admin paths come from configuration, so the admin panel is mounted
/// wherever `ADMIN_PATH` points.
pub fn routes(admin: &AdminRoutes) -> Router<AppState> {
    Router::new()
        .merge(health_routes())
        .merge(public_routes())
        .merge(admin::router(admin))
}

#[cfg(test)]
mod tests;
