//! Studio Site library.
//!
//! The public marketing site (services, portfolio, contact form) and the
//! secret-URL admin panel, both backed by a hosted Supabase project. This
//! crate is a library so the router can be exercised in tests and the CLI
//! can reuse the Supabase client and migrations.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod state;
pub mod supabase;

use axum::Router;
use tower_http::services::ServeDir;

use crate::middleware::security_headers_middleware;
use crate::state::AppState;

/// Static assets, relative to the workspace root.
pub const STATIC_DIR: &str = "crates/site/static";

/// Build the application router with its state.
///
/// Session, tracing and Sentry layers are added by the binary; tests wrap
/// the router in an in-memory session layer instead.
pub fn router(state: AppState) -> Router {
    routes::routes(state.admin())
        .nest_service("/static", ServeDir::new(STATIC_DIR))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            security_headers_middleware,
        ))
        .with_state(state)
}
