//! Session middleware configuration.
//!
//! Sets up `PostgreSQL`-backed sessions using tower-sessions. Only the
//! admin panel stores anything in them; public visitors never get a
//! cookie because an untouched session is not persisted.

use sqlx::PgPool;
use tower_sessions::{Expiry, SessionManagerLayer, SessionStore};
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::SiteConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "studio_session";

/// Session expiry time in seconds (7 days of inactivity).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Create the `PostgreSQL` session store in the `studio` schema.
///
/// # Panics
///
/// Panics if the schema name or table name is invalid (should never happen
/// with hardcoded "studio" and "session" values).
#[must_use]
pub fn create_session_store(pool: &PgPool) -> PostgresStore {
    // The table is created by migration, see crates/site/migrations.
    PostgresStore::new(pool.clone())
        .with_schema_name("studio")
        .expect("valid schema name")
        .with_table_name("session")
        .expect("valid table name")
}

/// Wrap any session store in the site's cookie settings.
#[must_use]
pub fn create_session_layer<S: SessionStore + Clone>(
    store: S,
    config: &SiteConfig,
) -> SessionManagerLayer<S> {
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.is_https())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}
