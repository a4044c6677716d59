//! Site configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SITE_DATABASE_URL` - `PostgreSQL` connection string for the session store
//!   (falls back to `DATABASE_URL`)
//! - `SITE_BASE_URL` - Public URL of the site
//! - `SUPABASE_URL` - Project URL (e.g., `https://abcd.supabase.co`)
//! - `SUPABASE_ANON_KEY` - Anonymous (publishable) API key
//!
//! ## Optional
//! - `SITE_HOST` - Bind address (default: 127.0.0.1)
//! - `SITE_PORT` - Listen port (default: 3000)
//! - `SUPABASE_MEDIA_BUCKET` - Storage bucket for project media (default: project-previews)
//! - `ADMIN_PATH` - Secret route prefix of the admin panel (default: /admin)
//! - `ADMIN_LOGIN_PATH` - Login route (default: `{ADMIN_PATH}/login`)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.0)

use std::net::{IpAddr, SocketAddr};

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

/// Admin path used when `ADMIN_PATH` is unset. Guessable; a warning is logged.
pub const DEFAULT_ADMIN_PATH: &str = "/admin";

/// Default storage bucket for project media.
pub const DEFAULT_MEDIA_BUCKET: &str = "project-previews";

/// Public route prefixes the admin paths must not shadow.
const RESERVED_PREFIXES: &[&str] = &["/static", "/health", "/contact", "/portfolio"];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Site application configuration.
#[derive(Debug, Clone)]
pub struct SiteConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL of the site
    pub base_url: String,
    /// Hosted backend configuration
    pub supabase: SupabaseConfig,
    /// Secret admin route configuration
    pub admin: AdminRoutes,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g. production, staging)
    pub sentry_environment: Option<String>,
    /// Fraction of errors sent to Sentry
    pub sentry_sample_rate: f32,
    /// Fraction of transactions sent to Sentry
    pub sentry_traces_sample_rate: f32,
}

/// Supabase project configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct SupabaseConfig {
    /// Project URL without trailing slash
    pub url: String,
    /// Anonymous API key, sent as `apikey` on every request
    pub anon_key: SecretString,
    /// Storage bucket holding `{project}/{file}` media
    pub media_bucket: String,
}

impl std::fmt::Debug for SupabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseConfig")
            .field("url", &self.url)
            .field("anon_key", &"[REDACTED]")
            .field("media_bucket", &self.media_bucket)
            .finish()
    }
}

/// Route paths of the secret-URL admin panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminRoutes {
    /// Prefix every admin page is nested under
    pub path: String,
    /// Sign-in page; reachable without a session
    pub login_path: String,
}

impl AdminRoutes {
    /// Build a link to an admin page, e.g. `href("/services")`.
    #[must_use]
    pub fn href(&self, suffix: &str) -> String {
        format!("{}{}", self.path, suffix)
    }

    /// Whether a redirect target stays inside the admin panel.
    #[must_use]
    pub fn contains(&self, target: &str) -> bool {
        target == self.path
            || target
                .strip_prefix(&self.path)
                .is_some_and(|rest| rest.starts_with('/') || rest.starts_with('?'))
    }
}

impl SiteConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("SITE_DATABASE_URL")?;
        let host = get_env_or_default("SITE_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("SITE_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("SITE_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("SITE_PORT".to_string(), e.to_string()))?;
        let base_url = validate_base_url("SITE_BASE_URL", &get_required_env("SITE_BASE_URL")?)?;

        let supabase = SupabaseConfig::from_env()?;

        let admin_path =
            validate_route_path("ADMIN_PATH", &get_env_or_default("ADMIN_PATH", DEFAULT_ADMIN_PATH))?;
        let login_path = match get_optional_env("ADMIN_LOGIN_PATH") {
            Some(path) => validate_route_path("ADMIN_LOGIN_PATH", &path)?,
            None => format!("{admin_path}/login"),
        };
        if login_path == admin_path {
            return Err(ConfigError::InvalidEnvVar(
                "ADMIN_LOGIN_PATH".to_string(),
                "must differ from ADMIN_PATH".to_string(),
            ));
        }

        let sentry_sample_rate = parse_rate("SENTRY_SAMPLE_RATE", 1.0)?;
        let sentry_traces_sample_rate = parse_rate("SENTRY_TRACES_SAMPLE_RATE", 0.0)?;

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            supabase,
            admin: AdminRoutes {
                path: admin_path,
                login_path,
            },
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should carry the `Secure` attribute.
    #[must_use]
    pub fn is_https(&self) -> bool {
        self.base_url.starts_with("https://")
    }

    /// Whether the admin panel sits on the guessable default path.
    #[must_use]
    pub fn uses_default_admin_path(&self) -> bool {
        self.admin.path == DEFAULT_ADMIN_PATH
    }
}

impl SupabaseConfig {
    /// Load the Supabase section.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the URL or key is missing or malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let url = validate_base_url("SUPABASE_URL", &get_required_env("SUPABASE_URL")?)?;
        let anon_key = get_required_env("SUPABASE_ANON_KEY")?;
        validate_anon_key("SUPABASE_ANON_KEY", &anon_key)?;
        let media_bucket = get_env_or_default("SUPABASE_MEDIA_BUCKET", DEFAULT_MEDIA_BUCKET);
        if media_bucket.is_empty() || media_bucket.contains('/') {
            return Err(ConfigError::InvalidEnvVar(
                "SUPABASE_MEDIA_BUCKET".to_string(),
                "must be a bucket name without '/'".to_string(),
            ));
        }

        Ok(Self {
            url,
            anon_key: SecretString::from(anon_key),
            media_bucket,
        })
    }

    /// Origin of the project, used to allow storage images in the CSP.
    #[must_use]
    pub fn origin(&self) -> String {
        Url::parse(&self.url)
            .map(|u| u.origin().ascii_serialization())
            .unwrap_or_else(|_| self.url.clone())
    }

    /// The anon key, for building request headers.
    #[must_use]
    pub fn anon_key(&self) -> &str {
        self.anon_key.expose_secret()
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL` (used by Fly.io postgres attach).
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable. Empty values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

fn parse_rate(key: &str, default: f32) -> Result<f32, ConfigError> {
    let Some(raw) = get_optional_env(key) else {
        return Ok(default);
    };
    match raw.parse::<f32>() {
        Ok(rate) if (0.0..=1.0).contains(&rate) => Ok(rate),
        _ => Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("expected a number between 0 and 1, got {raw:?}"),
        )),
    }
}

/// Validate an absolute http(s) URL and strip any trailing slash.
fn validate_base_url(var_name: &str, value: &str) -> Result<String, ConfigError> {
    let parsed = Url::parse(value)
        .map_err(|e| ConfigError::InvalidEnvVar(var_name.to_string(), e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            "must be an http(s) URL with a host".to_string(),
        ));
    }
    Ok(value.trim_end_matches('/').to_string())
}

/// Validate a route path used for the admin panel or its login page.
///
/// Rules: starts with `/`, is not `/`, has no trailing `/` or empty
/// segments, only uses `[A-Za-z0-9-_/]`, and does not overlap a public
/// route prefix.
fn validate_route_path(var_name: &str, value: &str) -> Result<String, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidEnvVar(var_name.to_string(), reason.to_string());

    if !value.starts_with('/') {
        return Err(invalid("must start with '/'"));
    }
    if value == "/" {
        return Err(invalid("cannot be the site root"));
    }
    if value.ends_with('/') || value.contains("//") {
        return Err(invalid("cannot end with '/' or contain empty segments"));
    }
    if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '/'))
    {
        return Err(invalid("may only contain letters, digits, '-', '_' and '/'"));
    }
    for prefix in RESERVED_PREFIXES {
        let overlaps = value == *prefix
            || value.starts_with(&format!("{prefix}/"))
            || prefix.starts_with(&format!("{value}/"));
        if overlaps {
            return Err(invalid(&format!("overlaps the public route {prefix}")));
        }
    }
    Ok(value.to_string())
}

/// Reject values that are obviously not a Supabase anon key.
///
/// Accepts legacy JWT keys (three dot separated segments) and the newer
/// `sb_publishable_` keys. Secret/service keys are refused outright.
fn validate_anon_key(var_name: &str, value: &str) -> Result<(), ConfigError> {
    if value.starts_with("sb_secret_") {
        return Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            "is a secret key; use the anon/publishable key".to_string(),
        ));
    }
    let is_jwt = value.split('.').count() == 3 && value.split('.').all(|part| !part.is_empty());
    if value.starts_with("sb_publishable_") || is_jwt {
        Ok(())
    } else {
        Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            "does not look like a Supabase anon key".to_string(),
        ))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    pub(crate) fn supabase_config() -> SupabaseConfig {
        SupabaseConfig {
            url: "https://abcd.supabase.co".to_string(),
            anon_key: SecretString::from("header.payload.signature"),
            media_bucket: DEFAULT_MEDIA_BUCKET.to_string(),
        }
    }

    #[test]
    fn test_validate_route_path_accepts() {
        assert_eq!(
            validate_route_path("ADMIN_PATH", "/studio-x9f2").unwrap(),
            "/studio-x9f2"
        );
        assert!(validate_route_path("ADMIN_PATH", "/a/b_c").is_ok());
    }

    #[test]
    fn test_validate_route_path_rejects() {
        for bad in ["admin", "/", "/admin/", "/a//b", "/adm in", "/static", "/health/x", "/contact"] {
            assert!(
                validate_route_path("ADMIN_PATH", bad).is_err(),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_validate_anon_key() {
        assert!(validate_anon_key("K", "eyJhbGci.eyJyb2xl.c2lnbmF0dXJl").is_ok());
        assert!(validate_anon_key("K", "sb_publishable_abc123").is_ok());
        assert!(validate_anon_key("K", "sb_secret_abc123").is_err());
        assert!(validate_anon_key("K", "your-anon-key").is_err());
        assert!(validate_anon_key("K", "a..b").is_err());
    }

    #[test]
    fn test_validate_base_url() {
        assert_eq!(
            validate_base_url("U", "https://abcd.supabase.co/").unwrap(),
            "https://abcd.supabase.co"
        );
        assert!(validate_base_url("U", "ftp://x.y").is_err());
        assert!(validate_base_url("U", "not a url").is_err());
    }

    #[test]
    fn test_admin_routes_contains() {
        let routes = AdminRoutes {
            path: "/hq".to_string(),
            login_path: "/hq/login".to_string(),
        };
        assert!(routes.contains("/hq"));
        assert!(routes.contains("/hq/services?x=1"));
        assert!(!routes.contains("/hqx"));
        assert!(!routes.contains("https://evil.example/hq"));
        assert_eq!(routes.href("/media"), "/hq/media");
    }

    #[test]
    fn test_supabase_origin() {
        assert_eq!(supabase_config().origin(), "https://abcd.supabase.co");
    }

    #[test]
    fn test_supabase_config_debug_redacts_key() {
        let debug_output = format!("{:?}", supabase_config());
        assert!(debug_output.contains("abcd.supabase.co"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("header.payload.signature"));
    }

    #[test]
    fn test_socket_addr() {
        let config = SiteConfig {
            database_url: SecretString::from("postgres://localhost/test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            supabase: supabase_config(),
            admin: AdminRoutes {
                path: DEFAULT_ADMIN_PATH.to_string(),
                login_path: "/admin/login".to_string(),
            },
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        };

        assert_eq!(config.socket_addr().port(), 3000);
        assert!(!config.is_https());
        assert!(config.uses_default_admin_path());
    }
}
