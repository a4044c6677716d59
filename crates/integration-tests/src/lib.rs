//! End-to-end tests for the studio site.
//!
//! The tests talk HTTP to a server that is already running against a real
//! Supabase project, so every test is `#[ignore]`d by default.
//!
//! # Running Tests
//!
//! ```bash
//! cargo run -p studio-site &
//! STUDIO_TEST_URL=http://localhost:3000 cargo test -p studio-integration-tests -- --ignored
//! ```
//!
//! # Environment Variables
//!
//! - `STUDIO_TEST_URL` - site base URL (default `http://localhost:3000`)
//! - `ADMIN_PATH`, `ADMIN_LOGIN_PATH` - as configured on the server
//! - `STUDIO_ADMIN_EMAIL`, `STUDIO_ADMIN_PASSWORD` - an admin account; tests
//!   that need a session are skipped when unset

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::missing_panics_doc)]

use reqwest::{Client, Response, StatusCode, redirect};
use secrecy::{ExposeSecret, SecretString};

/// Client-side view of a running site.
pub struct TestContext {
    pub client: Client,
    pub base_url: String,
    pub admin_path: String,
    pub login_path: String,
}

impl TestContext {
    /// A fresh context with its own cookie jar. Redirects are not followed
    /// so tests can assert on them.
    #[must_use]
    pub fn new() -> Self {
        dotenvy::dotenv().ok();
        let base_url = env_or("STUDIO_TEST_URL", "http://localhost:3000")
            .trim_end_matches('/')
            .to_string();
        let admin_path = env_or("ADMIN_PATH", "/admin");
        let login_path = env_or("ADMIN_LOGIN_PATH", &format!("{admin_path}/login"));

        let client = Client::builder()
            .cookie_store(true)
            .redirect(redirect::Policy::none())
            .build()
            .expect("client builds");

        Self {
            client,
            base_url,
            admin_path,
            login_path,
        }
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    #[must_use]
    pub fn admin_url(&self, suffix: &str) -> String {
        self.url(&format!("{}{suffix}", self.admin_path))
    }

    pub async fn get(&self, path: &str) -> Response {
        self.client.get(self.url(path)).send().await.unwrap()
    }

    pub async fn post_form(&self, url: &str, form: &[(&str, &str)]) -> Response {
        self.client.post(url).form(form).send().await.unwrap()
    }

    /// Sign in with the configured admin account.
    ///
    /// Returns `false` when no credentials are configured.
    pub async fn sign_in(&self) -> bool {
        let Some(credentials) = AdminCredentials::from_env() else {
            return false;
        };
        let response = self
            .post_form(
                &self.url(&self.login_path),
                &[
                    ("email", credentials.email.as_str()),
                    ("password", credentials.password.expose_secret()),
                    ("next", ""),
                ],
            )
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        true
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Admin account used by tests that need a session.
pub struct AdminCredentials {
    pub email: String,
    pub password: SecretString,
}

impl AdminCredentials {
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let email = std::env::var("STUDIO_ADMIN_EMAIL").ok()?;
        let password = std::env::var("STUDIO_ADMIN_PASSWORD").ok()?;
        Some(Self {
            email,
            password: SecretString::from(password),
        })
    }
}

/// Location header of a redirect.
#[must_use]
pub fn location(response: &Response) -> String {
    response
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}
