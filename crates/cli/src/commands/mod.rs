pub mod media;
pub mod migrate;
pub mod seed;

use secrecy::{ExposeSecret, SecretString};
use studio_site::config::{ConfigError, SupabaseConfig};
use studio_site::supabase::auth::AuthSession;
use studio_site::supabase::{SupabaseClient, SupabaseError};
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Supabase error: {0}")]
    Supabase(#[from] SupabaseError),

    #[error("Could not read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    /// The content file is not valid YAML for the expected shape.
    #[error("Invalid content file: {0}")]
    Content(#[from] serde_yaml::Error),

    /// The content file parsed but some entries failed validation.
    #[error("{0} validation errors found")]
    Invalid(usize),
}

/// An admin session against the hosted project.
pub struct SignedIn {
    pub client: SupabaseClient,
    pub session: AuthSession,
}

impl SignedIn {
    /// Sign in with the Supabase settings from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is missing or the credentials are
    /// rejected.
    pub async fn from_env(email: &str, password: &SecretString) -> Result<Self, CommandError> {
        dotenvy::dotenv().ok();
        let config = SupabaseConfig::from_env()?;
        Self::with_config(&config, email, password).await
    }

    /// # Errors
    ///
    /// Returns an error if the credentials are rejected.
    pub async fn with_config(
        config: &SupabaseConfig,
        email: &str,
        password: &SecretString,
    ) -> Result<Self, CommandError> {
        let client = SupabaseClient::new(config)?;
        let session = client
            .sign_in_with_password(email, password.expose_secret())
            .await?;
        tracing::info!(user_id = %session.user.id, "Signed in");
        Ok(Self { client, session })
    }

    pub fn token(&self) -> &str {
        &self.session.access_token
    }

    /// Revoke the session. Failures are logged only.
    pub async fn sign_out(self) {
        if let Err(e) = self.client.sign_out(&self.session.access_token).await {
            tracing::warn!(error = %e, "Sign-out failed");
        }
    }
}
