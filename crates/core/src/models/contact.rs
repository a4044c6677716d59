//! Contact form messages (`contacts` table).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::null_default;
use crate::types::{ContactStatus, Email};
use crate::validation::{ValidationErrors, optional_text, required_text};

/// A row of the `contacts` table.
///
/// `email` stays a plain string here: rows predating validation must still
/// show up in the inbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactMessage {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub message: String,
    #[serde(default, deserialize_with = "null_default")]
    pub status: ContactStatus,
    pub created_at: DateTime<Utc>,
}

impl ContactMessage {
    /// Subject line for list views, falling back to the start of the body.
    #[must_use]
    pub fn summary(&self) -> String {
        if let Some(subject) = self.subject.as_deref().filter(|s| !s.trim().is_empty()) {
            return subject.to_string();
        }
        let mut excerpt: String = self.message.chars().take(60).collect();
        if self.message.chars().count() > 60 {
            excerpt.push('…');
        }
        excerpt
    }
}

/// Raw contact form fields from the public site.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactDraft {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub message: String,
}

/// Validated payload inserted into `contacts`. Always starts as `new`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContactInput {
    pub name: String,
    pub email: Email,
    pub phone: Option<String>,
    pub subject: Option<String>,
    pub message: String,
    pub status: ContactStatus,
}

impl ContactDraft {
    pub const NAME_MAX: usize = 120;
    pub const SUBJECT_MAX: usize = 200;
    pub const MESSAGE_MAX: usize = 5000;

    /// Validate a public contact submission.
    ///
    /// # Errors
    ///
    /// Returns every failing field.
    pub fn validate(&self) -> Result<ContactInput, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let name = required_text(&mut errors, "name", &self.name, Self::NAME_MAX);
        let email = match Email::parse(&self.email) {
            Ok(email) => Some(email),
            Err(_) => {
                errors.add("email", "Please enter a valid email address.");
                None
            }
        };
        let phone = optional_text(&mut errors, "phone", self.phone.as_deref(), 40);
        if let Some(phone) = phone.as_deref()
            && !is_phone(phone)
        {
            errors.add("phone", "Please enter a valid phone number.");
        }
        let subject = optional_text(&mut errors, "subject", self.subject.as_deref(), Self::SUBJECT_MAX);
        let message = required_text(&mut errors, "message", &self.message, Self::MESSAGE_MAX);

        match email {
            Some(email) if errors.is_empty() => Ok(ContactInput {
                name,
                email,
                phone,
                subject,
                message,
                status: ContactStatus::New,
            }),
            _ => Err(errors),
        }
    }
}

fn is_phone(value: &str) -> bool {
    let allowed = value
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '+' | '(' | ')' | '-' | '.'));
    let digits = value.chars().filter(char::is_ascii_digit).count();
    allowed && (6..=20).contains(&digits)
}
