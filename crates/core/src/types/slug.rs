//! Project slug type.
//!
//! Slugs identify portfolio projects in URLs (`/portfolio/{slug}`) and name
//! the per-project folder in the media bucket (`{slug}/{filename}`).

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Slug`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SlugError {
    #[error("slug cannot be empty")]
    Empty,
    #[error("slug must be at most {max} characters")]
    TooLong { max: usize },
    #[error("slug may only contain lowercase letters, digits and '-' (found {0:?})")]
    InvalidChar(char),
    #[error("slug cannot start or end with '-' or contain '--'")]
    BadHyphen,
}

/// A URL-safe project identifier.
///
/// ```
/// use studio_core::Slug;
///
/// assert_eq!(Slug::parse("acme-portal").unwrap().as_str(), "acme-portal");
/// assert_eq!(Slug::from_name("  Acme Portal 2.0!").unwrap().as_str(), "acme-portal-2-0");
/// assert!(Slug::parse("-nope").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(try_from = "String", into = "String")]
pub struct Slug(String);

impl Slug {
    pub const MAX_LENGTH: usize = 64;

    /// Parse an existing slug without normalizing it.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, too long, contains anything
    /// other than `[a-z0-9-]`, or has a leading, trailing or doubled hyphen.
    pub fn parse(s: &str) -> Result<Self, SlugError> {
        if s.is_empty() {
            return Err(SlugError::Empty);
        }
        if s.len() > Self::MAX_LENGTH {
            return Err(SlugError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if let Some(c) = s
            .chars()
            .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-'))
        {
            return Err(SlugError::InvalidChar(c));
        }
        if s.starts_with('-') || s.ends_with('-') || s.contains("--") {
            return Err(SlugError::BadHyphen);
        }
        Ok(Self(s.to_owned()))
    }

    /// Derive a slug from a human-readable name.
    ///
    /// ASCII letters and digits are kept (lowercased); every other run of
    /// characters collapses into a single hyphen. The result is truncated to
    /// [`Self::MAX_LENGTH`] on a hyphen-free boundary.
    ///
    /// # Errors
    ///
    /// Returns [`SlugError::Empty`] when the name has no ASCII alphanumerics.
    pub fn from_name(name: &str) -> Result<Self, SlugError> {
        let mut out = String::with_capacity(name.len());
        let mut pending_hyphen = false;

        for c in name.chars() {
            if c.is_ascii_alphanumeric() {
                if pending_hyphen && !out.is_empty() {
                    out.push('-');
                }
                pending_hyphen = false;
                out.push(c.to_ascii_lowercase());
            } else {
                pending_hyphen = true;
            }
        }

        out.truncate(Self::MAX_LENGTH);
        let trimmed = out.trim_end_matches('-');
        Self::parse(trimmed)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Slug {
    type Err = SlugError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Slug {
    type Error = SlugError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Slug> for String {
    fn from(slug: Slug) -> Self {
        slug.0
    }
}

impl AsRef<str> for Slug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
