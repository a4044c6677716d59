//! Core types for the studio site.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod slug;
pub mod status;

pub use email::{Email, EmailError};
pub use slug::{Slug, SlugError};
pub use status::*;
