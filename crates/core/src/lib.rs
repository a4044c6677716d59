//! Studio Core - Shared domain types.
//!
//! This crate provides the types used across all studio components:
//! - `site` - Public marketing site and the secret-URL admin panel
//! - `cli` - Command-line tools for migrations, seeding and storage audits
//!
//! # Architecture
//!
//! The core crate contains only types and validation - no I/O, no database
//! access, no HTTP clients. Records mirror the hosted tables (`services`,
//! `projects_portfolio`, `contacts`); the input payloads validate raw form
//! fields before anything is sent to the hosted store.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for emails, slugs and status enums
//! - [`models`] - Entity records and validated input payloads
//! - [`validation`] - Field-level validation error collection

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::ValidationErrors;
