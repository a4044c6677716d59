//! Entity records mirrored from the hosted tables, and the validated
//! payloads written back to them.
//!
//! Records deserialize leniently: nullable columns fall back to their
//! defaults so a half-filled row never breaks a page. Inputs are strict and
//! only come into existence through `validate`.

pub mod contact;
pub mod media;
pub mod project;
pub mod service;

pub use contact::{ContactDraft, ContactInput, ContactMessage};
pub use media::{MediaFolder, MediaItem, group_by_folder, is_placeholder};
pub use project::{Project, ProjectDraft, ProjectInput, order_portfolio, parse_technologies};
pub use service::{Service, ServiceDraft, ServiceInput};

use serde::{Deserialize, Deserializer};

/// Deserialize `null` as `T::default()`.
pub(crate) fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Deserialize `null` (or a missing field, with `#[serde(default = ...)]`) as `true`.
pub(crate) fn null_true<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(true))
}

pub(crate) const fn default_true() -> bool {
    true
}

/// HTML checkboxes submit `on` when ticked and nothing otherwise.
pub(crate) fn checkbox(value: Option<&str>) -> bool {
    matches!(value.map(str::trim), Some("on" | "true" | "1" | "yes"))
}
