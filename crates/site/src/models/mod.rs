//! Site-local models.
//!
//! Content records live in `studio-core`; this module only holds what the
//! session stores.

pub mod session;

pub use session::{AdminSession, Flash, FlashKind, session_keys};
