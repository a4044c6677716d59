//! HTTP middleware stack for the site.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Session layer (tower-sessions with `PostgreSQL` store)
//! 5. Security headers (CSP, framing, isolation)
//! 6. Rate limiting on the contact form and login POSTs (governor)
//!
//! Admin pages are guarded per handler by the [`RequireSession`] extractor.

pub mod auth;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{
    AuthRejection, RequireSession, begin_admin_session, clear_admin_session, set_admin_session,
};
pub use rate_limit::{contact_rate_limiter, login_rate_limiter};
pub use request_id::{RequestId, request_id_middleware};
pub use security_headers::security_headers_middleware;
pub use session::{create_session_layer, create_session_store};
