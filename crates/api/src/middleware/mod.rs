//! HTTP middleware and extractors.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request span)
//! 3. Request ID (recorded on the span, Sentry scope and response)
//! 4. CORS
//! 5. Body size limit

pub mod auth;
pub mod request_id;

pub use auth::RequireUser;
pub use request_id::request_id_middleware;
