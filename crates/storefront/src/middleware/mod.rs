//! HTTP middleware stack for the storefront.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. `TraceLayer` (request span)
//! 3. Request ID (recorded in the span, echoed in the response)
//! 4. Session layer (tower-sessions, in-memory store)
//! 5. Security headers (CSP allowing Supabase images, HSTS, etc.)
//! 6. Rate limiting on the login form (governor)

pub mod auth;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{AuthRejection, PageContext, RequireAdmin};
pub use rate_limit::login_rate_limiter;
pub use request_id::{RequestId, request_id_middleware};
pub use security_headers::{content_security_policy, security_headers_middleware};
pub use session::create_session_layer;
