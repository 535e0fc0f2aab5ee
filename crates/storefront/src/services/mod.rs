//! Business logic services for the storefront.
//!
//! - `auth` - Admin sign-in, session resolution and sign-out

pub mod auth;

pub use auth::{AuthError, AuthService};
