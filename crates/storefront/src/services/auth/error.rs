//! Authentication error types.

use panaderia_core::ValidationError;
use thiserror::Error;

use crate::supabase::SupabaseError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Login form incomplete.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The auth service rejected the email/password pair.
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    /// Auth service unreachable or returned an unexpected error.
    #[error("auth service error: {0}")]
    Supabase(#[from] SupabaseError),

    /// Session store failure.
    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),
}

impl AuthError {
    /// Message shown on the login form.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(e) => e.description().to_string(),
            Self::InvalidCredentials(message) => message.clone(),
            Self::Supabase(e) => e.user_message(),
            Self::Session(_) => "No se pudo iniciar la sesión.".to_string(),
        }
    }
}
