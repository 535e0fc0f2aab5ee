//! Unified error handling with Sentry integration.
//!
//! Handlers that cannot recover locally return `Result<T, AppError>`. Admin
//! form handlers handle write failures themselves and re-render the form.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::filters;
use crate::middleware::PageContext;
use crate::services::AuthError;
use crate::supabase::SupabaseError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Supabase call failed.
    #[error("Supabase error: {0}")]
    Supabase(#[from] SupabaseError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Session store failure.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error page template.
#[derive(Template, WebTemplate)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub page: PageContext,
    pub status_code: u16,
    pub title: String,
    pub message: String,
}

impl ErrorTemplate {
    /// The 404 page.
    #[must_use]
    pub fn not_found() -> Self {
        Self {
            page: PageContext::anonymous(),
            status_code: 404,
            title: "La página no existe".to_string(),
            message: "La dirección que buscas no existe o fue movida.".to_string(),
        }
    }
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Supabase(SupabaseError::NotFound(_)) | Self::NotFound(_) => {
                StatusCode::NOT_FOUND
            }
            Self::Supabase(SupabaseError::Unauthorized(_)) => StatusCode::UNAUTHORIZED,
            Self::Supabase(SupabaseError::RateLimited(_)) => StatusCode::TOO_MANY_REQUESTS,
            Self::Supabase(_) => StatusCode::BAD_GATEWAY,
            Self::Auth(AuthError::Validation(_)) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Auth(AuthError::InvalidCredentials(_)) => StatusCode::UNAUTHORIZED,
            Self::Auth(AuthError::Supabase(_)) => StatusCode::BAD_GATEWAY,
            Self::Auth(AuthError::Session(_)) | Self::Session(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    // Internal details never reach the client
    fn public_message(&self) -> String {
        match self {
            Self::NotFound(_) | Self::Supabase(SupabaseError::NotFound(_)) => {
                "La página no existe".to_string()
            }
            Self::Supabase(e) => e.user_message(),
            Self::Auth(e) => e.user_message(),
            Self::BadRequest(msg) => msg.clone(),
            Self::Session(_) | Self::Internal(_) => "Error interno del servidor".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let template = ErrorTemplate {
            page: PageContext::anonymous(),
            status_code: status.as_u16(),
            title: status
                .canonical_reason()
                .unwrap_or("Error")
                .to_string(),
            message: self.public_message(),
        };

        (status, template).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context after an admin signs in.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context on sign-out.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for an admin action.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("admin", "Product deleted", Some(&[("product_id", "12")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
