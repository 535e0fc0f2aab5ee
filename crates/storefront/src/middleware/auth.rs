//! Authentication extractors.
//!
//! Both extractors resolve the session through [`AuthService::resolve`]
//! before the handler runs, so handlers only ever see a settled
//! [`SessionState`].
//!
//! [`AuthService::resolve`]: crate::services::AuthService::resolve

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::models::{CurrentAdmin, Flash, SessionState};
use crate::state::AppState;

/// Extractor that requires a signed-in admin.
///
/// Anonymous visitors are redirected to the login page before any protected
/// content is rendered.
///
/// # Example
///
/// ```rust,ignore
/// async fn admin_panel(RequireAdmin(admin): RequireAdmin) -> impl IntoResponse {
///     format!("Hola, {}", admin.display_name())
/// }
/// ```
pub struct RequireAdmin(pub CurrentAdmin);

/// Rejection for [`RequireAdmin`].
#[derive(Debug)]
pub enum AuthRejection {
    /// Not signed in.
    RedirectToLogin,
    /// Session layer missing from the router.
    MissingSession,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to("/login").into_response(),
            Self::MissingSession => {
                tracing::error!("Session extension missing; is the session layer installed?");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or(AuthRejection::MissingSession)?;

        match state.auth().resolve(&session).await {
            SessionState::Authenticated(admin) => Ok(Self(admin)),
            SessionState::Anonymous => Err(AuthRejection::RedirectToLogin),
        }
    }
}

/// Per-page context shared by every template: navigation state and the
/// pending flash message.
#[derive(Debug, Clone, Default)]
pub struct PageContext {
    pub signed_in: bool,
    pub admin_name: String,
    pub flash: Option<Flash>,
}

impl PageContext {
    /// Context for pages rendered outside a session (error pages).
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Context for an admin page, taking the pending flash.
    pub async fn for_admin(admin: &CurrentAdmin, session: &Session) -> Self {
        Self {
            signed_in: true,
            admin_name: admin.display_name().to_owned(),
            flash: Flash::take(session).await,
        }
    }

    /// Replace the pending flash with one produced by this request.
    #[must_use]
    pub fn with_flash(mut self, flash: Flash) -> Self {
        self.flash = Some(flash);
        self
    }
}

impl FromRequestParts<AppState> for PageContext {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(session) = parts.extensions.get::<Session>().cloned() else {
            return Ok(Self::anonymous());
        };

        let context = match state.auth().resolve(&session).await {
            SessionState::Authenticated(admin) => Self::for_admin(&admin, &session).await,
            SessionState::Anonymous => Self {
                flash: Flash::take(&session).await,
                ..Self::default()
            },
        };
        Ok(context)
    }
}
