//! Login and logout.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use panaderia_core::LoginForm;

use crate::filters;
use crate::middleware::PageContext;
use crate::models::Flash;
use crate::services::AuthError;
use crate::state::AppState;

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub page: PageContext,
    pub email: String,
}

/// Display the login page, or go to the admin panel if already signed in.
#[instrument(skip_all)]
pub async fn login_page(page: PageContext) -> Response {
    if page.signed_in {
        return Redirect::to("/admin").into_response();
    }
    LoginTemplate {
        page,
        email: String::new(),
    }
    .into_response()
}

/// Handle the login form.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    page: PageContext,
    Form(form): Form<LoginForm>,
) -> Response {
    match state.auth().sign_in(&session, &form).await {
        Ok(_) => {
            Flash::success("¡Bienvenido!", "Has iniciado sesión correctamente")
                .push(&session)
                .await;
            Redirect::to("/productos").into_response()
        }
        Err(err) => {
            let (status, title) = match &err {
                AuthError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "Error"),
                AuthError::InvalidCredentials(_) => {
                    (StatusCode::UNAUTHORIZED, "Error de autenticación")
                }
                AuthError::Supabase(_) => (StatusCode::BAD_GATEWAY, "Error de autenticación"),
                AuthError::Session(_) => {
                    tracing::error!(error = %err, "Session store failed during login");
                    (StatusCode::INTERNAL_SERVER_ERROR, "Ocurrió un error inesperado")
                }
            };

            let template = LoginTemplate {
                page: page.with_flash(Flash::error(title, err.user_message())),
                email: form.email,
            };
            (status, template).into_response()
        }
    }
}

/// Handle logout.
#[instrument(skip_all)]
pub async fn logout(State(state): State<AppState>, session: Session) -> Redirect {
    state.auth().sign_out(&session).await;
    Flash::info("Sesión cerrada", "Has cerrado sesión correctamente")
        .push(&session)
        .await;
    Redirect::to("/")
}
