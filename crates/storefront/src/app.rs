//! Router assembly.
//!
//! `main` and the integration tests build the same router, so every layer
//! the binary serves with is exercised in tests too.

use axum::{
    Router,
    extract::Request,
    http::StatusCode,
    middleware::{from_fn, from_fn_with_state},
    response::{IntoResponse, Response},
};
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::error::ErrorTemplate;
use crate::middleware::{
    PageContext, create_session_layer, request_id_middleware, security_headers_middleware,
};
use crate::routes;
use crate::state::AppState;

/// Static assets, relative to the workspace root.
pub const STATIC_DIR: &str = "crates/storefront/static";

/// Build the full storefront router with its middleware stack.
///
/// Sentry layers are added by `main` on top of this.
pub fn router(state: AppState) -> Router {
    let session_layer = create_session_layer(state.config());
    let trust_proxy = state.config().trust_proxy;

    Router::new()
        .merge(routes::routes(trust_proxy))
        .nest_service("/static", ServeDir::new(STATIC_DIR))
        .fallback(not_found)
        .layer(from_fn_with_state(
            state.clone(),
            security_headers_middleware,
        ))
        .layer(session_layer)
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = tracing::field::Empty,
                )
            }),
        )
        .with_state(state)
}

/// 404 page for unknown routes.
async fn not_found(page: PageContext) -> Response {
    let template = ErrorTemplate {
        page,
        ..ErrorTemplate::not_found()
    };
    (StatusCode::NOT_FOUND, template).into_response()
}
