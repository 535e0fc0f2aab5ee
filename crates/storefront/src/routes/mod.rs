//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                              - Home page
//! GET  /productos                     - Catalog (skeleton, groups or error)
//! POST /productos/reintentar          - Retry a failed catalog
//! GET  /informacion                   - Information page
//! GET  /health                        - Liveness
//! GET  /health/ready                  - Readiness (catalog not failed)
//!
//! # Auth
//! GET  /login                         - Login page
//! POST /login                         - Sign in (rate limited)
//! POST /logout                        - Sign out
//!
//! # Admin (requires sign-in)
//! GET  /admin                         - Products grouped by category
//! GET  /admin/productos/nuevo         - Create form
//! POST /admin/productos               - Create
//! GET  /admin/productos/{id}/editar   - Edit form
//! POST /admin/productos/{id}          - Update
//! GET  /admin/productos/{id}/eliminar - Delete confirmation
//! POST /admin/productos/{id}/eliminar - Delete
//! ```

pub mod admin;
pub mod auth;
pub mod health;
pub mod home;
pub mod products;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

use crate::middleware::login_rate_limiter;
use crate::state::AppState;

/// Largest accepted admin form, image included.
const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(admin::index))
        .route("/productos", post(admin::create))
        .route("/productos/nuevo", get(admin::new_product))
        .route("/productos/{id}", post(admin::update))
        .route("/productos/{id}/editar", get(admin::edit_product))
        .route(
            "/productos/{id}/eliminar",
            get(admin::confirm_delete).post(admin::delete),
        )
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

/// Create the auth routes router.
///
/// `trust_proxy` decides whether the login limiter keys on forwarded headers.
pub fn auth_routes(trust_proxy: bool) -> Router<AppState> {
    Router::new()
        .route(
            "/login",
            get(auth::login_page)
                .merge(post(auth::login).layer(login_rate_limiter(trust_proxy))),
        )
        .route("/logout", post(auth::logout))
}

/// Create all routes for the storefront.
pub fn routes(trust_proxy: bool) -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .route("/informacion", get(home::info))
        .route("/productos", get(products::index))
        .route("/productos/reintentar", post(products::retry))
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .merge(auth_routes(trust_proxy))
        .nest("/admin", admin_routes())
}
