//! Home and information pages.

use askama::Template;
use askama_web::WebTemplate;
use axum::response::IntoResponse;
use tracing::instrument;

use crate::filters;
use crate::middleware::PageContext;

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub page: PageContext,
}

/// Information page template.
#[derive(Template, WebTemplate)]
#[template(path = "info.html")]
pub struct InfoTemplate {
    pub page: PageContext,
}

/// Display the home page hero.
#[instrument(skip_all)]
pub async fn home(page: PageContext) -> impl IntoResponse {
    HomeTemplate { page }
}

/// Display the information page.
#[instrument(skip_all)]
pub async fn info(page: PageContext) -> impl IntoResponse {
    InfoTemplate { page }
}
