//! Public catalog page.
//!
//! Renders whatever the mounted catalog view currently holds: the skeleton
//! while loading, the grouped catalog once ready, or an error page.

use std::sync::Arc;
use std::time::Duration;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Extension,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use tokio::sync::watch;
use tracing::{debug, instrument, warn};

use panaderia_core::CategoryGroup;

use crate::catalog::{CatalogState, CatalogStatus};
use crate::filters;
use crate::middleware::{PageContext, RequestId};
use crate::state::AppState;

/// How long the retry handler waits for the worker to pick up the request.
const RETRY_ACK_TIMEOUT: Duration = Duration::from_secs(1);

/// Skeleton cards rendered while loading.
const SKELETON_CARDS: usize = 6;

/// Catalog page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct CatalogTemplate {
    pub page: PageContext,
    pub groups: Arc<[CategoryGroup]>,
}

/// Skeleton page; reloads itself until the catalog settles.
#[derive(Template, WebTemplate)]
#[template(path = "products/loading.html")]
pub struct LoadingTemplate {
    pub page: PageContext,
    pub cards: usize,
}

/// Catalog failure page.
#[derive(Template, WebTemplate)]
#[template(path = "products/error.html")]
pub struct CatalogErrorTemplate {
    pub page: PageContext,
    pub reference: String,
}

/// Display the catalog.
#[instrument(skip_all)]
pub async fn index(
    State(state): State<AppState>,
    page: PageContext,
    request_id: Option<Extension<RequestId>>,
) -> Response {
    let catalog = state.catalog();
    catalog.refresh_if_stale();

    match catalog.state() {
        CatalogState::Loading => LoadingTemplate {
            page,
            cards: SKELETON_CARDS,
        }
        .into_response(),
        CatalogState::Ready(groups) => CatalogTemplate { page, groups }.into_response(),
        CatalogState::Failed(failure) => {
            let reference = request_id.map(|Extension(id)| id.0).unwrap_or_default();
            warn!(%failure, %reference, "Serving catalog error page");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                CatalogErrorTemplate { page, reference },
            )
                .into_response()
        }
    }
}

/// Outcome of waiting for the worker after a retry.
#[derive(Debug, PartialEq, Eq)]
enum RetryAck {
    PickedUp,
    WorkerStopped,
    TimedOut,
}

async fn wait_for_ack(updates: &mut watch::Receiver<CatalogStatus>, limit: Duration) -> RetryAck {
    match tokio::time::timeout(limit, updates.changed()).await {
        Ok(Ok(())) => RetryAck::PickedUp,
        Ok(Err(_)) => RetryAck::WorkerStopped,
        Err(_) => RetryAck::TimedOut,
    }
}

/// Retry a failed catalog, then show it again.
#[instrument(skip_all)]
pub async fn retry(State(state): State<AppState>) -> Redirect {
    let catalog = state.catalog();
    let mut updates = catalog.subscribe();

    if catalog.retry() {
        // Wait for the worker to flip back to loading so the redirect shows
        // the skeleton instead of the stale failure.
        match wait_for_ack(&mut updates, RETRY_ACK_TIMEOUT).await {
            RetryAck::PickedUp => debug!("Catalog worker picked up the retry"),
            RetryAck::WorkerStopped => warn!("Catalog worker stopped before the retry"),
            RetryAck::TimedOut => debug!(
                timeout = ?RETRY_ACK_TIMEOUT,
                "Catalog worker did not pick up the retry in time"
            ),
        }
    } else {
        debug!("Catalog has not failed, nothing to retry");
    }

    Redirect::to("/productos")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn status() -> CatalogStatus {
        CatalogStatus {
            state: CatalogState::Loading,
            refreshing: false,
            categories_fetched_at: None,
            products_fetched_at: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_ack_reports_each_outcome() {
        let (tx, mut rx) = watch::channel(status());
        tx.send_replace(status());
        assert_eq!(wait_for_ack(&mut rx, RETRY_ACK_TIMEOUT).await, RetryAck::PickedUp);

        assert_eq!(wait_for_ack(&mut rx, RETRY_ACK_TIMEOUT).await, RetryAck::TimedOut);

        drop(tx);
        assert_eq!(
            wait_for_ack(&mut rx, RETRY_ACK_TIMEOUT).await,
            RetryAck::WorkerStopped
        );
    }
}
