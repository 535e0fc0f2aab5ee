//! Application state shared across handlers.

use std::sync::Arc;

use axum::http::HeaderValue;

use crate::catalog::CatalogView;
use crate::config::StorefrontConfig;
use crate::middleware::content_security_policy;
use crate::services::AuthService;
use crate::supabase::SupabaseClient;

/// Error building application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("Content-Security-Policy is not a valid header value: {0}")]
    InvalidCsp(#[from] axum::http::header::InvalidHeaderValue),
}

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. Holds the one mounted [`CatalogView`]; it is
/// torn down when the last clone is dropped at shutdown.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    supabase: SupabaseClient,
    auth: AuthService,
    catalog: CatalogView,
    csp: HeaderValue,
}

impl AppState {
    /// Create the state and mount the catalog view.
    ///
    /// Must be called from within a Tokio runtime; both catalog fetches
    /// start immediately.
    ///
    /// # Errors
    ///
    /// Returns an error if the Supabase origin produces an invalid CSP header.
    pub fn new(config: StorefrontConfig) -> Result<Self, StateError> {
        let supabase = SupabaseClient::new(&config.supabase);
        let auth = AuthService::new(supabase.clone());
        let catalog = CatalogView::mount(Arc::new(supabase.clone()), config.catalog);
        let csp = HeaderValue::from_str(&content_security_policy(&config.supabase.origin()))?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                supabase,
                auth,
                catalog,
                csp,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Supabase client for direct reads and admin writes.
    #[must_use]
    pub fn supabase(&self) -> &SupabaseClient {
        &self.inner.supabase
    }

    #[must_use]
    pub fn auth(&self) -> &AuthService {
        &self.inner.auth
    }

    /// The storefront's mounted catalog view.
    #[must_use]
    pub fn catalog(&self) -> &CatalogView {
        &self.inner.catalog
    }

    /// Precomputed Content-Security-Policy header.
    #[must_use]
    pub fn csp(&self) -> &HeaderValue {
        &self.inner.csp
    }
}
