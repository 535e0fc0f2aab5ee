//! Live catalog binding for the storefront.
//!
//! [`CatalogView`] owns the category and product snapshots, fetches them
//! concurrently, and publishes one combined [`CatalogState`] that request
//! handlers read without waiting on the network.

mod view;

pub use view::{CatalogState, CatalogStatus, CatalogView, FetchFailure, Sources};

use std::future::Future;

use panaderia_core::{Category, Product};

use crate::supabase::{SupabaseClient, SupabaseError};

/// Where the catalog's categories and products come from.
pub trait CatalogSource: Send + Sync + 'static {
    /// Fetch every category.
    fn fetch_categories(
        &self,
    ) -> impl Future<Output = Result<Vec<Category>, SupabaseError>> + Send;

    /// Fetch every product.
    fn fetch_products(&self) -> impl Future<Output = Result<Vec<Product>, SupabaseError>> + Send;
}

impl CatalogSource for SupabaseClient {
    fn fetch_categories(
        &self,
    ) -> impl Future<Output = Result<Vec<Category>, SupabaseError>> + Send {
        self.list_categories()
    }

    fn fetch_products(&self) -> impl Future<Output = Result<Vec<Product>, SupabaseError>> + Send {
        self.list_products()
    }
}
