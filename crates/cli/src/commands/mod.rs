//! CLI command implementations.

pub mod catalog;
pub mod categories;

use panaderia_core::{Category, Product};
use panaderia_storefront::config::{ConfigError, SupabaseConfig};
use panaderia_storefront::supabase::{SupabaseClient, SupabaseError};

/// Errors returned by CLI commands.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Supabase error: {0}")]
    Supabase(#[from] SupabaseError),

    #[error("catalog audit found problems")]
    AuditFailed,
}

/// Fetch both tables with the anon key, concurrently.
async fn snapshot() -> Result<(Vec<Category>, Vec<Product>), CommandError> {
    let _ = dotenvy::dotenv();
    let client = SupabaseClient::new(&SupabaseConfig::from_env()?);

    let (categories, products) = tokio::try_join!(client.list_categories(), client.list_products())?;
    tracing::debug!(
        categories = categories.len(),
        products = products.len(),
        "Fetched catalog snapshot"
    );
    Ok((categories, products))
}
