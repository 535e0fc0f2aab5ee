//! Print the catalog as the storefront shows it.

use tracing::info;

use panaderia_core::resolve;

use super::{CommandError, snapshot};

/// Fetch and print every category group with its products.
///
/// # Errors
///
/// Returns an error if configuration is missing or either fetch fails.
pub async fn print() -> Result<(), CommandError> {
    let (categories, products) = snapshot().await?;
    let groups = resolve(&categories, &products);

    if groups.is_empty() {
        info!("No categories from the menu order exist yet");
        return Ok(());
    }

    for group in &groups {
        info!("{} ({} producto(s))", group.category.name, group.products.len());
        if group.is_empty() {
            info!("  No hay productos en esta categoría");
        }
        for product in &group.products {
            info!(
                "  [{}] {} {}",
                product.id,
                product.name,
                product.price_label()
            );
        }
    }

    Ok(())
}
