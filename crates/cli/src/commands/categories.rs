//! Category table audit.

use tracing::{info, warn};

use panaderia_core::{CATEGORY_ORDER, audit as audit_snapshot};

use super::{CommandError, snapshot};

/// Report fixed names with no category, categories outside the fixed order,
/// and products the storefront cannot show.
///
/// Returns whether the catalog is clean.
///
/// # Errors
///
/// Returns an error if configuration is missing or either fetch fails.
pub async fn audit() -> Result<bool, CommandError> {
    let (categories, products) = snapshot().await?;
    let report = audit_snapshot(&categories, &products);

    info!("Menu order: {}", CATEGORY_ORDER.join(", "));

    if report.is_clean() {
        info!(
            categories = categories.len(),
            products = products.len(),
            "Catalog is clean"
        );
        return Ok(true);
    }

    for name in &report.missing_names {
        warn!("Missing category: no record named {name:?}");
    }
    for category in &report.unlisted_categories {
        warn!(
            "Unlisted category [{}] {:?}: not in the menu order, never shown",
            category.id, category.name
        );
    }
    for id in &report.hidden_products {
        warn!("Hidden product [{id}]: its category is not in the menu order");
    }
    for id in &report.orphan_products {
        warn!("Orphan product [{id}]: its category does not exist");
    }

    Ok(false)
}
