//! Categories, products and the category-grouped catalog.
//!
//! The public menu and the admin table both show products grouped under a
//! fixed sequence of category names. [`resolve`] turns complete snapshots of
//! the `Categories` and `Products` tables into that grouped structure.
//!
//! # Rules
//!
//! - Groups follow [`CATEGORY_ORDER`] exactly.
//! - A name in the order with no category record is omitted, not rendered
//!   as an empty group.
//! - A category whose name is not in the order is never shown.
//! - Products whose `category_id` matches no category are dropped.
//! - Products inside a group are sorted by ID using ordinal string
//!   comparison, so `"10"` comes before `"2"`.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Deserializer, Serialize};

use crate::types::{CategoryId, Price, ProductId, UserId};

/// Display order of the menu. Names must match `Category::name` exactly,
/// diacritics included.
pub const CATEGORY_ORDER: [&str; 6] = [
    "Cafetería",
    "Combos",
    "Panadería",
    "Para Agregar",
    "Sandwich",
    "Bebidas",
];

/// A row of the `Categories` table.
///
/// A missing or `null` name reads as empty and matches no menu slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
}

/// A row of the `Products` table.
///
/// Every field except `id` tolerates being absent or `null` so that one
/// incomplete row never fails a whole snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Option<Price>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub user_id: Option<UserId>,
}

impl Product {
    /// The description, or `None` when it is absent or blank.
    #[must_use]
    pub fn description_text(&self) -> Option<&str> {
        self.description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
    }

    /// The image URL, or `None` when it is absent or blank.
    #[must_use]
    pub fn image(&self) -> Option<&str> {
        self.image_url.as_deref().filter(|u| !u.trim().is_empty())
    }

    /// The price as `$x.xx`, or `-` when the row has none.
    #[must_use]
    pub fn price_label(&self) -> String {
        self.price.map_or_else(|| "-".to_string(), |p| p.to_string())
    }

    fn belongs_to(&self, category: &CategoryId) -> bool {
        self.category_id.as_ref() == Some(category)
    }
}

/// Read a nullable text column as a plain string, `null` becoming `""`.
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// One category with its products, in display order.
///
/// Derived on every snapshot change; never persisted or mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryGroup {
    pub category: Category,
    pub products: Vec<Product>,
}

impl CategoryGroup {
    /// Fragment identifier used by the category selector to jump to this
    /// group, e.g. `"para-agregar"` for "Para Agregar".
    #[must_use]
    pub fn anchor(&self) -> String {
        anchor_slug(&self.category.name)
    }

    /// Whether the category has no products.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

/// Group products under the fixed category order.
///
/// `categories` and `products` are complete snapshots. When two categories
/// share a name the later one in `categories` wins. Inputs are only read;
/// the returned groups own clones of the selected rows.
///
/// ```
/// use panaderia_core::{Category, CategoryId, Product, ProductId, resolve};
///
/// let categories = vec![Category { id: CategoryId::new("c1"), name: "Panadería".into() }];
/// let product = |id: &str, category: &str| Product {
///     id: ProductId::new(id),
///     name: String::new(),
///     description: None,
///     price: None,
///     image_url: None,
///     category_id: Some(CategoryId::new(category)),
///     user_id: None,
/// };
/// let products = vec![product("p2", "c1"), product("p1", "c1"), product("p9", "c9")];
///
/// let groups = resolve(&categories, &products);
/// assert_eq!(groups.len(), 1);
/// let ids: Vec<&str> = groups[0].products.iter().map(|p| p.id.as_str()).collect();
/// assert_eq!(ids, ["p1", "p2"]);
/// ```
#[must_use]
pub fn resolve(categories: &[Category], products: &[Product]) -> Vec<CategoryGroup> {
    let by_name: HashMap<&str, &Category> = categories
        .iter()
        .map(|category| (category.name.as_str(), category))
        .collect();

    CATEGORY_ORDER
        .iter()
        .filter_map(|name| {
            let category = *by_name.get(name)?;

            let mut selected: Vec<Product> = products
                .iter()
                .filter(|product| product.belongs_to(&category.id))
                .cloned()
                .collect();
            selected.sort_by(|a, b| a.id.cmp(&b.id));

            Some(CategoryGroup {
                category: category.clone(),
                products: selected,
            })
        })
        .collect()
}

/// Mismatches between the category table and the fixed display order.
///
/// The catalog silently hides anything that does not line up, so this report
/// is how an operator finds out that a rename broke a section of the menu.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogAudit {
    /// Names from [`CATEGORY_ORDER`] with no category record.
    pub missing_names: Vec<&'static str>,
    /// Category records whose name is not in [`CATEGORY_ORDER`].
    pub unlisted_categories: Vec<Category>,
    /// Products whose category is unlisted, hidden from every view.
    pub hidden_products: Vec<ProductId>,
    /// Products whose `category_id` matches no category at all.
    pub orphan_products: Vec<ProductId>,
}

impl CatalogAudit {
    /// Whether every product is reachable and every fixed name is present.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.missing_names.is_empty()
            && self.unlisted_categories.is_empty()
            && self.hidden_products.is_empty()
            && self.orphan_products.is_empty()
    }
}

/// Compare a snapshot against [`CATEGORY_ORDER`].
#[must_use]
pub fn audit(categories: &[Category], products: &[Product]) -> CatalogAudit {
    let names: HashSet<&str> = categories.iter().map(|c| c.name.as_str()).collect();
    let known: HashSet<&CategoryId> = categories.iter().map(|c| &c.id).collect();

    let missing_names = CATEGORY_ORDER
        .iter()
        .copied()
        .filter(|name| !names.contains(name))
        .collect();

    let unlisted_categories: Vec<Category> = categories
        .iter()
        .filter(|c| !CATEGORY_ORDER.contains(&c.name.as_str()))
        .cloned()
        .collect();
    let unlisted: HashSet<&CategoryId> = unlisted_categories.iter().map(|c| &c.id).collect();

    let mut hidden_products = Vec::new();
    let mut orphan_products = Vec::new();
    for product in products {
        match &product.category_id {
            Some(id) if unlisted.contains(id) => hidden_products.push(product.id.clone()),
            Some(id) if known.contains(id) => {}
            _ => orphan_products.push(product.id.clone()),
        }
    }
    hidden_products.sort();
    orphan_products.sort();

    CatalogAudit {
        missing_names,
        unlisted_categories,
        hidden_products,
        orphan_products,
    }
}

/// Turn a category name into a URL fragment: lowercase, whitespace runs
/// become `-`, Spanish diacritics are folded to their base letter.
#[must_use]
pub fn anchor_slug(name: &str) -> String {
    name.split_whitespace()
        .map(|word| word.chars().flat_map(char::to_lowercase).map(fold_diacritic).collect::<String>())
        .collect::<Vec<_>>()
        .join("-")
}

const fn fold_diacritic(c: char) -> char {
    match c {
        'á' | 'à' | 'ä' | 'â' => 'a',
        'é' | 'è' | 'ë' | 'ê' => 'e',
        'í' | 'ì' | 'ï' | 'î' => 'i',
        'ó' | 'ò' | 'ö' | 'ô' => 'o',
        'ú' | 'ù' | 'ü' | 'û' => 'u',
        'ñ' => 'n',
        'ç' => 'c',
        other => other,
    }
}
