//! Typed validation of form input.
//!
//! Admin and login forms arrive as plain strings. Each form is a fixed
//! record; `validate` checks every field and either yields a typed value
//! ready for a backend call or the first [`ValidationError`] found. Nothing
//! is sent to the backend until validation passes.

use serde::{Deserialize, Serialize};

use crate::catalog::Product;
use crate::types::{CategoryId, Price, PriceError, UserId};

/// Client-side rejection of form input.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Product name is blank.
    #[error("product name is required")]
    MissingName,
    /// Price is blank, not a number, or negative.
    #[error("invalid price: {0}")]
    InvalidPrice(#[from] PriceError),
    /// No category was selected.
    #[error("a category must be selected")]
    MissingCategory,
    /// Uploaded file is not an image.
    #[error("unsupported image type: {0}")]
    UnsupportedImage(String),
    /// Email or password left blank on the login form.
    #[error("email and password are required")]
    MissingCredentials,
}

impl ValidationError {
    /// Short heading shown to the user.
    #[must_use]
    pub const fn title(&self) -> &'static str {
        match self {
            Self::MissingName => "Nombre requerido",
            Self::InvalidPrice(_) => "Precio inválido",
            Self::MissingCategory => "Categoría requerida",
            Self::UnsupportedImage(_) => "Imagen no válida",
            Self::MissingCredentials => "Error",
        }
    }

    /// Longer explanation shown under the heading.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::MissingName => "Por favor ingresa el nombre del producto.",
            Self::InvalidPrice(_) => "Por favor ingresa un precio válido.",
            Self::MissingCategory => "Por favor selecciona una categoría.",
            Self::UnsupportedImage(_) => "El archivo seleccionado debe ser una imagen.",
            Self::MissingCredentials => "Por favor completa todos los campos",
        }
    }
}

/// Raw product form as submitted by the admin panel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProductForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub category_id: String,
    /// Image URL already stored for the product; kept unless a new file is
    /// uploaded.
    #[serde(default)]
    pub image_url: String,
}

impl ProductForm {
    /// Pre-fill the form from an existing product for editing.
    #[must_use]
    pub fn from_product(product: &Product) -> Self {
        Self {
            name: product.name.clone(),
            description: product.description.clone().unwrap_or_default(),
            price: product
                .price
                .map(|p| p.amount().to_string())
                .unwrap_or_default(),
            category_id: product
                .category_id
                .as_ref()
                .map(|id| id.as_str().to_owned())
                .unwrap_or_default(),
            image_url: product.image_url.clone().unwrap_or_default(),
        }
    }

    /// Validate every field.
    ///
    /// # Errors
    ///
    /// Returns the first failing field in form order: name, price, category.
    pub fn validate(&self) -> Result<ProductDraft, ValidationError> {
        let name = validate_name(&self.name)?;
        let price = Price::parse(&self.price)?;
        let category_id = validate_category(&self.category_id)?;

        Ok(ProductDraft {
            name,
            description: non_blank(&self.description),
            price,
            category_id,
            image_url: non_blank(&self.image_url),
        })
    }
}

fn validate_name(name: &str) -> Result<String, ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingName);
    }
    Ok(trimmed.to_owned())
}

fn validate_category(category_id: &str) -> Result<CategoryId, ValidationError> {
    let trimmed = category_id.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingCategory);
    }
    Ok(CategoryId::new(trimmed))
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

/// Check the content type of an uploaded product image.
///
/// # Errors
///
/// Returns [`ValidationError::UnsupportedImage`] unless the type is `image/*`.
pub fn validate_image_type(content_type: &str) -> Result<(), ValidationError> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    match essence.strip_prefix("image/") {
        Some(subtype) if !subtype.is_empty() => Ok(()),
        _ => Err(ValidationError::UnsupportedImage(content_type.to_owned())),
    }
}

/// A validated product, ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductDraft {
    pub name: String,
    pub description: Option<String>,
    pub price: Price,
    pub category_id: CategoryId,
    pub image_url: Option<String>,
}

impl ProductDraft {
    /// Replace the image with a freshly uploaded one.
    #[must_use]
    pub fn with_image(mut self, url: String) -> Self {
        self.image_url = Some(url);
        self
    }

    /// Build the row body sent on insert or update, attributed to `author`.
    #[must_use]
    pub fn into_record(self, author: UserId) -> ProductRecord {
        ProductRecord {
            name: self.name,
            description: self.description,
            price: self.price,
            image_url: self.image_url,
            category_id: self.category_id,
            user_id: author,
        }
    }
}

/// Row body for the `Products` table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductRecord {
    pub name: String,
    pub description: Option<String>,
    pub price: Price,
    pub image_url: Option<String>,
    pub category_id: CategoryId,
    pub user_id: UserId,
}

/// Raw login form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl LoginForm {
    /// Require both fields before contacting the auth service.
    ///
    /// The email is trimmed; the password is passed through untouched.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingCredentials`] if either is blank.
    pub fn validate(&self) -> Result<(String, String), ValidationError> {
        let email = self.email.trim();
        if email.is_empty() || self.password.is_empty() {
            return Err(ValidationError::MissingCredentials);
        }
        Ok((email.to_owned(), self.password.clone()))
    }
}
