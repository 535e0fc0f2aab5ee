//! `PostgREST` access to the `Categories` and `Products` tables.

use panaderia_core::{Category, Product, ProductId, ProductRecord};
use reqwest::Method;
use secrecy::SecretString;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use super::{SupabaseClient, SupabaseError};

const CATEGORIES: &str = "rest/v1/Categories";
const PRODUCTS: &str = "rest/v1/Products";

impl SupabaseClient {
    /// Fetch every category, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-success response.
    #[instrument(skip(self))]
    pub async fn list_categories(&self) -> Result<Vec<Category>, SupabaseError> {
        self.select(CATEGORIES, &[("order", "name.asc")]).await
    }

    /// Fetch every product, ordered by ID.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-success response.
    #[instrument(skip(self))]
    pub async fn list_products(&self) -> Result<Vec<Product>, SupabaseError> {
        self.select(PRODUCTS, &[("order", "id.asc")]).await
    }

    /// Fetch a single product.
    ///
    /// # Errors
    ///
    /// Returns `SupabaseError::NotFound` when no row has this ID.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get_product(&self, id: &ProductId) -> Result<Product, SupabaseError> {
        let filter = format!("eq.{id}");
        self.select::<Product>(PRODUCTS, &[("id", &filter)])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| SupabaseError::NotFound(format!("product {id}")))
    }

    /// Insert a product.
    ///
    /// # Errors
    ///
    /// Returns an error if the write is rejected.
    #[instrument(skip(self, record, token), fields(name = %record.name))]
    pub async fn insert_product(
        &self,
        record: &ProductRecord,
        token: &SecretString,
    ) -> Result<(), SupabaseError> {
        let url = self.endpoint(PRODUCTS)?;
        let response = self
            .request(Method::POST, url, Some(token))
            .header("Prefer", "return=minimal")
            .json(&[record])
            .send()
            .await?;
        Self::check(response).await?;
        debug!("product inserted");
        Ok(())
    }

    /// Update a product in place.
    ///
    /// # Errors
    ///
    /// Returns `SupabaseError::NotFound` if no row was updated, or another
    /// error if the write is rejected.
    #[instrument(skip(self, record, token), fields(product_id = %id))]
    pub async fn update_product(
        &self,
        id: &ProductId,
        record: &ProductRecord,
        token: &SecretString,
    ) -> Result<(), SupabaseError> {
        let url = self.filtered(PRODUCTS, id)?;
        let response = self
            .request(Method::PATCH, url, Some(token))
            .header("Prefer", "return=representation")
            .json(record)
            .send()
            .await?;
        Self::expect_rows(response, id).await
    }

    /// Hard-delete a product.
    ///
    /// # Errors
    ///
    /// Returns `SupabaseError::NotFound` if no row was deleted, or another
    /// error if the write is rejected.
    #[instrument(skip(self, token), fields(product_id = %id))]
    pub async fn delete_product(
        &self,
        id: &ProductId,
        token: &SecretString,
    ) -> Result<(), SupabaseError> {
        let url = self.filtered(PRODUCTS, id)?;
        let response = self
            .request(Method::DELETE, url, Some(token))
            .header("Prefer", "return=representation")
            .send()
            .await?;
        Self::expect_rows(response, id).await
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        params: &[(&str, &str)],
    ) -> Result<Vec<T>, SupabaseError> {
        let mut url = self.endpoint(table)?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("select", "*");
            for (key, value) in params {
                query.append_pair(key, value);
            }
        }

        let response = self.request(Method::GET, url, None).send().await?;
        let body = Self::check(response).await?.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    fn filtered(&self, table: &str, id: &ProductId) -> Result<url::Url, SupabaseError> {
        let mut url = self.endpoint(table)?;
        url.query_pairs_mut().append_pair("id", &format!("eq.{id}"));
        Ok(url)
    }

    /// With `return=representation`, an empty array means the filter matched
    /// nothing (or row-level security hid the row).
    async fn expect_rows(
        response: reqwest::Response,
        id: &ProductId,
    ) -> Result<(), SupabaseError> {
        let body = Self::check(response).await?.text().await?;
        let rows: Vec<serde_json::Value> = serde_json::from_str(&body)?;
        if rows.is_empty() {
            return Err(SupabaseError::NotFound(format!("product {id}")));
        }
        Ok(())
    }
}
