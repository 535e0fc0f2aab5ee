//! Product image uploads to Supabase storage.

use chrono::{DateTime, Utc};
use panaderia_core::UserId;
use reqwest::Method;
use secrecy::SecretString;
use tracing::{info, instrument};

use super::{SupabaseClient, SupabaseError};

/// Object name for an uploaded image: `{unix_millis}_{user_id}.{ext}`.
///
/// The extension is whatever follows the last `.` of the original file name,
/// lowercased and reduced to ASCII alphanumerics.
#[must_use]
pub fn object_name(original_file_name: &str, user: &UserId, now: DateTime<Utc>) -> String {
    let ext: String = original_file_name
        .rsplit('.')
        .next()
        .unwrap_or_default()
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect();
    let ext = if ext.is_empty() { "img".to_string() } else { ext };

    format!("{}_{user}.{ext}", now.timestamp_millis())
}

impl SupabaseClient {
    /// Upload an image and return its public URL.
    ///
    /// Existing objects are never overwritten.
    ///
    /// # Errors
    ///
    /// Returns an error if the upload is rejected (including a name clash).
    #[instrument(skip(self, bytes, token), fields(size = bytes.len()))]
    pub async fn upload_image(
        &self,
        object: &str,
        content_type: &str,
        bytes: Vec<u8>,
        token: &SecretString,
    ) -> Result<String, SupabaseError> {
        let url = self.endpoint(&format!(
            "storage/v1/object/{}/{object}",
            self.image_bucket()
        ))?;

        let response = self
            .request(Method::POST, url, Some(token))
            .header("content-type", content_type)
            .header("cache-control", "max-age=3600")
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await?;
        Self::check(response).await?;

        let public = self.public_image_url(object)?;
        info!(url = %public, "product image uploaded");
        Ok(public)
    }

    /// Public URL of an object in the image bucket.
    ///
    /// # Errors
    ///
    /// Returns an error if the object name cannot form a valid URL.
    pub fn public_image_url(&self, object: &str) -> Result<String, SupabaseError> {
        Ok(self
            .endpoint(&format!(
                "storage/v1/object/public/{}/{object}",
                self.image_bucket()
            ))?
            .to_string())
    }
}
