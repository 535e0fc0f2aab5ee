//! Supabase client: `PostgREST` tables, `GoTrue` auth and object storage.
//!
//! # Architecture
//!
//! - Plain `reqwest` calls against the project's HTTP APIs; no SDK
//! - Supabase is the source of truth - nothing is persisted locally
//! - Reads use the anon key; writes and uploads carry the signed-in admin's
//!   access token so row-level security attributes them correctly
//!
//! # Example
//!
//! ```rust,ignore
//! use panaderia_storefront::supabase::SupabaseClient;
//!
//! let client = SupabaseClient::new(&config.supabase);
//!
//! let categories = client.list_categories().await?;
//! let products = client.list_products().await?;
//! let groups = panaderia_core::resolve(&categories, &products);
//! ```

mod auth;
mod rest;
mod storage;

pub use auth::{AuthSession, AuthUser};
pub use storage::object_name;

use std::sync::Arc;

use reqwest::{Method, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

use crate::config::SupabaseConfig;

/// Errors that can occur when talking to Supabase.
#[derive(Debug, Error)]
pub enum SupabaseError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Endpoint URL could not be built.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Token missing, expired, or rejected by row-level security.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by Supabase.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Any other non-success response.
    #[error("Supabase returned {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Message extracted from the error body.
        message: String,
    },
}

impl SupabaseError {
    /// Message suitable for showing to the admin who triggered the call.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Unauthorized(msg) | Self::NotFound(msg) => msg.clone(),
            Self::Api { message, .. } => message.clone(),
            Self::RateLimited(_) => "Demasiadas solicitudes, intenta nuevamente.".to_string(),
            Self::Http(_) | Self::Url(_) | Self::Parse(_) => {
                "No se pudo contactar al servidor.".to_string()
            }
        }
    }
}

// =============================================================================
// SupabaseClient
// =============================================================================

/// Client for a Supabase project.
///
/// Cheap to clone; all clones share one connection pool.
#[derive(Clone)]
pub struct SupabaseClient {
    inner: Arc<SupabaseClientInner>,
}

struct SupabaseClientInner {
    client: reqwest::Client,
    base_url: Url,
    anon_key: SecretString,
    image_bucket: String,
}

impl SupabaseClient {
    /// Create a new client for the configured project.
    #[must_use]
    pub fn new(config: &SupabaseConfig) -> Self {
        let mut base_url = config.url.clone();
        // Url::join treats the last segment as a file unless the path ends in '/'
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }

        Self {
            inner: Arc::new(SupabaseClientInner {
                client: reqwest::Client::new(),
                base_url,
                anon_key: config.anon_key.clone(),
                image_bucket: config.image_bucket.clone(),
            }),
        }
    }

    /// Resolve a path relative to the project URL.
    fn endpoint(&self, path: &str) -> Result<Url, SupabaseError> {
        Ok(self.inner.base_url.join(path)?)
    }

    /// Start a request carrying the API key and a bearer token.
    ///
    /// Without a user token the anon key doubles as the bearer, which is
    /// what Supabase expects for public reads.
    fn request(&self, method: Method, url: Url, token: Option<&SecretString>) -> RequestBuilder {
        let bearer = token.unwrap_or(&self.inner.anon_key);
        self.inner
            .client
            .request(method, url)
            .header("apikey", self.inner.anon_key.expose_secret())
            .bearer_auth(bearer.expose_secret())
    }

    /// Turn a non-success response into a [`SupabaseError`].
    async fn check(response: Response) -> Result<Response, SupabaseError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(SupabaseError::RateLimited(retry_after));
        }

        let body = response.text().await.unwrap_or_default();
        let message = error_message(&body, status);

        tracing::warn!(
            status = %status,
            message = %message,
            "Supabase returned non-success status"
        );

        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => SupabaseError::Unauthorized(message),
            StatusCode::NOT_FOUND => SupabaseError::NotFound(message),
            _ => SupabaseError::Api {
                status: status.as_u16(),
                message,
            },
        })
    }

    /// Storage bucket for product images.
    #[must_use]
    pub fn image_bucket(&self) -> &str {
        &self.inner.image_bucket
    }
}

/// Pull a human-readable message out of an error body.
///
/// `PostgREST` uses `message`, `GoTrue` uses `msg` or `error_description`,
/// storage uses `message` or `error`. Falls back to the first 200 characters
/// of the body, then to the status reason.
fn error_message(body: &str, status: StatusCode) -> String {
    let parsed = serde_json::from_str::<serde_json::Value>(body).ok();
    let field = parsed.as_ref().and_then(|json| {
        ["msg", "message", "error_description", "error"]
            .iter()
            .find_map(|key| json.get(key).and_then(serde_json::Value::as_str))
            .map(str::to_owned)
    });

    field
        .or_else(|| {
            let trimmed = body.trim();
            (!trimmed.is_empty()).then(|| trimmed.chars().take(200).collect())
        })
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string()
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests_support {
    use super::*;

    /// Client pointed at a wiremock server.
    pub(crate) fn client_for(server: &wiremock::MockServer) -> SupabaseClient {
        SupabaseClient::new(&SupabaseConfig {
            url: Url::parse(&server.uri()).unwrap(),
            anon_key: SecretString::from("anon-key-for-tests"),
            image_bucket: "product-images".to_string(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_prefers_known_fields() {
        let body = r#"{"code":"400","error_code":"invalid_credentials","msg":"Invalid login credentials"}"#;
        assert_eq!(
            error_message(body, StatusCode::BAD_REQUEST),
            "Invalid login credentials"
        );

        let body = r#"{"code":"23503","message":"violates foreign key constraint","details":null}"#;
        assert_eq!(
            error_message(body, StatusCode::CONFLICT),
            "violates foreign key constraint"
        );
    }

    #[test]
    fn test_error_message_falls_back_to_body_then_reason() {
        assert_eq!(
            error_message("upstream timeout", StatusCode::BAD_GATEWAY),
            "upstream timeout"
        );
        assert_eq!(
            error_message("", StatusCode::SERVICE_UNAVAILABLE),
            "Service Unavailable"
        );
    }

    #[test]
    fn test_user_message_hides_transport_details() {
        let err = SupabaseError::Url(url::ParseError::EmptyHost);
        assert_eq!(err.user_message(), "No se pudo contactar al servidor.");

        let err = SupabaseError::Api {
            status: 409,
            message: "duplicate key".to_string(),
        };
        assert_eq!(err.user_message(), "duplicate key");
    }
}
