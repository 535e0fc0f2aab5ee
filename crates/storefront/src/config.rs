//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `PANADERIA_BASE_URL` - Public URL for the storefront
//! - `SUPABASE_URL` - Project URL (e.g., <https://abcd.supabase.co>)
//! - `SUPABASE_ANON_KEY` - Project anon (public) API key
//!
//! ## Optional
//! - `PANADERIA_HOST` - Bind address (default: 127.0.0.1)
//! - `PANADERIA_PORT` - Listen port (default: 3000)
//! - `SUPABASE_IMAGE_BUCKET` - Storage bucket for product images (default: product-images)
//! - `CATALOG_MIN_LOADING_MS` - Minimum skeleton time after start-up (default: 300)
//! - `CATALOG_CATEGORIES_STALE_SECS` - Category snapshot freshness (default: 300)
//! - `CATALOG_PRODUCTS_STALE_SECS` - Product snapshot freshness (default: 120)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.1)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

/// Keys below this Shannon entropy are treated as hand-typed.
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Fragments of the values shipped in `.env.example` and docs.
const PLACEHOLDER_PATTERNS: &[&str] = &["your-", "anon-key", "changeme", "placeholder", "example", "xxx"];

/// Prefix of Supabase's non-JWT publishable keys.
const PUBLISHABLE_KEY_PREFIX: &str = "sb_publishable_";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Whether a reverse proxy sets `X-Forwarded-For`/`X-Real-IP`
    pub trust_proxy: bool,
    /// Supabase project configuration
    pub supabase: SupabaseConfig,
    /// Catalog loading and freshness settings
    pub catalog: CatalogConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
    /// Fraction of requests traced as Sentry transactions
    pub sentry_traces_sample_rate: f32,
}

/// Supabase project configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct SupabaseConfig {
    /// Project URL without trailing slash
    pub url: Url,
    /// Anon API key, sent as `apikey` on every request
    pub anon_key: SecretString,
    /// Storage bucket holding product images
    pub image_bucket: String,
}

impl std::fmt::Debug for SupabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseConfig")
            .field("url", &self.url.as_str())
            .field("anon_key", &"[REDACTED]")
            .field("image_bucket", &self.image_bucket)
            .finish()
    }
}

/// Catalog loading and freshness settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogConfig {
    /// Skeleton is shown at least this long after start-up
    pub min_loading: Duration,
    /// Category snapshot is refetched on the next request after this age
    pub categories_stale_after: Duration,
    /// Product snapshot is refetched on the next request after this age
    pub products_stale_after: Duration,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            min_loading: Duration::from_millis(300),
            categories_stale_after: Duration::from_secs(5 * 60),
            products_stale_after: Duration::from_secs(2 * 60),
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the API key fails validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = parse_env("PANADERIA_HOST", "127.0.0.1")?;
        let port = parse_env("PANADERIA_PORT", "3000")?;
        let base_url = get_required_env("PANADERIA_BASE_URL")?;

        Ok(Self {
            host,
            port,
            base_url,
            trust_proxy: parse_env("PANADERIA_TRUST_PROXY", "false")?,
            supabase: SupabaseConfig::from_env()?,
            catalog: CatalogConfig::from_env()?,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_traces_sample_rate: parse_env("SENTRY_TRACES_SAMPLE_RATE", "0.1")?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should carry the `Secure` flag.
    #[must_use]
    pub fn is_https(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl SupabaseConfig {
    /// Load only the Supabase settings.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the URL or anon key is missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let raw_url = get_required_env("SUPABASE_URL")?;
        let url = Url::parse(raw_url.trim_end_matches('/')).map_err(|e| {
            ConfigError::InvalidEnvVar("SUPABASE_URL".to_string(), e.to_string())
        })?;

        Ok(Self {
            url,
            anon_key: get_anon_key("SUPABASE_ANON_KEY")?,
            image_bucket: get_env_or_default("SUPABASE_IMAGE_BUCKET", "product-images"),
        })
    }

    /// Origin of the project (scheme, host and port), used in the CSP.
    #[must_use]
    pub fn origin(&self) -> String {
        self.url.origin().ascii_serialization()
    }
}

impl CatalogConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            min_loading: Duration::from_millis(parse_env(
                "CATALOG_MIN_LOADING_MS",
                &millis(defaults.min_loading),
            )?),
            categories_stale_after: Duration::from_secs(parse_env(
                "CATALOG_CATEGORIES_STALE_SECS",
                &defaults.categories_stale_after.as_secs().to_string(),
            )?),
            products_stale_after: Duration::from_secs(parse_env(
                "CATALOG_PRODUCTS_STALE_SECS",
                &defaults.products_stale_after.as_secs().to_string(),
            )?),
        })
    }
}

fn millis(duration: Duration) -> String {
    duration.as_millis().to_string()
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Shannon entropy of `s` in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    let mut counts: HashMap<char, u32> = HashMap::new();
    let mut total = 0_u32;
    for c in s.chars() {
        *counts.entry(c).or_default() += 1;
        total += 1;
    }
    if total == 0 {
        return 0.0;
    }

    let total = f64::from(total);
    counts
        .into_values()
        .map(|n| {
            let p = f64::from(n) / total;
            -p * p.log2()
        })
        .sum()
}

/// Reject anon keys that are clearly not a real project key.
///
/// A key must be a three-part JWT or a `sb_publishable_` key, contain no
/// placeholder fragment, and have enough entropy.
fn validate_anon_key(key: &str, var_name: &str) -> Result<(), ConfigError> {
    let insecure = |reason: String| ConfigError::InsecureSecret(var_name.to_string(), reason);

    let lower = key.to_lowercase();
    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(**p)) {
        return Err(insecure(format!(
            "looks like a placeholder (contains '{pattern}')"
        )));
    }

    let is_jwt = key.split('.').count() == 3 && key.split('.').all(|part| !part.is_empty());
    if !is_jwt && !key.starts_with(PUBLISHABLE_KEY_PREFIX) {
        return Err(insecure(
            "not a Supabase API key (expected a JWT or sb_publishable_ key)".to_string(),
        ));
    }

    let entropy = shannon_entropy(key);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(insecure(format!(
            "entropy too low ({entropy:.2} bits/char). Copy the key from the project's API settings."
        )));
    }

    Ok(())
}

/// Read `key` and validate it as an anon key.
fn get_anon_key(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_anon_key(&value, key)?;
    Ok(SecretString::from(value))
}
