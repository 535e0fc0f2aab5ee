//! `GoTrue` email/password authentication.

use chrono::{DateTime, Duration, Utc};
use panaderia_core::UserId;
use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use super::{SupabaseClient, SupabaseError};

/// The signed-in user as reported by the auth service.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthUser {
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
}

/// Tokens returned by a successful sign-in or refresh.
pub struct AuthSession {
    pub access_token: SecretString,
    pub refresh_token: SecretString,
    pub expires_at: DateTime<Utc>,
    pub user: AuthUser,
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("user", &self.user)
            .finish()
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: AuthUser,
}

impl TokenResponse {
    fn into_session(self, now: DateTime<Utc>) -> AuthSession {
        let expires_at = self
            .expires_at
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .unwrap_or_else(|| now + Duration::seconds(self.expires_in.unwrap_or(3600)));

        AuthSession {
            access_token: SecretString::from(self.access_token),
            refresh_token: SecretString::from(self.refresh_token),
            expires_at,
            user: self.user,
        }
    }
}

impl SupabaseClient {
    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Wrong credentials come back as `SupabaseError::Api` with status 400
    /// and the service's message.
    #[instrument(skip(self, password))]
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, SupabaseError> {
        self.token_grant("password", &json!({ "email": email, "password": password }))
            .await
    }

    /// Exchange a refresh token for a new session.
    ///
    /// # Errors
    ///
    /// Returns an error if the refresh token is revoked or unknown.
    #[instrument(skip_all)]
    pub async fn refresh_session(
        &self,
        refresh_token: &SecretString,
    ) -> Result<AuthSession, SupabaseError> {
        self.token_grant(
            "refresh_token",
            &json!({ "refresh_token": refresh_token.expose_secret() }),
        )
        .await
    }

    /// Look up the user an access token belongs to.
    ///
    /// # Errors
    ///
    /// Returns `SupabaseError::Unauthorized` if the token is invalid or expired.
    #[instrument(skip_all)]
    pub async fn get_user(&self, token: &SecretString) -> Result<AuthUser, SupabaseError> {
        let url = self.endpoint("auth/v1/user")?;
        let response = self.request(Method::GET, url, Some(token)).send().await?;
        let body = Self::check(response).await?.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Revoke the session behind an access token.
    ///
    /// # Errors
    ///
    /// Returns an error if the auth service rejects the request.
    #[instrument(skip_all)]
    pub async fn sign_out(&self, token: &SecretString) -> Result<(), SupabaseError> {
        let url = self.endpoint("auth/v1/logout")?;
        let response = self.request(Method::POST, url, Some(token)).send().await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn token_grant(
        &self,
        grant_type: &str,
        body: &serde_json::Value,
    ) -> Result<AuthSession, SupabaseError> {
        let mut url = self.endpoint("auth/v1/token")?;
        url.query_pairs_mut().append_pair("grant_type", grant_type);

        let response = self
            .request(Method::POST, url, None)
            .json(body)
            .send()
            .await?;
        let body = Self::check(response).await?.text().await?;
        let token: TokenResponse = serde_json::from_str(&body)?;
        Ok(token.into_session(Utc::now()))
    }
}
