//! Authentication service.
//!
//! Supabase issues and verifies the admin's tokens; the session only
//! carries them. Every request resolves the session explicitly into a
//! [`SessionState`], refreshing the access token near expiry and dropping
//! sessions the auth service no longer accepts.

mod error;

pub use error::AuthError;

use std::time::Duration;

use chrono::Utc;
use moka::future::Cache;
use secrecy::ExposeSecret;
use tower_sessions::Session;
use tracing::{debug, info, instrument, warn};

use panaderia_core::{LoginForm, UserId};

use crate::error::{clear_sentry_user, set_sentry_user};
use crate::models::{CurrentAdmin, SessionState, keys};
use crate::supabase::{SupabaseClient, SupabaseError};

/// How long a verified access token is trusted without asking Supabase again.
const VERIFIED_TTL: Duration = Duration::from_secs(60);

/// Admin authentication backed by Supabase auth.
#[derive(Clone)]
pub struct AuthService {
    supabase: SupabaseClient,
    verified: Cache<String, UserId>,
}

impl AuthService {
    #[must_use]
    pub fn new(supabase: SupabaseClient) -> Self {
        let verified = Cache::builder()
            .max_capacity(1000)
            .time_to_live(VERIFIED_TTL)
            .build();

        Self { supabase, verified }
    }

    /// Sign in with the login form and store the admin in the session.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` for a blank field (nothing is sent),
    /// `AuthError::InvalidCredentials` if Supabase rejects the pair.
    #[instrument(skip_all)]
    pub async fn sign_in(
        &self,
        session: &Session,
        form: &LoginForm,
    ) -> Result<CurrentAdmin, AuthError> {
        let (email, password) = form.validate()?;

        let auth = self
            .supabase
            .sign_in_with_password(&email, &password)
            .await
            .map_err(|e| match e {
                SupabaseError::Api { status: 400, message }
                | SupabaseError::Unauthorized(message) => AuthError::InvalidCredentials(message),
                other => AuthError::Supabase(other),
            })?;

        let admin = CurrentAdmin::from(auth);
        self.verified
            .insert(
                admin.access_token().expose_secret().to_owned(),
                admin.user_id.clone(),
            )
            .await;

        session.cycle_id().await?;
        session.insert(keys::CURRENT_ADMIN, &admin).await?;
        set_sentry_user(&admin.user_id, admin.email.as_deref());

        info!(user_id = %admin.user_id, "Admin signed in");
        Ok(admin)
    }

    /// Resolve the session into an explicit authentication state.
    ///
    /// Never fails: a session that cannot be read, refreshed or verified
    /// resolves to `Anonymous`.
    #[instrument(skip_all)]
    pub async fn resolve(&self, session: &Session) -> SessionState {
        let admin = match session.get::<CurrentAdmin>(keys::CURRENT_ADMIN).await {
            Ok(Some(admin)) => admin,
            Ok(None) => return SessionState::Anonymous,
            Err(e) => {
                warn!(error = %e, "Failed to read admin from session");
                return SessionState::Anonymous;
            }
        };

        let admin = if admin.needs_refresh(Utc::now()) {
            match self.refresh(session, &admin).await {
                Some(refreshed) => refreshed,
                None => return SessionState::Anonymous,
            }
        } else {
            admin
        };

        if self.verify(&admin).await {
            SessionState::Authenticated(admin)
        } else {
            self.forget(session).await;
            SessionState::Anonymous
        }
    }

    /// Revoke the admin's tokens and clear the session.
    #[instrument(skip_all)]
    pub async fn sign_out(&self, session: &Session) {
        if let Ok(Some(admin)) = session.get::<CurrentAdmin>(keys::CURRENT_ADMIN).await {
            let token = admin.access_token();
            self.verified.invalidate(token.expose_secret()).await;
            if let Err(e) = self.supabase.sign_out(&token).await {
                warn!(error = %e, "Failed to revoke Supabase session");
            }
            info!(user_id = %admin.user_id, "Admin signed out");
        }

        if let Err(e) = session.flush().await {
            warn!(error = %e, "Failed to flush session");
        }
        clear_sentry_user();
    }

    async fn refresh(&self, session: &Session, admin: &CurrentAdmin) -> Option<CurrentAdmin> {
        match self.supabase.refresh_session(&admin.refresh_token()).await {
            Ok(auth) => {
                let refreshed = CurrentAdmin::from(auth);
                if let Err(e) = session.insert(keys::CURRENT_ADMIN, &refreshed).await {
                    warn!(error = %e, "Failed to store refreshed tokens");
                }
                debug!(user_id = %refreshed.user_id, "Access token refreshed");
                Some(refreshed)
            }
            Err(e) => {
                info!(error = %e, "Token refresh rejected, signing out");
                self.forget(session).await;
                None
            }
        }
    }

    /// Check the access token against Supabase, with a short-lived cache.
    ///
    /// Only an explicit rejection counts as invalid; if the auth service is
    /// unreachable the session is kept and writes will fail on their own.
    async fn verify(&self, admin: &CurrentAdmin) -> bool {
        let token = admin.access_token();
        if let Some(user_id) = self.verified.get(token.expose_secret()).await {
            return user_id == admin.user_id;
        }

        match self.supabase.get_user(&token).await {
            Ok(user) if user.id == admin.user_id => {
                self.verified
                    .insert(token.expose_secret().to_owned(), user.id)
                    .await;
                true
            }
            Ok(user) => {
                warn!(expected = %admin.user_id, actual = %user.id, "Token belongs to another user");
                false
            }
            Err(SupabaseError::Unauthorized(message)) => {
                info!(%message, "Access token rejected");
                false
            }
            Err(e) => {
                warn!(error = %e, "Could not verify access token, keeping session");
                true
            }
        }
    }

    async fn forget(&self, session: &Session) {
        if let Err(e) = session.remove::<CurrentAdmin>(keys::CURRENT_ADMIN).await {
            warn!(error = %e, "Failed to clear admin from session");
        }
    }
}
