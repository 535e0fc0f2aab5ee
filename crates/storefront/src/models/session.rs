//! Session-related types.
//!
//! The signed-in admin is the only identity the storefront knows about.
//! Visitors browsing the catalog never have one.

use chrono::{DateTime, Duration, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use panaderia_core::UserId;

use crate::supabase::AuthSession;

/// Access tokens this close to expiry are refreshed before use.
const EXPIRY_MARGIN_SECS: i64 = 30;

/// Session-stored admin identity and Supabase tokens.
#[derive(Clone, Serialize, Deserialize)]
pub struct CurrentAdmin {
    /// Supabase auth user ID, written to `user_id` on every product write.
    pub user_id: UserId,
    pub email: Option<String>,
    access_token: String,
    refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl CurrentAdmin {
    /// Bearer token for writes on behalf of this admin.
    #[must_use]
    pub fn access_token(&self) -> SecretString {
        SecretString::from(self.access_token.clone())
    }

    #[must_use]
    pub fn refresh_token(&self) -> SecretString {
        SecretString::from(self.refresh_token.clone())
    }

    /// Whether the access token must be refreshed at `now`.
    #[must_use]
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - Duration::seconds(EXPIRY_MARGIN_SECS) <= now
    }

    /// Name to greet the admin with.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.email.as_deref().unwrap_or("Administrador")
    }
}

impl From<AuthSession> for CurrentAdmin {
    fn from(session: AuthSession) -> Self {
        use secrecy::ExposeSecret;

        Self {
            user_id: session.user.id,
            email: session.user.email,
            access_token: session.access_token.expose_secret().to_owned(),
            refresh_token: session.refresh_token.expose_secret().to_owned(),
            expires_at: session.expires_at,
        }
    }
}

impl std::fmt::Debug for CurrentAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurrentAdmin")
            .field("user_id", &self.user_id)
            .field("email", &self.email)
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Authentication state resolved for one request.
///
/// Resolution finishes before any handler runs, so there is no separate
/// "still loading" state to guard against.
#[derive(Debug, Clone, Default)]
pub enum SessionState {
    #[default]
    Anonymous,
    Authenticated(CurrentAdmin),
}

impl SessionState {
    #[must_use]
    pub const fn admin(&self) -> Option<&CurrentAdmin> {
        match self {
            Self::Authenticated(admin) => Some(admin),
            Self::Anonymous => None,
        }
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }
}

/// Session keys.
pub mod keys {
    /// Key for the signed-in admin.
    pub const CURRENT_ADMIN: &str = "current_admin";

    /// Key for the one-shot notification shown on the next page.
    pub const FLASH: &str = "flash";
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;
    use crate::supabase::AuthUser;

    fn admin(expires_at: DateTime<Utc>) -> CurrentAdmin {
        CurrentAdmin::from(AuthSession {
            access_token: SecretString::from("access"),
            refresh_token: SecretString::from("refresh"),
            expires_at,
            user: AuthUser {
                id: UserId::new("u-1"),
                email: Some("admin@panaderia.test".to_string()),
            },
        })
    }

    #[test]
    fn test_tokens_survive_session_serialization() {
        let admin = admin(Utc::now());
        let json = serde_json::to_value(&admin).unwrap();
        let back: CurrentAdmin = serde_json::from_value(json).unwrap();

        assert_eq!(back.access_token().expose_secret(), "access");
        assert_eq!(back.refresh_token().expose_secret(), "refresh");
        assert_eq!(back.user_id, UserId::new("u-1"));
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let debug = format!("{:?}", admin(Utc::now()));
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("access\""));
        assert!(!debug.contains("\"refresh\""));
    }

    #[test]
    fn test_needs_refresh_near_expiry() {
        let now = Utc::now();
        assert!(admin(now + Duration::seconds(10)).needs_refresh(now));
        assert!(admin(now - Duration::seconds(1)).needs_refresh(now));
        assert!(!admin(now + Duration::minutes(30)).needs_refresh(now));
    }

    #[test]
    fn test_session_state_accessors() {
        let state = SessionState::Authenticated(admin(Utc::now()));
        assert!(state.is_authenticated());
        assert_eq!(state.admin().unwrap().display_name(), "admin@panaderia.test");
        assert!(SessionState::default().admin().is_none());
    }
}
