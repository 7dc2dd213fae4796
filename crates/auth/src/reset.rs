//! Password-reset token lifecycle
//!
//! Tokens are single-use and time-boxed. Redemption delegates to the
//! store's transactional `redeem_reset_token`, so verifying the token and
//! consuming it can never be observed separately (no replay window), and
//! a failure before commit leaves the token intact.

use std::sync::Arc;

use time::OffsetDateTime;
use uuid::Uuid;

use crate::clock::Clock;
use crate::config::AuthConfig;
use crate::error::{AuthError, AuthResult};
use crate::models::ResetTokenRecord;
use crate::password;
use crate::secrets;
use crate::store::ResetTokenStore;

/// A freshly issued reset token; the raw value is for out-of-band delivery
#[derive(Debug, Clone)]
pub struct IssuedReset {
    pub token: String,
    pub expires_at: OffsetDateTime,
}

pub struct PasswordResetManager<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    config: AuthConfig,
}

impl<S> PasswordResetManager<S>
where
    S: ResetTokenStore,
{
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>, config: AuthConfig) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    /// Issue a reset token for the user, invalidating any previous
    /// unredeemed one (at most one live token per user).
    pub async fn issue(&self, user_id: Uuid) -> AuthResult<IssuedReset> {
        let token = secrets::generate_secret();
        let expires_at = self.clock.now() + self.config.reset_token_ttl;

        self.store
            .upsert_reset_token(ResetTokenRecord {
                user_id,
                token_hash: secrets::hash_secret(&token),
                expires_at,
            })
            .await?;

        tracing::info!(user_id = %user_id, expires_at = %expires_at, "reset token issued");
        Ok(IssuedReset { token, expires_at })
    }

    /// Redeem a token and set the new password.
    ///
    /// Returns the owning user id so the caller can revoke sessions. A
    /// missing, expired or already-redeemed token is `InvalidToken`; the
    /// response never reveals whether the token was ever issued.
    pub async fn redeem(&self, raw_token: &str, new_password: &str) -> AuthResult<Uuid> {
        let token_hash = secrets::hash_secret(raw_token);
        let new_password_hash = password::hash_password_async(new_password.to_string()).await?;

        let user_id = self
            .store
            .redeem_reset_token(&token_hash, &new_password_hash, self.clock.now())
            .await?
            .ok_or(AuthError::InvalidToken)?;

        tracing::info!(user_id = %user_id, "password reset redeemed");
        Ok(user_id)
    }
}
