//! Orchestrated credential flows
//!
//! Ties the managers together into the flows the HTTP layer exposes:
//! register, login (password → MFA → session), email verification, OTP
//! resend, forgot/reset/change password, logout. The service owns no
//! state beyond the shared store handle.

use std::sync::Arc;

use uuid::Uuid;

use crate::clock::Clock;
use crate::config::AuthConfig;
use crate::devices::TrustedDeviceManager;
use crate::error::{AuthError, AuthResult};
use crate::models::{normalize_email, AuthedSession, Role, Session, User};
use crate::otp::{IssuedChallenge, MfaChallengeManager};
use crate::password;
use crate::reset::{IssuedReset, PasswordResetManager};
use crate::sessions::SessionManager;
use crate::store::{
    ChallengeStore, DeviceStore, ResetTokenStore, SessionStore, StoreError, UserStore,
};

/// Everything a login attempt can carry
#[derive(Debug, Clone, Default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    /// Submitted OTP code, when the client is answering an MFA challenge
    pub otp_code: Option<String>,
    /// Trusted-device cookie value, if the client presented one
    pub device_secret: Option<String>,
    /// Enroll this device after a successful MFA verification
    pub remember_device: bool,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Outcome of a credential check
#[derive(Debug, Clone)]
pub enum LoginOutcome {
    /// Authenticated; the session token goes into the client cookie, and
    /// the device secret (when present) into the trusted-device cookie.
    Complete {
        session: Session,
        device_secret: Option<String>,
    },
    /// Password accepted but an OTP is required; a challenge was issued
    /// for out-of-band delivery.
    MfaRequired(IssuedChallenge),
}

/// `USER < ADMIN < SUPER_ADMIN`; insufficient role is `Forbidden`
pub fn require_role(user: &User, required: Role) -> AuthResult<()> {
    if user.role >= required {
        Ok(())
    } else {
        Err(AuthError::Forbidden)
    }
}

pub struct AuthService<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    config: AuthConfig,
    pub sessions: SessionManager<S>,
    pub mfa: MfaChallengeManager<S>,
    pub devices: TrustedDeviceManager<S>,
    pub reset: PasswordResetManager<S>,
}

impl<S> AuthService<S>
where
    S: UserStore + SessionStore + ChallengeStore + DeviceStore + ResetTokenStore,
{
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>, config: AuthConfig) -> Self {
        Self {
            sessions: SessionManager::new(Arc::clone(&store), Arc::clone(&clock), config.clone()),
            mfa: MfaChallengeManager::new(Arc::clone(&store), Arc::clone(&clock), config.clone()),
            devices: TrustedDeviceManager::new(
                Arc::clone(&store),
                Arc::clone(&clock),
                config.clone(),
            ),
            reset: PasswordResetManager::new(Arc::clone(&store), Arc::clone(&clock), config.clone()),
            store,
            clock,
            config,
        }
    }

    /// Create an account. The user starts unverified with MFA off; an
    /// email-verification challenge is issued for delivery.
    pub async fn register(&self, email: &str, password: &str) -> AuthResult<(User, IssuedChallenge)> {
        let email = normalize_email(email);
        validate_password(password)?;

        if self.store.find_user_by_email(&email).await?.is_some() {
            return Err(AuthError::EmailExists);
        }

        let password_hash = password::hash_password_async(password.to_string()).await?;
        let user = User {
            id: Uuid::new_v4(),
            email: email.clone(),
            password_hash,
            role: Role::User,
            email_verified: false,
            mfa_enabled: false,
            created_at: self.clock.now(),
        };

        // The store's unique email constraint closes the check-then-create
        // race; a concurrent winner surfaces as Conflict.
        let user = match self.store.create_user(user).await {
            Ok(user) => user,
            Err(StoreError::Conflict) => return Err(AuthError::EmailExists),
            Err(err) => return Err(err.into()),
        };

        tracing::info!(user_id = %user.id, "user registered");

        let challenge = self.mfa.issue(&email).await?;
        Ok((user, challenge))
    }

    /// The credential-check flow: password, then email-verified gate, then
    /// MFA (skipped for a trusted device), then session issuance.
    pub async fn login(&self, request: LoginRequest) -> AuthResult<LoginOutcome> {
        let email = normalize_email(&request.email);

        let user = match self.store.find_user_by_email(&email).await? {
            Some(user) => user,
            None => {
                // Burn a hash so unknown emails take as long as wrong
                // passwords; the response is identical either way.
                password::burn_password_hash(request.password).await;
                return Err(AuthError::InvalidCredentials);
            }
        };

        let password_ok =
            password::verify_password_async(user.password_hash.clone(), request.password.clone())
                .await?;
        if !password_ok {
            tracing::warn!(user_id = %user.id, "login rejected: bad password");
            return Err(AuthError::InvalidCredentials);
        }

        if !user.email_verified {
            return Err(AuthError::EmailNotVerified);
        }

        let mut verified_mfa = false;
        if user.mfa_enabled {
            let trusted = match &request.device_secret {
                Some(secret) => self.devices.is_trusted(user.id, secret).await?,
                None => false,
            };

            if !trusted {
                match &request.otp_code {
                    Some(code) => {
                        self.mfa.verify(&email, code).await?;
                        verified_mfa = true;
                    }
                    None => {
                        let challenge = self.mfa.issue(&email).await?;
                        return Ok(LoginOutcome::MfaRequired(challenge));
                    }
                }
            }
        }

        let session = self
            .sessions
            .create_session(user.id, request.ip_address, request.user_agent)
            .await?;

        // Enrollment only ever follows an actual MFA verification
        let device_secret = if verified_mfa && request.remember_device {
            Some(self.devices.enroll(user.id).await?)
        } else {
            None
        };

        Ok(LoginOutcome::Complete {
            session,
            device_secret,
        })
    }

    /// Resolve a session token to its user, `Unauthenticated` when absent
    pub async fn current_user(&self, raw_token: &str) -> AuthResult<AuthedSession> {
        self.sessions
            .validate_session(raw_token)
            .await?
            .ok_or(AuthError::Unauthenticated)
    }

    /// Re-issue the OTP challenge for an email. Always succeeds from the
    /// caller's perspective; `None` means the account does not exist and
    /// the boundary must respond exactly as if it did.
    pub async fn resend_otp(&self, email: &str) -> AuthResult<Option<IssuedChallenge>> {
        let email = normalize_email(email);
        match self.store.find_user_by_email(&email).await? {
            Some(_) => Ok(Some(self.mfa.issue(&email).await?)),
            None => Ok(None),
        }
    }

    /// Verify the email-ownership challenge and flip the verified flag
    pub async fn verify_email(&self, email: &str, code: &str) -> AuthResult<()> {
        let email = normalize_email(email);
        self.mfa.verify(&email, code).await?;

        let user = self
            .store
            .find_user_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidOtp)?;

        self.store.set_email_verified(user.id, true).await?;
        tracing::info!(user_id = %user.id, "email verified");
        Ok(())
    }

    /// Toggle MFA for an authenticated user
    pub async fn set_mfa_enabled(&self, user_id: Uuid, enabled: bool) -> AuthResult<()> {
        self.store.set_mfa_enabled(user_id, enabled).await?;
        tracing::info!(user_id = %user_id, enabled, "mfa setting changed");
        Ok(())
    }

    /// Forgot-password entry point. Uniform success: `None` when the
    /// account does not exist, and the boundary response is identical.
    pub async fn forgot_password(&self, email: &str) -> AuthResult<Option<IssuedReset>> {
        let email = normalize_email(email);
        match self.store.find_user_by_email(&email).await? {
            Some(user) => Ok(Some(self.reset.issue(user.id).await?)),
            None => Ok(None),
        }
    }

    /// Redeem a reset token. A password change is a credential-level
    /// compromise signal, so every session is revoked.
    pub async fn reset_password(&self, raw_token: &str, new_password: &str) -> AuthResult<()> {
        validate_password(new_password)?;
        let user_id = self.reset.redeem(raw_token, new_password).await?;
        self.logout_all(user_id).await?;
        Ok(())
    }

    /// Change password with the current one as proof of possession
    pub async fn change_password(
        &self,
        user_id: Uuid,
        current_password: &str,
        new_password: &str,
    ) -> AuthResult<()> {
        validate_password(new_password)?;

        let user = self
            .store
            .find_user_by_id(user_id)
            .await?
            .ok_or(AuthError::Unauthenticated)?;

        let current_ok = password::verify_password_async(
            user.password_hash,
            current_password.to_string(),
        )
        .await?;
        if !current_ok {
            return Err(AuthError::InvalidCredentials);
        }

        let new_hash = password::hash_password_async(new_password.to_string()).await?;
        self.store.update_password_hash(user_id, &new_hash).await?;
        self.logout_all(user_id).await?;
        tracing::info!(user_id = %user_id, "password changed");
        Ok(())
    }

    pub async fn logout(&self, raw_token: &str) -> AuthResult<()> {
        self.sessions.logout(raw_token).await
    }

    /// Revoke every session, cascading to trusted devices when the policy
    /// says so.
    pub async fn logout_all(&self, user_id: Uuid) -> AuthResult<u64> {
        let revoked = self.sessions.logout_all(user_id).await?;
        if self.config.revoke_devices_on_logout_all {
            self.devices.revoke_all(user_id).await?;
        }
        Ok(revoked)
    }
}

fn validate_password(password: &str) -> AuthResult<()> {
    if let Err(reason) = password::validate_password_strength(password) {
        tracing::debug!(reason, "password rejected by strength policy");
        return Err(AuthError::InvalidCredentials);
    }
    Ok(())
}
