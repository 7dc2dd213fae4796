//! OTP challenge issuance and verification
//!
//! State machine per principal: NONE → PENDING → {VERIFIED, EXPIRED,
//! LOCKED}. At most one live challenge per principal; issuing again
//! supersedes the old one. Delivery of the code (email, SMS) is a caller
//! concern.
//!
//! Lockout reporting: the failed attempt that *triggers* the lock already
//! returns `OtpLocked` rather than `InvalidOtp`, so clients can show the
//! cooldown immediately. This is consistent across the subsystem.

use std::sync::Arc;

use time::OffsetDateTime;

use crate::clock::Clock;
use crate::config::AuthConfig;
use crate::error::{AuthError, AuthResult};
use crate::models::Challenge;
use crate::secrets;
use crate::store::ChallengeStore;

/// A freshly issued challenge. The raw code exists only here; the store
/// keeps its digest.
#[derive(Debug, Clone)]
pub struct IssuedChallenge {
    pub code: String,
    pub expires_at: OffsetDateTime,
}

pub struct MfaChallengeManager<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    config: AuthConfig,
}

impl<S> MfaChallengeManager<S>
where
    S: ChallengeStore,
{
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>, config: AuthConfig) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    /// Issue a challenge for the principal, superseding any prior one.
    /// Resend is simply re-issuance.
    pub async fn issue(&self, principal: &str) -> AuthResult<IssuedChallenge> {
        let code = secrets::generate_otp_code();
        let expires_at = self.clock.now() + self.config.otp_ttl;

        self.store
            .upsert_challenge(Challenge {
                principal: principal.to_string(),
                code_hash: secrets::hash_secret(&code),
                attempts: 0,
                expires_at,
                lock_until: None,
            })
            .await?;

        tracing::info!(principal = %principal, expires_at = %expires_at, "otp challenge issued");

        Ok(IssuedChallenge { code, expires_at })
    }

    /// Verify a submitted code against the live challenge.
    ///
    /// Success consumes the challenge; the store's delete is the atomic
    /// claim, so two concurrent verifications cannot both succeed.
    pub async fn verify(&self, principal: &str, submitted_code: &str) -> AuthResult<()> {
        let now = self.clock.now();

        let challenge = match self.store.find_challenge(principal).await? {
            Some(challenge) => challenge,
            None => return Err(AuthError::InvalidOtp),
        };

        if let Some(lock_until) = challenge.lock_until {
            if lock_until > now {
                // Rejected regardless of correctness; the lock state must
                // not leak whether the code would have matched.
                tracing::warn!(principal = %principal, "otp verification rejected during lockout");
                return Err(AuthError::OtpLocked);
            }
            // Lock elapsed: the challenge is void, a fresh one is required
            self.store.delete_challenge(principal).await?;
            return Err(AuthError::InvalidOtp);
        }

        if now >= challenge.expires_at {
            self.store.delete_challenge(principal).await?;
            return Err(AuthError::InvalidOtp);
        }

        let matches =
            secrets::digests_match(&secrets::hash_secret(submitted_code), &challenge.code_hash);

        if !matches {
            let attempts = challenge.attempts + 1;
            let locked = attempts >= self.config.otp_max_attempts;
            let lock_until = locked.then(|| now + self.config.otp_lockout);

            self.store
                .upsert_challenge(Challenge {
                    attempts,
                    lock_until,
                    ..challenge
                })
                .await?;

            if locked {
                tracing::warn!(principal = %principal, attempts, "otp challenge locked");
                return Err(AuthError::OtpLocked);
            }
            return Err(AuthError::InvalidOtp);
        }

        // Atomic claim: only the caller that actually removed the row wins
        if !self.store.delete_challenge(principal).await? {
            return Err(AuthError::InvalidOtp);
        }

        tracing::info!(principal = %principal, "otp challenge verified");
        Ok(())
    }
}
