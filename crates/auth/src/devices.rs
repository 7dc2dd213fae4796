//! Trusted-device enrollment
//!
//! A device that completed MFA can be granted a bounded exemption from
//! repeating it. The raw device secret exists only in the client cookie;
//! the store holds its digest. Mismatch and expiry are indistinguishable
//! to the caller, so the check cannot be used as a guessing oracle.

use std::sync::Arc;

use uuid::Uuid;

use crate::clock::Clock;
use crate::config::AuthConfig;
use crate::error::AuthResult;
use crate::models::DeviceRecord;
use crate::secrets;
use crate::store::DeviceStore;

pub struct TrustedDeviceManager<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    config: AuthConfig,
}

impl<S> TrustedDeviceManager<S>
where
    S: DeviceStore,
{
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>, config: AuthConfig) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    /// Enroll the current device. Returns the raw secret for the caller to
    /// place in a client-held cookie with a matching max-age.
    pub async fn enroll(&self, user_id: Uuid) -> AuthResult<String> {
        let secret = secrets::generate_secret();
        let now = self.clock.now();

        self.store
            .create_device(DeviceRecord {
                id: Uuid::new_v4(),
                user_id,
                secret_hash: secrets::hash_secret(&secret),
                created_at: now,
                expires_at: now + self.config.trusted_device_ttl,
            })
            .await?;

        tracing::info!(user_id = %user_id, "trusted device enrolled");
        Ok(secret)
    }

    /// Check whether the presented cookie value identifies a live trusted
    /// device for this user. Any miss (wrong secret, wrong user, expired)
    /// is simply `false`.
    pub async fn is_trusted(&self, user_id: Uuid, presented_secret: &str) -> AuthResult<bool> {
        let secret_hash = secrets::hash_secret(presented_secret);

        let device = match self
            .store
            .find_device_by_user_and_hash(user_id, &secret_hash)
            .await?
        {
            Some(device) => device,
            None => return Ok(false),
        };

        Ok(self.clock.now() < device.expires_at)
    }

    /// Revoke every enrollment for the user
    pub async fn revoke_all(&self, user_id: Uuid) -> AuthResult<u64> {
        let revoked = self.store.delete_devices_for_user(user_id).await?;
        if revoked > 0 {
            tracing::info!(user_id = %user_id, revoked, "trusted devices revoked");
        }
        Ok(revoked)
    }

    /// Optional maintenance sweep; expiry is already enforced on lookup
    pub async fn sweep_expired(&self) -> AuthResult<u64> {
        Ok(self.store.delete_expired_devices(self.clock.now()).await?)
    }
}
