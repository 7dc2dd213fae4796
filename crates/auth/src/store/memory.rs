//! In-memory store
//!
//! Implements every repository trait over one mutex-guarded state so the
//! managers and the orchestrated flows can be tested without a database.
//! The mutex also gives the same serialization guarantees the Postgres
//! store gets from transactions and unique indexes.

use std::collections::HashMap;
use std::sync::Mutex;

use time::OffsetDateTime;
use uuid::Uuid;

use crate::models::{Challenge, DeviceRecord, ResetTokenRecord, SessionRecord, User};
use crate::store::{
    ChallengeStore, DeviceStore, ResetTokenStore, SessionStore, StoreError, StoreResult, UserStore,
};

#[derive(Debug, Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    /// token_hash -> session
    sessions: HashMap<String, SessionRecord>,
    /// principal -> challenge (unique per principal by construction)
    challenges: HashMap<String, Challenge>,
    devices: Vec<DeviceRecord>,
    /// user_id -> reset token (at most one live token per user)
    reset_tokens: HashMap<Uuid, ResetTokenRecord>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<std::sync::MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".into()))
    }
}

impl UserStore for MemoryStore {
    async fn create_user(&self, user: User) -> StoreResult<User> {
        let mut inner = self.lock()?;
        if inner.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict);
        }
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.lock()?.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self
            .lock()?
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> StoreResult<()> {
        if let Some(user) = self.lock()?.users.get_mut(&id) {
            user.password_hash = password_hash.to_string();
        }
        Ok(())
    }

    async fn set_email_verified(&self, id: Uuid, verified: bool) -> StoreResult<()> {
        if let Some(user) = self.lock()?.users.get_mut(&id) {
            user.email_verified = verified;
        }
        Ok(())
    }

    async fn set_mfa_enabled(&self, id: Uuid, enabled: bool) -> StoreResult<()> {
        if let Some(user) = self.lock()?.users.get_mut(&id) {
            user.mfa_enabled = enabled;
        }
        Ok(())
    }
}

impl SessionStore for MemoryStore {
    async fn create_session(&self, session: SessionRecord) -> StoreResult<()> {
        self.lock()?
            .sessions
            .insert(session.token_hash.clone(), session);
        Ok(())
    }

    async fn find_session_by_token_hash(
        &self,
        token_hash: &str,
    ) -> StoreResult<Option<SessionRecord>> {
        Ok(self.lock()?.sessions.get(token_hash).cloned())
    }

    async fn delete_session_by_token_hash(&self, token_hash: &str) -> StoreResult<bool> {
        Ok(self.lock()?.sessions.remove(token_hash).is_some())
    }

    async fn delete_sessions_for_user(&self, user_id: Uuid) -> StoreResult<u64> {
        let mut inner = self.lock()?;
        let before = inner.sessions.len();
        inner.sessions.retain(|_, s| s.user_id != user_id);
        Ok((before - inner.sessions.len()) as u64)
    }
}

impl ChallengeStore for MemoryStore {
    async fn upsert_challenge(&self, challenge: Challenge) -> StoreResult<()> {
        self.lock()?
            .challenges
            .insert(challenge.principal.clone(), challenge);
        Ok(())
    }

    async fn find_challenge(&self, principal: &str) -> StoreResult<Option<Challenge>> {
        Ok(self.lock()?.challenges.get(principal).cloned())
    }

    async fn delete_challenge(&self, principal: &str) -> StoreResult<bool> {
        Ok(self.lock()?.challenges.remove(principal).is_some())
    }
}

impl DeviceStore for MemoryStore {
    async fn create_device(&self, device: DeviceRecord) -> StoreResult<()> {
        self.lock()?.devices.push(device);
        Ok(())
    }

    async fn find_device_by_user_and_hash(
        &self,
        user_id: Uuid,
        secret_hash: &str,
    ) -> StoreResult<Option<DeviceRecord>> {
        Ok(self
            .lock()?
            .devices
            .iter()
            .find(|d| d.user_id == user_id && d.secret_hash == secret_hash)
            .cloned())
    }

    async fn delete_devices_for_user(&self, user_id: Uuid) -> StoreResult<u64> {
        let mut inner = self.lock()?;
        let before = inner.devices.len();
        inner.devices.retain(|d| d.user_id != user_id);
        Ok((before - inner.devices.len()) as u64)
    }

    async fn delete_expired_devices(&self, now: OffsetDateTime) -> StoreResult<u64> {
        let mut inner = self.lock()?;
        let before = inner.devices.len();
        inner.devices.retain(|d| d.expires_at > now);
        Ok((before - inner.devices.len()) as u64)
    }
}

impl ResetTokenStore for MemoryStore {
    async fn upsert_reset_token(&self, token: ResetTokenRecord) -> StoreResult<()> {
        self.lock()?.reset_tokens.insert(token.user_id, token);
        Ok(())
    }

    async fn redeem_reset_token(
        &self,
        token_hash: &str,
        new_password_hash: &str,
        now: OffsetDateTime,
    ) -> StoreResult<Option<Uuid>> {
        // One lock spans the find, the delete and the password write, which
        // is the in-memory equivalent of the Postgres transaction.
        let mut inner = self.lock()?;

        let user_id = match inner
            .reset_tokens
            .values()
            .find(|t| t.token_hash == token_hash && t.expires_at > now)
        {
            Some(token) => token.user_id,
            None => return Ok(None),
        };

        inner.reset_tokens.remove(&user_id);
        if let Some(user) = inner.users.get_mut(&user_id) {
            user.password_hash = new_password_hash.to_string();
        }

        Ok(Some(user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use time::Duration;

    fn user(email: &str) -> User {
        User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: "hash".into(),
            role: Role::User,
            email_verified: false,
            mfa_enabled: false,
            created_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let store = MemoryStore::new();
        store.create_user(user("a@x.com")).await.unwrap();
        let err = store.create_user(user("a@x.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict));
    }

    #[tokio::test]
    async fn test_challenge_upsert_replaces() {
        let store = MemoryStore::new();
        let now = OffsetDateTime::UNIX_EPOCH;
        for code_hash in ["one", "two"] {
            store
                .upsert_challenge(Challenge {
                    principal: "a@x.com".into(),
                    code_hash: code_hash.into(),
                    attempts: 0,
                    expires_at: now + Duration::minutes(10),
                    lock_until: None,
                })
                .await
                .unwrap();
        }
        let found = store.find_challenge("a@x.com").await.unwrap().unwrap();
        assert_eq!(found.code_hash, "two");
    }

    #[tokio::test]
    async fn test_delete_challenge_claims_once() {
        let store = MemoryStore::new();
        store
            .upsert_challenge(Challenge {
                principal: "a@x.com".into(),
                code_hash: "h".into(),
                attempts: 0,
                expires_at: OffsetDateTime::UNIX_EPOCH,
                lock_until: None,
            })
            .await
            .unwrap();
        assert!(store.delete_challenge("a@x.com").await.unwrap());
        assert!(!store.delete_challenge("a@x.com").await.unwrap());
    }

    #[tokio::test]
    async fn test_redeem_is_single_use() {
        let store = MemoryStore::new();
        let u = store.create_user(user("a@x.com")).await.unwrap();
        let now = OffsetDateTime::UNIX_EPOCH;
        store
            .upsert_reset_token(ResetTokenRecord {
                user_id: u.id,
                token_hash: "digest".into(),
                expires_at: now + Duration::minutes(10),
            })
            .await
            .unwrap();

        let first = store.redeem_reset_token("digest", "new", now).await.unwrap();
        assert_eq!(first, Some(u.id));
        let second = store.redeem_reset_token("digest", "new", now).await.unwrap();
        assert_eq!(second, None);

        let reloaded = store.find_user_by_id(u.id).await.unwrap().unwrap();
        assert_eq!(reloaded.password_hash, "new");
    }
}
