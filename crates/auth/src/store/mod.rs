//! Repository traits
//!
//! The managers own no state; every mutation goes through these traits so
//! the logic runs unchanged over Postgres in production and the in-memory
//! store in tests. Single-use semantics lean on the store: deletes return
//! whether a row was removed (the atomic claim), challenge upsert is
//! unique per principal, and reset redemption is one logical transaction.

use time::OffsetDateTime;
use uuid::Uuid;

use crate::models::{Challenge, DeviceRecord, ResetTokenRecord, SessionRecord, User};

pub mod memory;

/// Failures surfaced by a repository implementation
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store backend failure: {0}")]
    Backend(String),
    /// A uniqueness constraint rejected the write (e.g. duplicate email)
    #[error("store constraint conflict")]
    Conflict,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Identity store: user creation/lookup, flag and credential transitions
pub trait UserStore: Send + Sync {
    /// Create a user; a duplicate normalized email yields `Conflict`
    async fn create_user(&self, user: User) -> StoreResult<User>;

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;

    /// Lookup by normalized email
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> StoreResult<()>;

    async fn set_email_verified(&self, id: Uuid, verified: bool) -> StoreResult<()>;

    async fn set_mfa_enabled(&self, id: Uuid, enabled: bool) -> StoreResult<()>;
}

pub trait SessionStore: Send + Sync {
    async fn create_session(&self, session: SessionRecord) -> StoreResult<()>;

    async fn find_session_by_token_hash(
        &self,
        token_hash: &str,
    ) -> StoreResult<Option<SessionRecord>>;

    /// Returns whether a session was actually removed
    async fn delete_session_by_token_hash(&self, token_hash: &str) -> StoreResult<bool>;

    /// Returns the number of sessions removed
    async fn delete_sessions_for_user(&self, user_id: Uuid) -> StoreResult<u64>;
}

pub trait ChallengeStore: Send + Sync {
    /// Insert or replace the challenge for its principal. The store keys
    /// challenges uniquely by principal, so concurrent issuance converges
    /// on exactly one live challenge.
    async fn upsert_challenge(&self, challenge: Challenge) -> StoreResult<()>;

    async fn find_challenge(&self, principal: &str) -> StoreResult<Option<Challenge>>;

    /// Returns whether a challenge was removed; the `true` case is the
    /// single-success claim for verification.
    async fn delete_challenge(&self, principal: &str) -> StoreResult<bool>;
}

pub trait DeviceStore: Send + Sync {
    async fn create_device(&self, device: DeviceRecord) -> StoreResult<()>;

    async fn find_device_by_user_and_hash(
        &self,
        user_id: Uuid,
        secret_hash: &str,
    ) -> StoreResult<Option<DeviceRecord>>;

    async fn delete_devices_for_user(&self, user_id: Uuid) -> StoreResult<u64>;

    /// Optional background sweep; correctness never depends on it
    async fn delete_expired_devices(&self, now: OffsetDateTime) -> StoreResult<u64>;
}

pub trait ResetTokenStore: Send + Sync {
    /// Insert or replace the reset token for its user (at most one live
    /// token per user bounds the replay surface)
    async fn upsert_reset_token(&self, token: ResetTokenRecord) -> StoreResult<()>;

    /// Atomic redemption: in one logical transaction, delete the token
    /// matching `token_hash` if it has not expired and update the owning
    /// user's password hash. Returns the user id on success, `None` when
    /// no live token matched. Any failure before commit leaves the token
    /// intact (fail closed).
    async fn redeem_reset_token(
        &self,
        token_hash: &str,
        new_password_hash: &str,
        now: OffsetDateTime,
    ) -> StoreResult<Option<Uuid>>;
}
