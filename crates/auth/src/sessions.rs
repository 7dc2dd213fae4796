//! Session issuance, validation and revocation
//!
//! Sessions are opaque 256-bit tokens with a fixed expiry. Only the token
//! digest is persisted; validation hashes the presented token and treats
//! "not found" and "expired" identically. No session is ever cached in
//! process memory — that would break logout-all across processes.

use std::sync::Arc;

use uuid::Uuid;

use crate::clock::Clock;
use crate::config::AuthConfig;
use crate::error::AuthResult;
use crate::models::{AuthedSession, Session, SessionRecord};
use crate::secrets;
use crate::store::{SessionStore, UserStore};

pub struct SessionManager<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    config: AuthConfig,
}

impl<S> SessionManager<S>
where
    S: SessionStore + UserStore,
{
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>, config: AuthConfig) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    /// Issue a new session. The returned [`Session`] carries the raw token;
    /// this is the only time it is ever available.
    pub async fn create_session(
        &self,
        user_id: Uuid,
        ip_address: Option<String>,
        user_agent: Option<String>,
    ) -> AuthResult<Session> {
        let token = secrets::generate_secret();
        let now = self.clock.now();
        let record = SessionRecord {
            id: Uuid::new_v4(),
            token_hash: secrets::hash_secret(&token),
            user_id,
            ip_address,
            user_agent,
            created_at: now,
            expires_at: now + self.config.session_ttl,
        };

        self.store.create_session(record.clone()).await?;

        tracing::info!(
            user_id = %user_id,
            session_id = %record.id,
            expires_at = %record.expires_at,
            "session issued"
        );

        Ok(Session {
            id: record.id,
            token,
            user_id,
            created_at: record.created_at,
            expires_at: record.expires_at,
        })
    }

    /// Resolve a raw token to a live session and its owning user.
    ///
    /// Missing, expired and orphaned (user deleted) sessions are all
    /// `None`; the caller never learns which.
    pub async fn validate_session(&self, raw_token: &str) -> AuthResult<Option<AuthedSession>> {
        let token_hash = secrets::hash_secret(raw_token);

        let record = match self.store.find_session_by_token_hash(&token_hash).await? {
            Some(record) => record,
            None => return Ok(None),
        };

        // Valid strictly before the expiry instant; at expiry the session
        // is absent. Expired rows are dropped lazily, not swept.
        if self.clock.now() >= record.expires_at {
            return Ok(None);
        }

        let user = match self.store.find_user_by_id(record.user_id).await? {
            Some(user) => user,
            None => return Ok(None),
        };

        Ok(Some(AuthedSession {
            session: record,
            user,
        }))
    }

    /// Delete the single matching session. Idempotent: an unknown token is
    /// not an error.
    pub async fn logout(&self, raw_token: &str) -> AuthResult<()> {
        let token_hash = secrets::hash_secret(raw_token);
        let deleted = self.store.delete_session_by_token_hash(&token_hash).await?;
        if deleted {
            tracing::info!("session revoked by logout");
        }
        Ok(())
    }

    /// Delete every session owned by the user. Called for "log out of all
    /// devices" and on any credential-level change.
    pub async fn logout_all(&self, user_id: Uuid) -> AuthResult<u64> {
        let revoked = self.store.delete_sessions_for_user(user_id).await?;
        tracing::info!(user_id = %user_id, revoked, "all sessions revoked");
        Ok(revoked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::models::{Role, User};
    use crate::store::memory::MemoryStore;
    use crate::store::UserStore as _;
    use time::{Duration, OffsetDateTime};

    async fn setup() -> (Arc<MemoryStore>, Arc<ManualClock>, SessionManager<MemoryStore>, Uuid) {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(OffsetDateTime::UNIX_EPOCH));
        let user = store
            .create_user(User {
                id: Uuid::new_v4(),
                email: "u1@x.com".into(),
                password_hash: "hash".into(),
                role: Role::User,
                email_verified: true,
                mfa_enabled: false,
                created_at: clock.now(),
            })
            .await
            .unwrap();
        let manager = SessionManager::new(
            Arc::clone(&store),
            clock.clone() as Arc<dyn Clock>,
            AuthConfig::default(),
        );
        (store, clock, manager, user.id)
    }

    #[tokio::test]
    async fn test_created_session_validates() {
        let (_, _, manager, user_id) = setup().await;
        let session = manager
            .create_session(user_id, Some("10.0.0.1".into()), None)
            .await
            .unwrap();

        let authed = manager
            .validate_session(&session.token)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(authed.user.id, user_id);
        assert_eq!(authed.session.id, session.id);
    }

    #[tokio::test]
    async fn test_token_expiry_is_session_ttl() {
        let (_, clock, manager, user_id) = setup().await;
        let session = manager.create_session(user_id, None, None).await.unwrap();
        assert_eq!(session.expires_at - clock.now(), Duration::days(7));
    }

    #[tokio::test]
    async fn test_absent_at_exact_expiry_instant() {
        let (_, clock, manager, user_id) = setup().await;
        let session = manager.create_session(user_id, None, None).await.unwrap();

        // One second before expiry: still valid
        clock.advance(Duration::days(7) - Duration::seconds(1));
        assert!(manager
            .validate_session(&session.token)
            .await
            .unwrap()
            .is_some());

        // At the exact expiry instant: absent
        clock.advance(Duration::seconds(1));
        assert!(manager
            .validate_session(&session.token)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_unknown_token_is_absent() {
        let (_, _, manager, _) = setup().await;
        assert!(manager.validate_session("deadbeef").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_logout_then_validate_absent() {
        let (_, _, manager, user_id) = setup().await;
        let session = manager.create_session(user_id, None, None).await.unwrap();

        manager.logout(&session.token).await.unwrap();
        assert!(manager
            .validate_session(&session.token)
            .await
            .unwrap()
            .is_none());

        // Idempotent
        manager.logout(&session.token).await.unwrap();
    }

    #[tokio::test]
    async fn test_logout_all_revokes_every_token() {
        let (_, _, manager, user_id) = setup().await;
        let a = manager.create_session(user_id, None, None).await.unwrap();
        let b = manager.create_session(user_id, None, None).await.unwrap();

        let revoked = manager.logout_all(user_id).await.unwrap();
        assert_eq!(revoked, 2);
        assert!(manager.validate_session(&a.token).await.unwrap().is_none());
        assert!(manager.validate_session(&b.token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_raw_token_never_stored() {
        let (store, _, manager, user_id) = setup().await;
        let session = manager.create_session(user_id, None, None).await.unwrap();

        let by_raw = store
            .find_session_by_token_hash(&session.token)
            .await
            .unwrap();
        assert!(by_raw.is_none(), "store must be keyed by digest, not raw token");
    }
}
