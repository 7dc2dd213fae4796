//! Data model for the security subsystem
//!
//! Raw secrets never appear in persisted records; every `*_hash` field is
//! the SHA-256 hex digest of the client-held value.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Account role, ordered by privilege
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    User,
    Admin,
    SuperAdmin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Admin => "ADMIN",
            Role::SuperAdmin => "SUPER_ADMIN",
        }
    }

    pub fn parse(raw: &str) -> Option<Role> {
        match raw {
            "USER" => Some(Role::User),
            "ADMIN" => Some(Role::Admin),
            "SUPER_ADMIN" => Some(Role::SuperAdmin),
            _ => None,
        }
    }
}

/// Identity record. Mutated only through explicit state transitions
/// (verify email, enable MFA, change password).
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: Uuid,
    /// Case-normalized (lowercased, trimmed), unique
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub email_verified: bool,
    pub mfa_enabled: bool,
    pub created_at: OffsetDateTime,
}

/// Normalize an email for storage and lookup
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}

/// Persisted session row. Immutable after issuance except for deletion.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub id: Uuid,
    pub token_hash: String,
    pub user_id: Uuid,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: OffsetDateTime,
    /// Absolute expiry, fixed at issuance (not sliding)
    pub expires_at: OffsetDateTime,
}

/// Freshly issued session, including the raw token.
/// This is the only place the raw token ever exists server-side.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub id: Uuid,
    /// Opaque high-entropy token, shown to the client once
    pub token: String,
    pub user_id: Uuid,
    pub created_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
}

/// A validated session together with its owning user
#[derive(Debug, Clone)]
pub struct AuthedSession {
    pub session: SessionRecord,
    pub user: User,
}

/// Live OTP challenge, at most one per principal
#[derive(Debug, Clone)]
pub struct Challenge {
    /// Email or user id the challenge is scoped to
    pub principal: String,
    pub code_hash: String,
    /// Failed verification count; increments only on mismatch
    pub attempts: u32,
    pub expires_at: OffsetDateTime,
    /// Set once attempts reach the maximum; rejects all verification
    /// until it elapses, after which the challenge is void
    pub lock_until: Option<OffsetDateTime>,
}

/// Trusted device enrollment; the raw secret lives only in a client cookie
#[derive(Debug, Clone)]
pub struct DeviceRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub secret_hash: String,
    pub created_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
}

/// Single-use password reset token
#[derive(Debug, Clone)]
pub struct ResetTokenRecord {
    pub user_id: Uuid,
    pub token_hash: String,
    pub expires_at: OffsetDateTime,
}
