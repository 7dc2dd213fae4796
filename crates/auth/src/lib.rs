// Auth crate clippy configuration
// These are intentional patterns in this crate:
#![allow(async_fn_in_trait)] // Store traits are consumed via generics, never dyn
// Test code patterns (expected in test files):
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Parley Session & Credential Security Subsystem
//!
//! Session issuance/validation/revocation, OTP-based MFA with attempt
//! limiting and cooldown lockout, trusted-device enrollment, and the
//! password-reset token lifecycle. All state goes through repository
//! traits so the security logic is testable without a database.
//!
//! ## Features
//!
//! - **Sessions**: opaque 256-bit tokens, fixed 7-day expiry, logout-all
//! - **MFA**: 6-digit OTP challenges, 5 attempts, 15-minute lockout
//! - **Trusted devices**: 30-day MFA exemption, hash-only storage
//! - **Password reset**: single-use, 10-minute tokens, atomic redemption
//! - **Error taxonomy**: one closed enum, exhaustively mapped at the boundary

pub mod clock;
pub mod config;
pub mod cookies;
pub mod devices;
pub mod error;
pub mod models;
pub mod otp;
pub mod password;
pub mod reset;
pub mod secrets;
pub mod service;
pub mod sessions;
pub mod store;


// Clock
pub use clock::{Clock, ManualClock, SystemClock};

// Config
pub use config::AuthConfig;

// Cookies
pub use cookies::{find_cookie, CookiePolicy, SameSite, SetCookie};

// Devices
pub use devices::TrustedDeviceManager;

// Error
pub use error::{AuthError, AuthResult};

// Models
pub use models::{
    AuthedSession, Challenge, DeviceRecord, ResetTokenRecord, Role, Session, SessionRecord, User,
};

// OTP
pub use otp::{IssuedChallenge, MfaChallengeManager};

// Password
pub use password::{hash_password, validate_password_strength, verify_password};

// Reset
pub use reset::{IssuedReset, PasswordResetManager};

// Service
pub use service::{require_role, AuthService, LoginOutcome, LoginRequest};

// Sessions
pub use sessions::SessionManager;

// Store
pub use store::{
    memory::MemoryStore, ChallengeStore, DeviceStore, ResetTokenStore, SessionStore, StoreError,
    UserStore,
};
