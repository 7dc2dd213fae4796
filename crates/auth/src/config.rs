//! Timer and policy configuration
//!
//! Every time-based invariant in the subsystem is driven by this struct;
//! nothing is hard-coded in the managers. Defaults match production
//! values, `from_env` allows per-environment tuning.

use time::Duration;

#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Absolute session lifetime from issuance (not sliding)
    pub session_ttl: Duration,
    /// OTP challenge lifetime
    pub otp_ttl: Duration,
    /// Failed verifications before a challenge locks
    pub otp_max_attempts: u32,
    /// Cooldown once a challenge locks
    pub otp_lockout: Duration,
    /// Password reset token lifetime
    pub reset_token_ttl: Duration,
    /// Trusted device MFA exemption window
    pub trusted_device_ttl: Duration,
    /// Whether logout-all also revokes trusted devices.
    /// Off by default: a device that completed MFA stays trusted across
    /// a forced logout unless the deployment opts into the stricter posture.
    pub revoke_devices_on_logout_all: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl: Duration::days(7),
            otp_ttl: Duration::minutes(10),
            otp_max_attempts: 5,
            otp_lockout: Duration::minutes(15),
            reset_token_ttl: Duration::minutes(10),
            trusted_device_ttl: Duration::days(30),
            revoke_devices_on_logout_all: false,
        }
    }
}

impl AuthConfig {
    /// Load overrides from the environment, falling back to defaults.
    ///
    /// Durations are given in seconds (`PARLEY_SESSION_TTL_SECS` etc.) so
    /// staging can run with compressed timers.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            session_ttl: env_secs("PARLEY_SESSION_TTL_SECS", defaults.session_ttl),
            otp_ttl: env_secs("PARLEY_OTP_TTL_SECS", defaults.otp_ttl),
            otp_max_attempts: env_u32("PARLEY_OTP_MAX_ATTEMPTS", defaults.otp_max_attempts),
            otp_lockout: env_secs("PARLEY_OTP_LOCKOUT_SECS", defaults.otp_lockout),
            reset_token_ttl: env_secs("PARLEY_RESET_TOKEN_TTL_SECS", defaults.reset_token_ttl),
            trusted_device_ttl: env_secs(
                "PARLEY_TRUSTED_DEVICE_TTL_SECS",
                defaults.trusted_device_ttl,
            ),
            revoke_devices_on_logout_all: env_bool(
                "PARLEY_REVOKE_DEVICES_ON_LOGOUT_ALL",
                defaults.revoke_devices_on_logout_all,
            ),
        }
    }
}

fn env_secs(name: &str, default: Duration) -> Duration {
    match std::env::var(name) {
        Ok(raw) => match raw.parse::<i64>() {
            Ok(secs) if secs > 0 => Duration::seconds(secs),
            _ => {
                tracing::warn!(var = name, value = %raw, "ignoring invalid duration override");
                default
            }
        },
        Err(_) => default,
    }
}

fn env_u32(name: &str, default: u32) -> u32 {
    match std::env::var(name) {
        Ok(raw) => match raw.parse::<u32>() {
            Ok(n) if n > 0 => n,
            _ => {
                tracing::warn!(var = name, value = %raw, "ignoring invalid count override");
                default
            }
        },
        Err(_) => default,
    }
}

fn env_bool(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(raw) => matches!(raw.as_str(), "1" | "true" | "yes"),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_production_values() {
        let config = AuthConfig::default();
        assert_eq!(config.session_ttl, Duration::days(7));
        assert_eq!(config.otp_ttl, Duration::minutes(10));
        assert_eq!(config.otp_max_attempts, 5);
        assert_eq!(config.otp_lockout, Duration::minutes(15));
        assert_eq!(config.reset_token_ttl, Duration::minutes(10));
        assert_eq!(config.trusted_device_ttl, Duration::days(30));
        assert!(!config.revoke_devices_on_logout_all);
    }
}
