//! Cookie policy for the HTTP boundary
//!
//! The core never touches cookies; this module is the collaborator the
//! boundary uses to place the session token and trusted-device secret in
//! HttpOnly cookies with max-ages matching the configured TTLs.

use crate::config::AuthConfig;

pub const SESSION_COOKIE: &str = "parley_session";
pub const DEVICE_COOKIE: &str = "parley_device";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    fn as_str(&self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

/// Transport flags for an issued cookie
#[derive(Debug, Clone)]
pub struct SetCookie {
    pub name: &'static str,
    pub value: String,
    pub http_only: bool,
    pub secure: bool,
    pub same_site: SameSite,
    pub path: &'static str,
    pub domain: Option<String>,
    pub max_age_secs: i64,
}

impl SetCookie {
    /// Render as a `Set-Cookie` header value
    pub fn header_value(&self) -> String {
        let mut out = format!("{}={}", self.name, self.value);
        out.push_str("; Path=");
        out.push_str(self.path);
        if let Some(domain) = &self.domain {
            out.push_str("; Domain=");
            out.push_str(domain);
        }
        out.push_str(&format!("; Max-Age={}", self.max_age_secs));
        out.push_str(&format!("; SameSite={}", self.same_site.as_str()));
        if self.secure {
            out.push_str("; Secure");
        }
        if self.http_only {
            out.push_str("; HttpOnly");
        }
        out
    }
}

/// Deployment-level cookie settings
#[derive(Debug, Clone)]
pub struct CookiePolicy {
    /// Off only for local development over plain HTTP
    pub secure: bool,
    pub domain: Option<String>,
}

impl Default for CookiePolicy {
    fn default() -> Self {
        Self {
            secure: true,
            domain: None,
        }
    }
}

impl CookiePolicy {
    /// Session cookie, max-age matched to the session TTL
    pub fn session_cookie(&self, token: &str, config: &AuthConfig) -> SetCookie {
        SetCookie {
            name: SESSION_COOKIE,
            value: token.to_string(),
            http_only: true,
            secure: self.secure,
            same_site: SameSite::Lax,
            path: "/",
            domain: self.domain.clone(),
            max_age_secs: config.session_ttl.whole_seconds(),
        }
    }

    /// Trusted-device cookie, max-age matched to the device TTL
    pub fn device_cookie(&self, secret: &str, config: &AuthConfig) -> SetCookie {
        SetCookie {
            name: DEVICE_COOKIE,
            value: secret.to_string(),
            http_only: true,
            secure: self.secure,
            same_site: SameSite::Lax,
            path: "/",
            domain: self.domain.clone(),
            max_age_secs: config.trusted_device_ttl.whole_seconds(),
        }
    }

    /// Expire a cookie immediately (logout)
    pub fn clear_cookie(&self, name: &'static str) -> SetCookie {
        SetCookie {
            name,
            value: String::new(),
            http_only: true,
            secure: self.secure,
            same_site: SameSite::Lax,
            path: "/",
            domain: self.domain.clone(),
            max_age_secs: 0,
        }
    }
}

/// Scan a `Cookie` header value for a named cookie
pub fn find_cookie<'a>(header_value: &'a str, name: &str) -> Option<&'a str> {
    for cookie in header_value.split(';') {
        let cookie = cookie.trim();
        if let Some(value) = cookie.strip_prefix(name) {
            if let Some(value) = value.strip_prefix('=') {
                return Some(value);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_cookie_flags() {
        let policy = CookiePolicy::default();
        let cookie = policy.session_cookie("tok123", &AuthConfig::default());
        let header = cookie.header_value();

        assert!(header.starts_with("parley_session=tok123"));
        assert!(header.contains("HttpOnly"));
        assert!(header.contains("Secure"));
        assert!(header.contains("SameSite=Lax"));
        assert!(header.contains(&format!("Max-Age={}", 7 * 24 * 3600)));
    }

    #[test]
    fn test_device_cookie_max_age_matches_ttl() {
        let policy = CookiePolicy::default();
        let cookie = policy.device_cookie("dev456", &AuthConfig::default());
        assert_eq!(cookie.max_age_secs, 30 * 24 * 3600);
    }

    #[test]
    fn test_clear_cookie_expires_now() {
        let policy = CookiePolicy::default();
        let cookie = policy.clear_cookie(SESSION_COOKIE);
        assert_eq!(cookie.max_age_secs, 0);
        assert!(cookie.value.is_empty());
    }

    #[test]
    fn test_find_cookie() {
        let header = "theme=dark; parley_session=abc123; parley_device=xyz";
        assert_eq!(find_cookie(header, SESSION_COOKIE), Some("abc123"));
        assert_eq!(find_cookie(header, DEVICE_COOKIE), Some("xyz"));
        assert_eq!(find_cookie(header, "missing"), None);
    }

    #[test]
    fn test_find_cookie_requires_exact_name() {
        // A cookie whose name merely starts with the needle must not match
        let header = "parley_session_old=stale";
        assert_eq!(find_cookie(header, SESSION_COOKIE), None);
    }
}
