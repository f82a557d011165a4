//! Auth configuration and shared state.

use secrecy::SecretString;

const DEFAULT_SESSION_TTL_SECONDS: i64 = 7 * 24 * 60 * 60;

#[derive(Debug, Clone)]
pub struct AuthConfig {
    session_secret: SecretString,
    session_ttl_seconds: i64,
    secure_cookies: bool,
}

impl AuthConfig {
    #[must_use]
    pub fn new(session_secret: SecretString) -> Self {
        Self {
            session_secret,
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            secure_cookies: false,
        }
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: i64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.secure_cookies = secure;
        self
    }

    #[must_use]
    pub fn session_secret(&self) -> &SecretString {
        &self.session_secret
    }

    #[must_use]
    pub fn session_ttl_seconds(&self) -> i64 {
        self.session_ttl_seconds
    }

    #[must_use]
    pub fn secure_cookies(&self) -> bool {
        self.secure_cookies
    }
}

/// Request-scoped auth state shared through an axum extension.
#[derive(Debug)]
pub struct AuthState {
    config: AuthConfig,
}

impl AuthState {
    #[must_use]
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_seven_days_and_insecure_cookies() {
        let config = AuthConfig::new(SecretString::from("secret".to_string()));
        assert_eq!(config.session_ttl_seconds(), 604_800);
        assert!(!config.secure_cookies());
    }

    #[test]
    fn builders_override_defaults() {
        let config = AuthConfig::new(SecretString::from("secret".to_string()))
            .with_session_ttl_seconds(3600)
            .with_secure_cookies(true);
        assert_eq!(config.session_ttl_seconds(), 3600);
        assert!(config.secure_cookies());
    }
}
