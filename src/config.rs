// SPDX-License-Identifier: MIT

//! Application configuration loaded from environment variables.
//!
//! Everything is read once at startup; handlers only ever see the cached
//! `Config` inside the shared state.

use std::env;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Frontend URL for CORS and redirects
    pub frontend_url: String,
    /// Server port
    pub port: u16,
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    /// Required email domain suffix for campus accounts (e.g. "@iiita.ac.in")
    pub allowed_email_domain: String,
    /// Session lifetime in days
    pub session_ttl_days: i64,
    /// OTP challenge lifetime in minutes
    pub otp_ttl_minutes: i64,
    /// Email verification token lifetime in hours
    pub verification_ttl_hours: i64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
                .into_bytes(),
            allowed_email_domain: env::var("ALLOWED_EMAIL_DOMAIN")
                .unwrap_or_else(|_| "@iiita.ac.in".to_string()),
            session_ttl_days: parse_or("SESSION_TTL_DAYS", 30),
            otp_ttl_minutes: parse_or("OTP_TTL_MINUTES", 10),
            verification_ttl_hours: parse_or("VERIFICATION_TTL_HOURS", 24),
        })
    }

    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            port: 8080,
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            allowed_email_domain: "@iiita.ac.in".to_string(),
            session_ttl_days: 30,
            otp_ttl_minutes: 10,
            verification_ttl_hours: 24,
        }
    }
}

fn parse_or(var: &str, default: i64) -> i64 {
    env::var(var)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        env::set_var("JWT_SIGNING_KEY", "test_jwt_key_32_bytes_minimum!!");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.port, 8080);
        assert_eq!(config.allowed_email_domain, "@iiita.ac.in");
        assert_eq!(config.otp_ttl_minutes, 10);
    }

    #[test]
    fn test_defaults_match_documented_ttls() {
        let config = Config::test_default();
        assert_eq!(config.otp_ttl_minutes, 10);
        assert_eq!(config.verification_ttl_hours, 24);
        assert_eq!(config.session_ttl_days, 30);
    }
}
