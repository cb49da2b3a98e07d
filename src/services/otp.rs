// SPDX-License-Identifier: MIT

//! Step-up email verification via short-lived one-time codes.
//!
//! One active challenge per email: issuing again overwrites the previous
//! challenge. A challenge ends on expiry or on the first correct code; wrong
//! codes neither consume nor extend it.

use crate::error::AppError;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use rand::Rng;
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// An issued OTP challenge.
#[derive(Debug, Clone)]
pub struct OtpChallenge {
    pub code: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// OTP challenge store keyed by email.
#[derive(Clone)]
pub struct OtpService {
    challenges: Arc<DashMap<String, OtpChallenge>>,
    allowed_email_domain: String,
    ttl: Duration,
}

impl OtpService {
    pub fn new(allowed_email_domain: String, ttl_minutes: i64) -> Self {
        Self {
            challenges: Arc::new(DashMap::new()),
            allowed_email_domain,
            ttl: Duration::minutes(ttl_minutes),
        }
    }

    /// Issue a challenge for the email and return the code for out-of-band
    /// delivery. The code is never part of an API response.
    pub fn send_verification_otp(&self, email: &str) -> Result<String, AppError> {
        self.send_verification_otp_at(email, Utc::now())
    }

    pub(crate) fn send_verification_otp_at(
        &self,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<String, AppError> {
        if email.is_empty() {
            return Err(AppError::Validation("Email is required".to_string()));
        }
        if !email.ends_with(&self.allowed_email_domain) {
            return Err(AppError::Validation(format!(
                "Email must be a campus address ending in {}",
                self.allowed_email_domain
            )));
        }

        // Uniform 6-digit code; leading zeros allowed.
        let code = format!("{:06}", rand::thread_rng().gen_range(0..1_000_000u32));

        self.challenges.insert(
            email.to_lowercase(),
            OtpChallenge {
                code: code.clone(),
                issued_at: now,
                expires_at: now + self.ttl,
            },
        );

        tracing::debug!(email = %email, "OTP challenge issued");
        Ok(code)
    }

    /// Verify a submitted code against the active challenge.
    pub fn verify_email_otp(&self, email: &str, code: &str) -> Result<(), AppError> {
        self.verify_email_otp_at(email, code, Utc::now())
    }

    pub(crate) fn verify_email_otp_at(
        &self,
        email: &str,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let key = email.to_lowercase();
        let challenge = self
            .challenges
            .get(&key)
            .ok_or_else(|| AppError::NotFound("Verification code".to_string()))?;

        if now > challenge.expires_at {
            drop(challenge);
            self.challenges.remove(&key);
            return Err(AppError::Expired("Verification code".to_string()));
        }

        let matches: bool = challenge.code.as_bytes().ct_eq(code.as_bytes()).into();
        if !matches {
            // Challenge stays usable for a correct retry within TTL.
            return Err(AppError::OtpMismatch);
        }
        drop(challenge);

        // Single use: consumed on first successful verification.
        self.challenges.remove(&key);
        tracing::debug!(email = %email, "OTP verified");
        Ok(())
    }
}
