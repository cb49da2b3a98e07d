// SPDX-License-Identifier: MIT

//! Identity provider: the service of record for credentials, sessions, and
//! email-verification tokens.
//!
//! The rest of the crate treats this as an opaque capability offering six
//! operations (sign-up, password sign-in, session retrieval, sign-out,
//! token verification, auth-state subscription). Anything implementing the
//! same surface is interchangeable; this one keeps its state in concurrent
//! maps and pushes auth-state changes over a broadcast channel.
//!
//! Every pushed event carries a monotonically increasing sequence number so
//! downstream synchronizers can discard out-of-order updates.

use crate::error::AppError;
use crate::models::AccountMetadata;
use argon2::{
    password_hash::SaltString, Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Auth-state change pushed to subscribers.
#[derive(Debug, Clone)]
pub struct AuthEvent {
    /// Monotonically increasing; later events have strictly larger values.
    pub seq: u64,
    pub change: AuthChange,
}

#[derive(Debug, Clone)]
pub enum AuthChange {
    SignedIn { user: ProviderUser },
    SignedOut { user_id: Uuid },
}

/// Snapshot of a provider account handed to callers. Never includes the
/// password hash.
#[derive(Debug, Clone)]
pub struct ProviderUser {
    pub id: Uuid,
    pub email: String,
    pub metadata: AccountMetadata,
    pub email_confirmed_at: Option<DateTime<Utc>>,
}

/// Result of a successful sign-in.
#[derive(Debug, Clone)]
pub struct ProviderSession {
    /// Bearer token for the client. Stored server-side only as a hash.
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: ProviderUser,
}

struct AccountRecord {
    id: Uuid,
    email: String,
    password_hash: String,
    metadata: AccountMetadata,
    email_confirmed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

struct SessionRecord {
    user_id: Uuid,
    expires_at: DateTime<Utc>,
}

struct IssuedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

/// In-process identity provider.
#[derive(Clone)]
pub struct IdentityProvider {
    inner: Arc<ProviderInner>,
}

struct ProviderInner {
    /// Accounts keyed by lowercased email.
    accounts: DashMap<String, AccountRecord>,
    /// Email lookup by identity id.
    emails_by_id: DashMap<Uuid, String>,
    /// Active sessions keyed by SHA-256 of the bearer token.
    sessions: DashMap<String, SessionRecord>,
    /// Pending email-verification tokens keyed by email.
    verification_tokens: DashMap<String, IssuedToken>,
    /// Pending password-reset tokens keyed by email.
    reset_tokens: DashMap<String, IssuedToken>,
    events: broadcast::Sender<AuthEvent>,
    seq: AtomicU64,
    jwt_signing_key: Vec<u8>,
    session_ttl: Duration,
    verification_ttl: Duration,
}

impl IdentityProvider {
    pub fn new(jwt_signing_key: Vec<u8>, session_ttl_days: i64, verification_ttl_hours: i64) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            inner: Arc::new(ProviderInner {
                accounts: DashMap::new(),
                emails_by_id: DashMap::new(),
                sessions: DashMap::new(),
                verification_tokens: DashMap::new(),
                reset_tokens: DashMap::new(),
                events,
                seq: AtomicU64::new(0),
                jwt_signing_key,
                session_ttl: Duration::days(session_ttl_days),
                verification_ttl: Duration::hours(verification_ttl_hours),
            }),
        }
    }

    /// Subscribe to auth-state change events.
    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.inner.events.subscribe()
    }

    /// The sequence number of the most recently published event.
    pub fn current_seq(&self) -> u64 {
        self.inner.seq.load(Ordering::SeqCst)
    }

    fn publish(&self, change: AuthChange) -> u64 {
        let seq = self.inner.seq.fetch_add(1, Ordering::SeqCst) + 1;
        // Send fails only when there are no subscribers, which is fine.
        let _ = self.inner.events.send(AuthEvent { seq, change });
        seq
    }

    // ─── Sign-up & Email Confirmation ────────────────────────────

    /// Create an account. Email confirmation is required before sign-in;
    /// the returned token must be delivered out-of-band.
    pub fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: AccountMetadata,
    ) -> Result<(ProviderUser, String), AppError> {
        let key = email.to_lowercase();
        if self.inner.accounts.contains_key(&key) {
            return Err(AppError::DuplicateAccount);
        }

        let password_hash = hash_password(password)?;
        let record = AccountRecord {
            id: Uuid::new_v4(),
            email: key.clone(),
            password_hash,
            metadata,
            email_confirmed_at: None,
            created_at: Utc::now(),
        };
        let user = snapshot(&record);

        self.inner.emails_by_id.insert(record.id, key.clone());
        self.inner.accounts.insert(key.clone(), record);

        let token = self.issue_verification_token(&key);
        tracing::info!(user_id = %user.id, email = %key, "Account created, confirmation pending");

        Ok((user, token))
    }

    /// Issue (or re-issue) an email-verification token. A new token replaces
    /// any previous one for the same email.
    pub fn issue_verification_token(&self, email: &str) -> String {
        let token = random_token();
        self.inner.verification_tokens.insert(
            email.to_lowercase(),
            IssuedToken {
                token: token.clone(),
                expires_at: Utc::now() + self.inner.verification_ttl,
            },
        );
        token
    }

    /// Re-send flow: fails for unknown or already-confirmed accounts.
    pub fn resend_verification(&self, email: &str) -> Result<String, AppError> {
        let key = email.to_lowercase();
        let account = self
            .inner
            .accounts
            .get(&key)
            .ok_or_else(|| AppError::NotFound(format!("No account for {}", email)))?;
        if account.email_confirmed_at.is_some() {
            return Err(AppError::Validation(
                "Email is already verified".to_string(),
            ));
        }
        drop(account);
        Ok(self.issue_verification_token(&key))
    }

    /// Consume a verification token and mark the account confirmed.
    pub fn verify_email(&self, email: &str, token: &str) -> Result<(), AppError> {
        self.verify_email_at(email, token, Utc::now())
    }

    pub(crate) fn verify_email_at(
        &self,
        email: &str,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let key = email.to_lowercase();
        let issued = self
            .inner
            .verification_tokens
            .get(&key)
            .ok_or_else(|| AppError::NotFound("Verification token".to_string()))?;

        if now > issued.expires_at {
            drop(issued);
            self.inner.verification_tokens.remove(&key);
            return Err(AppError::Expired("Verification link".to_string()));
        }

        let matches: bool = issued.token.as_bytes().ct_eq(token.as_bytes()).into();
        if !matches {
            return Err(AppError::OtpMismatch);
        }
        drop(issued);

        // Single use: consumed on the first successful verification.
        self.inner.verification_tokens.remove(&key);

        let mut account = self
            .inner
            .accounts
            .get_mut(&key)
            .ok_or_else(|| AppError::NotFound(format!("No account for {}", email)))?;
        account.email_confirmed_at = Some(now);

        tracing::info!(email = %key, "Email verified");
        Ok(())
    }

    // ─── Password Sign-in ────────────────────────────────────────

    /// Verify credentials and open a session. Pushes a `SignedIn` event.
    pub fn sign_in(&self, email: &str, password: &str) -> Result<ProviderSession, AppError> {
        let key = email.to_lowercase();
        let account = self
            .inner
            .accounts
            .get(&key)
            .ok_or(AppError::InvalidCredentials)?;

        if !verify_password(password, &account.password_hash)? {
            return Err(AppError::InvalidCredentials);
        }

        if account.email_confirmed_at.is_none() {
            return Err(AppError::Validation(
                "Please verify your email before logging in".to_string(),
            ));
        }

        let user = snapshot(&account);
        drop(account);

        let expires_at = Utc::now() + self.inner.session_ttl;
        let token = crate::middleware::auth::create_jwt(
            user.id,
            expires_at,
            &self.inner.jwt_signing_key,
        )
        .map_err(|e| AppError::Provider(format!("Token issuance failed: {}", e)))?;

        self.inner.sessions.insert(
            token_hash(&token),
            SessionRecord {
                user_id: user.id,
                expires_at,
            },
        );

        self.publish(AuthChange::SignedIn { user: user.clone() });

        Ok(ProviderSession {
            token,
            expires_at,
            user,
        })
    }

    // ─── Session Retrieval ───────────────────────────────────────

    /// Resolve the account behind an active session token.
    ///
    /// Returns `None` when the token is unknown, revoked, or expired; an
    /// expired record is deleted as a side effect.
    pub fn get_session(&self, token: &str) -> Option<ProviderUser> {
        let hash = token_hash(token);
        let record = self.inner.sessions.get(&hash)?;

        if Utc::now() > record.expires_at {
            drop(record);
            self.inner.sessions.remove(&hash);
            return None;
        }

        let user_id = record.user_id;
        drop(record);

        let email = self.inner.emails_by_id.get(&user_id)?.clone();
        self.inner.accounts.get(&email).map(|a| snapshot(&a))
    }

    // ─── Sign-out ────────────────────────────────────────────────

    /// Invalidate a session. Idempotent: signing out an already-dead token
    /// succeeds silently. Pushes a `SignedOut` event when a session existed.
    pub fn sign_out(&self, token: &str) {
        if let Some((_, record)) = self.inner.sessions.remove(&token_hash(token)) {
            self.publish(AuthChange::SignedOut {
                user_id: record.user_id,
            });
        }
    }

    // ─── Password Reset ──────────────────────────────────────────

    /// Issue a password-reset token for delivery out-of-band.
    ///
    /// Returns `None` for unknown accounts without erroring, so the HTTP
    /// surface never reveals whether an email is registered.
    pub fn issue_password_reset(&self, email: &str) -> Option<String> {
        let key = email.to_lowercase();
        if !self.inner.accounts.contains_key(&key) {
            return None;
        }
        let token = random_token();
        self.inner.reset_tokens.insert(
            key,
            IssuedToken {
                token: token.clone(),
                expires_at: Utc::now() + self.inner.verification_ttl,
            },
        );
        Some(token)
    }

    /// Consume a reset token.
    pub fn verify_reset_token(&self, email: &str, token: &str) -> Result<(), AppError> {
        let key = email.to_lowercase();
        let issued = self
            .inner
            .reset_tokens
            .get(&key)
            .ok_or_else(|| AppError::NotFound("Password reset token".to_string()))?;

        if Utc::now() > issued.expires_at {
            drop(issued);
            self.inner.reset_tokens.remove(&key);
            return Err(AppError::Expired("Password reset link".to_string()));
        }

        let matches: bool = issued.token.as_bytes().ct_eq(token.as_bytes()).into();
        if !matches {
            return Err(AppError::OtpMismatch);
        }
        drop(issued);
        self.inner.reset_tokens.remove(&key);
        Ok(())
    }

    /// Replace the account password and revoke every open session for the
    /// account (a password change invalidates all existing proof).
    pub fn update_password(&self, email: &str, new_password: &str) -> Result<(), AppError> {
        let key = email.to_lowercase();
        let mut account = self
            .inner
            .accounts
            .get_mut(&key)
            .ok_or_else(|| AppError::NotFound(format!("No account for {}", email)))?;

        account.password_hash = hash_password(new_password)?;
        let user_id = account.id;
        drop(account);

        self.inner
            .sessions
            .retain(|_, record| record.user_id != user_id);
        self.publish(AuthChange::SignedOut { user_id });

        tracing::info!(user_id = %user_id, "Password updated, sessions revoked");
        Ok(())
    }

    /// Test hook: mark an account confirmed without a token round-trip.
    #[doc(hidden)]
    pub fn confirm_email_for_tests(&self, email: &str) {
        if let Some(mut account) = self.inner.accounts.get_mut(&email.to_lowercase()) {
            account.email_confirmed_at = Some(Utc::now());
        }
    }
}

fn snapshot(record: &AccountRecord) -> ProviderUser {
    ProviderUser {
        id: record.id,
        email: record.email.clone(),
        metadata: record.metadata.clone(),
        email_confirmed_at: record.email_confirmed_at,
    }
}

fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Provider(format!("Failed to hash password: {}", e)))
}

fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| AppError::Provider(format!("Failed to parse password hash: {}", e)))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

fn random_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn token_hash(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    fn provider() -> IdentityProvider {
        IdentityProvider::new(b"test_jwt_key_32_bytes_minimum!!".to_vec(), 30, 24)
    }

    fn metadata() -> AccountMetadata {
        AccountMetadata {
            full_name: "Demo Student".to_string(),
            user_role: Role::Student,
        }
    }

    #[test]
    fn test_sign_up_rejects_duplicates() {
        let p = provider();
        p.sign_up("student@iiita.ac.in", "password123", metadata())
            .unwrap();
        let err = p
            .sign_up("Student@iiita.ac.in", "other", metadata())
            .unwrap_err();
        assert!(matches!(err, AppError::DuplicateAccount));
    }

    #[test]
    fn test_sign_in_requires_confirmed_email() {
        let p = provider();
        p.sign_up("student@iiita.ac.in", "password123", metadata())
            .unwrap();

        let err = p.sign_in("student@iiita.ac.in", "password123").unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        p.confirm_email_for_tests("student@iiita.ac.in");
        let session = p.sign_in("student@iiita.ac.in", "password123").unwrap();
        assert_eq!(session.user.email, "student@iiita.ac.in");
    }

    #[test]
    fn test_verification_token_single_use() {
        let p = provider();
        let (_, token) = p
            .sign_up("student@iiita.ac.in", "password123", metadata())
            .unwrap();

        p.verify_email("student@iiita.ac.in", &token).unwrap();
        let err = p.verify_email("student@iiita.ac.in", &token).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_verification_token_expiry() {
        let p = provider();
        let (_, token) = p
            .sign_up("student@iiita.ac.in", "password123", metadata())
            .unwrap();

        let late = Utc::now() + Duration::hours(25);
        let err = p
            .verify_email_at("student@iiita.ac.in", &token, late)
            .unwrap_err();
        assert!(matches!(err, AppError::Expired(_)));

        // Stale token was deleted
        let err = p.verify_email("student@iiita.ac.in", &token).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_sign_out_is_idempotent_and_revokes() {
        let p = provider();
        p.sign_up("student@iiita.ac.in", "password123", metadata())
            .unwrap();
        p.confirm_email_for_tests("student@iiita.ac.in");
        let session = p.sign_in("student@iiita.ac.in", "password123").unwrap();

        assert!(p.get_session(&session.token).is_some());
        p.sign_out(&session.token);
        assert!(p.get_session(&session.token).is_none());
        // Second sign-out succeeds silently
        p.sign_out(&session.token);
    }

    #[test]
    fn test_password_update_revokes_sessions() {
        let p = provider();
        p.sign_up("student@iiita.ac.in", "password123", metadata())
            .unwrap();
        p.confirm_email_for_tests("student@iiita.ac.in");
        let session = p.sign_in("student@iiita.ac.in", "password123").unwrap();

        p.update_password("student@iiita.ac.in", "newpassword456")
            .unwrap();
        assert!(p.get_session(&session.token).is_none());

        let err = p.sign_in("student@iiita.ac.in", "password123").unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));
        p.sign_in("student@iiita.ac.in", "newpassword456").unwrap();
    }

    #[test]
    fn test_events_have_increasing_seq() {
        let p = provider();
        let mut rx = p.subscribe();
        p.sign_up("student@iiita.ac.in", "password123", metadata())
            .unwrap();
        p.confirm_email_for_tests("student@iiita.ac.in");
        let session = p.sign_in("student@iiita.ac.in", "password123").unwrap();
        p.sign_out(&session.token);

        let first = rx.try_recv().unwrap();
        let second = rx.try_recv().unwrap();
        assert!(matches!(first.change, AuthChange::SignedIn { .. }));
        assert!(matches!(second.change, AuthChange::SignedOut { .. }));
        assert!(second.seq > first.seq);
    }
}
