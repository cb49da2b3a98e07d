// SPDX-License-Identifier: MIT

//! Identity provider adapter.
//!
//! Translates application-level auth intents into provider calls and
//! normalizes the results into [`UserIdentity`]. Input validation happens
//! before any provider call; provider failures surface as `AppError`
//! variants rather than panics, so consumers never need their own
//! exception handling. Profile lookups are tolerated to fail: the caller
//! proceeds with a metadata-only identity.

use crate::db::Database;
use crate::error::AppError;
use crate::models::{AccountMetadata, Profile, Role, UserIdentity};
use crate::services::mailer::Outbox;
use crate::services::provider::{IdentityProvider, ProviderUser};
use crate::services::session_sync::{
    CachedSession, LocalCache, CACHE_SESSION, CACHE_USER, CACHE_USER_ROLE,
};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Successful login payload.
#[derive(Debug, Clone)]
pub struct LoginSuccess {
    pub identity: UserIdentity,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Registration result. The provider requires email confirmation, so the
/// account starts pending with a resend affordance.
#[derive(Debug, Clone)]
pub struct RegisterSuccess {
    pub user_id: Uuid,
    pub verification_pending: bool,
    pub message: String,
}

#[derive(Clone)]
pub struct AuthService {
    provider: IdentityProvider,
    db: Database,
    outbox: Outbox,
    cache: LocalCache,
    frontend_url: String,
}

impl AuthService {
    pub fn new(
        provider: IdentityProvider,
        db: Database,
        outbox: Outbox,
        cache: LocalCache,
        frontend_url: String,
    ) -> Self {
        Self {
            provider,
            db,
            outbox,
            cache,
            frontend_url,
        }
    }

    /// Merge a provider account with its profile record. The profile — when
    /// present — is authoritative for name and role; otherwise provider
    /// metadata stands, with the email local-part as a last-resort name.
    pub fn normalize(&self, user: &ProviderUser) -> UserIdentity {
        let profile = self.db.get_profile(user.id);
        if profile.is_none() {
            tracing::warn!(user_id = %user.id, "Profile record missing, using provider metadata");
        }

        let display_name = profile
            .as_ref()
            .map(|p| p.full_name.clone())
            .unwrap_or_else(|| {
                if user.metadata.full_name.is_empty() {
                    user.email
                        .split('@')
                        .next()
                        .unwrap_or_default()
                        .to_string()
                } else {
                    user.metadata.full_name.clone()
                }
            });
        let role = profile
            .as_ref()
            .map(|p| p.user_role)
            .unwrap_or(user.metadata.user_role);

        UserIdentity {
            id: user.id,
            email: user.email.clone(),
            display_name,
            role,
        }
    }

    /// Password login. Persists `user`/`user_role`/`session` cache keys on
    /// success.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginSuccess, AppError> {
        if email.is_empty() || password.is_empty() {
            return Err(AppError::Validation(
                "Email and password are required".to_string(),
            ));
        }

        let session = self.provider.sign_in(email, password)?;
        let identity = self.normalize(&session.user);

        self.persist(&identity, &session.token, session.expires_at);

        tracing::info!(
            user_id = %identity.id,
            role = %identity.role,
            "Login successful"
        );

        Ok(LoginSuccess {
            identity,
            token: session.token,
            expires_at: session.expires_at,
        })
    }

    /// Register a new account. Field and role validation happens before any
    /// provider call; the profile record is created best-effort alongside the
    /// identity and its absence degrades rather than fails.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
        role: &str,
    ) -> Result<RegisterSuccess, AppError> {
        if email.is_empty() || password.is_empty() || display_name.is_empty() || role.is_empty() {
            return Err(AppError::Validation("All fields are required".to_string()));
        }
        let role = Role::parse(role)
            .ok_or_else(|| AppError::Validation("Invalid user role".to_string()))?;

        let metadata = AccountMetadata {
            full_name: display_name.to_string(),
            user_role: role,
        };
        let (user, verification_token) = self.provider.sign_up(email, password, metadata)?;

        // Best-effort profile record next to the identity. The in-process
        // store cannot fail here, but the contract stands: a missing profile
        // degrades the identity to metadata-only instead of failing signup.
        self.db.upsert_profile(Profile {
            id: user.id,
            full_name: display_name.to_string(),
            email: user.email.clone(),
            user_role: role,
        });

        self.mail_verification_link(&user.email, &verification_token);

        Ok(RegisterSuccess {
            user_id: user.id,
            verification_pending: true,
            message: "Registration successful. Please check your email to verify your account."
                .to_string(),
        })
    }

    /// Resolve the identity behind a session token, or `None` when there is
    /// no active session.
    pub async fn current_user(&self, token: &str) -> Option<UserIdentity> {
        let user = self.provider.get_session(token)?;
        Some(self.normalize(&user))
    }

    /// Invalidate the session and clear the local cache. Idempotent.
    pub async fn sign_out(&self, token: &str) -> Result<(), AppError> {
        self.provider.sign_out(token);
        self.cache.remove(CACHE_USER);
        self.cache.remove(CACHE_USER_ROLE);
        self.cache.remove(CACHE_SESSION);
        Ok(())
    }

    /// Consume an emailed reset token and set the new password.
    pub async fn reset_password(
        &self,
        email: &str,
        token: &str,
        new_password: &str,
    ) -> Result<(), AppError> {
        if new_password.is_empty() {
            return Err(AppError::Validation(
                "New password is required".to_string(),
            ));
        }
        self.provider.verify_reset_token(email, token)?;
        self.provider.update_password(email, new_password)
    }

    /// Mail a password-reset link. Always succeeds so the endpoint never
    /// reveals whether an address is registered.
    pub async fn send_password_reset_email(&self, email: &str) -> Result<(), AppError> {
        if email.is_empty() {
            return Err(AppError::Validation("Email is required".to_string()));
        }
        if let Some(token) = self.provider.issue_password_reset(email) {
            self.outbox.send(
                email,
                "Reset your password",
                format!(
                    "{}/reset-password?email={}&token={}",
                    self.frontend_url, email, token
                ),
            );
        }
        Ok(())
    }

    /// Consume an email-verification token, activating the account.
    pub async fn verify_email(&self, email: &str, token: &str) -> Result<(), AppError> {
        self.provider.verify_email(email, token)
    }

    /// Re-issue and mail the verification link.
    pub async fn resend_verification(&self, email: &str) -> Result<(), AppError> {
        let token = self.provider.resend_verification(email)?;
        self.mail_verification_link(email, &token);
        Ok(())
    }

    fn mail_verification_link(&self, email: &str, token: &str) {
        self.outbox.send(
            email,
            "Verify your email",
            format!(
                "{}/verify-email?email={}&token={}",
                self.frontend_url, email, token
            ),
        );
    }

    fn persist(&self, identity: &UserIdentity, token: &str, expires_at: DateTime<Utc>) {
        match serde_json::to_string(identity) {
            Ok(raw) => self.cache.set(CACHE_USER, raw),
            Err(e) => tracing::warn!(error = %e, "Failed to cache identity"),
        }
        self.cache
            .set(CACHE_USER_ROLE, identity.role.as_str().to_string());
        match serde_json::to_string(&CachedSession {
            token: token.to_string(),
            expires_at,
        }) {
            Ok(raw) => self.cache.set(CACHE_SESSION, raw),
            Err(e) => tracing::warn!(error = %e, "Failed to cache session"),
        }
    }
}
