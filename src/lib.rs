// SPDX-License-Identifier: MIT

//! Campus-Hub: campus club and event management backend
//!
//! This crate provides the backend API for campus club membership, event
//! registration, and the authentication stack behind them: an identity
//! provider adapter, OTP verification, session synchronization, and
//! role-based route guards.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use db::Database;
use services::{AuthService, IdentityProvider, LocalCache, OtpService, Outbox};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub provider: IdentityProvider,
    pub auth: AuthService,
    pub otp: OtpService,
    pub outbox: Outbox,
    pub cache: LocalCache,
}

impl AppState {
    /// Wire up the full service stack from a configuration and a data store.
    pub fn new(config: Config, db: Database) -> Self {
        let provider = IdentityProvider::new(
            config.jwt_signing_key.clone(),
            config.session_ttl_days,
            config.verification_ttl_hours,
        );
        let outbox = Outbox::new();
        let cache = LocalCache::new();
        let auth = AuthService::new(
            provider.clone(),
            db.clone(),
            outbox.clone(),
            cache.clone(),
            config.frontend_url.clone(),
        );
        let otp = OtpService::new(
            config.allowed_email_domain.clone(),
            config.otp_ttl_minutes,
        );

        Self {
            config,
            db,
            provider,
            auth,
            otp,
            outbox,
            cache,
        }
    }
}
