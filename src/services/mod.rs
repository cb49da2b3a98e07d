// SPDX-License-Identifier: MIT

//! Services module - business logic layer.

pub mod auth;
pub mod mailer;
pub mod otp;
pub mod provider;
pub mod session_sync;

pub use auth::{AuthService, LoginSuccess, RegisterSuccess};
pub use mailer::{OutboundEmail, Outbox};
pub use otp::OtpService;
pub use provider::{AuthChange, AuthEvent, IdentityProvider, ProviderUser};
pub use session_sync::{LocalCache, SessionState, SessionSync};
