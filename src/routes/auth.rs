// SPDX-License-Identifier: MIT

//! Authentication routes: registration, login, OTP step-up, email
//! verification, and password reset.
//!
//! Every failure resolves to the uniform JSON error body from
//! `crate::error`; verification codes and tokens are delivered through the
//! outbox, never in a response.

use axum::{
    extract::State,
    http::HeaderMap,
    routing::post,
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::middleware::auth::SESSION_COOKIE;
use crate::models::UserIdentity;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/otp/send", post(send_otp))
        .route("/auth/otp/verify", post(verify_otp))
        .route("/auth/verify-email", post(verify_email))
        .route("/auth/resend-verification", post(resend_verification))
        .route("/auth/password-reset/request", post(request_password_reset))
        .route("/auth/password-reset/confirm", post(confirm_password_reset))
        .route("/auth/me", post(whoami))
}

/// Simple acknowledgement body.
#[derive(Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

fn ok(message: &str) -> Json<MessageResponse> {
    Json(MessageResponse {
        success: true,
        message: message.to_string(),
    })
}

// ─── Registration ────────────────────────────────────────────

#[derive(Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "A valid email address is required"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    pub display_name: String,
    pub role: String,
}

#[derive(Serialize)]
pub struct RegisterResponse {
    pub success: bool,
    pub message: String,
    pub user_id: String,
    pub verification_pending: bool,
}

async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>> {
    // Reject malformed input before the provider sees anything.
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let result = state
        .auth
        .register(
            &payload.email,
            &payload.password,
            &payload.display_name,
            &payload.role,
        )
        .await?;

    Ok(Json(RegisterResponse {
        success: true,
        message: result.message,
        user_id: result.user_id.to_string(),
        verification_pending: result.verification_pending,
    }))
}

// ─── Login / Logout ──────────────────────────────────────────

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub token: String,
    pub expires_at: String,
    pub user: UserIdentity,
}

async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>)> {
    let result = state.auth.login(&payload.email, &payload.password).await?;

    let cookie = Cookie::build((SESSION_COOKIE, result.token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();

    Ok((
        jar.add(cookie),
        Json(LoginResponse {
            success: true,
            token: result.token,
            expires_at: result.expires_at.to_rfc3339(),
            user: result.identity,
        }),
    ))
}

/// Sign out. Idempotent: succeeds silently when no session is present.
async fn logout(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
) -> Result<(CookieJar, Json<MessageResponse>)> {
    let token = jar
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .or_else(|| {
            headers
                .get(axum::http::header::AUTHORIZATION)
                .and_then(|h| h.to_str().ok())
                .and_then(|h| h.strip_prefix("Bearer "))
                .map(|t| t.to_string())
        });

    if let Some(token) = token {
        state.auth.sign_out(&token).await?;
    }

    Ok((
        jar.remove(Cookie::from(SESSION_COOKIE)),
        ok("Signed out successfully"),
    ))
}

/// Resolve the current session, if any. Returns the merged identity.
async fn whoami(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
) -> Result<Json<Option<UserIdentity>>> {
    let token = jar
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .or_else(|| {
            headers
                .get(axum::http::header::AUTHORIZATION)
                .and_then(|h| h.to_str().ok())
                .and_then(|h| h.strip_prefix("Bearer "))
                .map(|t| t.to_string())
        });

    match token {
        Some(token) => Ok(Json(state.auth.current_user(&token).await)),
        None => Ok(Json(None)),
    }
}

// ─── OTP Step-up ─────────────────────────────────────────────

#[derive(Deserialize)]
pub struct SendOtpRequest {
    pub email: String,
}

async fn send_otp(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SendOtpRequest>,
) -> Result<Json<MessageResponse>> {
    let code = state.otp.send_verification_otp(&payload.email)?;
    state.outbox.send(
        &payload.email,
        "Your verification code",
        format!("Your verification code is {}. It expires in 10 minutes.", code),
    );
    Ok(ok("A verification code has been sent to your email."))
}

#[derive(Deserialize)]
pub struct VerifyOtpRequest {
    pub email: String,
    pub code: String,
}

async fn verify_otp(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<VerifyOtpRequest>,
) -> Result<Json<MessageResponse>> {
    state.otp.verify_email_otp(&payload.email, &payload.code)?;
    Ok(ok("Code verified successfully"))
}

// ─── Email Verification ──────────────────────────────────────

#[derive(Deserialize)]
pub struct VerifyEmailRequest {
    pub email: String,
    pub token: String,
}

async fn verify_email(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<VerifyEmailRequest>,
) -> Result<Json<MessageResponse>> {
    state
        .auth
        .verify_email(&payload.email, &payload.token)
        .await?;
    Ok(ok("Email verified successfully. You can now log in."))
}

#[derive(Deserialize)]
pub struct ResendVerificationRequest {
    pub email: String,
}

async fn resend_verification(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ResendVerificationRequest>,
) -> Result<Json<MessageResponse>> {
    state.auth.resend_verification(&payload.email).await?;
    Ok(ok("Verification email has been sent. Please check your inbox."))
}

// ─── Password Reset ──────────────────────────────────────────

#[derive(Deserialize)]
pub struct PasswordResetRequest {
    pub email: String,
}

async fn request_password_reset(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<PasswordResetRequest>,
) -> Result<Json<MessageResponse>> {
    state.auth.send_password_reset_email(&payload.email).await?;
    Ok(ok(
        "If the address is registered, password reset instructions have been sent.",
    ))
}

#[derive(Deserialize, Validate)]
pub struct PasswordResetConfirm {
    pub email: String,
    pub token: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub new_password: String,
}

async fn confirm_password_reset(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<PasswordResetConfirm>,
) -> Result<Json<MessageResponse>> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;
    state
        .auth
        .reset_password(&payload.email, &payload.token, &payload.new_password)
        .await?;
    Ok(ok("Password reset successful"))
}
