// SPDX-License-Identifier: MIT

//! Session authentication middleware and the role-based route guard.

use crate::models::Role;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Session cookie name.
pub const SESSION_COOKIE: &str = "campus_token";

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (identity id)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
}

/// Authenticated user extracted from the session token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    /// The raw bearer token, kept for sign-out.
    pub token: String,
}

/// Pull the session token from the cookie first, then the header.
fn extract_token(jar: &CookieJar, headers: &HeaderMap) -> Option<String> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        return Some(cookie.value().to_string());
    }
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())?;
    auth_header
        .strip_prefix("Bearer ")
        .map(|token| token.to_string())
}

/// Resolve a token into an authenticated user: the JWT must decode AND the
/// provider must still hold an unexpired session for it (sign-out and
/// password changes revoke tokens before their JWT expiry).
async fn resolve_user(state: &AppState, token: &str) -> Option<AuthUser> {
    let key = DecodingKey::from_secret(&state.config.jwt_signing_key);
    let validation = Validation::new(Algorithm::HS256);
    decode::<Claims>(token, &key, &validation).ok()?;

    let identity = state.auth.current_user(token).await?;
    Some(AuthUser {
        id: identity.id,
        email: identity.email,
        display_name: identity.display_name,
        role: identity.role,
        token: token.to_string(),
    })
}

/// Middleware that requires a valid session.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = extract_token(&jar, request.headers()).ok_or(StatusCode::UNAUTHORIZED)?;

    let auth_user = resolve_user(&state, &token)
        .await
        .ok_or(StatusCode::UNAUTHORIZED)?;

    request.extensions_mut().insert(auth_user);
    Ok(next.run(request).await)
}

/// Role-gated route guard.
///
/// Unauthenticated requests are redirected to the login route; authenticated
/// requests with the wrong role are redirected home. Neither case produces an
/// error body. The session lookup completes before any decision, so a
/// just-restored session is never bounced by a premature redirect.
pub async fn require_role(
    allowed_role: Role,
    state: Arc<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let user = match extract_token(&jar, request.headers()) {
        Some(token) => resolve_user(&state, &token).await,
        None => None,
    };

    match user {
        None => Redirect::to("/login").into_response(),
        Some(user) if user.role != allowed_role => {
            tracing::debug!(
                user_id = %user.id,
                role = %user.role,
                required = %allowed_role,
                "Role mismatch, redirecting home"
            );
            Redirect::to("/").into_response()
        }
        Some(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
    }
}

/// Create a JWT for a user session.
pub fn create_jwt(
    user_id: Uuid,
    expires_at: DateTime<Utc>,
    signing_key: &[u8],
) -> anyhow::Result<String> {
    use jsonwebtoken::{encode, EncodingKey, Header};

    let claims = Claims {
        sub: user_id.to_string(),
        iat: Utc::now().timestamp() as usize,
        exp: expires_at.timestamp() as usize,
    };

    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(signing_key),
    )?)
}
