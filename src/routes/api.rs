// SPDX-License-Identifier: MIT

//! Authenticated API routes: current-user lookup, club membership, and
//! event registration. All handlers run behind `require_auth` and read the
//! resolved [`AuthUser`] from request extensions.

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{Club, Event, Role};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/me", get(me))
        .route("/clubs", get(list_clubs))
        .route("/clubs/mine", get(my_clubs))
        .route("/clubs/{id}", get(get_club))
        .route("/clubs/{id}/events", get(club_events))
        .route("/clubs/{id}/join", post(join_club))
        .route("/clubs/{id}/leave", post(leave_club))
        .route("/events", get(list_events))
        .route("/events/mine", get(my_events))
        .route("/events/{id}", get(get_event))
        .route("/events/{id}/register", post(register_for_event))
        .route("/events/{id}/unregister", post(unregister_from_event))
}

#[derive(Serialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub role: Role,
}

async fn me(Extension(user): Extension<AuthUser>) -> Json<UserResponse> {
    Json(UserResponse {
        id: user.id.to_string(),
        email: user.email,
        display_name: user.display_name,
        role: user.role,
    })
}

// ─── Clubs ───────────────────────────────────────────────────

async fn list_clubs(State(state): State<Arc<AppState>>) -> Json<Vec<Club>> {
    Json(state.db.list_clubs())
}

async fn my_clubs(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Json<Vec<Club>> {
    Json(state.db.clubs_by_member(user.id))
}

async fn get_club(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<Club>> {
    state
        .db
        .get_club(id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Club {} not found", id)))
}

async fn join_club(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<u64>,
) -> Result<Json<Club>> {
    let club = state.db.join_club(id, user.id)?;
    tracing::info!(user_id = %user.id, club_id = id, "Joined club");
    Ok(Json(club))
}

async fn leave_club(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<u64>,
) -> Result<Json<Club>> {
    let club = state.db.leave_club(id, user.id)?;
    tracing::info!(user_id = %user.id, club_id = id, "Left club");
    Ok(Json(club))
}

// ─── Events ──────────────────────────────────────────────────

async fn list_events(State(state): State<Arc<AppState>>) -> Json<Vec<Event>> {
    Json(state.db.list_events())
}

async fn my_events(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Json<Vec<Event>> {
    Json(state.db.events_by_student(user.id))
}

async fn get_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<Event>> {
    state
        .db
        .get_event(id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Event {} not found", id)))
}

async fn club_events(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<Vec<Event>>> {
    if state.db.get_club(id).is_none() {
        return Err(AppError::NotFound(format!("Club {} not found", id)));
    }
    Ok(Json(state.db.events_by_club(id)))
}

async fn register_for_event(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<u64>,
) -> Result<Json<Event>> {
    let event = state.db.register_for_event(id, user.id)?;
    tracing::info!(user_id = %user.id, event_id = id, "Registered for event");
    Ok(Json(event))
}

async fn unregister_from_event(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<u64>,
) -> Result<Json<Event>> {
    let event = state.db.unregister_from_event(id, user.id)?;
    tracing::info!(user_id = %user.id, event_id = id, "Unregistered from event");
    Ok(Json(event))
}
