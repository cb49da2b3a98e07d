// SPDX-License-Identifier: MIT

//! Role-gated dashboard routes.
//!
//! `/student/*` requires the student role and `/organizer/*` the organizer
//! role; the guard redirects rather than erroring, so these handlers only
//! ever see a correctly-roled [`AuthUser`]. Organizer mutations additionally
//! check that the caller manages the club or event in question.

use axum::{
    extract::{Path, State},
    routing::{get, post, put},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::db::BudgetItemInput;
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{Club, ClubBudget, Event};
use crate::AppState;

pub fn student_routes() -> Router<Arc<AppState>> {
    Router::new().route("/student/dashboard", get(student_dashboard))
}

pub fn organizer_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/organizer/dashboard", get(organizer_dashboard))
        .route("/organizer/clubs/{id}/budget", post(update_club_budget))
        .route(
            "/organizer/clubs/{id}/budget/{item_id}/approve",
            post(approve_budget_item),
        )
        .route("/organizer/events", post(create_event))
        .route("/organizer/events/{id}", put(update_event))
}

// ─── Student ─────────────────────────────────────────────────

#[derive(Serialize)]
pub struct StudentDashboard {
    pub display_name: String,
    pub clubs: Vec<Club>,
    pub registered_events: Vec<Event>,
    pub upcoming_events: Vec<Event>,
}

async fn student_dashboard(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Json<StudentDashboard> {
    let registered = state.db.events_by_student(user.id);
    let upcoming = state
        .db
        .list_events()
        .into_iter()
        .filter(|e| !e.registered_user_ids.contains(&user.id))
        .collect();

    Json(StudentDashboard {
        display_name: user.display_name,
        clubs: state.db.clubs_by_member(user.id),
        registered_events: registered,
        upcoming_events: upcoming,
    })
}

// ─── Organizer ───────────────────────────────────────────────

#[derive(Serialize)]
pub struct OrganizerDashboard {
    pub display_name: String,
    pub managed_clubs: Vec<Club>,
    pub managed_events: Vec<Event>,
}

async fn organizer_dashboard(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Json<OrganizerDashboard> {
    Json(OrganizerDashboard {
        display_name: user.display_name,
        managed_clubs: state.db.clubs_by_organizer(user.id),
        managed_events: state.db.events_by_organizer(user.id),
    })
}

/// The caller must be listed as an organizer of the club.
fn ensure_manages_club(state: &AppState, user: &AuthUser, club_id: u64) -> Result<()> {
    let club = state
        .db
        .get_club(club_id)
        .ok_or_else(|| AppError::NotFound(format!("Club {} not found", club_id)))?;
    if !club.organizer_ids.contains(&user.id) {
        return Err(AppError::Validation(
            "You do not manage this club".to_string(),
        ));
    }
    Ok(())
}

async fn update_club_budget(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<u64>,
    Json(input): Json<BudgetItemInput>,
) -> Result<Json<ClubBudget>> {
    ensure_manages_club(&state, &user, id)?;
    let budget = state.db.update_club_budget(id, input)?;
    tracing::info!(user_id = %user.id, club_id = id, "Updated club budget");
    Ok(Json(budget))
}

async fn approve_budget_item(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path((id, item_id)): Path<(u64, u64)>,
) -> Result<Json<ClubBudget>> {
    ensure_manages_club(&state, &user, id)?;
    let budget = state.db.approve_budget_item(id, item_id)?;
    tracing::info!(user_id = %user.id, club_id = id, item_id, "Approved budget item");
    Ok(Json(budget))
}

#[derive(Deserialize)]
pub struct CreateEventRequest {
    pub title: String,
    pub description: String,
    pub date: String,
    pub time: String,
    pub location: String,
    pub club_id: u64,
}

async fn create_event(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CreateEventRequest>,
) -> Result<Json<Event>> {
    if payload.title.is_empty() || payload.date.is_empty() {
        return Err(AppError::Validation(
            "Event title and date are required".to_string(),
        ));
    }
    ensure_manages_club(&state, &user, payload.club_id)?;

    let event = state.db.create_event(
        payload.title,
        payload.description,
        payload.date,
        payload.time,
        payload.location,
        payload.club_id,
        user.id,
    )?;
    tracing::info!(user_id = %user.id, event_id = event.id, "Created event");
    Ok(Json(event))
}

#[derive(Deserialize)]
pub struct UpdateEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub location: Option<String>,
}

async fn update_event(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<u64>,
    Json(payload): Json<UpdateEventRequest>,
) -> Result<Json<Event>> {
    let existing = state
        .db
        .get_event(id)
        .ok_or_else(|| AppError::NotFound(format!("Event {} not found", id)))?;
    if !existing.organizer_ids.contains(&user.id) {
        return Err(AppError::Validation(
            "You do not manage this event".to_string(),
        ));
    }

    let event = state.db.update_event(
        id,
        payload.title,
        payload.description,
        payload.date,
        payload.time,
        payload.location,
    )?;
    tracing::info!(user_id = %user.id, event_id = id, "Updated event");
    Ok(Json(event))
}
