// SPDX-License-Identifier: MIT

//! Club membership, event registration, and organizer mutation tests over
//! the HTTP surface.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use tower::ServiceExt;

mod common;

#[tokio::test]
async fn test_club_listing_requires_auth() {
    let (app, _state) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/clubs")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_join_and_leave_club() {
    let (app, state) = common::create_test_app();
    let (token, _) =
        common::signed_in_user(&app, &state, "member@iiita.ac.in", "Member", "student").await;

    let response =
        common::post_json_authed(&app, "/api/clubs/1/join", &token, serde_json::json!({})).await;
    assert_eq!(response.status(), StatusCode::OK);

    // Joining twice is rejected
    let response =
        common::post_json_authed(&app, "/api/clubs/1/join", &token, serde_json::json!({})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Membership shows up in the member's club list
    let response = common::get_authed(&app, "/api/clubs/mine", &token).await;
    let body = common::body_json(response).await;
    assert_eq!(body[0]["id"], 1);

    let response =
        common::post_json_authed(&app, "/api/clubs/1/leave", &token, serde_json::json!({})).await;
    assert_eq!(response.status(), StatusCode::OK);

    // Leaving a club the user is not in is rejected
    let response =
        common::post_json_authed(&app, "/api/clubs/1/leave", &token, serde_json::json!({})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_club_is_404() {
    let (app, state) = common::create_test_app();
    let (token, _) =
        common::signed_in_user(&app, &state, "lost@iiita.ac.in", "Lost", "student").await;

    let response = common::get_authed(&app, "/api/clubs/999", &token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response =
        common::post_json_authed(&app, "/api/clubs/999/join", &token, serde_json::json!({})).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_event_registration_round_trip() {
    let (app, state) = common::create_test_app();
    let (token, _) =
        common::signed_in_user(&app, &state, "attendee@iiita.ac.in", "Attendee", "student").await;

    let response = common::post_json_authed(
        &app,
        "/api/events/2/register",
        &token,
        serde_json::json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    // Double registration is rejected
    let response = common::post_json_authed(
        &app,
        "/api/events/2/register",
        &token,
        serde_json::json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = common::get_authed(&app, "/api/events/mine", &token).await;
    let body = common::body_json(response).await;
    assert_eq!(body[0]["id"], 2);
    assert_eq!(body[0]["club_name"], "Coding Club");

    let response = common::post_json_authed(
        &app,
        "/api/events/2/unregister",
        &token,
        serde_json::json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = common::get_authed(&app, "/api/events/mine", &token).await;
    let body = common::body_json(response).await;
    assert_eq!(body.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_events_by_club() {
    let (app, state) = common::create_test_app();
    let (token, _) =
        common::signed_in_user(&app, &state, "curious@iiita.ac.in", "Curious", "student").await;

    let response = common::get_authed(&app, "/api/clubs/2/events", &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = common::body_json(response).await;
    assert!(body
        .as_array()
        .unwrap()
        .iter()
        .all(|e| e["club_id"] == 2));
}

#[tokio::test]
async fn test_budget_update_requires_managing_the_club() {
    let (app, state) = common::create_test_app();
    let (token, user_id) =
        common::signed_in_user(&app, &state, "treasurer@iiita.ac.in", "Treasurer", "organizer")
            .await;
    state.db.add_organizer(1, user_id).unwrap();

    // Managed club: new items start pending
    let response = common::post_json_authed(
        &app,
        "/organizer/clubs/1/budget",
        &token,
        serde_json::json!({ "id": null, "name": "Lens Rental", "cost": 1200 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = common::body_json(response).await;
    let item = body["items"].as_array().unwrap().last().unwrap().clone();
    assert_eq!(item["name"], "Lens Rental");
    assert_eq!(item["status"], "pending");

    // Unmanaged club is rejected
    let response = common::post_json_authed(
        &app,
        "/organizer/clubs/2/budget",
        &token,
        serde_json::json!({ "id": null, "name": "Snacks", "cost": 300 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_budget_approval_moves_cost_to_spent() {
    let (app, state) = common::create_test_app();
    let (token, user_id) =
        common::signed_in_user(&app, &state, "approver@iiita.ac.in", "Approver", "organizer")
            .await;
    state.db.add_organizer(1, user_id).unwrap();

    let spent_before = state.db.get_club(1).unwrap().budget.spent;

    let response = common::post_json_authed(
        &app,
        "/organizer/clubs/1/budget/3/approve",
        &token,
        serde_json::json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = common::body_json(response).await;
    assert_eq!(body["spent"], spent_before + 3500);

    // Approving twice is rejected
    let response = common::post_json_authed(
        &app,
        "/organizer/clubs/1/budget/3/approve",
        &token,
        serde_json::json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_event_create_and_update() {
    let (app, state) = common::create_test_app();
    let (token, user_id) =
        common::signed_in_user(&app, &state, "planner@iiita.ac.in", "Planner", "organizer").await;
    state.db.add_organizer(2, user_id).unwrap();

    let response = common::post_json_authed(
        &app,
        "/organizer/events",
        &token,
        serde_json::json!({
            "title": "Rust Workshop",
            "description": "Hands-on systems programming session.",
            "date": "2026-09-20",
            "time": "2:00 PM - 5:00 PM",
            "location": "Lab 3",
            "club_id": 2,
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = common::body_json(response).await;
    let event_id = body["id"].as_u64().unwrap();
    assert_eq!(body["club_name"], "Coding Club");

    // Update through PUT
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri(format!("/organizer/events/{}", event_id))
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::from(
                    serde_json::json!({ "location": "Auditorium" }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = common::body_json(response).await;
    assert_eq!(body["location"], "Auditorium");
    assert_eq!(body["title"], "Rust Workshop");

    // A different organizer cannot edit it
    let (other_token, _) =
        common::signed_in_user(&app, &state, "other@iiita.ac.in", "Other", "organizer").await;
    let response = app
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri(format!("/organizer/events/{}", event_id))
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::AUTHORIZATION, format!("Bearer {}", other_token))
                .body(Body::from(
                    serde_json::json!({ "title": "Hijacked" }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_event_creation_for_unmanaged_club_is_rejected() {
    let (app, state) = common::create_test_app();
    let (token, _) =
        common::signed_in_user(&app, &state, "rogue@iiita.ac.in", "Rogue", "organizer").await;

    let response = common::post_json_authed(
        &app,
        "/organizer/events",
        &token,
        serde_json::json!({
            "title": "Unsanctioned Meetup",
            "description": "",
            "date": "2026-09-21",
            "time": "6:00 PM",
            "location": "Cafeteria",
            "club_id": 4,
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
