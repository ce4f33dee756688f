//! Application workflow integration tests.

mod common;

use axum::http::header::AUTHORIZATION;
use axum::http::StatusCode;
use chrono::{Duration, Utc};
use common::TestHarness;
use rendezvous_core::UserId;
use serde_json::json;

/// Owner with an account and one event; returns (owner, event id).
async fn hosted_event(harness: &TestHarness, max_guests: u32) -> (UserId, String) {
    let owner = harness.test_user_id;
    harness.create_account(&owner).await;
    let event_id = harness
        .create_event(&owner, max_guests, Duration::days(1))
        .await;
    (owner, event_id)
}

#[tokio::test]
async fn cannot_apply_to_own_event() {
    let harness = TestHarness::new();
    let (owner, event_id) = hosted_event(&harness, 2).await;

    let response = harness
        .server
        .post(&format!("/v1/events/{event_id}/applications"))
        .add_header(AUTHORIZATION, harness.auth_for(&owner))
        .json(&json!({}))
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn second_application_conflicts() {
    let harness = TestHarness::new();
    let (_, event_id) = hosted_event(&harness, 2).await;
    let guest = UserId::generate();
    harness.apply(&guest, &event_id).await;

    let response = harness
        .server
        .post(&format!("/v1/events/{event_id}/applications"))
        .add_header(AUTHORIZATION, harness.auth_for(&guest))
        .json(&json!({}))
        .await;

    response.assert_status(StatusCode::CONFLICT);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "conflict");
}

#[tokio::test]
async fn full_event_turns_applicants_away() {
    let harness = TestHarness::new();
    let (owner, event_id) = hosted_event(&harness, 1).await;

    let first = harness.apply(&UserId::generate(), &event_id).await;
    harness.approve(&owner, &first).await;

    let response = harness
        .server
        .post(&format!("/v1/events/{event_id}/applications"))
        .add_header(AUTHORIZATION, harness.auth_for(&UserId::generate()))
        .json(&json!({}))
        .await;

    response.assert_status(StatusCode::CONFLICT);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "event_full");
    assert_eq!(body["error"]["details"]["max_guests"], 1);
}

#[tokio::test]
async fn age_limits_need_a_date_of_birth() {
    let harness = TestHarness::new();
    let owner = harness.test_user_id;
    harness.create_account(&owner).await;

    let response = harness
        .server
        .post("/v1/events")
        .add_header(AUTHORIZATION, harness.auth_for(&owner))
        .json(&json!({
            "title": "Wine tasting",
            "start_time": Utc::now() + Duration::days(3),
            "max_guests": 2,
            "min_age": 21
        }))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let event_id = body["id"].as_str().unwrap().to_string();

    let guest = UserId::generate();
    let apply = || {
        harness
            .server
            .post(&format!("/v1/events/{event_id}/applications"))
            .add_header(AUTHORIZATION, harness.auth_for(&guest))
            .json(&json!({}))
    };

    let response = apply().await;
    response.assert_status(StatusCode::FORBIDDEN);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "date_of_birth_required");

    let too_young = (Utc::now() - Duration::days(365 * 18)).date_naive();
    harness
        .server
        .put("/v1/profiles/me")
        .add_header(AUTHORIZATION, harness.auth_for(&guest))
        .json(&json!({ "display_name": "Sam", "date_of_birth": too_young }))
        .await
        .assert_status_ok();

    let response = apply().await;
    response.assert_status(StatusCode::FORBIDDEN);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "age_restricted");
    assert_eq!(body["error"]["details"]["min_age"], 21);

    let old_enough = (Utc::now() - Duration::days(365 * 30)).date_naive();
    harness
        .server
        .put("/v1/profiles/me")
        .add_header(AUTHORIZATION, harness.auth_for(&guest))
        .json(&json!({ "display_name": "Sam", "date_of_birth": old_enough }))
        .await
        .assert_status_ok();

    apply().await.assert_status_ok();
}

#[tokio::test]
async fn only_owner_responds_and_only_once() {
    let harness = TestHarness::new();
    let (owner, event_id) = hosted_event(&harness, 2).await;
    let application_id = harness.apply(&UserId::generate(), &event_id).await;

    harness
        .server
        .post(&format!("/v1/applications/{application_id}/respond"))
        .add_header(AUTHORIZATION, harness.auth_for(&UserId::generate()))
        .json(&json!({ "status": "approved" }))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    harness
        .server
        .post(&format!("/v1/applications/{application_id}/respond"))
        .add_header(AUTHORIZATION, harness.auth_for(&owner))
        .json(&json!({ "status": "rejected", "owner_response": "Sorry" }))
        .await
        .assert_status_ok();

    let response = harness
        .server
        .post(&format!("/v1/applications/{application_id}/respond"))
        .add_header(AUTHORIZATION, harness.auth_for(&owner))
        .json(&json!({ "status": "approved" }))
        .await;
    response.assert_status(StatusCode::CONFLICT);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "invalid_state");

    // Rejection spends nothing.
    let balance = harness.balance(&owner).await;
    assert_eq!(balance["held_credits"], 2);
    assert_eq!(balance["total_used"], 0);
}

#[tokio::test]
async fn applicant_can_cancel_pending_application() {
    let harness = TestHarness::new();
    let (owner, event_id) = hosted_event(&harness, 2).await;
    let guest = UserId::generate();
    let application_id = harness.apply(&guest, &event_id).await;

    harness
        .server
        .post(&format!("/v1/applications/{application_id}/cancel"))
        .add_header(AUTHORIZATION, harness.auth_for(&owner))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    harness
        .server
        .post(&format!("/v1/applications/{application_id}/cancel"))
        .add_header(AUTHORIZATION, harness.auth_for(&guest))
        .await
        .assert_status_ok();

    let response = harness
        .server
        .get("/v1/applications/mine")
        .add_header(AUTHORIZATION, harness.auth_for(&guest))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["applications"][0]["status"], "cancelled");
}

#[tokio::test]
async fn deleting_event_cancels_pending_applications() {
    let harness = TestHarness::new();
    let (owner, event_id) = hosted_event(&harness, 2).await;
    harness.apply(&UserId::generate(), &event_id).await;

    let response = harness
        .server
        .delete(&format!("/v1/events/{event_id}"))
        .add_header(AUTHORIZATION, harness.auth_for(&owner))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["applications_cancelled"], 1);

    let response = harness
        .server
        .get(&format!("/v1/events/{event_id}/applications"))
        .add_header(AUTHORIZATION, harness.auth_for(&owner))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["applications"][0]["status"], "cancelled");
}

#[tokio::test]
async fn outsiders_cannot_see_applications_or_chat() {
    let harness = TestHarness::new();
    let (_, event_id) = hosted_event(&harness, 2).await;
    let outsider = UserId::generate();

    harness
        .server
        .get(&format!("/v1/events/{event_id}/applications"))
        .add_header(AUTHORIZATION, harness.auth_for(&outsider))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    harness
        .server
        .get(&format!("/v1/events/{event_id}/participants"))
        .add_header(AUTHORIZATION, harness.auth_for(&outsider))
        .await
        .assert_status(StatusCode::FORBIDDEN);
}
