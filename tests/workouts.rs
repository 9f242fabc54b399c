mod common;

use actix_web::http::{Method, StatusCode};
use actix_web::test;
use serde_json::{json, Value};

use common::{request, send};
use octofit_backend::models::Difficulty;
use octofit_backend::serializers::WorkoutRepr;

fn plan() -> Value {
    json!({
        "title": "Morning strength",
        "description": "Full body circuit",
        "duration_minutes": 40,
        "difficulty": "medium",
        "exercises": ["push-up", {"name": "squat", "reps": 15}],
        "scheduled_date": "2025-03-01",
    })
}

#[actix_web::test]
async fn create_defaults_to_incomplete() {
    let store = common::store();
    let (alice, token) = common::user(&store, "alice", false).await;
    let app = test::init_service(common::app(store.clone())).await;

    let reply = send(&app, request(Method::POST, "/api/workouts/", Some(&token), Some(plan())).to_request()).await;
    assert_eq!(reply.status, StatusCode::CREATED);
    let workout: WorkoutRepr = reply.json();
    assert_eq!(workout.user.id, alice.id);
    assert_eq!(workout.difficulty, Difficulty::Medium);
    assert!(!workout.completed);
    assert_eq!(workout.exercises[0], json!("push-up"));
    assert_eq!(workout.exercises[1]["reps"], 15);
}

#[actix_web::test]
async fn mark_completed_is_idempotent() {
    let store = common::store();
    let (_, token) = common::user(&store, "alice", false).await;
    let app = test::init_service(common::app(store.clone())).await;

    let reply = send(&app, request(Method::POST, "/api/workouts/", Some(&token), Some(plan())).to_request()).await;
    let workout: WorkoutRepr = reply.json();
    let action = format!("/api/workouts/{}/mark_completed/", workout.id);

    for _ in 0..2 {
        let reply = send(&app, request(Method::POST, &action, Some(&token), None).to_request()).await;
        assert_eq!(reply.status, StatusCode::OK);
        let done: WorkoutRepr = reply.json();
        assert!(done.completed);
        assert_eq!(done.title, "Morning strength");
    }
}

#[actix_web::test]
async fn workouts_are_private_to_their_owner() {
    let store = common::store();
    let (_, alice_token) = common::user(&store, "alice", false).await;
    let (_, bob_token) = common::user(&store, "bob", false).await;
    let (_, staff_token) = common::user(&store, "coach", true).await;
    let app = test::init_service(common::app(store.clone())).await;

    let reply = send(&app, request(Method::POST, "/api/workouts/", Some(&bob_token), Some(plan())).to_request()).await;
    let workout: WorkoutRepr = reply.json();

    let reply = send(&app, request(Method::GET, "/api/workouts/", Some(&alice_token), None).to_request()).await;
    assert_eq!(reply.body, json!([]));

    let action = format!("/api/workouts/{}/mark_completed/", workout.id);
    let reply = send(&app, request(Method::POST, &action, Some(&alice_token), None).to_request()).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);

    let reply = send(&app, request(Method::GET, "/api/workouts/", Some(&staff_token), None).to_request()).await;
    let all: Vec<WorkoutRepr> = reply.json();
    assert_eq!(all.len(), 1);

    let reply = send(&app, request(Method::GET, "/api/workouts/", None, None).to_request()).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert!(reply.body["error"].is_string());
}

#[actix_web::test]
async fn invalid_workouts_are_rejected() {
    let store = common::store();
    let (_, token) = common::user(&store, "alice", false).await;
    let app = test::init_service(common::app(store.clone())).await;

    let mut bad = plan();
    bad["difficulty"] = json!("brutal");
    let reply = send(&app, request(Method::POST, "/api/workouts/", Some(&token), Some(bad)).to_request()).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["fields"]["difficulty"][0], "\"brutal\" is not a valid choice.");

    let mut bad = plan();
    bad["duration_minutes"] = json!("forty");
    let reply = send(&app, request(Method::POST, "/api/workouts/", Some(&token), Some(bad)).to_request()).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert!(reply.body["fields"]["non_field_errors"].is_array());

    let mut bad = plan();
    bad["exercises"] = json!([1, 2, 3]);
    let reply = send(&app, request(Method::POST, "/api/workouts/", Some(&token), Some(bad)).to_request()).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert!(reply.body["fields"]["exercises"].is_array());
}

#[actix_web::test]
async fn patch_then_delete() {
    let store = common::store();
    let (_, token) = common::user(&store, "alice", false).await;
    let app = test::init_service(common::app(store.clone())).await;

    let reply = send(&app, request(Method::POST, "/api/workouts/", Some(&token), Some(plan())).to_request()).await;
    let workout: WorkoutRepr = reply.json();
    let detail = format!("/api/workouts/{}/", workout.id);

    let reply = send(&app, request(Method::PATCH, &detail, Some(&token), Some(json!({"scheduled_date": null, "difficulty": "hard"}))).to_request()).await;
    assert_eq!(reply.status, StatusCode::OK);
    let patched: WorkoutRepr = reply.json();
    assert_eq!(patched.scheduled_date, None);
    assert_eq!(patched.difficulty, Difficulty::Hard);
    assert_eq!(patched.exercises.len(), 2);

    let reply = send(&app, request(Method::DELETE, &detail, Some(&token), None).to_request()).await;
    assert_eq!(reply.status, StatusCode::NO_CONTENT);
    let reply = send(&app, request(Method::GET, &detail, Some(&token), None).to_request()).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}
