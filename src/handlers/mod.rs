pub mod activity;
pub mod auth;
pub mod leaderboard;
pub mod team;
pub mod user;
pub mod workout;

use actix_web::HttpResponse;
use serde_json::json;

// GET /api/
pub async fn api_root() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "users": "/api/users/",
        "teams": "/api/teams/",
        "activities": "/api/activities/",
        "leaderboard": "/api/leaderboard/",
        "workouts": "/api/workouts/",
    }))
}
