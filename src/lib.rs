//! OctoFit Tracker backend: users, teams, activities, workouts and a
//! leaderboard behind a JSON REST API.

pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod serializers;
pub mod utils;
