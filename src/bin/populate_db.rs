//! Seeds the database with superhero-themed sample data and rebuilds the
//! leaderboard.
//!
//! `populate_db` clears every table first. `populate_db --refresh-leaderboard`
//! only recomputes leaderboard totals and ranks from the stored activities.

use chrono::{Duration, Utc};
use dotenv::dotenv;
use env_logger::Env;
use log::{info, warn};
use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::json;
use sqlx::types::Json;
use std::env;
use std::error::Error;

use octofit_backend::config::Config;
use octofit_backend::db::{self, SharedStore};
use octofit_backend::models::{Activity, ActivityType, Difficulty, LeaderboardEntry, Team, User, Workout};

const HEROES: [(&str, &str, &str, &str); 6] = [
    ("ironman", "tony@marvel.com", "Tony", "Stark"),
    ("captain", "steve@marvel.com", "Steve", "Rogers"),
    ("widow", "natasha@marvel.com", "Natasha", "Romanoff"),
    ("batman", "bruce@dc.com", "Bruce", "Wayne"),
    ("superman", "clark@dc.com", "Clark", "Kent"),
    ("wonderwoman", "diana@dc.com", "Diana", "Prince"),
];

async fn hashed(password: &str) -> Result<String, Box<dyn Error>> {
    let password = password.to_string();
    Ok(tokio::task::spawn_blocking(move || bcrypt::hash(password, 10)).await??)
}

fn calories_per_minute(activity_type: ActivityType) -> f64 {
    match activity_type {
        ActivityType::Walking | ActivityType::Yoga => 4.0,
        ActivityType::Cycling | ActivityType::Swimming | ActivityType::Strength => 8.0,
        ActivityType::Running => 10.0,
        ActivityType::Other => 5.0,
    }
}

async fn seed(store: &SharedStore, password: &str) -> Result<(), Box<dyn Error>> {
    store.clear().await?;
    info!("Cleared existing data");

    let password_hash = hashed(password).await?;

    let mut admin = User::new("admin", "admin@octofit.app");
    admin.is_staff = true;
    admin.password_hash = Some(password_hash.clone());
    store.insert_user(&admin).await?;

    let mut heroes = Vec::new();
    for (username, email, first_name, last_name) in HEROES {
        let mut user = User::new(username, email);
        user.first_name = first_name.to_string();
        user.last_name = last_name.to_string();
        user.bio = Some(format!("{} {} keeps fit for the next mission.", first_name, last_name));
        user.password_hash = Some(password_hash.clone());
        store.insert_user(&user).await?;
        heroes.push(user);
    }

    let (marvel_members, dc_members) = heroes.split_at(3);

    let mut marvel = Team::new("Marvel", marvel_members[0].id);
    marvel.description = Some("Earth's mightiest heroes".to_string());
    store.insert_team(&marvel).await?;
    for user in marvel_members {
        store.add_member(marvel.id, user.id).await?;
    }

    let mut dc = Team::new("DC", dc_members[0].id);
    dc.description = Some("Justice League".to_string());
    store.insert_team(&dc).await?;
    for user in dc_members {
        store.add_member(dc.id, user.id).await?;
    }

    // Entries start at zero and are filled in by the recompute in main.
    for (team, members) in [(&marvel, marvel_members), (&dc, dc_members)] {
        for user in members {
            store.insert_leaderboard_entry(&LeaderboardEntry::new(user.id, Some(team.id))).await?;
        }
    }

    let mut rng = rand::thread_rng();
    let today = Utc::now().date_naive();
    let mut logged = 0;
    for user in &heroes {
        for _ in 0..rng.gen_range(3..=8) {
            let activity_type = *ActivityType::ALL.choose(&mut rng).unwrap_or(&ActivityType::Other);
            let duration = rng.gen_range(15..=90);
            let calories = (duration as f64 * calories_per_minute(activity_type)).round();
            let date = today - Duration::days(rng.gen_range(0..30));

            let mut activity = Activity::new(user.id, activity_type, duration, calories, date);
            activity.distance_km = match activity_type {
                ActivityType::Running | ActivityType::Walking => {
                    Some((duration as f64 / rng.gen_range(6.0..12.0) * 10.0).round() / 10.0)
                }
                ActivityType::Cycling => Some((duration as f64 / 2.5).round()),
                ActivityType::Swimming => Some((duration as f64 / 30.0 * 10.0).round() / 10.0),
                _ => None,
            };
            store.insert_activity(&activity).await?;
            logged += 1;
        }
    }
    info!("Logged {} activities", logged);

    let plans = [
        ("Super Strength", "Strength circuit for heroes", 45, Difficulty::Hard,
            json!(["deadlift", "bench press", {"name": "pull-up", "sets": 4, "reps": 10}])),
        ("Flight Training", "Aerobic intervals for flyers", 30, Difficulty::Medium,
            json!(["sprint intervals", "jump rope", "burpees"])),
        ("Recovery Flow", "Mobility and stretching", 20, Difficulty::Easy,
            json!(["sun salutation", {"name": "pigeon pose", "hold_seconds": 60}])),
    ];
    for user in &heroes {
        let (title, description, duration, difficulty, exercises) =
            plans.choose(&mut rng).cloned().unwrap_or_else(|| plans[0].clone());
        let mut workout = Workout::new(user.id, title, description, duration, difficulty);
        workout.exercises = Json(exercises.as_array().cloned().unwrap_or_default());
        workout.scheduled_date = Some(today + Duration::days(rng.gen_range(1..7)));
        store.insert_workout(&workout).await?;
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = Config::from_env()?;
    let store = db::connect(&config).await?;

    let refresh_only = env::args().skip(1).any(|arg| arg == "--refresh-leaderboard");
    if !refresh_only {
        let password = env::var("SEED_PASSWORD").unwrap_or_else(|_| {
            warn!("SEED_PASSWORD not set, using the default sample password");
            "octofit-heroes".to_string()
        });
        seed(&store, &password).await?;
    }

    let written = store.recompute_leaderboard().await?;
    info!("Leaderboard recomputed for {} users", written);
    Ok(())
}
