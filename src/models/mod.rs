pub mod activity;
pub mod leaderboard;
pub mod team;
pub mod user;
pub mod workout;

use std::fmt;

pub use activity::{Activity, ActivityType};
pub use leaderboard::LeaderboardEntry;
pub use team::{Membership, Team};
pub use user::User;
pub use workout::{Difficulty, Workout};

/// Returned when a stored or submitted value is not one of an enumeration's choices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidChoice {
    pub kind: &'static str,
    pub value: String,
}

impl fmt::Display for InvalidChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\" is not a valid {}", self.value, self.kind)
    }
}

impl std::error::Error for InvalidChoice {}
