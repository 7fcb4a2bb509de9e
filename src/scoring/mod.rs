pub mod handlers;
pub mod service;
pub mod types;

pub use handlers::{
    award_manual_bonus, delete_manual_bonus, get_challenge_score, get_team_score,
    list_manual_bonuses, update_challenge_score,
};
pub use service::ScoringService;
