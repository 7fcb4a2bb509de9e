use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Start and end of a team session
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SessionWindow {
    pub begin: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub minutes: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{session::SessionService, shared::test_utils::game};
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_window_spans_game_session_minutes() {
        let mut game = game("game-1");
        game.session_minutes = 90.5;
        let start = Utc.with_ymd_and_hms(2026, 5, 1, 9, 0, 0).unwrap();

        let window = SessionService::calculate_session_window(&game, start);
        assert_eq!(window.begin, start);
        assert_eq!(window.end, start + Duration::seconds(90 * 60 + 30));
        assert_eq!(window.minutes, 90.5);
    }
}
