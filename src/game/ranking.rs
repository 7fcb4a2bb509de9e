use std::cmp::Ordering;

use crate::store::models::Player;

/// Leaderboard order: score descending, elapsed time ascending, then correct
/// and partial counts descending.
pub fn ranking_order(a: &Player, b: &Player) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.time_ms.cmp(&b.time_ms))
        .then_with(|| b.correct_count.cmp(&a.correct_count))
        .then_with(|| b.partial_count.cmp(&a.partial_count))
}

/// Sorts players into leaderboard order and numbers them.
///
/// The rank moves up by one each time the team id differs from the previous
/// row, so teammates share a rank while two teams with equal scores still get
/// consecutive ranks. The sort is stable.
pub fn assign_ranks(mut players: Vec<Player>) -> Vec<Player> {
    players.sort_by(ranking_order);

    let mut rank = 0;
    let mut previous_team: Option<String> = None;
    for player in players.iter_mut() {
        if previous_team.as_deref() != Some(player.team_id.as_str()) {
            rank += 1;
            previous_team = Some(player.team_id.clone());
        }
        player.rank = rank;
    }
    players
}
