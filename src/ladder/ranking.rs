use crate::database::models::LadderPosition;

/// Applies a challenge outcome to an in-memory rank table. Returns true when
/// any rank moved.
///
/// Only a win by the lower-ranked challenger reshuffles: everyone from the
/// challengee's rank down to just above the challenger slides one place down,
/// and the challenger takes the challengee's old rank. The table stays a
/// contiguous permutation of 1..N.
pub fn apply_challenge_result(
    positions: &mut [LadderPosition],
    challenger_id: i64,
    challengee_id: i64,
    winner_id: i64,
) -> bool {
    if winner_id != challenger_id {
        return false;
    }

    let Some(challenger_rank) = rank_of(positions, challenger_id) else {
        return false;
    };
    let Some(challengee_rank) = rank_of(positions, challengee_id) else {
        return false;
    };
    if challenger_rank <= challengee_rank {
        return false;
    }

    for position in positions.iter_mut() {
        if position.participant_id == challenger_id {
            position.rank = challengee_rank;
        } else if position.rank >= challengee_rank && position.rank < challenger_rank {
            position.rank += 1;
        }
    }
    true
}

fn rank_of(positions: &[LadderPosition], participant_id: i64) -> Option<i32> {
    positions
        .iter()
        .find(|p| p.participant_id == participant_id)
        .map(|p| p.rank)
}

/// Ranks must always be exactly 1..N with no duplicates or gaps.
pub fn is_contiguous(positions: &[LadderPosition]) -> bool {
    let mut ranks: Vec<i32> = positions.iter().map(|p| p.rank).collect();
    ranks.sort_unstable();
    ranks
        .iter()
        .enumerate()
        .all(|(idx, rank)| *rank == idx as i32 + 1)
}
