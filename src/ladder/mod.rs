pub mod ranking;

use anyhow::{Context, Result};
use log::info;

use crate::database::{self, DbConn};

/// Applies the rank-adjustment rule after a completed ladder match. A win by
/// the higher-ranked incumbent changes nothing. Safe to call once per
/// completion only; the caller gates this behind the conditional finalize.
pub fn apply_match_result(
    conn: &mut DbConn,
    ladder_id: i64,
    challenger_id: i64,
    challengee_id: i64,
    winner_id: i64,
) -> Result<()> {
    let mut positions = database::ladders::list_positions(conn, ladder_id)?;

    let changed = ranking::apply_challenge_result(
        &mut positions,
        challenger_id,
        challengee_id,
        winner_id,
    );
    if !changed {
        return Ok(());
    }

    database::ladders::store_positions(conn, ladder_id, &positions)
        .context("Failed to persist ladder rank update")?;

    info!(
        "Ladder {}: challenger {} took over rank from {}",
        ladder_id, challenger_id, challengee_id
    );
    Ok(())
}
