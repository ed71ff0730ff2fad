use anyhow::{Context, Result};
use rusqlite::{params, OptionalExtension};

use super::connection::DbConn;
use super::models::{Ladder, LadderPosition};
use crate::domain::LadderStatus;

const LADDER_COLUMNS: &str = "id, name, creator_id, challenge_window_mins, status, created_at";

/// Creates a ladder with the creator seated at rank 1.
pub fn insert_ladder(
    conn: &mut DbConn,
    name: &str,
    creator_id: i64,
    challenge_window_mins: i64,
) -> Result<Ladder> {
    let sql = format!(
        "INSERT INTO ladders (name, creator_id, challenge_window_mins, status) VALUES (?1, ?2, ?3, ?4) RETURNING {LADDER_COLUMNS}"
    );

    let ladder = conn
        .query_row(
            &sql,
            params![
                name,
                creator_id,
                challenge_window_mins,
                LadderStatus::Active.as_str()
            ],
            parse_ladder_row,
        )
        .context("Failed to insert new ladder")?;

    insert_position(conn, ladder.id, 1, creator_id)?;
    Ok(ladder)
}

pub fn find_by_id(conn: &mut DbConn, id: i64) -> Result<Option<Ladder>> {
    let sql = format!("SELECT {LADDER_COLUMNS} FROM ladders WHERE id = ?1");

    conn.query_row(&sql, params![id], parse_ladder_row)
        .optional()
        .context("Failed to query ladder by id")
}

fn parse_ladder_row(row: &rusqlite::Row) -> rusqlite::Result<Ladder> {
    Ok(Ladder {
        id: row.get(0)?,
        name: row.get(1)?,
        creator_id: row.get(2)?,
        challenge_window_mins: row.get(3)?,
        status: row.get(4)?,
        created_at: row.get(5)?,
    })
}

/// Appends a participant at the given rank. Returns false when they already
/// hold a position (racing joins resolve through the UNIQUE constraint).
pub fn insert_position(
    conn: &mut DbConn,
    ladder_id: i64,
    rank: i32,
    participant_id: i64,
) -> Result<bool> {
    let sql = "INSERT OR IGNORE INTO ladder_positions (ladder_id, rank, participant_id) VALUES (?1, ?2, ?3)";

    let inserted = conn
        .execute(sql, params![ladder_id, rank, participant_id])
        .context("Failed to insert ladder position")?;
    Ok(inserted == 1)
}

/// Positions ordered best rank first.
pub fn list_positions(conn: &mut DbConn, ladder_id: i64) -> Result<Vec<LadderPosition>> {
    let sql =
        "SELECT ladder_id, rank, participant_id FROM ladder_positions WHERE ladder_id = ?1 ORDER BY rank";

    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params![ladder_id], parse_position_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(rows)
}

fn parse_position_row(row: &rusqlite::Row) -> rusqlite::Result<LadderPosition> {
    Ok(LadderPosition {
        ladder_id: row.get(0)?,
        rank: row.get(1)?,
        participant_id: row.get(2)?,
    })
}

pub fn find_position(
    conn: &mut DbConn,
    ladder_id: i64,
    participant_id: i64,
) -> Result<Option<LadderPosition>> {
    let sql = "SELECT ladder_id, rank, participant_id FROM ladder_positions WHERE ladder_id = ?1 AND participant_id = ?2";

    conn.query_row(sql, params![ladder_id, participant_id], parse_position_row)
        .optional()
        .context("Failed to query ladder position")
}

pub fn count_positions(conn: &mut DbConn, ladder_id: i64) -> Result<i32> {
    let sql = "SELECT COUNT(*) FROM ladder_positions WHERE ladder_id = ?1";
    conn.query_row(sql, params![ladder_id], |row| row.get(0))
        .context("Failed to count ladder positions")
}

/// Rewrites the rank column for every listed participant in one transaction,
/// so a failed shift never leaves a half-moved table.
pub fn store_positions(
    conn: &mut DbConn,
    ladder_id: i64,
    positions: &[LadderPosition],
) -> Result<()> {
    let tx = conn
        .transaction()
        .context("Failed to open rank-update transaction")?;

    for position in positions {
        tx.execute(
            "UPDATE ladder_positions SET rank = ?1 WHERE ladder_id = ?2 AND participant_id = ?3",
            params![position.rank, ladder_id, position.participant_id],
        )
        .context("Failed to update ladder rank")?;
    }

    tx.commit().context("Failed to commit rank update")
}

/// Removes a participant and closes the rank gap they leave behind.
pub fn remove_position(conn: &mut DbConn, ladder_id: i64, participant_id: i64) -> Result<bool> {
    let Some(leaving) = find_position(conn, ladder_id, participant_id)? else {
        return Ok(false);
    };

    let tx = conn
        .transaction()
        .context("Failed to open leave transaction")?;

    tx.execute(
        "DELETE FROM ladder_positions WHERE ladder_id = ?1 AND participant_id = ?2",
        params![ladder_id, participant_id],
    )
    .context("Failed to delete ladder position")?;

    tx.execute(
        "UPDATE ladder_positions SET rank = rank - 1 WHERE ladder_id = ?1 AND rank > ?2",
        params![ladder_id, leaving.rank],
    )
    .context("Failed to close ladder rank gap")?;

    tx.commit().context("Failed to commit ladder leave")?;
    Ok(true)
}
