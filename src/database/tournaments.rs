use anyhow::{Context, Result};
use rusqlite::{params, OptionalExtension};

use super::connection::DbConn;
use super::models::Tournament;
use crate::domain::{TournamentFormat, TournamentStatus, Visibility};

const TOURNAMENT_COLUMNS: &str = "id, name, format, visibility, creator_id, challenge_window_mins, status, winner_id, created_at";

pub fn insert_tournament(
    conn: &mut DbConn,
    name: &str,
    format: TournamentFormat,
    visibility: Visibility,
    creator_id: i64,
    challenge_window_mins: i64,
) -> Result<Tournament> {
    let sql = format!(
        "INSERT INTO tournaments (name, format, visibility, creator_id, challenge_window_mins, status) VALUES (?1, ?2, ?3, ?4, ?5, ?6) RETURNING {TOURNAMENT_COLUMNS}"
    );

    conn.query_row(
        &sql,
        params![
            name,
            format.as_str(),
            visibility.as_str(),
            creator_id,
            challenge_window_mins,
            TournamentStatus::Pending.as_str()
        ],
        parse_tournament_row,
    )
    .context("Failed to insert new tournament")
}

pub fn find_by_id(conn: &mut DbConn, id: i64) -> Result<Option<Tournament>> {
    let sql = format!("SELECT {TOURNAMENT_COLUMNS} FROM tournaments WHERE id = ?1");

    conn.query_row(&sql, params![id], parse_tournament_row)
        .optional()
        .context("Failed to query tournament by id")
}

fn parse_tournament_row(row: &rusqlite::Row) -> rusqlite::Result<Tournament> {
    Ok(Tournament {
        id: row.get(0)?,
        name: row.get(1)?,
        format: row.get(2)?,
        visibility: row.get(3)?,
        creator_id: row.get(4)?,
        challenge_window_mins: row.get(5)?,
        status: row.get(6)?,
        winner_id: row.get(7)?,
        created_at: row.get(8)?,
    })
}

/// Registers a participant. Returns false when they are already registered
/// (UNIQUE constraint absorbed by OR IGNORE, so two racing joins are safe).
pub fn add_player(
    conn: &mut DbConn,
    tournament_id: i64,
    participant_id: i64,
    seed: i32,
) -> Result<bool> {
    let sql = "INSERT OR IGNORE INTO tournament_players (tournament_id, participant_id, seed) VALUES (?1, ?2, ?3)";

    let inserted = conn
        .execute(sql, params![tournament_id, participant_id, seed])
        .context("Failed to register tournament participant")?;
    Ok(inserted == 1)
}

/// Participant ids in join order.
pub fn list_players(conn: &mut DbConn, tournament_id: i64) -> Result<Vec<i64>> {
    let sql =
        "SELECT participant_id FROM tournament_players WHERE tournament_id = ?1 ORDER BY seed";

    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params![tournament_id], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(rows)
}

pub fn count_players(conn: &mut DbConn, tournament_id: i64) -> Result<i32> {
    let sql = "SELECT COUNT(*) FROM tournament_players WHERE tournament_id = ?1";
    conn.query_row(sql, params![tournament_id], |row| row.get(0))
        .context("Failed to count tournament participants")
}

/// Conditional pending -> active transition. False means another start won.
pub fn activate(conn: &mut DbConn, id: i64) -> Result<bool> {
    let sql = "UPDATE tournaments SET status = ?1 WHERE id = ?2 AND status = ?3";

    let updated = conn
        .execute(
            sql,
            params![
                TournamentStatus::Active.as_str(),
                id,
                TournamentStatus::Pending.as_str()
            ],
        )
        .context("Failed to activate tournament")?;
    Ok(updated == 1)
}

/// Conditional active -> completed transition, recording the winner.
pub fn complete(conn: &mut DbConn, id: i64, winner_id: i64) -> Result<bool> {
    let sql = "UPDATE tournaments SET status = ?1, winner_id = ?2 WHERE id = ?3 AND status = ?4";

    let updated = conn
        .execute(
            sql,
            params![
                TournamentStatus::Completed.as_str(),
                winner_id,
                id,
                TournamentStatus::Active.as_str()
            ],
        )
        .context("Failed to complete tournament")?;
    Ok(updated == 1)
}
