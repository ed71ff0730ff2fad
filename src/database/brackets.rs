use anyhow::{Context, Result};
use rusqlite::{params, OptionalExtension};

use super::connection::DbConn;
use super::models::BracketSlot;
use crate::domain::Side;

const SLOT_COLUMNS: &str = "id, tournament_id, round, position, match_number, home_id, away_id, winner_id, feeder_home, feeder_away";

#[allow(clippy::too_many_arguments)]
pub fn insert_slot(
    conn: &mut DbConn,
    tournament_id: i64,
    round: i32,
    position: i32,
    match_number: i64,
    home_id: Option<i64>,
    away_id: Option<i64>,
    feeder_home: Option<i64>,
    feeder_away: Option<i64>,
) -> Result<BracketSlot> {
    let sql = format!(
        "INSERT INTO bracket_slots (tournament_id, round, position, match_number, home_id, away_id, feeder_home, feeder_away) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8) RETURNING {SLOT_COLUMNS}"
    );

    conn.query_row(
        &sql,
        params![
            tournament_id,
            round,
            position,
            match_number,
            home_id,
            away_id,
            feeder_home,
            feeder_away
        ],
        parse_slot_row,
    )
    .context("Failed to insert bracket slot")
}

fn parse_slot_row(row: &rusqlite::Row) -> rusqlite::Result<BracketSlot> {
    Ok(BracketSlot {
        id: row.get(0)?,
        tournament_id: row.get(1)?,
        round: row.get(2)?,
        position: row.get(3)?,
        match_number: row.get(4)?,
        home_id: row.get(5)?,
        away_id: row.get(6)?,
        winner_id: row.get(7)?,
        feeder_home: row.get(8)?,
        feeder_away: row.get(9)?,
    })
}

pub fn find_slot(
    conn: &mut DbConn,
    tournament_id: i64,
    match_number: i64,
) -> Result<Option<BracketSlot>> {
    let sql =
        format!("SELECT {SLOT_COLUMNS} FROM bracket_slots WHERE tournament_id = ?1 AND match_number = ?2");

    conn.query_row(&sql, params![tournament_id, match_number], parse_slot_row)
        .optional()
        .context("Failed to query bracket slot by match number")
}

/// The later-round slot whose back-references name this match as a feeder.
/// None for the final round.
pub fn find_slot_fed_by(
    conn: &mut DbConn,
    tournament_id: i64,
    match_number: i64,
) -> Result<Option<BracketSlot>> {
    let sql = format!(
        "SELECT {SLOT_COLUMNS} FROM bracket_slots WHERE tournament_id = ?1 AND (feeder_home = ?2 OR feeder_away = ?2)"
    );

    conn.query_row(&sql, params![tournament_id, match_number], parse_slot_row)
        .optional()
        .context("Failed to query fed bracket slot")
}

pub fn list_slots(conn: &mut DbConn, tournament_id: i64) -> Result<Vec<BracketSlot>> {
    let sql = format!(
        "SELECT {SLOT_COLUMNS} FROM bracket_slots WHERE tournament_id = ?1 ORDER BY round, position"
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![tournament_id], parse_slot_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(rows)
}

/// Seats a competitor on one side of a slot. Conditional on the side still
/// being empty so replayed advancements cannot overwrite.
pub fn seat_competitor(
    conn: &mut DbConn,
    slot_id: i64,
    side: Side,
    participant_id: i64,
) -> Result<bool> {
    let sql = match side {
        Side::Home => "UPDATE bracket_slots SET home_id = ?1 WHERE id = ?2 AND home_id IS NULL",
        Side::Away => "UPDATE bracket_slots SET away_id = ?1 WHERE id = ?2 AND away_id IS NULL",
    };

    let updated = conn
        .execute(sql, params![participant_id, slot_id])
        .context("Failed to seat competitor in bracket slot")?;
    Ok(updated == 1)
}

/// Records a slot winner. A slot winner is immutable once set; the false
/// return is the advancement idempotence check.
pub fn record_winner(
    conn: &mut DbConn,
    tournament_id: i64,
    match_number: i64,
    winner_id: i64,
) -> Result<bool> {
    let sql = "UPDATE bracket_slots SET winner_id = ?1 WHERE tournament_id = ?2 AND match_number = ?3 AND winner_id IS NULL";

    let updated = conn
        .execute(sql, params![winner_id, tournament_id, match_number])
        .context("Failed to record bracket slot winner")?;
    Ok(updated == 1)
}
