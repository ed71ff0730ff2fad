use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use rusqlite::{params, OptionalExtension, Row};

use super::connection::DbConn;
use super::models::CompetitiveMatch;
use crate::domain::{decode_scores, MatchKind, MatchStatus, ResolutionMethod, Side, Submission};

const MATCH_COLUMNS: &str = "id, kind, tournament_id, match_number, ladder_id, home_id, away_id, status, deadline, home_scores, home_winner_id, home_submitted_at, away_scores, away_winner_id, away_submitted_at, final_scores, final_winner_id, resolution, resolver_id, resolved_at, created_at";

/// Creates the playable match for a bracket slot. Returns None when another
/// advancer already created it (absorbed by the unique tournament/number
/// index), so concurrent feeder completions cannot double-schedule.
pub fn create_tournament_match(
    conn: &mut DbConn,
    tournament_id: i64,
    match_number: i64,
    home_id: i64,
    away_id: i64,
    deadline: NaiveDateTime,
) -> Result<Option<CompetitiveMatch>> {
    let sql = format!(
        "INSERT OR IGNORE INTO matches (kind, tournament_id, match_number, home_id, away_id, status, deadline) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) RETURNING {MATCH_COLUMNS}"
    );

    conn.query_row(
        &sql,
        params![
            MatchKind::Tournament.as_str(),
            tournament_id,
            match_number,
            home_id,
            away_id,
            MatchStatus::Scheduled.as_str(),
            deadline
        ],
        parse_match_row,
    )
    .optional()
    .context("Failed to insert tournament match")
}

pub fn create_ladder_match(
    conn: &mut DbConn,
    ladder_id: i64,
    challenger_id: i64,
    challengee_id: i64,
    deadline: NaiveDateTime,
) -> Result<CompetitiveMatch> {
    let sql = format!(
        "INSERT INTO matches (kind, ladder_id, home_id, away_id, status, deadline) VALUES (?1, ?2, ?3, ?4, ?5, ?6) RETURNING {MATCH_COLUMNS}"
    );

    conn.query_row(
        &sql,
        params![
            MatchKind::Ladder.as_str(),
            ladder_id,
            challenger_id,
            challengee_id,
            MatchStatus::Scheduled.as_str(),
            deadline
        ],
        parse_match_row,
    )
    .context("Failed to insert ladder match")
}

pub fn find_by_id(conn: &mut DbConn, id: i64) -> Result<Option<CompetitiveMatch>> {
    let sql = format!("SELECT {MATCH_COLUMNS} FROM matches WHERE id = ?1");

    conn.query_row(&sql, params![id], parse_match_row)
        .optional()
        .context("Failed to query match by id")
}

pub fn find_by_tournament_match(
    conn: &mut DbConn,
    tournament_id: i64,
    match_number: i64,
) -> Result<Option<CompetitiveMatch>> {
    let sql = format!(
        "SELECT {MATCH_COLUMNS} FROM matches WHERE tournament_id = ?1 AND match_number = ?2"
    );

    conn.query_row(&sql, params![tournament_id, match_number], parse_match_row)
        .optional()
        .context("Failed to query match by tournament and number")
}

/// An unresolved challenge between the same two ladder members, either
/// direction. Used to enforce one open challenge per pair.
pub fn find_open_ladder_match(
    conn: &mut DbConn,
    ladder_id: i64,
    first_id: i64,
    second_id: i64,
) -> Result<Option<CompetitiveMatch>> {
    let sql = format!(
        "SELECT {MATCH_COLUMNS} FROM matches WHERE ladder_id = ?1 AND status IN ('scheduled', 'accepted', 'disputed') AND ((home_id = ?2 AND away_id = ?3) OR (home_id = ?3 AND away_id = ?2))"
    );

    conn.query_row(&sql, params![ladder_id, first_id, second_id], parse_match_row)
        .optional()
        .context("Failed to query open ladder match for pair")
}

/// Every match still in a sweepable state. Deadline filtering happens at the
/// caller so a sweep decision is explicit about the clock it uses.
pub fn list_open(conn: &mut DbConn) -> Result<Vec<CompetitiveMatch>> {
    let sql =
        format!("SELECT {MATCH_COLUMNS} FROM matches WHERE status IN ('scheduled', 'accepted')");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], parse_match_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(rows)
}

pub fn list_by_tournament(conn: &mut DbConn, tournament_id: i64) -> Result<Vec<CompetitiveMatch>> {
    let sql = format!("SELECT {MATCH_COLUMNS} FROM matches WHERE tournament_id = ?1 ORDER BY match_number");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![tournament_id], parse_match_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(rows)
}

fn parse_match_row(row: &Row) -> rusqlite::Result<CompetitiveMatch> {
    Ok(CompetitiveMatch {
        id: row.get(0)?,
        kind: row.get(1)?,
        tournament_id: row.get(2)?,
        match_number: row.get(3)?,
        ladder_id: row.get(4)?,
        home_id: row.get(5)?,
        away_id: row.get(6)?,
        status: row.get(7)?,
        deadline: row.get(8)?,
        home_submission: parse_submission(row, 9, 10, 11)?,
        away_submission: parse_submission(row, 12, 13, 14)?,
        final_scores: row.get(15)?,
        final_winner_id: row.get(16)?,
        resolution: row.get(17)?,
        resolver_id: row.get(18)?,
        resolved_at: row.get(19)?,
        created_at: row.get(20)?,
    })
}

fn parse_submission(
    row: &Row,
    scores_idx: usize,
    winner_idx: usize,
    at_idx: usize,
) -> rusqlite::Result<Option<Submission>> {
    let raw: Option<String> = row.get(scores_idx)?;
    let Some(raw) = raw else {
        return Ok(None);
    };

    let scores = decode_scores(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(scores_idx, rusqlite::types::Type::Text, e.into())
    })?;

    Ok(Some(Submission {
        scores,
        winner_id: row.get(winner_idx)?,
        submitted_at: row.get(at_idx)?,
    }))
}

/// Conditional status transition; false means the match was no longer in any
/// of the expected states and nothing changed.
pub fn transition_status(
    conn: &mut DbConn,
    id: i64,
    from: &[MatchStatus],
    to: MatchStatus,
) -> Result<bool> {
    let expected = status_list(from);
    let sql = format!("UPDATE matches SET status = ?1 WHERE id = ?2 AND status IN ({expected})");

    let updated = conn
        .execute(&sql, params![to.as_str(), id])
        .context("Failed to transition match status")?;
    Ok(updated == 1)
}

/// Records one side's submission. The write is conditional on the match still
/// being open for that side: a second submission from the same participant,
/// or a submission after a sweep forced the outcome, affects zero rows.
pub fn record_submission(
    conn: &mut DbConn,
    id: i64,
    side: Side,
    scores_json: &str,
    winner_id: i64,
    submitted_at: NaiveDateTime,
    open_status: MatchStatus,
) -> Result<bool> {
    let sql = match side {
        Side::Home => "UPDATE matches SET home_scores = ?1, home_winner_id = ?2, home_submitted_at = ?3 WHERE id = ?4 AND status = ?5 AND home_scores IS NULL",
        Side::Away => "UPDATE matches SET away_scores = ?1, away_winner_id = ?2, away_submitted_at = ?3 WHERE id = ?4 AND status = ?5 AND away_scores IS NULL",
    };

    let updated = conn
        .execute(
            sql,
            params![scores_json, winner_id, submitted_at, id, open_status.as_str()],
        )
        .context("Failed to record match submission")?;
    Ok(updated == 1)
}

/// Clears one side's submission and reopens a disputed match for a fresh
/// consensus attempt.
pub fn clear_submission(
    conn: &mut DbConn,
    id: i64,
    side: Side,
    reopen_to: MatchStatus,
) -> Result<bool> {
    let sql = match side {
        Side::Home => "UPDATE matches SET home_scores = NULL, home_winner_id = NULL, home_submitted_at = NULL, status = ?1 WHERE id = ?2 AND status = ?3",
        Side::Away => "UPDATE matches SET away_scores = NULL, away_winner_id = NULL, away_submitted_at = NULL, status = ?1 WHERE id = ?2 AND status = ?3",
    };

    let updated = conn
        .execute(
            sql,
            params![reopen_to.as_str(), id, MatchStatus::Disputed.as_str()],
        )
        .context("Failed to clear match submission")?;
    Ok(updated == 1)
}

/// Seals a match with its final outcome. Conditional on the expected
/// pre-states so racing resolvers collapse to a single winner; the losers see
/// false and must not run downstream effects.
#[allow(clippy::too_many_arguments)]
pub fn finalize(
    conn: &mut DbConn,
    id: i64,
    from: &[MatchStatus],
    to: MatchStatus,
    final_scores: Option<&str>,
    final_winner_id: Option<i64>,
    resolution: ResolutionMethod,
    resolver_id: Option<i64>,
    resolved_at: NaiveDateTime,
) -> Result<bool> {
    let expected = status_list(from);
    let sql = format!(
        "UPDATE matches SET status = ?1, final_scores = ?2, final_winner_id = ?3, resolution = ?4, resolver_id = ?5, resolved_at = ?6 WHERE id = ?7 AND status IN ({expected})"
    );

    let updated = conn
        .execute(
            &sql,
            params![
                to.as_str(),
                final_scores,
                final_winner_id,
                resolution.as_str(),
                resolver_id,
                resolved_at,
                id
            ],
        )
        .context("Failed to finalize match")?;
    Ok(updated == 1)
}

fn status_list(statuses: &[MatchStatus]) -> String {
    statuses
        .iter()
        .map(|s| format!("'{}'", s.as_str()))
        .collect::<Vec<_>>()
        .join(", ")
}
