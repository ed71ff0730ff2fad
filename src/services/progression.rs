use anyhow::{Context, Result};
use chrono::NaiveDateTime;

use crate::bracket::advancer::{self, AdvanceEvent};
use crate::clients::NotificationEvent;
use crate::database::models::CompetitiveMatch;
use crate::database::{self, DbConn};
use crate::domain::MatchKind;
use crate::ladder;

/// Routes a freshly completed match to its downstream effect: bracket
/// advancement for tournaments, the rank-adjustment rule for ladders. Must
/// run exactly once per completion; callers gate it behind the conditional
/// finalize that sealed the match.
pub fn on_match_completed(
    conn: &mut DbConn,
    m: &CompetitiveMatch,
    winner_id: i64,
    now: NaiveDateTime,
) -> Result<Vec<AdvanceEvent>> {
    match m.kind {
        MatchKind::Tournament => {
            let tournament_id = m
                .tournament_id
                .context("Tournament match has no tournament reference")?;
            let match_number = m
                .match_number
                .context("Tournament match has no match number")?;

            let tournament = database::tournaments::find_by_id(conn, tournament_id)?
                .context("Tournament match references a missing tournament")?;

            advancer::record_result_and_advance(conn, &tournament, match_number, winner_id, now)
        }
        MatchKind::Ladder => {
            let ladder_id = m.ladder_id.context("Ladder match has no ladder reference")?;
            ladder::apply_match_result(conn, ladder_id, m.home_id, m.away_id, winner_id)?;
            Ok(Vec::new())
        }
    }
}

/// Completion notifications: both players hear about the result, plus the
/// fan-out produced by bracket advancement.
pub fn completion_notifications(
    m: &CompetitiveMatch,
    advances: &[AdvanceEvent],
) -> Vec<NotificationEvent> {
    let mut events = vec![
        NotificationEvent::for_match("match_completed", m.home_id, m.id),
        NotificationEvent::for_match("match_completed", m.away_id, m.id),
    ];
    events.extend(advance_notifications(advances));
    events
}

pub fn advance_notifications(advances: &[AdvanceEvent]) -> Vec<NotificationEvent> {
    let mut events = Vec::new();
    for advance in advances {
        match advance {
            AdvanceEvent::MatchScheduled {
                match_id,
                home_id,
                away_id,
                ..
            } => {
                events.push(NotificationEvent::for_match(
                    "match_scheduled",
                    *home_id,
                    *match_id,
                ));
                events.push(NotificationEvent::for_match(
                    "match_scheduled",
                    *away_id,
                    *match_id,
                ));
            }
            AdvanceEvent::TournamentCompleted {
                tournament_id,
                winner_id,
            } => {
                events.push(NotificationEvent::for_tournament(
                    "tournament_completed",
                    *winner_id,
                    *tournament_id,
                ));
            }
        }
    }
    events
}
