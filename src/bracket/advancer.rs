use anyhow::{Context, Result};
use chrono::{Duration, NaiveDateTime};
use log::{info, warn};

use crate::database::models::{BracketSlot, Tournament};
use crate::database::{self, DbConn};
use crate::domain::{MatchStatus, Side};

/// Side effects produced while walking a result up the bracket. The caller
/// turns these into notifications once the storage work is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceEvent {
    MatchScheduled {
        match_id: i64,
        match_number: i64,
        home_id: i64,
        away_id: i64,
    },
    TournamentCompleted {
        tournament_id: i64,
        winner_id: i64,
    },
}

/// Records a match winner and advances them through the bracket, resolving
/// byes recursively. Strictly forward-only and idempotent: the conditional
/// slot-winner write is the replay guard, so re-invoking for an
/// already-advanced match is a no-op.
pub fn record_result_and_advance(
    conn: &mut DbConn,
    tournament: &Tournament,
    match_number: i64,
    winner_id: i64,
    now: NaiveDateTime,
) -> Result<Vec<AdvanceEvent>> {
    let mut events = Vec::new();
    advance(conn, tournament, match_number, winner_id, now, &mut events)?;
    Ok(events)
}

fn advance(
    conn: &mut DbConn,
    tournament: &Tournament,
    match_number: i64,
    winner_id: i64,
    now: NaiveDateTime,
    events: &mut Vec<AdvanceEvent>,
) -> Result<()> {
    let claimed = database::brackets::record_winner(conn, tournament.id, match_number, winner_id)?;
    if !claimed {
        info!(
            "Match {} of tournament {} already advanced, skipping",
            match_number, tournament.id
        );
        return Ok(());
    }

    let target = database::brackets::find_slot_fed_by(conn, tournament.id, match_number)?;
    let Some(target) = target else {
        return complete_tournament(conn, tournament, winner_id, events);
    };

    seat_winner(conn, &target, match_number, winner_id)?;

    let target = database::brackets::find_slot(conn, tournament.id, target.match_number)?
        .context("Fed bracket slot disappeared mid-advancement")?;

    match (target.home_id, target.away_id) {
        (Some(home), Some(away)) if home == away => {
            warn!(
                "Both sides of match {} in tournament {} resolved to participant {}",
                target.match_number, tournament.id, home
            );
            advance(conn, tournament, target.match_number, home, now, events)
        }
        (Some(home), Some(away)) => {
            schedule_match(conn, tournament, &target, home, away, now, events)
        }
        (Some(solo), None) | (None, Some(solo)) => {
            resolve_half_fed_slot(conn, tournament, &target, solo, now, events)
        }
        (None, None) => Ok(()),
    }
}

fn complete_tournament(
    conn: &mut DbConn,
    tournament: &Tournament,
    winner_id: i64,
    events: &mut Vec<AdvanceEvent>,
) -> Result<()> {
    if database::tournaments::complete(conn, tournament.id, winner_id)? {
        info!(
            "Tournament {} completed, winner {}",
            tournament.id, winner_id
        );
        events.push(AdvanceEvent::TournamentCompleted {
            tournament_id: tournament.id,
            winner_id,
        });
    }
    Ok(())
}

fn seat_winner(
    conn: &mut DbConn,
    target: &BracketSlot,
    match_number: i64,
    winner_id: i64,
) -> Result<()> {
    if target.feeder_home == Some(match_number) {
        database::brackets::seat_competitor(conn, target.id, Side::Home, winner_id)?;
    }
    if target.feeder_away == Some(match_number) {
        database::brackets::seat_competitor(conn, target.id, Side::Away, winner_id)?;
    }
    Ok(())
}

fn schedule_match(
    conn: &mut DbConn,
    tournament: &Tournament,
    target: &BracketSlot,
    home_id: i64,
    away_id: i64,
    now: NaiveDateTime,
    events: &mut Vec<AdvanceEvent>,
) -> Result<()> {
    let deadline = now + Duration::minutes(tournament.challenge_window_mins);
    let created = database::matches::create_tournament_match(
        conn,
        tournament.id,
        target.match_number,
        home_id,
        away_id,
        deadline,
    )?;

    if let Some(created) = created {
        events.push(AdvanceEvent::MatchScheduled {
            match_id: created.id,
            match_number: target.match_number,
            home_id,
            away_id,
        });
    }
    Ok(())
}

/// A target slot with one seated competitor. Advance them without playing
/// when the other side can never arrive: a duplicated back-reference, or a
/// sibling feeder that expired with no winner.
fn resolve_half_fed_slot(
    conn: &mut DbConn,
    tournament: &Tournament,
    target: &BracketSlot,
    solo_id: i64,
    now: NaiveDateTime,
    events: &mut Vec<AdvanceEvent>,
) -> Result<()> {
    if target.feeder_home == target.feeder_away {
        return advance(conn, tournament, target.match_number, solo_id, now, events);
    }

    if sibling_forfeited(conn, tournament, target)? {
        info!(
            "Opponent for match {} in tournament {} forfeited by expiry, advancing {}",
            target.match_number, tournament.id, solo_id
        );
        return advance(conn, tournament, target.match_number, solo_id, now, events);
    }

    Ok(())
}

/// True when the feeder that has not produced a winner can no longer do so
/// because its match expired.
fn sibling_forfeited(
    conn: &mut DbConn,
    tournament: &Tournament,
    target: &BracketSlot,
) -> Result<bool> {
    for feeder in [target.feeder_home, target.feeder_away] {
        let Some(feeder) = feeder else { continue };

        let slot = database::brackets::find_slot(conn, tournament.id, feeder)?;
        if slot.and_then(|s| s.winner_id).is_some() {
            continue;
        }

        let feeder_match = database::matches::find_by_tournament_match(conn, tournament.id, feeder)?;
        return Ok(matches!(
            feeder_match.map(|m| m.status),
            Some(MatchStatus::Expired)
        ));
    }
    Ok(false)
}

/// Called by the deadline sweeper after a match expires with no result. When
/// the sibling feeding the same next slot already produced a winner, that
/// winner advances as a walkover; otherwise the slot stays unresolved.
pub fn propagate_walkover(
    conn: &mut DbConn,
    tournament: &Tournament,
    expired_match_number: i64,
    now: NaiveDateTime,
) -> Result<Vec<AdvanceEvent>> {
    let target = database::brackets::find_slot_fed_by(conn, tournament.id, expired_match_number)?;
    let Some(target) = target else {
        warn!(
            "Final match {} of tournament {} expired with no result",
            expired_match_number, tournament.id
        );
        return Ok(Vec::new());
    };

    let sibling = match (target.feeder_home, target.feeder_away) {
        (Some(a), Some(b)) if a == expired_match_number => Some(b),
        (Some(a), Some(b)) if b == expired_match_number => Some(a),
        _ => None,
    };
    let Some(sibling) = sibling else {
        return Ok(Vec::new());
    };

    let sibling_winner = database::brackets::find_slot(conn, tournament.id, sibling)?
        .and_then(|slot| slot.winner_id);
    let Some(winner_id) = sibling_winner else {
        return Ok(Vec::new());
    };

    record_result_and_advance(conn, tournament, target.match_number, winner_id, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bracket::builder::build_bracket;
    use crate::database::testing::memory_pool;
    use crate::database::DbPool;
    use crate::domain::{TournamentFormat, Visibility};
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 4, 10)
            .unwrap()
            .and_hms_opt(18, 0, 0)
            .unwrap()
    }

    /// Active four-player tournament with its round-1 matches created.
    fn seed_four_player_tournament(pool: &DbPool) -> Tournament {
        let mut conn = pool.get().unwrap();

        let tournament = database::tournaments::insert_tournament(
            &mut conn,
            "Spring Open",
            TournamentFormat::SingleElimination,
            Visibility::Public,
            1,
            60,
        )
        .unwrap();
        database::tournaments::activate(&mut conn, tournament.id).unwrap();

        let bracket = build_bracket(&[10, 20, 30, 40]).unwrap();
        for round in &bracket.rounds {
            for pairing in &round.pairings {
                database::brackets::insert_slot(
                    &mut conn,
                    tournament.id,
                    round.number,
                    pairing.position,
                    pairing.match_number,
                    pairing.home,
                    pairing.away,
                    pairing.feeder_home,
                    pairing.feeder_away,
                )
                .unwrap();
            }
        }
        for pairing in &bracket.rounds[0].pairings {
            database::matches::create_tournament_match(
                &mut conn,
                tournament.id,
                pairing.match_number,
                pairing.home.unwrap(),
                pairing.away.unwrap(),
                now(),
            )
            .unwrap();
        }

        database::tournaments::find_by_id(&mut conn, tournament.id)
            .unwrap()
            .unwrap()
    }

    #[test]
    fn winner_is_seated_in_the_next_round() {
        let pool = memory_pool();
        let tournament = seed_four_player_tournament(&pool);
        let mut conn = pool.get().unwrap();

        let events =
            record_result_and_advance(&mut conn, &tournament, 1, 10, now()).unwrap();
        assert!(events.is_empty());

        let final_slot = database::brackets::find_slot(&mut conn, tournament.id, 3)
            .unwrap()
            .unwrap();
        assert_eq!(final_slot.home_id, Some(10));
        assert_eq!(final_slot.away_id, None);
    }

    #[test]
    fn second_feeder_completion_schedules_the_next_match() {
        let pool = memory_pool();
        let tournament = seed_four_player_tournament(&pool);
        let mut conn = pool.get().unwrap();

        record_result_and_advance(&mut conn, &tournament, 1, 10, now()).unwrap();
        let events =
            record_result_and_advance(&mut conn, &tournament, 2, 40, now()).unwrap();

        assert_eq!(events.len(), 1);
        match &events[0] {
            AdvanceEvent::MatchScheduled {
                match_number,
                home_id,
                away_id,
                ..
            } => {
                assert_eq!(*match_number, 3);
                assert_eq!(*home_id, 10);
                assert_eq!(*away_id, 40);
            }
            other => panic!("unexpected event: {other:?}"),
        }

        let created = database::matches::find_by_tournament_match(&mut conn, tournament.id, 3)
            .unwrap()
            .unwrap();
        assert_eq!(created.status, MatchStatus::Scheduled);
    }

    #[test]
    fn reinvoking_an_advanced_match_is_a_no_op() {
        let pool = memory_pool();
        let tournament = seed_four_player_tournament(&pool);
        let mut conn = pool.get().unwrap();

        record_result_and_advance(&mut conn, &tournament, 1, 10, now()).unwrap();
        let replay = record_result_and_advance(&mut conn, &tournament, 1, 20, now()).unwrap();
        assert!(replay.is_empty());

        // The original winner stands.
        let slot = database::brackets::find_slot(&mut conn, tournament.id, 1)
            .unwrap()
            .unwrap();
        assert_eq!(slot.winner_id, Some(10));

        let final_slot = database::brackets::find_slot(&mut conn, tournament.id, 3)
            .unwrap()
            .unwrap();
        assert_eq!(final_slot.home_id, Some(10));
    }

    #[test]
    fn final_round_winner_completes_the_tournament() {
        let pool = memory_pool();
        let tournament = seed_four_player_tournament(&pool);
        let mut conn = pool.get().unwrap();

        record_result_and_advance(&mut conn, &tournament, 1, 10, now()).unwrap();
        record_result_and_advance(&mut conn, &tournament, 2, 30, now()).unwrap();
        let events =
            record_result_and_advance(&mut conn, &tournament, 3, 30, now()).unwrap();

        assert!(events.contains(&AdvanceEvent::TournamentCompleted {
            tournament_id: tournament.id,
            winner_id: 30,
        }));

        let stored = database::tournaments::find_by_id(&mut conn, tournament.id)
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, crate::domain::TournamentStatus::Completed);
        assert_eq!(stored.winner_id, Some(30));
    }

    #[test]
    fn expired_sibling_forfeits_to_the_advancing_winner() {
        let pool = memory_pool();
        let tournament = seed_four_player_tournament(&pool);
        let mut conn = pool.get().unwrap();

        // Match 2 times out before anyone reports.
        let m2 = database::matches::find_by_tournament_match(&mut conn, tournament.id, 2)
            .unwrap()
            .unwrap();
        database::matches::transition_status(
            &mut conn,
            m2.id,
            &[MatchStatus::Scheduled],
            MatchStatus::Expired,
        )
        .unwrap();

        let events =
            record_result_and_advance(&mut conn, &tournament, 1, 20, now()).unwrap();

        // 20 walks through the final unopposed and wins the tournament.
        assert!(events.contains(&AdvanceEvent::TournamentCompleted {
            tournament_id: tournament.id,
            winner_id: 20,
        }));
    }

    #[test]
    fn walkover_propagates_a_completed_sibling_winner() {
        let pool = memory_pool();
        let tournament = seed_four_player_tournament(&pool);
        let mut conn = pool.get().unwrap();

        record_result_and_advance(&mut conn, &tournament, 1, 10, now()).unwrap();

        let events = propagate_walkover(&mut conn, &tournament, 2, now()).unwrap();
        assert!(events.contains(&AdvanceEvent::TournamentCompleted {
            tournament_id: tournament.id,
            winner_id: 10,
        }));
    }

    #[test]
    fn walkover_without_a_resolved_sibling_leaves_the_slot_alone() {
        let pool = memory_pool();
        let tournament = seed_four_player_tournament(&pool);
        let mut conn = pool.get().unwrap();

        let events = propagate_walkover(&mut conn, &tournament, 2, now()).unwrap();
        assert!(events.is_empty());

        let final_slot = database::brackets::find_slot(&mut conn, tournament.id, 3)
            .unwrap()
            .unwrap();
        assert_eq!(final_slot.winner_id, None);
    }
}
