use chrono::{Duration, NaiveDateTime};
use log::info;
use rand::seq::SliceRandom;
use rand::thread_rng;

use crate::bracket::advancer::{self, AdvanceEvent};
use crate::bracket::builder::{build_bracket, BuiltBracket};
use crate::config::settings::CompetitionSettings;
use crate::database::models::Tournament;
use crate::database::{self, DbConn};
use crate::domain::{CompetitionError, CompetitionResult, TournamentFormat};

/// Flips a pending tournament to active, seeds the bracket and schedules
/// round 1. Byes resolve immediately and their winners advance before the
/// call returns. The conditional pending->active write makes a concurrent
/// second start a clean conflict.
pub fn start_tournament(
    conn: &mut DbConn,
    tournament: &Tournament,
    settings: &CompetitionSettings,
    now: NaiveDateTime,
) -> CompetitionResult<Vec<AdvanceEvent>> {
    if tournament.format != TournamentFormat::SingleElimination {
        return Err(CompetitionError::validation(
            "Only single elimination tournaments can be started",
        ));
    }

    let mut participants = database::tournaments::list_players(conn, tournament.id)?;
    if participants.len() < settings.min_participants {
        return Err(CompetitionError::validation(format!(
            "Tournament needs at least {} participants to start",
            settings.min_participants
        )));
    }

    if !database::tournaments::activate(conn, tournament.id)? {
        return Err(CompetitionError::conflict(
            "Tournament has already been started",
        ));
    }

    participants.shuffle(&mut thread_rng());
    let bracket = build_bracket(&participants)?;

    store_bracket(conn, tournament.id, &bracket)?;
    let events = schedule_first_round(conn, tournament, &bracket, now)?;

    info!(
        "Tournament {} started with {} participants over {} rounds",
        tournament.id,
        participants.len(),
        bracket.rounds.len()
    );
    Ok(events)
}

fn store_bracket(
    conn: &mut DbConn,
    tournament_id: i64,
    bracket: &BuiltBracket,
) -> CompetitionResult<()> {
    for round in &bracket.rounds {
        for pairing in &round.pairings {
            database::brackets::insert_slot(
                conn,
                tournament_id,
                round.number,
                pairing.position,
                pairing.match_number,
                pairing.home,
                pairing.away,
                pairing.feeder_home,
                pairing.feeder_away,
            )?;
        }
    }
    Ok(())
}

/// Creates playable round-1 matches and walks bye winners up the bracket.
fn schedule_first_round(
    conn: &mut DbConn,
    tournament: &Tournament,
    bracket: &BuiltBracket,
    now: NaiveDateTime,
) -> CompetitionResult<Vec<AdvanceEvent>> {
    let deadline = now + Duration::minutes(tournament.challenge_window_mins);
    let mut events = Vec::new();

    for pairing in &bracket.first_round().pairings {
        if let Some(solo) = pairing.sole_competitor() {
            let advanced = advancer::record_result_and_advance(
                conn,
                tournament,
                pairing.match_number,
                solo,
                now,
            )?;
            events.extend(advanced);
            continue;
        }

        let (Some(home), Some(away)) = (pairing.home, pairing.away) else {
            return Err(CompetitionError::Internal(anyhow::anyhow!(
                "Bracket produced an empty round-1 pairing"
            )));
        };

        let created = database::matches::create_tournament_match(
            conn,
            tournament.id,
            pairing.match_number,
            home,
            away,
            deadline,
        )?;
        if let Some(created) = created {
            events.push(AdvanceEvent::MatchScheduled {
                match_id: created.id,
                match_number: pairing.match_number,
                home_id: home,
                away_id: away,
            });
        }
    }

    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::submission::{submit_result, SubmissionOutcome};
    use crate::database::testing::memory_pool;
    use crate::database::DbPool;
    use crate::domain::{MatchStatus, SetScore, TournamentStatus, Visibility};
    use crate::services::progression::on_match_completed;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 6, 7)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    fn settings() -> CompetitionSettings {
        CompetitionSettings::default()
    }

    fn create_tournament(pool: &DbPool, participants: &[i64]) -> Tournament {
        let mut conn = pool.get().unwrap();
        let tournament = database::tournaments::insert_tournament(
            &mut conn,
            "City Knockout",
            TournamentFormat::SingleElimination,
            Visibility::Public,
            participants[0],
            120,
        )
        .unwrap();
        for (idx, &participant) in participants.iter().enumerate() {
            database::tournaments::add_player(&mut conn, tournament.id, participant, idx as i32 + 1)
                .unwrap();
        }
        tournament
    }

    fn agreed_scores() -> Vec<SetScore> {
        vec![SetScore { home: 6, away: 2 }]
    }

    /// Both players report the same result; returns the advancement fan-out.
    fn complete_by_consensus(pool: &DbPool, match_id: i64, winner: i64) -> Vec<AdvanceEvent> {
        let mut conn = pool.get().unwrap();
        let m = database::matches::find_by_id(&mut conn, match_id).unwrap().unwrap();

        let first = submit_result(&mut conn, &m, m.home_id, &agreed_scores(), winner, now()).unwrap();
        assert_eq!(first, SubmissionOutcome::Pending);

        let m = database::matches::find_by_id(&mut conn, match_id).unwrap().unwrap();
        let second = submit_result(&mut conn, &m, m.away_id, &agreed_scores(), winner, now()).unwrap();
        assert!(matches!(second, SubmissionOutcome::Agreed { .. }));

        let sealed = database::matches::find_by_id(&mut conn, match_id).unwrap().unwrap();
        on_match_completed(&mut conn, &sealed, winner, now()).unwrap()
    }

    #[test]
    fn starting_twice_conflicts() {
        let pool = memory_pool();
        let tournament = create_tournament(&pool, &[1, 2, 3, 4]);
        let mut conn = pool.get().unwrap();

        start_tournament(&mut conn, &tournament, &settings(), now()).unwrap();
        let err = start_tournament(&mut conn, &tournament, &settings(), now()).unwrap_err();
        assert!(matches!(err, CompetitionError::Conflict(_)));
    }

    #[test]
    fn starting_needs_enough_participants() {
        let pool = memory_pool();
        let tournament = create_tournament(&pool, &[1]);
        let mut conn = pool.get().unwrap();

        let err = start_tournament(&mut conn, &tournament, &settings(), now()).unwrap_err();
        assert!(matches!(err, CompetitionError::Validation(_)));

        // Validation rejected before any mutation.
        let stored = database::tournaments::find_by_id(&mut conn, tournament.id)
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, TournamentStatus::Pending);
    }

    #[test]
    fn four_players_get_two_playable_matches_and_no_byes() {
        let pool = memory_pool();
        let tournament = create_tournament(&pool, &[1, 2, 3, 4]);
        let mut conn = pool.get().unwrap();

        let events = start_tournament(&mut conn, &tournament, &settings(), now()).unwrap();

        let scheduled: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, AdvanceEvent::MatchScheduled { .. }))
            .collect();
        assert_eq!(scheduled.len(), 2);

        let slots = database::brackets::list_slots(&mut conn, tournament.id).unwrap();
        assert_eq!(slots.len(), 3);
        assert!(slots.iter().all(|s| s.winner_id.is_none()));
    }

    #[test]
    fn five_players_resolve_three_byes_into_round_two() {
        let pool = memory_pool();
        let tournament = create_tournament(&pool, &[1, 2, 3, 4, 5]);
        let mut conn = pool.get().unwrap();

        start_tournament(&mut conn, &tournament, &settings(), now()).unwrap();

        let slots = database::brackets::list_slots(&mut conn, tournament.id).unwrap();
        let round1: Vec<_> = slots.iter().filter(|s| s.round == 1).collect();
        assert_eq!(round1.len(), 4);

        // Three byes resolved instantly, one real match pending.
        let resolved = round1.iter().filter(|s| s.winner_id.is_some()).count();
        assert_eq!(resolved, 3);

        let matches = database::matches::list_by_tournament(&mut conn, tournament.id).unwrap();
        let round1_pending = matches
            .iter()
            .filter(|m| m.match_number.unwrap() <= 4 && m.status == MatchStatus::Scheduled)
            .count();
        assert_eq!(round1_pending, 1);

        // Every bye winner is already seated in round 2.
        let round2: Vec<_> = slots.iter().filter(|s| s.round == 2).collect();
        let seated: usize = round2
            .iter()
            .map(|s| usize::from(s.home_id.is_some()) + usize::from(s.away_id.is_some()))
            .sum();
        assert_eq!(seated, 3);
    }

    #[test]
    fn full_four_player_run_crowns_a_champion() {
        let pool = memory_pool();
        let tournament = create_tournament(&pool, &[1, 2, 3, 4]);
        {
            let mut conn = pool.get().unwrap();
            start_tournament(&mut conn, &tournament, &settings(), now()).unwrap();
        }

        let (m1, m2) = {
            let mut conn = pool.get().unwrap();
            let matches = database::matches::list_by_tournament(&mut conn, tournament.id).unwrap();
            assert_eq!(matches.len(), 2);
            (matches[0].clone(), matches[1].clone())
        };

        let w1 = m1.home_id;
        let advances = complete_by_consensus(&pool, m1.id, w1);
        assert!(advances.is_empty());

        let w2 = m2.away_id;
        let advances = complete_by_consensus(&pool, m2.id, w2);
        assert_eq!(advances.len(), 1);
        let AdvanceEvent::MatchScheduled {
            match_id: final_id,
            home_id,
            away_id,
            ..
        } = advances[0]
        else {
            panic!("expected the final to be scheduled");
        };
        assert_eq!(home_id, w1);
        assert_eq!(away_id, w2);

        let advances = complete_by_consensus(&pool, final_id, w2);
        assert!(advances.contains(&AdvanceEvent::TournamentCompleted {
            tournament_id: tournament.id,
            winner_id: w2,
        }));

        let mut conn = pool.get().unwrap();
        let stored = database::tournaments::find_by_id(&mut conn, tournament.id)
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, TournamentStatus::Completed);
        assert_eq!(stored.winner_id, Some(w2));

        // N-1 resolutions: every slot carries a winner at the end.
        let slots = database::brackets::list_slots(&mut conn, tournament.id).unwrap();
        assert_eq!(slots.len(), 3);
        assert!(slots.iter().all(|s| s.winner_id.is_some()));
    }

    #[test]
    fn five_player_run_needs_exactly_four_real_matches() {
        let pool = memory_pool();
        let tournament = create_tournament(&pool, &[1, 2, 3, 4, 5]);
        {
            let mut conn = pool.get().unwrap();
            start_tournament(&mut conn, &tournament, &settings(), now()).unwrap();
        }

        let mut played = 0;
        loop {
            let next_open = {
                let mut conn = pool.get().unwrap();
                database::matches::list_by_tournament(&mut conn, tournament.id)
                    .unwrap()
                    .into_iter()
                    .find(|m| m.status == MatchStatus::Scheduled)
            };
            let Some(m) = next_open else { break };

            complete_by_consensus(&pool, m.id, m.home_id);
            played += 1;
            assert!(played <= 5, "runaway tournament");
        }

        // N-1 real matches for N=5, byes excluded.
        assert_eq!(played, 4);

        let mut conn = pool.get().unwrap();
        let stored = database::tournaments::find_by_id(&mut conn, tournament.id)
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, TournamentStatus::Completed);
        assert!(stored.winner_id.is_some());
    }
}
