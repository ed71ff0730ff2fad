use anyhow::{Context, Result};
use chrono::{NaiveDateTime, Utc};
use log::{error, info};
use std::time::Duration;

use crate::bracket::advancer::{self, AdvanceEvent};
use crate::clients::{NotificationEvent, Notifier};
use crate::config::AppConfig;
use crate::database::models::CompetitiveMatch;
use crate::database::{self, DbConn, DbPool};
use crate::domain::{MatchKind, MatchStatus};
use crate::services::progression;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub tournament_matches: usize,
    pub ladder_matches: usize,
}

/// Everything one sweep pass did, for logging and notification fan-out.
#[derive(Debug, Default)]
pub struct SweepOutcome {
    pub report: SweepReport,
    pub expired: Vec<CompetitiveMatch>,
    pub forced_disputes: Vec<CompetitiveMatch>,
    pub advances: Vec<AdvanceEvent>,
}

/// Scans open matches whose response window elapsed and forces a terminal
/// outcome. Each forced match leaves the sweepable states, so a later pass
/// (or a concurrent one) sees zero affected rows and moves on.
pub fn sweep_once(conn: &mut DbConn, now: NaiveDateTime) -> Result<SweepOutcome> {
    let mut outcome = SweepOutcome::default();

    for m in database::matches::list_open(conn)? {
        if m.deadline >= now {
            continue;
        }

        match m.kind {
            MatchKind::Tournament => sweep_tournament_match(conn, &m, now, &mut outcome)?,
            MatchKind::Ladder => sweep_ladder_match(conn, &m, &mut outcome)?,
        }
    }

    if outcome.report.tournament_matches > 0 || outcome.report.ladder_matches > 0 {
        info!(
            "Deadline sweep forced {} tournament and {} ladder matches",
            outcome.report.tournament_matches, outcome.report.ladder_matches
        );
    }
    Ok(outcome)
}

fn sweep_tournament_match(
    conn: &mut DbConn,
    m: &CompetitiveMatch,
    now: NaiveDateTime,
    outcome: &mut SweepOutcome,
) -> Result<()> {
    let forced = database::matches::transition_status(
        conn,
        m.id,
        &[MatchStatus::Scheduled, MatchStatus::Accepted],
        MatchStatus::Expired,
    )?;
    if !forced {
        return Ok(());
    }

    outcome.report.tournament_matches += 1;
    outcome.expired.push(m.clone());

    let tournament_id = m
        .tournament_id
        .context("Tournament match has no tournament reference")?;
    let match_number = m
        .match_number
        .context("Tournament match has no match number")?;
    let tournament = database::tournaments::find_by_id(conn, tournament_id)?
        .context("Expired match references a missing tournament")?;

    let advances = advancer::propagate_walkover(conn, &tournament, match_number, now)?;
    outcome.advances.extend(advances);
    Ok(())
}

fn sweep_ladder_match(
    conn: &mut DbConn,
    m: &CompetitiveMatch,
    outcome: &mut SweepOutcome,
) -> Result<()> {
    let forced = database::matches::transition_status(
        conn,
        m.id,
        &[MatchStatus::Scheduled, MatchStatus::Accepted],
        MatchStatus::Disputed,
    )?;
    if !forced {
        return Ok(());
    }

    outcome.report.ladder_matches += 1;
    outcome.forced_disputes.push(m.clone());
    Ok(())
}

impl SweepOutcome {
    pub fn notifications(&self) -> Vec<NotificationEvent> {
        let mut events = Vec::new();
        for m in &self.expired {
            events.push(NotificationEvent::for_match("match_expired", m.home_id, m.id));
            events.push(NotificationEvent::for_match("match_expired", m.away_id, m.id));
        }
        for m in &self.forced_disputes {
            events.push(NotificationEvent::for_match("dispute_raised", m.home_id, m.id));
            events.push(NotificationEvent::for_match("dispute_raised", m.away_id, m.id));
        }
        events.extend(progression::advance_notifications(&self.advances));
        events
    }
}

pub struct SweeperService {
    config: AppConfig,
}

impl SweeperService {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    /// Background loop for the serve command. Runs forever; a failed pass is
    /// logged and the next tick tries again.
    pub async fn run_loop(&self, pool: DbPool, notifier: Notifier) {
        let mut ticker =
            tokio::time::interval(Duration::from_secs(self.config.competition.sweep_interval_secs));

        loop {
            ticker.tick().await;
            match self.run_once(&pool) {
                Ok(outcome) => notifier.dispatch_all(outcome.notifications()),
                Err(e) => error!("Deadline sweep failed: {:?}", e),
            }
        }
    }

    pub fn run_once(&self, pool: &DbPool) -> Result<SweepOutcome> {
        let mut conn = database::get_connection(pool)?;
        sweep_once(&mut conn, Utc::now().naive_utc())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::testing::memory_pool;
    use crate::database::DbPool;
    use crate::domain::{TournamentFormat, TournamentStatus, Visibility};
    use crate::services::tournaments::start_tournament;
    use chrono::NaiveDate;

    fn base() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 7, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn after_window() -> NaiveDateTime {
        base() + chrono::Duration::minutes(500)
    }

    fn started_tournament(pool: &DbPool) -> i64 {
        let mut conn = pool.get().unwrap();
        let tournament = database::tournaments::insert_tournament(
            &mut conn,
            "Winter Cup",
            TournamentFormat::SingleElimination,
            Visibility::Public,
            1,
            120,
        )
        .unwrap();
        for (idx, participant) in [1i64, 2, 3, 4].iter().enumerate() {
            database::tournaments::add_player(&mut conn, tournament.id, *participant, idx as i32 + 1)
                .unwrap();
        }
        start_tournament(
            &mut conn,
            &tournament,
            &crate::config::settings::CompetitionSettings::default(),
            base(),
        )
        .unwrap();
        tournament.id
    }

    fn ladder_match(pool: &DbPool, deadline: NaiveDateTime) -> CompetitiveMatch {
        let mut conn = pool.get().unwrap();
        let ladder = database::ladders::insert_ladder(&mut conn, "Club Ladder", 100, 60).unwrap();
        database::ladders::insert_position(&mut conn, ladder.id, 2, 200).unwrap();
        database::matches::create_ladder_match(&mut conn, ladder.id, 200, 100, deadline).unwrap()
    }

    #[test]
    fn future_deadlines_are_left_alone() {
        let pool = memory_pool();
        let m = ladder_match(&pool, base() + chrono::Duration::minutes(60));
        let mut conn = pool.get().unwrap();

        let outcome = sweep_once(&mut conn, base()).unwrap();
        assert_eq!(outcome.report, SweepReport::default());

        let stored = database::matches::find_by_id(&mut conn, m.id).unwrap().unwrap();
        assert_eq!(stored.status, MatchStatus::Scheduled);
    }

    #[test]
    fn overdue_ladder_matches_become_disputes() {
        let pool = memory_pool();
        let m = ladder_match(&pool, base());
        let mut conn = pool.get().unwrap();

        let outcome = sweep_once(&mut conn, after_window()).unwrap();
        assert_eq!(outcome.report.ladder_matches, 1);

        let stored = database::matches::find_by_id(&mut conn, m.id).unwrap().unwrap();
        assert_eq!(stored.status, MatchStatus::Disputed);
    }

    #[test]
    fn overdue_tournament_matches_expire() {
        let pool = memory_pool();
        let tournament_id = started_tournament(&pool);
        let mut conn = pool.get().unwrap();

        let outcome = sweep_once(&mut conn, after_window()).unwrap();
        assert_eq!(outcome.report.tournament_matches, 2);

        for m in database::matches::list_by_tournament(&mut conn, tournament_id).unwrap() {
            assert_eq!(m.status, MatchStatus::Expired);
        }
    }

    #[test]
    fn a_second_sweep_is_a_no_op() {
        let pool = memory_pool();
        started_tournament(&pool);
        ladder_match(&pool, base());
        let mut conn = pool.get().unwrap();

        let first = sweep_once(&mut conn, after_window()).unwrap();
        assert_eq!(first.report.tournament_matches, 2);
        assert_eq!(first.report.ladder_matches, 1);

        let second = sweep_once(&mut conn, after_window()).unwrap();
        assert_eq!(second.report, SweepReport::default());
    }

    #[test]
    fn expiry_propagates_a_completed_sibling_as_walkover() {
        let pool = memory_pool();
        let tournament_id = started_tournament(&pool);
        let mut conn = pool.get().unwrap();

        // Match 1 completes in time; match 2 never does.
        let tournament = database::tournaments::find_by_id(&mut conn, tournament_id)
            .unwrap()
            .unwrap();
        let m1 = database::matches::find_by_tournament_match(&mut conn, tournament_id, 1)
            .unwrap()
            .unwrap();
        database::matches::finalize(
            &mut conn,
            m1.id,
            &[MatchStatus::Scheduled],
            MatchStatus::Completed,
            None,
            Some(m1.home_id),
            crate::domain::ResolutionMethod::Consensus,
            None,
            base(),
        )
        .unwrap();
        advancer::record_result_and_advance(&mut conn, &tournament, 1, m1.home_id, base())
            .unwrap();

        let outcome = sweep_once(&mut conn, after_window()).unwrap();
        assert_eq!(outcome.report.tournament_matches, 1);

        // The sibling's winner walked through the final unopposed.
        assert!(outcome.advances.contains(&AdvanceEvent::TournamentCompleted {
            tournament_id,
            winner_id: m1.home_id,
        }));

        let stored = database::tournaments::find_by_id(&mut conn, tournament_id)
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, TournamentStatus::Completed);
    }

    #[test]
    fn completed_matches_are_never_touched() {
        let pool = memory_pool();
        let m = ladder_match(&pool, base());
        let mut conn = pool.get().unwrap();

        database::matches::finalize(
            &mut conn,
            m.id,
            &[MatchStatus::Scheduled],
            MatchStatus::Declined,
            None,
            None,
            crate::domain::ResolutionMethod::NoContest,
            None,
            base(),
        )
        .unwrap();

        let outcome = sweep_once(&mut conn, after_window()).unwrap();
        assert_eq!(outcome.report, SweepReport::default());

        let stored = database::matches::find_by_id(&mut conn, m.id).unwrap().unwrap();
        assert_eq!(stored.status, MatchStatus::Declined);
    }
}
