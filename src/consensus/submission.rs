use chrono::NaiveDateTime;
use log::info;

use crate::database::models::CompetitiveMatch;
use crate::database::{self, DbConn};
use crate::domain::{
    encode_scores, CompetitionError, CompetitionResult, MatchKind, MatchStatus, ResolutionMethod,
    SetScore, Side,
};

/// What a recorded submission did to the match.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionOutcome {
    /// Recorded; waiting on the other side.
    Pending,
    /// Both sides agreed and THIS call sealed the match. The caller owns the
    /// downstream advancement exactly once.
    Agreed {
        winner_id: i64,
        scores: Vec<SetScore>,
    },
    /// The submissions disagree; the match needs a human.
    Disputed,
    /// A concurrent writer sealed the match first; nothing left to do.
    AlreadyResolved,
}

/// Records one participant's result and runs the consensus comparison when
/// both sides are in. Every state change is a conditional write, so two
/// racing submissions (or a racing deadline sweep) leave exactly one winner.
pub fn submit_result(
    conn: &mut DbConn,
    m: &CompetitiveMatch,
    participant_id: i64,
    scores: &[SetScore],
    declared_winner_id: i64,
    now: NaiveDateTime,
) -> CompetitionResult<SubmissionOutcome> {
    let side = participant_side(m, participant_id)?;

    if scores.is_empty() {
        return Err(CompetitionError::validation(
            "A result needs at least one set score",
        ));
    }
    if !m.involves(declared_winner_id) {
        return Err(CompetitionError::validation(
            "Declared winner is not a participant of this match",
        ));
    }

    let open_status = m.kind.open_status();
    if m.status != open_status {
        return Err(status_conflict(m));
    }

    let scores_json = encode_scores(scores)?;
    let recorded = database::matches::record_submission(
        conn,
        m.id,
        side,
        &scores_json,
        declared_winner_id,
        now,
        open_status,
    )?;
    if !recorded {
        // Either a duplicate submission or the status moved underneath us.
        let current = reload(conn, m.id)?;
        let err = if current.submission(side).is_some() {
            CompetitionError::conflict("You have already submitted a result for this match")
        } else {
            CompetitionError::conflict(format!(
                "Match is {} and not open for submission",
                current.status.as_str()
            ))
        };
        return Err(err);
    }

    let current = reload(conn, m.id)?;
    let (Some(home), Some(away)) = (&current.home_submission, &current.away_submission) else {
        return Ok(SubmissionOutcome::Pending);
    };

    if home.agrees_with(away) {
        let sealed = database::matches::finalize(
            conn,
            current.id,
            &[open_status],
            MatchStatus::Completed,
            Some(&scores_json),
            Some(home.winner_id),
            ResolutionMethod::Consensus,
            None,
            now,
        )?;
        if !sealed {
            return Ok(SubmissionOutcome::AlreadyResolved);
        }

        info!("Match {} completed by consensus", current.id);
        Ok(SubmissionOutcome::Agreed {
            winner_id: home.winner_id,
            scores: home.scores.clone(),
        })
    } else {
        let moved = database::matches::transition_status(
            conn,
            current.id,
            &[open_status],
            MatchStatus::Disputed,
        )?;
        if !moved {
            return Ok(SubmissionOutcome::AlreadyResolved);
        }

        info!("Match {} submissions disagree, marked disputed", current.id);
        Ok(SubmissionOutcome::Disputed)
    }
}

/// Clears the calling participant's own submission on a disputed match and
/// reopens it for a fresh consensus attempt.
pub fn reset_submission(
    conn: &mut DbConn,
    m: &CompetitiveMatch,
    participant_id: i64,
) -> CompetitionResult<()> {
    let side = participant_side(m, participant_id)?;

    if m.status != MatchStatus::Disputed {
        return Err(CompetitionError::conflict(
            "Only a disputed match can be reset",
        ));
    }
    if m.submission(side).is_none() {
        return Err(CompetitionError::conflict(
            "No submission of yours to clear on this match",
        ));
    }

    let reopened =
        database::matches::clear_submission(conn, m.id, side, m.kind.open_status())?;
    if !reopened {
        return Err(CompetitionError::conflict(
            "Match is no longer disputed",
        ));
    }

    info!("Match {} reset by participant {}", m.id, participant_id);
    Ok(())
}

/// Ladder challengee accepts the challenge, opening the match for results.
pub fn accept_challenge(
    conn: &mut DbConn,
    m: &CompetitiveMatch,
    participant_id: i64,
) -> CompetitionResult<()> {
    answer_challenge(conn, m, participant_id, MatchStatus::Accepted)
}

/// Ladder challengee declines; terminal.
pub fn decline_challenge(
    conn: &mut DbConn,
    m: &CompetitiveMatch,
    participant_id: i64,
) -> CompetitionResult<()> {
    answer_challenge(conn, m, participant_id, MatchStatus::Declined)
}

fn answer_challenge(
    conn: &mut DbConn,
    m: &CompetitiveMatch,
    participant_id: i64,
    to: MatchStatus,
) -> CompetitionResult<()> {
    if m.kind != MatchKind::Ladder {
        return Err(CompetitionError::validation(
            "Tournament matches do not need acceptance",
        ));
    }
    if participant_id != m.away_id {
        return Err(CompetitionError::forbidden(
            "Only the challenged member may answer a challenge",
        ));
    }

    let moved =
        database::matches::transition_status(conn, m.id, &[MatchStatus::Scheduled], to)?;
    if !moved {
        return Err(CompetitionError::conflict(
            "Challenge has already been answered or forced",
        ));
    }
    Ok(())
}

fn participant_side(m: &CompetitiveMatch, participant_id: i64) -> CompetitionResult<Side> {
    m.side_of(participant_id).ok_or_else(|| {
        CompetitionError::forbidden("You are not a participant of this match")
    })
}

fn status_conflict(m: &CompetitiveMatch) -> CompetitionError {
    match (m.kind, m.status) {
        (MatchKind::Ladder, MatchStatus::Scheduled) => {
            CompetitionError::conflict("Challenge has not been accepted yet")
        }
        _ => CompetitionError::conflict(format!(
            "Match is {} and not open for submission",
            m.status.as_str()
        )),
    }
}

fn reload(conn: &mut DbConn, match_id: i64) -> CompetitionResult<CompetitiveMatch> {
    database::matches::find_by_id(conn, match_id)?
        .ok_or_else(|| CompetitionError::not_found("Match disappeared during the operation"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::testing::memory_pool;
    use crate::database::DbPool;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 5, 2)
            .unwrap()
            .and_hms_opt(19, 30, 0)
            .unwrap()
    }

    fn scores() -> Vec<SetScore> {
        vec![SetScore { home: 6, away: 3 }, SetScore { home: 6, away: 4 }]
    }

    fn seed_ladder_match(pool: &DbPool) -> CompetitiveMatch {
        let mut conn = pool.get().unwrap();
        let ladder =
            database::ladders::insert_ladder(&mut conn, "Club Ladder", 100, 60).unwrap();
        database::ladders::insert_position(&mut conn, ladder.id, 2, 200).unwrap();

        database::matches::create_ladder_match(&mut conn, ladder.id, 200, 100, now()).unwrap()
    }

    fn accepted_ladder_match(pool: &DbPool) -> CompetitiveMatch {
        let m = seed_ladder_match(pool);
        let mut conn = pool.get().unwrap();
        accept_challenge(&mut conn, &m, m.away_id).unwrap();
        database::matches::find_by_id(&mut conn, m.id).unwrap().unwrap()
    }

    #[test]
    fn submission_before_acceptance_is_rejected() {
        let pool = memory_pool();
        let m = seed_ladder_match(&pool);
        let mut conn = pool.get().unwrap();

        let err = submit_result(&mut conn, &m, 200, &scores(), 200, now()).unwrap_err();
        assert!(matches!(err, CompetitionError::Conflict(_)));
    }

    #[test]
    fn only_the_challengee_may_answer() {
        let pool = memory_pool();
        let m = seed_ladder_match(&pool);
        let mut conn = pool.get().unwrap();

        let err = accept_challenge(&mut conn, &m, m.home_id).unwrap_err();
        assert!(matches!(err, CompetitionError::Forbidden(_)));
    }

    #[test]
    fn decline_is_terminal() {
        let pool = memory_pool();
        let m = seed_ladder_match(&pool);
        let mut conn = pool.get().unwrap();

        decline_challenge(&mut conn, &m, m.away_id).unwrap();

        let stored = database::matches::find_by_id(&mut conn, m.id).unwrap().unwrap();
        assert_eq!(stored.status, MatchStatus::Declined);

        let again = accept_challenge(&mut conn, &stored, m.away_id).unwrap_err();
        assert!(matches!(again, CompetitionError::Conflict(_)));
    }

    #[test]
    fn matching_submissions_complete_regardless_of_order() {
        for first_submitter in [200i64, 100i64] {
            let pool = memory_pool();
            let m = accepted_ladder_match(&pool);
            let mut conn = pool.get().unwrap();
            let second_submitter = if first_submitter == 200 { 100 } else { 200 };

            let first =
                submit_result(&mut conn, &m, first_submitter, &scores(), 200, now()).unwrap();
            assert_eq!(first, SubmissionOutcome::Pending);

            let m = database::matches::find_by_id(&mut conn, m.id).unwrap().unwrap();
            assert_eq!(m.status, MatchStatus::Accepted);

            let second =
                submit_result(&mut conn, &m, second_submitter, &scores(), 200, now()).unwrap();
            assert_eq!(
                second,
                SubmissionOutcome::Agreed {
                    winner_id: 200,
                    scores: scores(),
                }
            );

            let sealed = database::matches::find_by_id(&mut conn, m.id).unwrap().unwrap();
            assert_eq!(sealed.status, MatchStatus::Completed);
            assert_eq!(sealed.final_winner_id, Some(200));
            assert_eq!(sealed.resolution, Some(ResolutionMethod::Consensus));
        }
    }

    #[test]
    fn disagreeing_winners_dispute_the_match() {
        let pool = memory_pool();
        let m = accepted_ladder_match(&pool);
        let mut conn = pool.get().unwrap();

        submit_result(&mut conn, &m, 200, &scores(), 200, now()).unwrap();
        let m = database::matches::find_by_id(&mut conn, m.id).unwrap().unwrap();
        let outcome = submit_result(&mut conn, &m, 100, &scores(), 100, now()).unwrap();

        assert_eq!(outcome, SubmissionOutcome::Disputed);
        let stored = database::matches::find_by_id(&mut conn, m.id).unwrap().unwrap();
        assert_eq!(stored.status, MatchStatus::Disputed);
        assert_eq!(stored.final_winner_id, None);
    }

    #[test]
    fn duplicate_submission_is_rejected() {
        let pool = memory_pool();
        let m = accepted_ladder_match(&pool);
        let mut conn = pool.get().unwrap();

        submit_result(&mut conn, &m, 200, &scores(), 200, now()).unwrap();
        let m = database::matches::find_by_id(&mut conn, m.id).unwrap().unwrap();

        let err = submit_result(&mut conn, &m, 200, &scores(), 200, now()).unwrap_err();
        assert!(matches!(err, CompetitionError::Conflict(_)));
    }

    #[test]
    fn outsiders_may_not_submit() {
        let pool = memory_pool();
        let m = accepted_ladder_match(&pool);
        let mut conn = pool.get().unwrap();

        let err = submit_result(&mut conn, &m, 999, &scores(), 200, now()).unwrap_err();
        assert!(matches!(err, CompetitionError::Forbidden(_)));
    }

    #[test]
    fn declared_winner_must_be_a_participant() {
        let pool = memory_pool();
        let m = accepted_ladder_match(&pool);
        let mut conn = pool.get().unwrap();

        let err = submit_result(&mut conn, &m, 200, &scores(), 999, now()).unwrap_err();
        assert!(matches!(err, CompetitionError::Validation(_)));
    }

    #[test]
    fn reset_reopens_a_disputed_match_for_fresh_consensus() {
        let pool = memory_pool();
        let m = accepted_ladder_match(&pool);
        let mut conn = pool.get().unwrap();

        submit_result(&mut conn, &m, 200, &scores(), 200, now()).unwrap();
        let m = database::matches::find_by_id(&mut conn, m.id).unwrap().unwrap();
        submit_result(&mut conn, &m, 100, &scores(), 100, now()).unwrap();

        let disputed = database::matches::find_by_id(&mut conn, m.id).unwrap().unwrap();
        reset_submission(&mut conn, &disputed, 100).unwrap();

        let reopened = database::matches::find_by_id(&mut conn, m.id).unwrap().unwrap();
        assert_eq!(reopened.status, MatchStatus::Accepted);
        assert!(reopened.away_submission.is_none());
        assert!(reopened.home_submission.is_some());

        // The second attempt can now agree.
        let outcome = submit_result(&mut conn, &reopened, 100, &scores(), 200, now()).unwrap();
        assert_eq!(
            outcome,
            SubmissionOutcome::Agreed {
                winner_id: 200,
                scores: scores(),
            }
        );
    }

    #[test]
    fn reset_requires_a_dispute() {
        let pool = memory_pool();
        let m = accepted_ladder_match(&pool);
        let mut conn = pool.get().unwrap();

        let err = reset_submission(&mut conn, &m, 200).unwrap_err();
        assert!(matches!(err, CompetitionError::Conflict(_)));
    }

    #[test]
    fn submission_after_a_forced_outcome_fails_gracefully() {
        let pool = memory_pool();
        let m = accepted_ladder_match(&pool);
        let mut conn = pool.get().unwrap();

        // A sweep forces the match while the player is typing.
        database::matches::transition_status(
            &mut conn,
            m.id,
            &[MatchStatus::Accepted],
            MatchStatus::Disputed,
        )
        .unwrap();

        let err = submit_result(&mut conn, &m, 200, &scores(), 200, now()).unwrap_err();
        assert!(matches!(err, CompetitionError::Conflict(_)));

        let stored = database::matches::find_by_id(&mut conn, m.id).unwrap().unwrap();
        assert_eq!(stored.status, MatchStatus::Disputed);
        assert!(stored.home_submission.is_none());
    }
}
