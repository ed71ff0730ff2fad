use chrono::NaiveDateTime;
use log::{info, warn};

use crate::database::models::CompetitiveMatch;
use crate::database::{self, DbConn};
use crate::domain::{
    encode_scores, CompetitionError, CompetitionResult, MatchKind, MatchStatus, ResolutionMethod,
    SetScore, Side,
};

/// How an authorized resolver settles a disputed match.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Take one side's submission verbatim.
    Accept(Side),
    /// Supply a result neither side reported.
    Custom {
        scores: Vec<SetScore>,
        winner_id: i64,
    },
    /// Void the match with no winner.
    NoContest,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResolutionOutcome {
    /// The match completed; the caller owns downstream advancement once.
    Completed {
        winner_id: i64,
        scores: Vec<SetScore>,
    },
    /// The match was voided; nobody advances.
    Voided,
}

/// Settles a disputed match. Authorization (tournament or ladder creator) is
/// checked by the caller, which knows the surrounding context record.
pub fn resolve_dispute(
    conn: &mut DbConn,
    m: &CompetitiveMatch,
    resolver_id: i64,
    decision: Decision,
    now: NaiveDateTime,
) -> CompetitionResult<ResolutionOutcome> {
    if m.status != MatchStatus::Disputed {
        return Err(CompetitionError::conflict(
            "Only a disputed match can be resolved",
        ));
    }

    match decision {
        Decision::Accept(side) => {
            let submission = m.submission(side).ok_or_else(|| {
                CompetitionError::conflict("That side never submitted a result")
            })?;
            complete(
                conn,
                m,
                submission.scores.clone(),
                submission.winner_id,
                ResolutionMethod::AdminAccept,
                resolver_id,
                now,
            )
        }
        Decision::Custom { scores, winner_id } => {
            if scores.is_empty() {
                return Err(CompetitionError::validation(
                    "A custom resolution needs at least one set score",
                ));
            }
            if !m.involves(winner_id) {
                return Err(CompetitionError::validation(
                    "Custom winner is not a participant of this match",
                ));
            }
            complete(
                conn,
                m,
                scores,
                winner_id,
                ResolutionMethod::AdminCustom,
                resolver_id,
                now,
            )
        }
        Decision::NoContest => void(conn, m, resolver_id, now),
    }
}

fn complete(
    conn: &mut DbConn,
    m: &CompetitiveMatch,
    scores: Vec<SetScore>,
    winner_id: i64,
    method: ResolutionMethod,
    resolver_id: i64,
    now: NaiveDateTime,
) -> CompetitionResult<ResolutionOutcome> {
    let scores_json = encode_scores(&scores)?;
    let sealed = database::matches::finalize(
        conn,
        m.id,
        &[MatchStatus::Disputed],
        MatchStatus::Completed,
        Some(&scores_json),
        Some(winner_id),
        method,
        Some(resolver_id),
        now,
    )?;
    if !sealed {
        return Err(CompetitionError::conflict("Match is no longer disputed"));
    }

    info!(
        "Match {} resolved by {} ({})",
        m.id,
        resolver_id,
        method.as_str()
    );
    Ok(ResolutionOutcome::Completed { winner_id, scores })
}

fn void(
    conn: &mut DbConn,
    m: &CompetitiveMatch,
    resolver_id: i64,
    now: NaiveDateTime,
) -> CompetitionResult<ResolutionOutcome> {
    let sealed = database::matches::finalize(
        conn,
        m.id,
        &[MatchStatus::Disputed],
        MatchStatus::NoContest,
        None,
        None,
        ResolutionMethod::NoContest,
        Some(resolver_id),
        now,
    )?;
    if !sealed {
        return Err(CompetitionError::conflict("Match is no longer disputed"));
    }

    if m.kind == MatchKind::Tournament {
        // Neither participant progresses; the fed slot stays open until an
        // admin re-seats it by hand.
        warn!(
            "Tournament match {} voided as no contest; bracket slot left unresolved",
            m.id
        );
    }
    Ok(ResolutionOutcome::Voided)
}
