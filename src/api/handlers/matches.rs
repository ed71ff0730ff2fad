use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::{IntoResponse, Json},
};
use chrono::Utc;
use std::sync::Arc;

use crate::api::models::{
    MatchDetail, MatchStatusResponse, ResolveRequest, SubmissionView, SubmitResultRequest,
};
use crate::clients::NotificationEvent;
use crate::consensus::{self, Decision, ResolutionOutcome, SubmissionOutcome};
use crate::database;
use crate::database::models::CompetitiveMatch;
use crate::domain::{
    decode_scores, CompetitionError, CompetitionResult, MatchKind, Side, Submission,
};
use crate::services::progression;

use super::{authenticate, participant_view, AppState};

pub async fn accept_match(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(match_id): Path<i64>,
) -> Result<impl IntoResponse, CompetitionError> {
    let participant_id = authenticate(&state, &headers).await?;

    let mut conn = database::get_connection(&state.pool)?;
    let m = load_match(&mut conn, match_id)?;
    consensus::accept_challenge(&mut conn, &m, participant_id)?;

    status_response(&mut conn, match_id)
}

pub async fn decline_match(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(match_id): Path<i64>,
) -> Result<impl IntoResponse, CompetitionError> {
    let participant_id = authenticate(&state, &headers).await?;

    let mut conn = database::get_connection(&state.pool)?;
    let m = load_match(&mut conn, match_id)?;
    consensus::decline_challenge(&mut conn, &m, participant_id)?;

    status_response(&mut conn, match_id)
}

pub async fn submit_result(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(match_id): Path<i64>,
    Json(request): Json<SubmitResultRequest>,
) -> Result<impl IntoResponse, CompetitionError> {
    let participant_id = authenticate(&state, &headers).await?;
    let now = Utc::now().naive_utc();

    let mut conn = database::get_connection(&state.pool)?;
    let m = load_match(&mut conn, match_id)?;

    let outcome = consensus::submit_result(
        &mut conn,
        &m,
        participant_id,
        &request.scores,
        request.winner_id,
        now,
    )?;

    match outcome {
        SubmissionOutcome::Agreed { winner_id, .. } => {
            let advances = progression::on_match_completed(&mut conn, &m, winner_id, now)?;
            state
                .notifier
                .dispatch_all(progression::completion_notifications(&m, &advances));
        }
        SubmissionOutcome::Disputed => {
            state.notifier.dispatch_all([
                NotificationEvent::for_match("dispute_raised", m.home_id, m.id),
                NotificationEvent::for_match("dispute_raised", m.away_id, m.id),
            ]);
        }
        SubmissionOutcome::Pending | SubmissionOutcome::AlreadyResolved => {}
    }

    status_response(&mut conn, match_id)
}

pub async fn reset_match(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(match_id): Path<i64>,
) -> Result<impl IntoResponse, CompetitionError> {
    let participant_id = authenticate(&state, &headers).await?;

    let mut conn = database::get_connection(&state.pool)?;
    let m = load_match(&mut conn, match_id)?;
    consensus::reset_submission(&mut conn, &m, participant_id)?;

    status_response(&mut conn, match_id)
}

pub async fn resolve_match(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(match_id): Path<i64>,
    Json(request): Json<ResolveRequest>,
) -> Result<impl IntoResponse, CompetitionError> {
    let resolver_id = authenticate(&state, &headers).await?;
    let now = Utc::now().naive_utc();
    let decision = parse_decision(&request)?;

    let mut conn = database::get_connection(&state.pool)?;
    let m = load_match(&mut conn, match_id)?;

    if resolver_for(&mut conn, &m)? != resolver_id {
        return Err(CompetitionError::forbidden(
            "Only the competition creator may resolve disputes",
        ));
    }

    let outcome = consensus::resolve_dispute(&mut conn, &m, resolver_id, decision, now)?;

    match outcome {
        ResolutionOutcome::Completed { winner_id, .. } => {
            let advances = progression::on_match_completed(&mut conn, &m, winner_id, now)?;
            state
                .notifier
                .dispatch_all(progression::completion_notifications(&m, &advances));
        }
        ResolutionOutcome::Voided => {
            state.notifier.dispatch_all([
                NotificationEvent::for_match("match_voided", m.home_id, m.id),
                NotificationEvent::for_match("match_voided", m.away_id, m.id),
            ]);
        }
    }

    status_response(&mut conn, match_id)
}

pub async fn get_match(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(match_id): Path<i64>,
) -> Result<impl IntoResponse, CompetitionError> {
    authenticate(&state, &headers).await?;

    let m = {
        let mut conn = database::get_connection(&state.pool)?;
        load_match(&mut conn, match_id)?
    };

    let profiles = state.directory.lookup_many(&[m.home_id, m.away_id]).await;

    let final_scores = m
        .final_scores
        .as_deref()
        .map(decode_scores)
        .transpose()?;

    Ok(Json(MatchDetail {
        id: m.id,
        kind: m.kind,
        status: m.status,
        tournament_id: m.tournament_id,
        match_number: m.match_number,
        ladder_id: m.ladder_id,
        home: participant_view(&profiles, m.home_id),
        away: participant_view(&profiles, m.away_id),
        deadline: m.deadline,
        home_submission: m.home_submission.as_ref().map(submission_view),
        away_submission: m.away_submission.as_ref().map(submission_view),
        final_scores,
        final_winner_id: m.final_winner_id,
        resolution: m.resolution,
    }))
}

fn submission_view(submission: &Submission) -> SubmissionView {
    SubmissionView {
        scores: submission.scores.clone(),
        winner_id: submission.winner_id,
        submitted_at: submission.submitted_at,
    }
}

fn parse_decision(request: &ResolveRequest) -> CompetitionResult<Decision> {
    match request.decision.as_str() {
        "accept_home" => Ok(Decision::Accept(Side::Home)),
        "accept_away" => Ok(Decision::Accept(Side::Away)),
        "no_contest" => Ok(Decision::NoContest),
        "custom" => {
            let scores = request
                .scores
                .clone()
                .ok_or_else(|| CompetitionError::validation("Custom resolution needs scores"))?;
            let winner_id = request
                .winner_id
                .ok_or_else(|| CompetitionError::validation("Custom resolution needs a winner"))?;
            Ok(Decision::Custom { scores, winner_id })
        }
        other => Err(CompetitionError::validation(format!(
            "Unknown decision: {other}"
        ))),
    }
}

/// Who is allowed to resolve disputes for this match: the creator of its
/// surrounding tournament or ladder.
fn resolver_for(conn: &mut database::DbConn, m: &CompetitiveMatch) -> CompetitionResult<i64> {
    match m.kind {
        MatchKind::Tournament => {
            let tournament_id = m
                .tournament_id
                .ok_or_else(|| CompetitionError::not_found("Match has no tournament"))?;
            let tournament = database::tournaments::find_by_id(conn, tournament_id)?
                .ok_or_else(|| CompetitionError::not_found("Tournament not found"))?;
            Ok(tournament.creator_id)
        }
        MatchKind::Ladder => {
            let ladder_id = m
                .ladder_id
                .ok_or_else(|| CompetitionError::not_found("Match has no ladder"))?;
            let ladder = database::ladders::find_by_id(conn, ladder_id)?
                .ok_or_else(|| CompetitionError::not_found("Ladder not found"))?;
            Ok(ladder.creator_id)
        }
    }
}

fn load_match(
    conn: &mut database::DbConn,
    match_id: i64,
) -> CompetitionResult<CompetitiveMatch> {
    database::matches::find_by_id(conn, match_id)?
        .ok_or_else(|| CompetitionError::not_found("Match not found"))
}

fn status_response(
    conn: &mut database::DbConn,
    match_id: i64,
) -> Result<Json<MatchStatusResponse>, CompetitionError> {
    let m = load_match(conn, match_id)?;
    Ok(Json(MatchStatusResponse {
        match_id: m.id,
        status: m.status,
        final_winner_id: m.final_winner_id,
    }))
}
