use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use chrono::{Duration, Utc};
use std::sync::Arc;

use crate::api::models::{
    ChallengeRequest, CreateLadderRequest, CreatedResponse, LadderDetail, MessageResponse,
    StandingView,
};
use crate::clients::NotificationEvent;
use crate::database;
use crate::database::models::Ladder;
use crate::domain::{CompetitionError, CompetitionResult, LadderStatus};

use super::{authenticate, participant_view, AppState};

pub async fn create_ladder(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<CreateLadderRequest>,
) -> Result<impl IntoResponse, CompetitionError> {
    let creator_id = authenticate(&state, &headers).await?;

    if request.name.trim().is_empty() {
        return Err(CompetitionError::validation("Ladder name is required"));
    }
    let window = match request.challenge_window_mins {
        None => state.config.competition.default_challenge_window_mins,
        Some(mins) if mins > 0 => mins,
        Some(_) => {
            return Err(CompetitionError::validation(
                "Challenge window must be positive",
            ))
        }
    };

    let mut conn = database::get_connection(&state.pool)?;
    let ladder =
        database::ladders::insert_ladder(&mut conn, request.name.trim(), creator_id, window)?;

    Ok((StatusCode::CREATED, Json(CreatedResponse { id: ladder.id })))
}

pub async fn join_ladder(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(ladder_id): Path<i64>,
) -> Result<impl IntoResponse, CompetitionError> {
    let participant_id = authenticate(&state, &headers).await?;

    let mut conn = database::get_connection(&state.pool)?;
    let ladder = active_ladder(&mut conn, ladder_id)?;

    // New members start at the bottom.
    let bottom = database::ladders::count_positions(&mut conn, ladder.id)? + 1;
    let joined = database::ladders::insert_position(&mut conn, ladder.id, bottom, participant_id)?;
    if !joined {
        return Err(CompetitionError::conflict(
            "You already hold a position on this ladder",
        ));
    }

    Ok(Json(MessageResponse {
        message: format!("Joined at rank {bottom}"),
    }))
}

pub async fn leave_ladder(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(ladder_id): Path<i64>,
) -> Result<impl IntoResponse, CompetitionError> {
    let participant_id = authenticate(&state, &headers).await?;

    let mut conn = database::get_connection(&state.pool)?;
    let ladder = active_ladder(&mut conn, ladder_id)?;

    if ladder.creator_id == participant_id {
        return Err(CompetitionError::forbidden(
            "The ladder creator cannot leave their own ladder",
        ));
    }

    let removed = database::ladders::remove_position(&mut conn, ladder.id, participant_id)?;
    if !removed {
        return Err(CompetitionError::not_found(
            "You do not hold a position on this ladder",
        ));
    }

    Ok(Json(MessageResponse {
        message: "Left the ladder".to_string(),
    }))
}

/// Issues a rank challenge. The challenger must sit strictly below the
/// challengee, and only one unresolved match per pair may exist at a time.
pub async fn issue_challenge(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(ladder_id): Path<i64>,
    Json(request): Json<ChallengeRequest>,
) -> Result<impl IntoResponse, CompetitionError> {
    let challenger_id = authenticate(&state, &headers).await?;

    if request.challengee_id == challenger_id {
        return Err(CompetitionError::validation("You cannot challenge yourself"));
    }

    let mut conn = database::get_connection(&state.pool)?;
    let ladder = active_ladder(&mut conn, ladder_id)?;

    let challenger = database::ladders::find_position(&mut conn, ladder.id, challenger_id)?
        .ok_or_else(|| CompetitionError::forbidden("You are not a member of this ladder"))?;
    let challengee =
        database::ladders::find_position(&mut conn, ladder.id, request.challengee_id)?
            .ok_or_else(|| CompetitionError::validation("Challengee is not on this ladder"))?;

    if challenger.rank <= challengee.rank {
        return Err(CompetitionError::validation(
            "You can only challenge members ranked above you",
        ));
    }

    let open = database::matches::find_open_ladder_match(
        &mut conn,
        ladder.id,
        challenger_id,
        request.challengee_id,
    )?;
    if open.is_some() {
        return Err(CompetitionError::conflict(
            "There is already an unresolved match between you two",
        ));
    }

    let deadline = Utc::now().naive_utc() + Duration::minutes(ladder.challenge_window_mins);
    let m = database::matches::create_ladder_match(
        &mut conn,
        ladder.id,
        challenger_id,
        request.challengee_id,
        deadline,
    )?;

    state.notifier.dispatch(
        NotificationEvent::for_match("challenge_issued", request.challengee_id, m.id)
            .ladder(ladder.id),
    );

    Ok((StatusCode::CREATED, Json(CreatedResponse { id: m.id })))
}

pub async fn get_ladder(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(ladder_id): Path<i64>,
) -> Result<impl IntoResponse, CompetitionError> {
    authenticate(&state, &headers).await?;

    let (ladder, positions) = {
        let mut conn = database::get_connection(&state.pool)?;
        let ladder = database::ladders::find_by_id(&mut conn, ladder_id)?
            .ok_or_else(|| CompetitionError::not_found("Ladder not found"))?;
        let positions = database::ladders::list_positions(&mut conn, ladder_id)?;
        (ladder, positions)
    };

    let ids: Vec<i64> = positions.iter().map(|p| p.participant_id).collect();
    let profiles = state.directory.lookup_many(&ids).await;

    Ok(Json(LadderDetail {
        id: ladder.id,
        name: ladder.name.clone(),
        status: ladder.status,
        standings: positions
            .iter()
            .map(|p| StandingView {
                rank: p.rank,
                participant: participant_view(&profiles, p.participant_id),
            })
            .collect(),
    }))
}

fn active_ladder(
    conn: &mut database::DbConn,
    ladder_id: i64,
) -> CompetitionResult<Ladder> {
    let ladder = database::ladders::find_by_id(conn, ladder_id)?
        .ok_or_else(|| CompetitionError::not_found("Ladder not found"))?;
    if ladder.status != LadderStatus::Active {
        return Err(CompetitionError::conflict("Ladder is closed"));
    }
    Ok(ladder)
}
