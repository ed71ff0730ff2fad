use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use chrono::Utc;
use std::sync::Arc;

use crate::api::models::{
    CreateTournamentRequest, CreatedResponse, MessageResponse, RoundView, SlotView,
    TournamentDetail,
};
use crate::clients::NotificationEvent;
use crate::database;
use crate::domain::{
    CompetitionError, CompetitionResult, TournamentFormat, TournamentStatus, Visibility,
};
use crate::services::{progression, tournaments};

use super::{authenticate, participant_view, AppState};

pub async fn create_tournament(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<CreateTournamentRequest>,
) -> Result<impl IntoResponse, CompetitionError> {
    let creator_id = authenticate(&state, &headers).await?;

    if request.name.trim().is_empty() {
        return Err(CompetitionError::validation("Tournament name is required"));
    }
    let format = match request.format.as_deref() {
        None => TournamentFormat::SingleElimination,
        Some(raw) => TournamentFormat::parse(raw)
            .map_err(|_| CompetitionError::validation("Unknown tournament format"))?,
    };
    let visibility = match request.visibility.as_deref() {
        None => Visibility::Public,
        Some(raw) => Visibility::parse(raw)
            .map_err(|_| CompetitionError::validation("Unknown visibility"))?,
    };
    let window = challenge_window(&state, request.challenge_window_mins)?;

    let mut conn = database::get_connection(&state.pool)?;
    let tournament = database::tournaments::insert_tournament(
        &mut conn,
        request.name.trim(),
        format,
        visibility,
        creator_id,
        window,
    )?;

    Ok((StatusCode::CREATED, Json(CreatedResponse { id: tournament.id })))
}

fn challenge_window(state: &AppState, requested: Option<i64>) -> CompetitionResult<i64> {
    match requested {
        None => Ok(state.config.competition.default_challenge_window_mins),
        Some(mins) if mins > 0 => Ok(mins),
        Some(_) => Err(CompetitionError::validation(
            "Challenge window must be positive",
        )),
    }
}

pub async fn join_tournament(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(tournament_id): Path<i64>,
) -> Result<impl IntoResponse, CompetitionError> {
    let participant_id = authenticate(&state, &headers).await?;

    let mut conn = database::get_connection(&state.pool)?;
    let tournament = database::tournaments::find_by_id(&mut conn, tournament_id)?
        .ok_or_else(|| CompetitionError::not_found("Tournament not found"))?;

    if tournament.status != TournamentStatus::Pending {
        return Err(CompetitionError::conflict(
            "Tournament is no longer open for registration",
        ));
    }

    let seed = database::tournaments::count_players(&mut conn, tournament_id)? + 1;
    let joined =
        database::tournaments::add_player(&mut conn, tournament_id, participant_id, seed)?;
    if !joined {
        return Err(CompetitionError::conflict(
            "You are already registered for this tournament",
        ));
    }

    Ok(Json(MessageResponse {
        message: "Registered".to_string(),
    }))
}

pub async fn start_tournament(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(tournament_id): Path<i64>,
) -> Result<impl IntoResponse, CompetitionError> {
    let caller_id = authenticate(&state, &headers).await?;

    let mut conn = database::get_connection(&state.pool)?;
    let tournament = database::tournaments::find_by_id(&mut conn, tournament_id)?
        .ok_or_else(|| CompetitionError::not_found("Tournament not found"))?;

    if tournament.creator_id != caller_id {
        return Err(CompetitionError::forbidden(
            "Only the tournament creator may start it",
        ));
    }

    let events = tournaments::start_tournament(
        &mut conn,
        &tournament,
        &state.config.competition,
        Utc::now().naive_utc(),
    )?;

    let mut notifications = progression::advance_notifications(&events);
    for participant in database::tournaments::list_players(&mut conn, tournament_id)? {
        notifications.push(NotificationEvent::for_tournament(
            "tournament_started",
            participant,
            tournament_id,
        ));
    }
    state.notifier.dispatch_all(notifications);

    Ok(Json(MessageResponse {
        message: "Tournament started".to_string(),
    }))
}

pub async fn get_tournament(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(tournament_id): Path<i64>,
) -> Result<impl IntoResponse, CompetitionError> {
    let caller_id = authenticate(&state, &headers).await?;

    let (tournament, participants, slots) = {
        let mut conn = database::get_connection(&state.pool)?;
        let tournament = database::tournaments::find_by_id(&mut conn, tournament_id)?
            .ok_or_else(|| CompetitionError::not_found("Tournament not found"))?;
        let participants = database::tournaments::list_players(&mut conn, tournament_id)?;
        let slots = database::brackets::list_slots(&mut conn, tournament_id)?;
        (tournament, participants, slots)
    };

    if tournament.visibility == Visibility::Private
        && tournament.creator_id != caller_id
        && !participants.contains(&caller_id)
    {
        return Err(CompetitionError::forbidden("This tournament is private"));
    }

    let profiles = state.directory.lookup_many(&participants).await;

    let mut rounds: Vec<RoundView> = Vec::new();
    for slot in &slots {
        let view = SlotView {
            match_number: slot.match_number,
            home: slot.home_id.map(|id| participant_view(&profiles, id)),
            away: slot.away_id.map(|id| participant_view(&profiles, id)),
            winner_id: slot.winner_id,
        };
        match rounds.last_mut() {
            Some(round) if round.round == slot.round => round.slots.push(view),
            _ => rounds.push(RoundView {
                round: slot.round,
                slots: vec![view],
            }),
        }
    }

    Ok(Json(TournamentDetail {
        id: tournament.id,
        name: tournament.name.clone(),
        status: tournament.status,
        winner_id: tournament.winner_id,
        participants: participants
            .iter()
            .map(|&id| participant_view(&profiles, id))
            .collect(),
        bracket: rounds,
    }))
}
