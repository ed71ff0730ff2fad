use axum::{
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Json},
};
use std::sync::Arc;

use crate::api::models::SweepResponse;
use crate::domain::CompetitionError;
use crate::services::sweeper::SweeperService;

use super::{authenticate, AppState};

/// Manual deadline-sweep trigger; the scheduled loop runs the same pass.
pub async fn trigger_sweep(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, CompetitionError> {
    authenticate(&state, &headers).await?;

    let sweeper = SweeperService::new(state.config.clone());
    let outcome = sweeper.run_once(&state.pool)?;
    state.notifier.dispatch_all(outcome.notifications());

    Ok(Json(SweepResponse {
        tournament_matches: outcome.report.tournament_matches,
        ladder_matches: outcome.report.ladder_matches,
    }))
}
