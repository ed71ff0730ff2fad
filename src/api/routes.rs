use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::api::handlers::{admin, ladders, matches, tournaments, AppState};

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/tournaments", post(tournaments::create_tournament))
        .route("/api/tournaments/:id", get(tournaments::get_tournament))
        .route("/api/tournaments/:id/join", post(tournaments::join_tournament))
        .route("/api/tournaments/:id/start", post(tournaments::start_tournament))
        .route("/api/ladders", post(ladders::create_ladder))
        .route("/api/ladders/:id", get(ladders::get_ladder))
        .route("/api/ladders/:id/join", post(ladders::join_ladder))
        .route("/api/ladders/:id/leave", post(ladders::leave_ladder))
        .route("/api/ladders/:id/challenge", post(ladders::issue_challenge))
        .route("/api/matches/:id", get(matches::get_match))
        .route("/api/matches/:id/accept", post(matches::accept_match))
        .route("/api/matches/:id/decline", post(matches::decline_match))
        .route("/api/matches/:id/result", post(matches::submit_result))
        .route("/api/matches/:id/reset", post(matches::reset_match))
        .route("/api/matches/:id/resolve", post(matches::resolve_match))
        .route("/api/admin/sweep", post(admin::trigger_sweep))
        .with_state(state)
}
