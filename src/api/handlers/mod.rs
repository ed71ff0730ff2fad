use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use log::error;

use crate::clients::{DirectoryClient, IdentityClient, Notifier};
use crate::config::AppConfig;
use crate::database::DbPool;
use crate::domain::{CompetitionError, CompetitionResult};

pub mod admin;
pub mod ladders;
pub mod matches;
pub mod tournaments;

pub struct AppState {
    pub pool: DbPool,
    pub config: AppConfig,
    pub identity: IdentityClient,
    pub directory: DirectoryClient,
    pub notifier: Notifier,
}

/// Resolves the caller's participant id from the Authorization header via
/// the identity service.
pub async fn authenticate(state: &AppState, headers: &HeaderMap) -> CompetitionResult<i64> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| CompetitionError::unauthorized("Missing bearer token"))?;

    state.identity.verify_token(token).await
}

/// Decorates a bare participant id with directory data when available.
pub fn participant_view(
    profiles: &std::collections::HashMap<i64, crate::clients::ParticipantProfile>,
    participant_id: i64,
) -> crate::api::models::ParticipantView {
    let profile = profiles.get(&participant_id);
    crate::api::models::ParticipantView {
        participant_id,
        display_name: profile.map(|p| p.display_name.clone()),
        skill_tier: profile.and_then(|p| p.skill_tier.clone()),
    }
}

impl IntoResponse for CompetitionError {
    fn into_response(self) -> Response {
        let status = match &self {
            CompetitionError::Validation(_) => StatusCode::BAD_REQUEST,
            CompetitionError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            CompetitionError::Forbidden(_) => StatusCode::FORBIDDEN,
            CompetitionError::NotFound(_) => StatusCode::NOT_FOUND,
            CompetitionError::Conflict(_) => StatusCode::CONFLICT,
            CompetitionError::Internal(e) => {
                error!("Internal error: {:?}", e);
                return (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response();
            }
        };
        (status, self.to_string()).into_response()
    }
}
