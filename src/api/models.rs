use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::{
    LadderStatus, MatchKind, MatchStatus, ResolutionMethod, SetScore, TournamentStatus,
};

// --- Requests ---

#[derive(Deserialize)]
pub struct CreateTournamentRequest {
    pub name: String,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub visibility: Option<String>,
    #[serde(default)]
    pub challenge_window_mins: Option<i64>,
}

#[derive(Deserialize)]
pub struct CreateLadderRequest {
    pub name: String,
    #[serde(default)]
    pub challenge_window_mins: Option<i64>,
}

#[derive(Deserialize)]
pub struct ChallengeRequest {
    pub challengee_id: i64,
}

#[derive(Deserialize)]
pub struct SubmitResultRequest {
    pub scores: Vec<SetScore>,
    pub winner_id: i64,
}

#[derive(Deserialize)]
pub struct ResolveRequest {
    pub decision: String,
    #[serde(default)]
    pub scores: Option<Vec<SetScore>>,
    #[serde(default)]
    pub winner_id: Option<i64>,
}

// --- Responses ---

/// Participant decorated with whatever the directory could tell us; falls
/// back to the bare id when the lookup degrades.
#[derive(Serialize)]
pub struct ParticipantView {
    pub participant_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skill_tier: Option<String>,
}

#[derive(Serialize)]
pub struct TournamentDetail {
    pub id: i64,
    pub name: String,
    pub status: TournamentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner_id: Option<i64>,
    pub participants: Vec<ParticipantView>,
    pub bracket: Vec<RoundView>,
}

#[derive(Serialize)]
pub struct RoundView {
    pub round: i32,
    pub slots: Vec<SlotView>,
}

#[derive(Serialize)]
pub struct SlotView {
    pub match_number: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub home: Option<ParticipantView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub away: Option<ParticipantView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner_id: Option<i64>,
}

#[derive(Serialize)]
pub struct LadderDetail {
    pub id: i64,
    pub name: String,
    pub status: LadderStatus,
    pub standings: Vec<StandingView>,
}

#[derive(Serialize)]
pub struct StandingView {
    pub rank: i32,
    #[serde(flatten)]
    pub participant: ParticipantView,
}

#[derive(Serialize)]
pub struct SubmissionView {
    pub scores: Vec<SetScore>,
    pub winner_id: i64,
    pub submitted_at: NaiveDateTime,
}

#[derive(Serialize)]
pub struct MatchDetail {
    pub id: i64,
    pub kind: MatchKind,
    pub status: MatchStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tournament_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_number: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ladder_id: Option<i64>,
    pub home: ParticipantView,
    pub away: ParticipantView,
    pub deadline: NaiveDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub home_submission: Option<SubmissionView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub away_submission: Option<SubmissionView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_scores: Option<Vec<SetScore>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_winner_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<ResolutionMethod>,
}

#[derive(Serialize)]
pub struct CreatedResponse {
    pub id: i64,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Serialize)]
pub struct MatchStatusResponse {
    pub match_id: i64,
    pub status: MatchStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_winner_id: Option<i64>,
}

#[derive(Serialize)]
pub struct SweepResponse {
    pub tournament_matches: usize,
    pub ladder_matches: usize,
}
