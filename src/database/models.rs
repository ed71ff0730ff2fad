use chrono::NaiveDateTime;

use crate::domain::{
    LadderStatus, MatchKind, MatchStatus, ResolutionMethod, Side, Submission, TournamentFormat,
    TournamentStatus, Visibility,
};

#[derive(Debug, Clone)]
pub struct Tournament {
    pub id: i64,
    pub name: String,
    pub format: TournamentFormat,
    pub visibility: Visibility,
    pub creator_id: i64,
    pub challenge_window_mins: i64,
    pub status: TournamentStatus,
    pub winner_id: Option<i64>,
    pub created_at: Option<NaiveDateTime>,
}

/// One pairing in the bracket tree. `match_number` is unique within the
/// tournament; `feeder_home` / `feeder_away` back-reference the earlier-round
/// match numbers whose winners occupy this slot (NULL in round 1).
#[derive(Debug, Clone)]
pub struct BracketSlot {
    pub id: i64,
    pub tournament_id: i64,
    pub round: i32,
    pub position: i32,
    pub match_number: i64,
    pub home_id: Option<i64>,
    pub away_id: Option<i64>,
    pub winner_id: Option<i64>,
    pub feeder_home: Option<i64>,
    pub feeder_away: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct Ladder {
    pub id: i64,
    pub name: String,
    pub creator_id: i64,
    pub challenge_window_mins: i64,
    pub status: LadderStatus,
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LadderPosition {
    pub ladder_id: i64,
    pub rank: i32,
    pub participant_id: i64,
}

/// The unit processed by submission consensus, dispute resolution and the
/// deadline sweeper. For ladder matches home is the challenger and away the
/// challengee.
#[derive(Debug, Clone)]
pub struct CompetitiveMatch {
    pub id: i64,
    pub kind: MatchKind,
    pub tournament_id: Option<i64>,
    pub match_number: Option<i64>,
    pub ladder_id: Option<i64>,
    pub home_id: i64,
    pub away_id: i64,
    pub status: MatchStatus,
    pub deadline: NaiveDateTime,
    pub home_submission: Option<Submission>,
    pub away_submission: Option<Submission>,
    pub final_scores: Option<String>,
    pub final_winner_id: Option<i64>,
    pub resolution: Option<ResolutionMethod>,
    pub resolver_id: Option<i64>,
    pub resolved_at: Option<NaiveDateTime>,
    pub created_at: Option<NaiveDateTime>,
}

impl CompetitiveMatch {
    pub fn side_of(&self, participant_id: i64) -> Option<Side> {
        if participant_id == self.home_id {
            Some(Side::Home)
        } else if participant_id == self.away_id {
            Some(Side::Away)
        } else {
            None
        }
    }

    pub fn involves(&self, participant_id: i64) -> bool {
        self.side_of(participant_id).is_some()
    }

    pub fn submission(&self, side: Side) -> Option<&Submission> {
        match side {
            Side::Home => self.home_submission.as_ref(),
            Side::Away => self.away_submission.as_ref(),
        }
    }
}
