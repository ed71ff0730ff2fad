use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One set of a match score line, in playing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetScore {
    pub home: i32,
    pub away: i32,
}

/// Which side of a match a participant occupies. For ladder matches the
/// challenger is always the home side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Home,
    Away,
}

/// A single participant's reported result, recorded at most once per match.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub scores: Vec<SetScore>,
    pub winner_id: i64,
    pub submitted_at: NaiveDateTime,
}

impl Submission {
    /// Consensus requires exact agreement on both the score sequence and the
    /// declared winner.
    pub fn agrees_with(&self, other: &Submission) -> bool {
        self.scores == other.scores && self.winner_id == other.winner_id
    }
}

pub fn encode_scores(scores: &[SetScore]) -> Result<String> {
    serde_json::to_string(scores).context("Failed to encode score sequence")
}

pub fn decode_scores(raw: &str) -> Result<Vec<SetScore>> {
    serde_json::from_str(raw).context("Failed to decode stored score sequence")
}
