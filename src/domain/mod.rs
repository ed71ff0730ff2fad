pub mod error;
pub mod models;
pub mod status;

pub use error::{CompetitionError, CompetitionResult};
pub use models::{decode_scores, encode_scores, SetScore, Side, Submission};
pub use status::{
    LadderStatus, MatchKind, MatchStatus, ResolutionMethod, TournamentFormat, TournamentStatus,
    Visibility,
};
