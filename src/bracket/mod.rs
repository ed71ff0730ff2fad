pub mod advancer;
pub mod builder;

pub use advancer::{record_result_and_advance, AdvanceEvent};
pub use builder::{build_bracket, round_count, BuiltBracket, BuiltRound, Pairing};
