pub mod dispute;
pub mod submission;

pub use dispute::{resolve_dispute, Decision, ResolutionOutcome};
pub use submission::{
    accept_challenge, decline_challenge, reset_submission, submit_result, SubmissionOutcome,
};
