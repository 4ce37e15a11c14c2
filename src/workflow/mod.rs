pub mod attempt;
pub mod authoring;
pub mod pending;
pub mod self_check;

pub use attempt::{format_elapsed, Attempt, AttemptEngine, AttemptState};
pub use authoring::{AuthoringPipeline, AuthoringState, HeldQuestions};
pub use pending::{Completion, PendingRequest, RequestAction};
pub use self_check::SelfCheck;
