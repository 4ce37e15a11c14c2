pub mod assembly;
pub mod quiz_library;
pub mod scoring;
pub mod upload_guard;

pub use assembly::QuizAssembler;
pub use quiz_library::QuizLibrary;
pub use scoring::{score, AttemptResult, QuestionReview, Verdict};
pub use upload_guard::{UploadFile, UploadGuard};
