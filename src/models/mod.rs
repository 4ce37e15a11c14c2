pub mod loaders;
pub mod question;

pub use loaders::{load_draft, load_all_drafts};
pub use question::{
    has_renderable_options, total_question_count, ModuleId, OptionLetter, Question, QuestionId,
    QuestionKey, QuestionOption, QuestionRecord, Quiz, QuizDraft, QuizId, Selections,
};
