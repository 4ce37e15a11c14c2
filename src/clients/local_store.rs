//! 内存题库
//!
//! 在本地维护每个模块的测验，并按照门户服务的规则组卷：
//! 题库 = 模块下所有测验的题目并集；不放回地随机抽题；每道题的选项独立打乱并重新编排字母。

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use std::sync::Mutex;
use tracing::{debug, info, warn};

use crate::clients::backend::{AssemblyOutcome, CommitReceipt, QuizBackend};
use crate::error::{AppError, AppResult, Operation};
use crate::models::question::{ModuleId, OptionLetter, Question, QuestionId, Quiz, QuizDraft, QuizId};
use crate::services::upload_guard::UploadFile;

pub const ASSEMBLED_TITLE: &str = "Module Quiz";
pub const ASSEMBLED_DESCRIPTION: &str = "Randomized quiz from uploaded question pool";

struct StoreState {
    modules: BTreeMap<ModuleId, Vec<Quiz>>,
    next_quiz_id: QuizId,
    next_question_id: QuestionId,
    rng: StdRng,
}

/// 内存题库
pub struct LocalStore {
    state: Mutex<StoreState>,
}

impl LocalStore {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// 固定随机种子，组卷结果可复现
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            state: Mutex::new(StoreState {
                modules: BTreeMap::new(),
                next_quiz_id: 1,
                next_question_id: 1,
                rng,
            }),
        }
    }

    fn lock(&self, operation: Operation) -> AppResult<std::sync::MutexGuard<'_, StoreState>> {
        self.state
            .lock()
            .map_err(|_| AppError::collaborator(operation, operation.fallback_message()))
    }

    /// 保存草稿，分配 quizId 和 questionId
    fn insert(&self, module_id: ModuleId, draft: &QuizDraft) -> AppResult<Quiz> {
        draft.validate()?;

        let mut state = self.lock(Operation::CommitQuiz)?;
        let quiz_id = state.next_quiz_id;
        state.next_quiz_id += 1;

        let mut questions = Vec::with_capacity(draft.questions.len());
        for question in &draft.questions {
            let mut stored = question.clone();
            stored.question_id = Some(state.next_question_id);
            state.next_question_id += 1;
            questions.push(stored);
        }

        let quiz = Quiz {
            quiz_id: Some(quiz_id),
            title: draft.title.clone(),
            description: draft.description.clone(),
            questions,
        };
        state.modules.entry(module_id).or_default().push(quiz.clone());

        info!("模块 {} 新增测验 #{}，{} 道题", module_id, quiz_id, quiz.questions.len());
        Ok(quiz)
    }
}

impl Default for LocalStore {
    fn default() -> Self {
        Self::new()
    }
}

impl QuizBackend for LocalStore {
    async fn parse_document(&self, _module_id: ModuleId, _file: &UploadFile) -> AppResult<Vec<Question>> {
        Err(AppError::collaborator(
            Operation::ParseDocument,
            "Document parsing is only available through the portal service.",
        ))
    }

    async fn parse_and_commit(
        &self,
        _module_id: ModuleId,
        _file: &UploadFile,
        _title: &str,
        _description: &str,
    ) -> AppResult<CommitReceipt> {
        Err(AppError::collaborator(
            Operation::ParseAndCommit,
            "Document parsing is only available through the portal service.",
        ))
    }

    async fn commit_quiz(&self, module_id: ModuleId, draft: &QuizDraft) -> AppResult<Quiz> {
        self.insert(module_id, draft)
    }

    async fn list_quizzes(&self, module_id: ModuleId) -> AppResult<Vec<Quiz>> {
        let state = self.lock(Operation::ListQuizzes)?;
        Ok(state.modules.get(&module_id).cloned().unwrap_or_default())
    }

    async fn delete_quiz(&self, module_id: ModuleId, quiz_id: QuizId) -> AppResult<()> {
        let mut state = self.lock(Operation::DeleteQuiz)?;
        let quizzes = state.modules.entry(module_id).or_default();
        let before = quizzes.len();
        quizzes.retain(|q| q.quiz_id != Some(quiz_id));

        if quizzes.len() == before {
            return Err(AppError::collaborator(
                Operation::DeleteQuiz,
                format!("Quiz not found with id: {}", quiz_id),
            ));
        }
        Ok(())
    }

    async fn assemble_random_attempt(&self, module_id: ModuleId, num_questions: usize) -> AppResult<AssemblyOutcome> {
        let mut guard = self.lock(Operation::AssembleAttempt)?;
        let state = &mut *guard;
        let quizzes = state.modules.get(&module_id).map(Vec::as_slice).unwrap_or_default();

        match assemble(quizzes, num_questions, &mut state.rng) {
            Some(quiz) => {
                debug!("模块 {} 组卷完成: {} 道题", module_id, quiz.questions.len());
                Ok(AssemblyOutcome::Ready(quiz))
            }
            None => Ok(AssemblyOutcome::EmptyPool),
        }
    }
}

/// 从测验集合中组卷；题库为空时返回 `None`
pub fn assemble<R: Rng + ?Sized>(quizzes: &[Quiz], num_questions: usize, rng: &mut R) -> Option<Quiz> {
    let mut pool: Vec<&Question> = quizzes.iter().flat_map(|q| q.questions.iter()).collect();
    if pool.is_empty() {
        return None;
    }

    pool.shuffle(rng);
    pool.truncate(num_questions.min(pool.len()));

    Some(Quiz {
        quiz_id: quizzes.first().and_then(|q| q.quiz_id),
        title: ASSEMBLED_TITLE.to_string(),
        description: ASSEMBLED_DESCRIPTION.to_string(),
        questions: pool.into_iter().map(|q| shuffle_options(q, rng)).collect(),
    })
}

/// 打乱选项并按新顺序重新编排 A、B、C…，正确答案随之更新
pub fn shuffle_options<R: Rng + ?Sized>(question: &Question, rng: &mut R) -> Question {
    let mut options = question.options().to_vec();
    options.shuffle(rng);

    let mut correct = question.correct_option();
    let mut relettered = Vec::with_capacity(options.len());
    for (index, option) in options.into_iter().enumerate() {
        let Some(letter) = OptionLetter::from_index(index) else {
            break;
        };
        if option.letter == question.correct_option() {
            correct = letter;
        }
        relettered.push((letter, option.text));
    }

    Question::new(question.question_id, question.question_text.clone(), relettered, correct).unwrap_or_else(|reason| {
        warn!("无法打乱题目 {:?} 的选项: {}", question.question_id, reason);
        question.clone()
    })
}
