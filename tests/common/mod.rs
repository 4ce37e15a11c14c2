//! 测试用的协作方替身
#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;

use learn_quiz::clients::{AssemblyOutcome, CommitReceipt, QuizBackend};
use learn_quiz::error::{AppError, AppResult, Operation};
use learn_quiz::models::question::{ModuleId, OptionLetter, Question, Quiz, QuizDraft, QuizId};
use learn_quiz::services::UploadFile;

/// 按脚本返回结果，并记录每一次调用
#[derive(Default)]
pub struct ScriptedBackend {
    calls: RefCell<Vec<Operation>>,
    previews: RefCell<VecDeque<AppResult<Vec<Question>>>>,
    uploads: RefCell<VecDeque<AppResult<CommitReceipt>>>,
    commits: RefCell<VecDeque<AppResult<Quiz>>>,
    assemblies: RefCell<VecDeque<AppResult<AssemblyOutcome>>>,
    committed: RefCell<Vec<QuizDraft>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<Operation> {
        self.calls.borrow().clone()
    }

    pub fn committed(&self) -> Vec<QuizDraft> {
        self.committed.borrow().clone()
    }

    pub fn push_preview(&self, result: AppResult<Vec<Question>>) -> &Self {
        self.previews.borrow_mut().push_back(result);
        self
    }

    pub fn push_upload(&self, result: AppResult<CommitReceipt>) -> &Self {
        self.uploads.borrow_mut().push_back(result);
        self
    }

    pub fn push_commit(&self, result: AppResult<Quiz>) -> &Self {
        self.commits.borrow_mut().push_back(result);
        self
    }

    pub fn push_assembly(&self, result: AppResult<AssemblyOutcome>) -> &Self {
        self.assemblies.borrow_mut().push_back(result);
        self
    }

    fn next<T>(&self, operation: Operation, queue: &RefCell<VecDeque<AppResult<T>>>) -> AppResult<T> {
        self.calls.borrow_mut().push(operation);
        queue
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(AppError::collaborator(operation, "no scripted response")))
    }
}

impl QuizBackend for ScriptedBackend {
    async fn parse_document(&self, _module_id: ModuleId, _file: &UploadFile) -> AppResult<Vec<Question>> {
        self.next(Operation::ParseDocument, &self.previews)
    }

    async fn parse_and_commit(
        &self,
        _module_id: ModuleId,
        _file: &UploadFile,
        _title: &str,
        _description: &str,
    ) -> AppResult<CommitReceipt> {
        self.next(Operation::ParseAndCommit, &self.uploads)
    }

    async fn commit_quiz(&self, _module_id: ModuleId, draft: &QuizDraft) -> AppResult<Quiz> {
        self.committed.borrow_mut().push(draft.clone());
        self.next(Operation::CommitQuiz, &self.commits)
    }

    async fn list_quizzes(&self, _module_id: ModuleId) -> AppResult<Vec<Quiz>> {
        self.calls.borrow_mut().push(Operation::ListQuizzes);
        Ok(Vec::new())
    }

    async fn delete_quiz(&self, _module_id: ModuleId, _quiz_id: QuizId) -> AppResult<()> {
        self.calls.borrow_mut().push(Operation::DeleteQuiz);
        Ok(())
    }

    async fn assemble_random_attempt(&self, _module_id: ModuleId, _num_questions: usize) -> AppResult<AssemblyOutcome> {
        self.next(Operation::AssembleAttempt, &self.assemblies)
    }
}

/// 三个选项 A/B/C 的题目
pub fn question(id: Option<i64>, text: &str, correct: OptionLetter) -> Question {
    Question::new(
        id,
        text,
        [
            (OptionLetter::A, format!("{} / first", text)),
            (OptionLetter::B, format!("{} / second", text)),
            (OptionLetter::C, format!("{} / third", text)),
        ],
        correct,
    )
    .unwrap()
}

/// 已入库的题目组成的一次下发
pub fn delivered(correct: &[OptionLetter]) -> AppResult<AssemblyOutcome> {
    let questions = correct
        .iter()
        .enumerate()
        .map(|(i, letter)| question(Some(100 + i as i64), &format!("Question {}", i + 1), *letter))
        .collect();
    Ok(AssemblyOutcome::Ready(Quiz {
        quiz_id: Some(1),
        title: "Module Quiz".into(),
        description: "Randomized quiz from uploaded question pool".into(),
        questions,
    }))
}

pub fn pdf(name: &str) -> UploadFile {
    UploadFile::new(name, b"%PDF-1.7 questions".to_vec())
}
