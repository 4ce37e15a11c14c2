use crate::error::AppResult;
use crate::models::question::{ModuleId, Question, Quiz, QuizDraft, QuizId};
use crate::services::upload_guard::UploadFile;

/// 解析并保存后的回执
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitReceipt {
    pub quiz: Quiz,
    /// 协作方的提示语，例如 "Successfully uploaded 5 questions."
    pub message: Option<String>,
}

/// 组卷结果
///
/// 题库为空不是错误，而是一个独立的结果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssemblyOutcome {
    Ready(Quiz),
    EmptyPool,
}

/// 课程门户的边界操作
///
/// 每个实例同一时间只会有一个请求在途（由调用方的状态机保证）。
#[allow(async_fn_in_trait)]
pub trait QuizBackend {
    /// 解析文档，返回题目列表（可能为空），不保存
    async fn parse_document(&self, module_id: ModuleId, file: &UploadFile) -> AppResult<Vec<Question>>;

    /// 解析文档并直接保存为一个新测验
    async fn parse_and_commit(
        &self,
        module_id: ModuleId,
        file: &UploadFile,
        title: &str,
        description: &str,
    ) -> AppResult<CommitReceipt>;

    /// 保存一个新测验，返回带 quizId 的测验
    async fn commit_quiz(&self, module_id: ModuleId, draft: &QuizDraft) -> AppResult<Quiz>;

    async fn list_quizzes(&self, module_id: ModuleId) -> AppResult<Vec<Quiz>>;

    async fn delete_quiz(&self, module_id: ModuleId, quiz_id: QuizId) -> AppResult<()>;

    /// 从模块题库中随机抽取至多 `num_questions` 道题，并打乱每道题的选项字母
    async fn assemble_random_attempt(&self, module_id: ModuleId, num_questions: usize) -> AppResult<AssemblyOutcome>;
}
