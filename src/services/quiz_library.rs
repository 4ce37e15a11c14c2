//! 模块测验列表
//!
//! 讲师页面上"已有测验"一栏的查询和删除。删除只有在协作方确认后才从列表中移除。

use tracing::{info, warn};

use crate::clients::QuizBackend;
use crate::error::AppResult;
use crate::models::question::{total_question_count, ModuleId, Quiz, QuizId};

pub struct QuizLibrary {
    module_id: ModuleId,
    quizzes: Vec<Quiz>,
    error: Option<String>,
}

impl QuizLibrary {
    pub fn new(module_id: ModuleId) -> Self {
        Self {
            module_id,
            quizzes: Vec::new(),
            error: None,
        }
    }

    pub fn module_id(&self) -> ModuleId {
        self.module_id
    }

    pub fn quizzes(&self) -> &[Quiz] {
        &self.quizzes
    }

    /// 最近一次失败的提示
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// 题库中的题目总数
    pub fn total_question_count(&self) -> usize {
        total_question_count(&self.quizzes)
    }

    /// 重新加载列表；失败时保留当前列表
    pub async fn refresh<B: QuizBackend>(&mut self, backend: &B) -> AppResult<&[Quiz]> {
        match backend.list_quizzes(self.module_id).await {
            Ok(quizzes) => {
                info!(
                    "✓ 模块 {} 共 {} 个测验，{} 道题",
                    self.module_id,
                    quizzes.len(),
                    total_question_count(&quizzes)
                );
                self.quizzes = quizzes;
                self.error = None;
                Ok(&self.quizzes)
            }
            Err(e) => {
                warn!("⚠️ 加载测验列表失败: {}", e);
                self.error = Some(e.display_message());
                Err(e)
            }
        }
    }

    pub async fn delete<B: QuizBackend>(&mut self, backend: &B, quiz_id: QuizId) -> AppResult<()> {
        match backend.delete_quiz(self.module_id, quiz_id).await {
            Ok(()) => {
                self.quizzes.retain(|q| q.quiz_id != Some(quiz_id));
                self.error = None;
                info!("✓ 已删除测验 #{}", quiz_id);
                Ok(())
            }
            Err(e) => {
                warn!("⚠️ 删除测验 #{} 失败: {}", quiz_id, e);
                self.error = Some(e.display_message());
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::LocalStore;
    use crate::models::question::{OptionLetter, Question, QuizDraft};

    fn draft(title: &str, count: usize) -> QuizDraft {
        let questions = (0..count)
            .map(|i| {
                Question::new(
                    None,
                    format!("{} q{}", title, i),
                    [(OptionLetter::A, "a".to_string()), (OptionLetter::B, "b".to_string())],
                    OptionLetter::B,
                )
                .unwrap()
            })
            .collect();
        QuizDraft::new(title, "", questions)
    }

    #[tokio::test]
    async fn test_refresh_and_delete() {
        let store = LocalStore::with_seed(0);
        let first = store.commit_quiz(2, &draft("Week 1", 3)).await.unwrap();
        store.commit_quiz(2, &draft("Week 2", 2)).await.unwrap();

        let mut library = QuizLibrary::new(2);
        library.refresh(&store).await.unwrap();
        assert_eq!(library.quizzes().len(), 2);
        assert_eq!(library.total_question_count(), 5);

        library.delete(&store, first.quiz_id.unwrap()).await.unwrap();
        assert_eq!(library.quizzes().len(), 1);
        assert_eq!(library.total_question_count(), 2);
    }

    #[tokio::test]
    async fn test_failed_delete_keeps_list() {
        let store = LocalStore::with_seed(0);
        store.commit_quiz(2, &draft("Week 1", 1)).await.unwrap();

        let mut library = QuizLibrary::new(2);
        library.refresh(&store).await.unwrap();

        assert!(library.delete(&store, 999).await.is_err());
        assert_eq!(library.quizzes().len(), 1);
        assert_eq!(library.error_message(), Some("Quiz not found with id: 999"));
    }
}
