//! 组卷请求 - 业务能力层
//!
//! 负责题目数的取值范围，以及检查下发的题目集能否被作答引擎使用。

use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::clients::{AssemblyOutcome, QuizBackend};
use crate::config::Config;
use crate::error::{AppError, AppResult, Operation, ValidationError};
use crate::models::question::{ModuleId, Quiz};

/// 组卷请求器
#[derive(Debug, Clone, Copy)]
pub struct QuizAssembler {
    default_num_questions: usize,
    max_num_questions: usize,
}

impl QuizAssembler {
    pub fn new(config: &Config) -> Self {
        Self {
            default_num_questions: config.default_num_questions,
            max_num_questions: config.max_num_questions,
        }
    }

    /// 计算实际请求的题目数
    ///
    /// # 参数
    /// - `requested`: 调用方指定的题目数，`None` 时使用默认值
    ///
    /// # 返回
    /// 0 是校验错误；超过上限时截断到上限
    pub fn resolve_count(&self, requested: Option<usize>) -> Result<usize, ValidationError> {
        let count = requested.unwrap_or(self.default_num_questions);
        if count == 0 {
            return Err(ValidationError::InvalidQuestionCount);
        }
        if count > self.max_num_questions {
            debug!("题目数 {} 超过上限，截断为 {}", count, self.max_num_questions);
        }
        Ok(count.min(self.max_num_questions))
    }

    /// 请求一次组卷
    pub async fn assemble<B: QuizBackend>(
        &self,
        backend: &B,
        module_id: ModuleId,
        requested: Option<usize>,
    ) -> AppResult<AssemblyOutcome> {
        let count = self.resolve_count(requested)?;
        info!("🔍 模块 {} 请求组卷，{} 道题", module_id, count);

        match backend.assemble_random_attempt(module_id, count).await? {
            AssemblyOutcome::Ready(quiz) if quiz.questions.is_empty() => Ok(AssemblyOutcome::EmptyPool),
            AssemblyOutcome::Ready(mut quiz) => {
                check_delivery(&quiz)?;
                if quiz.questions.len() > count {
                    warn!("⚠️ 协作方下发了 {} 道题，超过请求的 {} 道", quiz.questions.len(), count);
                    quiz.questions.truncate(count);
                }
                info!("✓ 组卷完成: {} 道题", quiz.questions.len());
                Ok(AssemblyOutcome::Ready(quiz))
            }
            AssemblyOutcome::EmptyPool => {
                info!("模块 {} 题库为空", module_id);
                Ok(AssemblyOutcome::EmptyPool)
            }
        }
    }
}

/// 下发的每道题都必须带有唯一的 questionId，作答记录按 id 索引
pub fn check_delivery(quiz: &Quiz) -> AppResult<()> {
    let mut seen = HashSet::with_capacity(quiz.questions.len());
    for (position, question) in quiz.questions.iter().enumerate() {
        let Some(id) = question.question_id else {
            return Err(malformed(format!("question {} has no questionId", position + 1)));
        };
        if !seen.insert(id) {
            return Err(malformed(format!("questionId {} is delivered twice", id)));
        }
    }
    Ok(())
}

fn malformed(detail: String) -> AppError {
    warn!("组卷结果不可用: {}", detail);
    AppError::collaborator(
        Operation::AssembleAttempt,
        format!("Malformed response from the quiz service: {}", detail),
    )
}
