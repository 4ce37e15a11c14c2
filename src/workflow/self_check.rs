//! 讲师自测
//!
//! 在保存前试答刚解析出的题目。和学员作答共用 [`score`]，结果只保存在内存里，
//! 重置后可以再试，不会改动题目列表。

use tracing::{debug, info};

use crate::error::ValidationError;
use crate::models::question::{OptionLetter, Question, QuestionKey, Selections};
use crate::services::scoring::{score, AttemptResult};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelfCheck {
    selections: Selections,
    result: Option<AttemptResult>,
}

impl SelfCheck {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selections(&self) -> &Selections {
        &self.selections
    }

    pub fn selection(&self, question: &Question, index: usize) -> Option<OptionLetter> {
        self.selections.get(&question.key(index)).copied()
    }

    pub fn result(&self) -> Option<&AttemptResult> {
        self.result.as_ref()
    }

    pub fn is_submitted(&self) -> bool {
        self.result.is_some()
    }

    /// 选择第 `index` 题的答案；已提交时静默忽略
    pub fn select(&mut self, questions: &[Question], index: usize, letter: OptionLetter) -> Result<(), ValidationError> {
        if self.is_submitted() {
            debug!("自测已提交，忽略选择");
            return Ok(());
        }

        let question = questions.get(index).ok_or(ValidationError::UnknownQuestion {
            key: QuestionKey::Position(index),
        })?;
        let key = question.key(index);
        if !question.has_option(letter) {
            return Err(ValidationError::OptionNotAvailable { key, letter });
        }

        self.selections.insert(key, letter);
        Ok(())
    }

    /// 提交自测；必须每题都已作答
    pub fn submit(&mut self, questions: &[Question]) -> Result<&AttemptResult, ValidationError> {
        if self.result.is_none() {
            let answered = answered_count(questions, &self.selections);
            if answered < questions.len() {
                return Err(ValidationError::IncompleteAnswers {
                    answered,
                    total: questions.len(),
                });
            }

            let result = score(questions, &self.selections)?;
            info!("✓ Preview Score: {} / {}", result.score, result.total);
            self.result = Some(result);
        }

        self.result.as_ref().ok_or(ValidationError::NoQuestions)
    }

    pub fn reset(&mut self) {
        self.selections.clear();
        self.result = None;
    }
}

/// 已作答的题目数（只统计属于本题目集的选择）
pub fn answered_count(questions: &[Question], selections: &Selections) -> usize {
    questions
        .iter()
        .enumerate()
        .filter(|(index, question)| selections.contains_key(&question.key(*index)))
        .count()
}
