//! 计分与回顾 - 业务能力层
//!
//! 纯函数，没有副作用。学员作答和讲师自测共用同一个 [`score`]。

use crate::error::ValidationError;
use crate::models::question::{OptionLetter, Question, QuestionId, QuestionKey, Selections};

/// 及格线（百分比）
pub const PASS_PERCENTAGE: u8 = 50;
/// 优秀线（百分比）
pub const EXCELLENT_PERCENTAGE: u8 = 80;

/// 单题回顾
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionReview {
    pub key: QuestionKey,
    pub question_id: Option<QuestionId>,
    pub question_text: String,
    pub selected_option: Option<OptionLetter>,
    pub correct_option: OptionLetter,
    pub correct: bool,
}

/// 一次作答的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptResult {
    pub score: usize,
    pub total: usize,
    /// 0-100，四舍五入
    pub percentage: u8,
    pub passed: bool,
    pub per_question: Vec<QuestionReview>,
}

impl AttemptResult {
    pub fn verdict(&self) -> Verdict {
        if self.percentage >= EXCELLENT_PERCENTAGE {
            Verdict::Excellent
        } else if self.passed {
            Verdict::Passed
        } else {
            Verdict::KeepPracticing
        }
    }

    pub fn review(&self, key: QuestionKey) -> Option<&QuestionReview> {
        self.per_question.iter().find(|r| r.key == key)
    }
}

/// 结果评语
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Excellent,
    Passed,
    KeepPracticing,
}

impl Verdict {
    pub fn message(self, percentage: u8) -> String {
        match self {
            Verdict::Excellent => format!("Excellent! You scored {}%", percentage),
            Verdict::Passed => "Good effort! Keep practicing.".to_string(),
            Verdict::KeepPracticing => "Keep studying and try again!".to_string(),
        }
    }
}

/// 计分
///
/// 没有作答的题目记为错误；题目为空时无法计分。
pub fn score(questions: &[Question], selections: &Selections) -> Result<AttemptResult, ValidationError> {
    if questions.is_empty() {
        return Err(ValidationError::NoQuestions);
    }

    let per_question: Vec<QuestionReview> = questions
        .iter()
        .enumerate()
        .map(|(position, question)| {
            let key = question.key(position);
            let selected_option = selections.get(&key).copied();
            QuestionReview {
                key,
                question_id: question.question_id,
                question_text: question.question_text.clone(),
                selected_option,
                correct_option: question.correct_option(),
                correct: selected_option.is_some_and(|s| question.is_correct(s)),
            }
        })
        .collect();

    let score = per_question.iter().filter(|r| r.correct).count();
    let total = per_question.len();
    let percentage = round_percentage(score, total);

    Ok(AttemptResult {
        score,
        total,
        percentage,
        passed: percentage >= PASS_PERCENTAGE,
        per_question,
    })
}

/// `round(100 * score / total)`，0.5 向上取整
pub fn round_percentage(score: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let score = score.min(total);
    ((200 * score + total) / (2 * total)) as u8
}
