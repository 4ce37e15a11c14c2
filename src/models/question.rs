use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

pub type QuestionId = i64;
pub type QuizId = i64;
pub type ModuleId = i64;

/// 一道题最少需要的选项数量
pub const MIN_OPTIONS: usize = 2;

/// 选项字母，只有 A-D 四个
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum OptionLetter {
    A,
    B,
    C,
    D,
}

impl OptionLetter {
    pub const ALL: [OptionLetter; 4] = [OptionLetter::A, OptionLetter::B, OptionLetter::C, OptionLetter::D];

    pub fn as_str(self) -> &'static str {
        match self {
            OptionLetter::A => "A",
            OptionLetter::B => "B",
            OptionLetter::C => "C",
            OptionLetter::D => "D",
        }
    }

    /// 按位置取字母（0 → A）
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

impl FromStr for OptionLetter {
    type Err = ValidationError;

    /// 大小写不敏感："b" 与 "B" 等价
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(OptionLetter::A),
            "B" => Ok(OptionLetter::B),
            "C" => Ok(OptionLetter::C),
            "D" => Ok(OptionLetter::D),
            _ => Err(ValidationError::InvalidOptionLetter { input: s.to_string() }),
        }
    }
}

impl TryFrom<String> for OptionLetter {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for OptionLetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 一个选项：字母 + 文本
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionOption {
    pub letter: OptionLetter,
    pub text: String,
}

/// 题目在一次下发的题目集中的标识
///
/// 已入库的题目用 questionId；刚解析、尚未保存的题目没有 id，按位置标识。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum QuestionKey {
    Id(QuestionId),
    Position(usize),
}

impl fmt::Display for QuestionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionKey::Id(id) => write!(f, "#{}", id),
            QuestionKey::Position(index) => write!(f, "{}", index + 1),
        }
    }
}

/// 作答记录：每题至多一个选择
pub type Selections = BTreeMap<QuestionKey, OptionLetter>;

/// 单选题
///
/// 构造时保证：2-4 个非空选项，且 `correct_option` 指向其中之一。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "QuestionRecord", into = "QuestionRecord")]
pub struct Question {
    pub question_id: Option<QuestionId>,
    pub question_text: String,
    options: Vec<QuestionOption>,
    correct_option: OptionLetter,
}

impl Question {
    /// 创建题目，空白选项会被丢弃
    pub fn new(
        question_id: Option<QuestionId>,
        question_text: impl Into<String>,
        options: impl IntoIterator<Item = (OptionLetter, String)>,
        correct_option: OptionLetter,
    ) -> Result<Self, String> {
        let question_text = question_text.into();
        if question_text.trim().is_empty() {
            return Err("question text is empty".to_string());
        }

        let mut by_letter = BTreeMap::new();
        for (letter, text) in options {
            if text.trim().is_empty() {
                continue;
            }
            if by_letter.insert(letter, text).is_some() {
                return Err(format!("option {} appears more than once", letter));
            }
        }

        if by_letter.len() < MIN_OPTIONS {
            return Err(format!(
                "only {} non-empty option(s), at least {} required",
                by_letter.len(),
                MIN_OPTIONS
            ));
        }

        if !by_letter.contains_key(&correct_option) {
            return Err(format!("correct option {} is empty", correct_option));
        }

        Ok(Self {
            question_id,
            question_text,
            options: by_letter
                .into_iter()
                .map(|(letter, text)| QuestionOption { letter, text })
                .collect(),
            correct_option,
        })
    }

    /// 有序的选项集合（缺失的字母直接不存在）
    pub fn options(&self) -> &[QuestionOption] {
        &self.options
    }

    pub fn option(&self, letter: OptionLetter) -> Option<&QuestionOption> {
        self.options.iter().find(|o| o.letter == letter)
    }

    pub fn has_option(&self, letter: OptionLetter) -> bool {
        self.option(letter).is_some()
    }

    pub fn correct_option(&self) -> OptionLetter {
        self.correct_option
    }

    pub fn is_correct(&self, letter: OptionLetter) -> bool {
        self.correct_option == letter
    }

    /// 在题目集第 `position` 位时的标识
    pub fn key(&self, position: usize) -> QuestionKey {
        match self.question_id {
            Some(id) => QuestionKey::Id(id),
            None => QuestionKey::Position(position),
        }
    }

    pub fn has_renderable_options(&self) -> bool {
        self.options.len() >= MIN_OPTIONS
    }
}

/// 题目的线上格式 `{questionId, questionText, optionA..D, correctOption}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_id: Option<QuestionId>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub question_text: String,
    #[serde(default)]
    pub option_a: Option<String>,
    #[serde(default)]
    pub option_b: Option<String>,
    #[serde(default)]
    pub option_c: Option<String>,
    #[serde(default)]
    pub option_d: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub correct_option: String,
}

impl QuestionRecord {
    fn slots(&self) -> [(OptionLetter, Option<&String>); 4] {
        [
            (OptionLetter::A, self.option_a.as_ref()),
            (OptionLetter::B, self.option_b.as_ref()),
            (OptionLetter::C, self.option_c.as_ref()),
            (OptionLetter::D, self.option_d.as_ref()),
        ]
    }

    /// 去掉 questionId，用于提交新测验
    pub fn without_id(mut self) -> Self {
        self.question_id = None;
        self
    }
}

/// 四个选项位中至少有两个非空
pub fn has_renderable_options(record: &QuestionRecord) -> bool {
    record
        .slots()
        .iter()
        .filter(|(_, text)| text.is_some_and(|t| !t.trim().is_empty()))
        .count()
        >= MIN_OPTIONS
}

impl TryFrom<QuestionRecord> for Question {
    type Error = String;

    fn try_from(record: QuestionRecord) -> Result<Self, Self::Error> {
        let correct = record
            .correct_option
            .parse::<OptionLetter>()
            .map_err(|e| e.to_string())?;
        let options: Vec<(OptionLetter, String)> = record
            .slots()
            .into_iter()
            .filter_map(|(letter, text)| text.map(|t| (letter, t.clone())))
            .collect();
        Question::new(record.question_id, record.question_text, options, correct)
    }
}

impl From<Question> for QuestionRecord {
    fn from(question: Question) -> Self {
        let mut record = QuestionRecord {
            question_id: question.question_id,
            question_text: question.question_text,
            correct_option: question.correct_option.to_string(),
            ..Default::default()
        };
        for QuestionOption { letter, text } in question.options {
            let slot = match letter {
                OptionLetter::A => &mut record.option_a,
                OptionLetter::B => &mut record.option_b,
                OptionLetter::C => &mut record.option_c,
                OptionLetter::D => &mut record.option_d,
            };
            *slot = Some(text);
        }
        record
    }
}

/// 测验：一次上传或一次手工组卷
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    #[serde(default)]
    pub quiz_id: Option<QuizId>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub questions: Vec<Question>,
}

/// 所有测验的题目总数（仅用于展示）
pub fn total_question_count(quizzes: &[Quiz]) -> usize {
    quizzes.iter().map(|q| q.questions.len()).sum()
}

/// 待提交的测验
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub questions: Vec<Question>,
}

impl QuizDraft {
    pub fn new(title: impl Into<String>, description: impl Into<String>, questions: Vec<Question>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            questions,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        if self.questions.is_empty() {
            return Err(ValidationError::EmptyQuiz);
        }
        Ok(())
    }
}

// null 与缺省一样按默认值处理
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
