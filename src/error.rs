use thiserror::Error;

use crate::models::question::{OptionLetter, QuestionKey};

/// 应用程序错误类型
///
/// 校验错误和协作服务错误的 `Display` 是透明的，直接就是展示给用户的文字。
#[derive(Debug, Error)]
pub enum AppError {
    /// 本地校验失败（从不触达网络，不丢失状态）
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// 外部协作服务（解析/保存/组卷）失败
    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),
    /// 当前状态不允许该操作
    #[error(transparent)]
    Transition(#[from] TransitionError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
}

/// 本地校验错误
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please select a file first.")]
    NoFileSelected,
    #[error("Uploaded file is empty.")]
    EmptyFile,
    #[error("Unsupported file type: .{extension}. Only PDF and DOCX files are supported.")]
    UnsupportedFileType { extension: String },
    #[error("File size ({size_label}) exceeds the {limit_mb} MB limit.")]
    FileTooLarge {
        size_bytes: u64,
        size_label: String,
        limit_mb: u64,
    },
    /// 提交前还有题目没作答
    #[error("Please answer all questions before submitting.")]
    IncompleteAnswers { answered: usize, total: usize },
    /// 题目数为 0 时无法计分
    #[error("There are no questions to submit.")]
    NoQuestions,
    #[error("Question {key} is not part of this attempt.")]
    UnknownQuestion { key: QuestionKey },
    #[error("Option {letter} is not available for question {key}.")]
    OptionNotAvailable { key: QuestionKey, letter: OptionLetter },
    #[error("'{input}' is not an option letter (expected A-D).")]
    InvalidOptionLetter { input: String },
    #[error("The number of questions must be at least 1.")]
    InvalidQuestionCount,
    #[error("Quiz title must not be empty.")]
    EmptyTitle,
    #[error("A quiz needs at least one question.")]
    EmptyQuiz,
    #[error("Question {position} is invalid: {reason}")]
    InvalidQuestion { position: usize, reason: String },
}

/// 外部协作方的操作种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    ParseDocument,
    ParseAndCommit,
    CommitQuiz,
    ListQuizzes,
    DeleteQuiz,
    AssembleAttempt,
}

impl Operation {
    /// 协作方没给出原因时使用的通用提示
    pub fn fallback_message(self) -> &'static str {
        match self {
            Operation::ParseDocument => "Failed to parse questions from file.",
            Operation::ParseAndCommit => "Failed to upload quiz.",
            Operation::CommitQuiz => "Failed to save quiz.",
            Operation::ListQuizzes => "Failed to load existing quizzes.",
            Operation::DeleteQuiz => "Failed to delete quiz.",
            Operation::AssembleAttempt => "Failed to generate randomized quiz.",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Operation::ParseDocument => "parseDocument",
            Operation::ParseAndCommit => "parseAndCommit",
            Operation::CommitQuiz => "commitQuiz",
            Operation::ListQuizzes => "listQuizzes",
            Operation::DeleteQuiz => "deleteQuiz",
            Operation::AssembleAttempt => "assembleRandomAttempt",
        };
        f.write_str(name)
    }
}

/// 协作服务错误
///
/// `message` 优先取协作方返回的原因，否则是 [`Operation::fallback_message`]。
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct CollaboratorError {
    pub operation: Operation,
    /// HTTP 状态码（本地协作方没有）
    pub status: Option<u16>,
    pub message: String,
}

/// 状态机转换错误
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Cannot {action} while the {component} is {state}.")]
    NotAllowed {
        component: &'static str,
        action: &'static str,
        state: &'static str,
    },
    /// 已有请求在途，触发按钮应处于禁用状态
    #[error("Please wait: a request is already in progress ({action} unavailable).")]
    Busy { action: &'static str },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} 取值无效: {reason}")]
    InvalidValue { name: &'static str, reason: String },
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

// ========== 从常见错误类型转换 ==========

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: String::new(),
            source: err,
        })
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::File(FileError::TomlParseFailed {
            path: String::new(), // TOML错误不包含路径信息
            source: err,
        })
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建协作服务错误；`message` 为空时使用通用提示
    pub fn collaborator(operation: Operation, message: impl Into<String>) -> Self {
        let message = message.into();
        let message = if message.trim().is_empty() {
            operation.fallback_message().to_string()
        } else {
            message
        };
        AppError::Collaborator(CollaboratorError {
            operation,
            status: None,
            message,
        })
    }

    /// 创建带 HTTP 状态码的协作服务错误
    pub fn collaborator_status(operation: Operation, status: u16, reason: Option<String>) -> Self {
        AppError::Collaborator(CollaboratorError {
            operation,
            status: Some(status),
            message: reason
                .filter(|r| !r.trim().is_empty())
                .unwrap_or_else(|| operation.fallback_message().to_string()),
        })
    }

    /// 创建状态转换错误
    pub fn not_allowed(component: &'static str, action: &'static str, state: &'static str) -> Self {
        AppError::Transition(TransitionError::NotAllowed {
            component,
            action,
            state,
        })
    }

    /// 展示给用户的文字
    pub fn display_message(&self) -> String {
        self.to_string()
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, AppError::Validation(_))
    }

    pub fn is_collaborator(&self) -> bool {
        matches!(self, AppError::Collaborator(_))
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
