//! 上传出题流程 - 流程层
//!
//! 核心职责：把一份上传的文档变成预览中的题目，或一个已保存的测验
//!
//! 状态顺序：
//! 1. Idle → FileSelected（本地校验文件）
//! 2. FileSelected → Previewing → Previewed（解析，不保存）
//! 3. Previewed → Saving → Saved（提交预览中的题目）
//! 4. FileSelected → Saving → Saved（解析并直接保存）
//!
//! 请求失败时回到发起前的状态，错误原因保存在 `error_message()`。

use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::clients::{CommitReceipt, QuizBackend};
use crate::config::Config;
use crate::error::{AppError, AppResult, TransitionError, ValidationError};
use crate::models::question::{ModuleId, OptionLetter, Question, Quiz, QuizDraft};
use crate::services::scoring::AttemptResult;
use crate::services::upload_guard::{format_file_size, UploadFile, UploadGuard};
use crate::workflow::pending::{Completion, Epoch, PendingRequest, RequestAction};
use crate::workflow::self_check::SelfCheck;

const COMPONENT: &str = "authoring pipeline";

/// 本地持有、可自测的题目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeldQuestions {
    pub questions: Vec<Question>,
    pub self_check: SelfCheck,
}

impl HeldQuestions {
    fn new(questions: Vec<Question>) -> Self {
        Self {
            questions,
            self_check: SelfCheck::new(),
        }
    }
}

/// 出题流程状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthoringState {
    Idle,
    FileSelected {
        file: Arc<UploadFile>,
    },
    Previewing {
        file: Arc<UploadFile>,
    },
    Previewed {
        file: Arc<UploadFile>,
        held: HeldQuestions,
    },
    /// `held` 为 `None` 表示解析并直接保存
    Saving {
        file: Arc<UploadFile>,
        held: Option<HeldQuestions>,
    },
    Saved {
        quiz: Quiz,
        held: HeldQuestions,
    },
}

impl AuthoringState {
    pub fn name(&self) -> &'static str {
        match self {
            AuthoringState::Idle => "idle",
            AuthoringState::FileSelected { .. } => "file selected",
            AuthoringState::Previewing { .. } => "previewing",
            AuthoringState::Previewed { .. } => "previewed",
            AuthoringState::Saving { .. } => "saving",
            AuthoringState::Saved { .. } => "saved",
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, AuthoringState::Previewing { .. } | AuthoringState::Saving { .. })
    }
}

/// 解析请求
#[derive(Debug)]
pub struct PreviewRequest {
    pub ticket: PendingRequest,
    pub file: Arc<UploadFile>,
}

/// 解析并保存请求
#[derive(Debug)]
pub struct UploadRequest {
    pub ticket: PendingRequest,
    pub file: Arc<UploadFile>,
    pub title: String,
    pub description: String,
}

/// 提交预览题目请求
#[derive(Debug)]
pub struct CommitRequest {
    pub ticket: PendingRequest,
    pub draft: QuizDraft,
}

/// 上传出题流程
///
/// - 持有一次上传的全部状态
/// - 决定什么时候可以发请求、响应回来后进入哪个状态
/// - 不直接做网络请求，`preview` 等便捷方法通过 [`QuizBackend`] 完成
pub struct AuthoringPipeline {
    module_id: ModuleId,
    guard: UploadGuard,
    default_title: String,
    default_description: String,
    state: AuthoringState,
    epoch: Epoch,
    error: Option<String>,
    notice: Option<String>,
}

impl AuthoringPipeline {
    /// 创建新的出题流程
    pub fn new(config: &Config, module_id: ModuleId) -> Self {
        Self {
            module_id,
            guard: UploadGuard::new(config),
            default_title: config.default_quiz_title.clone(),
            default_description: config.default_quiz_description.clone(),
            state: AuthoringState::Idle,
            epoch: Epoch::default(),
            error: None,
            notice: None,
        }
    }

    pub fn module_id(&self) -> ModuleId {
        self.module_id
    }

    pub fn state(&self) -> &AuthoringState {
        &self.state
    }

    pub fn is_busy(&self) -> bool {
        self.state.is_pending()
    }

    /// 最近一次显示的错误
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// 最近一次成功提示
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn file(&self) -> Option<&UploadFile> {
        match &self.state {
            AuthoringState::FileSelected { file }
            | AuthoringState::Previewing { file }
            | AuthoringState::Previewed { file, .. }
            | AuthoringState::Saving { file, .. } => Some(file.as_ref()),
            AuthoringState::Idle | AuthoringState::Saved { .. } => None,
        }
    }

    /// 本地持有的题目（预览中或已保存）
    pub fn questions(&self) -> Option<&[Question]> {
        self.held().map(|h| h.questions.as_slice())
    }

    pub fn self_check(&self) -> Option<&SelfCheck> {
        self.held().map(|h| &h.self_check)
    }

    pub fn saved_quiz(&self) -> Option<&Quiz> {
        match &self.state {
            AuthoringState::Saved { quiz, .. } => Some(quiz),
            _ => None,
        }
    }

    fn held(&self) -> Option<&HeldQuestions> {
        match &self.state {
            AuthoringState::Previewed { held, .. } | AuthoringState::Saved { held, .. } => Some(held),
            AuthoringState::Saving { held, .. } => held.as_ref(),
            _ => None,
        }
    }

    // ========== 选择文件 ==========

    /// 选择文件；类型或大小不合格时拒绝，状态不变
    pub fn select_file(&mut self, file: UploadFile) -> AppResult<()> {
        self.ensure_not_busy("select a file")?;

        if let Err(e) = self.guard.check(&file) {
            return Err(self.reject(e.into()));
        }

        info!("✓ 已选择文件 {} ({})", file.file_name(), format_file_size(file.size()));
        self.state = AuthoringState::FileSelected { file: Arc::new(file) };
        self.error = None;
        self.notice = None;
        Ok(())
    }

    /// 从磁盘读取并选择文件；超限的文件不会被读入内存
    pub async fn select_path(&mut self, path: &Path) -> AppResult<()> {
        self.ensure_not_busy("select a file")?;
        match self.guard.read(path).await {
            Ok(file) => self.select_file(file),
            Err(e) => Err(self.reject(e)),
        }
    }

    /// 移除已选择的文件
    pub fn clear_file(&mut self) -> AppResult<()> {
        self.ensure_not_busy("remove the file")?;
        match self.state {
            AuthoringState::FileSelected { .. } => {
                self.state = AuthoringState::Idle;
                self.error = None;
                Ok(())
            }
            _ => Err(self.not_allowed("remove the file")),
        }
    }

    // ========== 解析预览 ==========

    pub fn begin_preview(&mut self) -> AppResult<PreviewRequest> {
        self.ensure_not_busy("preview")?;
        let file = self.selected_file("preview")?;

        let ticket = self.epoch.issue(RequestAction::Preview);
        debug!("{} 发送 {} 到解析服务", ticket, file.file_name());
        self.state = AuthoringState::Previewing { file: Arc::clone(&file) };
        self.error = None;
        Ok(PreviewRequest { ticket, file })
    }

    pub fn complete_preview(
        &mut self,
        ticket: PendingRequest,
        result: AppResult<Vec<Question>>,
    ) -> AppResult<Completion> {
        let Some(AuthoringState::Previewing { file }) = self.take_pending(&ticket, RequestAction::Preview) else {
            return Ok(Completion::Stale);
        };

        match result {
            Ok(questions) => {
                info!("✓ 解析完成，共 {} 道题", questions.len());
                self.notice = Some(format!("Parsed {} questions! Review below.", questions.len()));
                self.state = AuthoringState::Previewed {
                    file,
                    held: HeldQuestions::new(questions),
                };
                Ok(Completion::Applied)
            }
            Err(e) => {
                self.state = AuthoringState::FileSelected { file };
                Err(self.reject(e))
            }
        }
    }

    /// 解析文档，结果留在本地等待检查
    pub async fn preview<B: QuizBackend>(&mut self, backend: &B) -> AppResult<Completion> {
        let request = self.begin_preview()?;
        let result = backend.parse_document(self.module_id, &request.file).await;
        self.complete_preview(request.ticket, result)
    }

    // ========== 解析并保存 ==========

    pub fn begin_upload_and_save(&mut self, title: &str, description: &str) -> AppResult<UploadRequest> {
        self.ensure_not_busy("upload")?;
        let file = self.selected_file("upload")?;

        let ticket = self.epoch.issue(RequestAction::UploadAndSave);
        let title = non_blank_or(title, &self.default_title);
        let description = non_blank_or(description, &self.default_description);
        debug!("{} 上传 {}，标题 {}", ticket, file.file_name(), title);

        self.state = AuthoringState::Saving {
            file: Arc::clone(&file),
            held: None,
        };
        self.error = None;
        Ok(UploadRequest {
            ticket,
            file,
            title,
            description,
        })
    }

    pub fn complete_upload(
        &mut self,
        ticket: PendingRequest,
        result: AppResult<CommitReceipt>,
    ) -> AppResult<Completion> {
        let Some(AuthoringState::Saving { file, held: None }) = self.take_pending(&ticket, RequestAction::UploadAndSave)
        else {
            return Ok(Completion::Stale);
        };

        match result {
            Ok(receipt) => {
                let questions = receipt.quiz.questions.clone();
                info!("✓ 上传并保存完成，共 {} 道题", questions.len());
                self.notice = Some(
                    receipt
                        .message
                        .filter(|m| !m.trim().is_empty())
                        .unwrap_or_else(|| "Quiz uploaded successfully!".to_string()),
                );
                self.state = AuthoringState::Saved {
                    quiz: receipt.quiz,
                    held: HeldQuestions::new(questions),
                };
                Ok(Completion::Applied)
            }
            Err(e) => {
                self.state = AuthoringState::FileSelected { file };
                Err(self.reject(e))
            }
        }
    }

    /// 解析并直接保存，不经过预览
    pub async fn upload_and_save<B: QuizBackend>(
        &mut self,
        backend: &B,
        title: &str,
        description: &str,
    ) -> AppResult<Completion> {
        let request = self.begin_upload_and_save(title, description)?;
        let result = backend
            .parse_and_commit(self.module_id, &request.file, &request.title, &request.description)
            .await;
        self.complete_upload(request.ticket, result)
    }

    // ========== 提交预览题目 ==========

    pub fn begin_commit(&mut self, title: &str, description: &str) -> AppResult<CommitRequest> {
        self.ensure_not_busy("save")?;
        let AuthoringState::Previewed { held, .. } = &self.state else {
            return Err(self.not_allowed("save"));
        };

        let draft = QuizDraft::new(
            non_blank_or(title, &self.default_title),
            non_blank_or(description, &self.default_description),
            held.questions.clone(),
        );
        if let Err(e) = draft.validate() {
            return Err(self.reject(e.into()));
        }

        let AuthoringState::Previewed { file, held } = std::mem::replace(&mut self.state, AuthoringState::Idle) else {
            return Err(self.not_allowed("save"));
        };
        let ticket = self.epoch.issue(RequestAction::Commit);
        debug!("{} 提交 {} 道题", ticket, draft.questions.len());

        self.state = AuthoringState::Saving {
            file,
            held: Some(held),
        };
        self.error = None;
        Ok(CommitRequest { ticket, draft })
    }

    /// 提交失败时回到 Previewed，题目和自测结果都保留
    pub fn complete_commit(&mut self, ticket: PendingRequest, result: AppResult<Quiz>) -> AppResult<Completion> {
        let Some(AuthoringState::Saving { file, held: Some(held) }) = self.take_pending(&ticket, RequestAction::Commit)
        else {
            return Ok(Completion::Stale);
        };

        match result {
            Ok(quiz) => {
                info!("✓ 测验已保存 (quizId={:?})", quiz.quiz_id);
                self.notice = Some("Quiz saved successfully! Students can now take this quiz.".to_string());
                self.state = AuthoringState::Saved { quiz, held };
                Ok(Completion::Applied)
            }
            Err(e) => {
                self.state = AuthoringState::Previewed { file, held };
                Err(self.reject(e))
            }
        }
    }

    /// 保存预览中的题目
    pub async fn commit_previewed<B: QuizBackend>(
        &mut self,
        backend: &B,
        title: &str,
        description: &str,
    ) -> AppResult<Completion> {
        let request = self.begin_commit(title, description)?;
        let result = backend.commit_quiz(self.module_id, &request.draft).await;
        self.complete_commit(request.ticket, result)
    }

    // ========== 重置 ==========

    /// "再上传一个"：清空文件、题目和自测结果
    pub fn reset(&mut self) -> AppResult<()> {
        self.ensure_not_busy("reset")?;
        match self.state {
            AuthoringState::Previewed { .. } | AuthoringState::Saved { .. } => {
                info!("流程已重置");
                self.state = AuthoringState::Idle;
                self.error = None;
                self.notice = None;
                Ok(())
            }
            _ => Err(self.not_allowed("reset")),
        }
    }

    /// 离开页面：丢弃全部状态，在途请求的响应将被忽略
    pub fn abandon(&mut self) {
        if self.state.is_pending() {
            debug!("离开时仍有请求在途 ({})，响应将被丢弃", self.state.name());
        }
        self.epoch.advance();
        self.state = AuthoringState::Idle;
        self.error = None;
        self.notice = None;
    }

    // ========== 自测 ==========

    pub fn select_answer(&mut self, index: usize, letter: OptionLetter) -> AppResult<()> {
        self.ensure_not_busy("answer")?;
        let held = self.held_mut("answer")?;
        held.self_check.select(&held.questions, index, letter)?;
        Ok(())
    }

    pub fn submit_self_check(&mut self) -> AppResult<AttemptResult> {
        self.ensure_not_busy("submit the preview")?;
        let held = self.held_mut("submit the preview")?;
        match held.self_check.submit(&held.questions) {
            Ok(result) => {
                let result = result.clone();
                self.notice = Some(format!("Preview Score: {} / {}", result.score, result.total));
                Ok(result)
            }
            Err(e) => Err(self.reject(e.into())),
        }
    }

    pub fn reset_self_check(&mut self) -> AppResult<()> {
        self.ensure_not_busy("reset the preview")?;
        self.held_mut("reset the preview")?.self_check.reset();
        Ok(())
    }

    // ========== 内部 ==========

    fn held_mut(&mut self, action: &'static str) -> AppResult<&mut HeldQuestions> {
        let state = self.state.name();
        match &mut self.state {
            AuthoringState::Previewed { held, .. } | AuthoringState::Saved { held, .. } => Ok(held),
            _ => Err(AppError::not_allowed(COMPONENT, action, state)),
        }
    }

    fn selected_file(&mut self, action: &'static str) -> AppResult<Arc<UploadFile>> {
        match &self.state {
            AuthoringState::FileSelected { file } => Ok(Arc::clone(file)),
            AuthoringState::Idle => Err(self.reject(ValidationError::NoFileSelected.into())),
            _ => Err(self.not_allowed(action)),
        }
    }

    fn ensure_not_busy(&self, action: &'static str) -> AppResult<()> {
        if self.state.is_pending() {
            warn!("⚠️ 请求在途，拒绝 {}", action);
            return Err(TransitionError::Busy { action }.into());
        }
        Ok(())
    }

    /// 凭据仍有效且状态与请求种类一致时取出当前状态
    fn take_pending(&mut self, ticket: &PendingRequest, action: RequestAction) -> Option<AuthoringState> {
        let state_matches = matches!(
            (&self.state, action),
            (AuthoringState::Previewing { .. }, RequestAction::Preview)
                | (AuthoringState::Saving { held: None, .. }, RequestAction::UploadAndSave)
                | (AuthoringState::Saving { held: Some(_), .. }, RequestAction::Commit)
        );
        if !self.epoch.is_current(ticket) || ticket.action() != action || !state_matches {
            debug!("丢弃过期响应 {}", ticket);
            return None;
        }
        Some(std::mem::replace(&mut self.state, AuthoringState::Idle))
    }

    fn not_allowed(&self, action: &'static str) -> AppError {
        let err = AppError::not_allowed(COMPONENT, action, self.state.name());
        warn!("⚠️ {}", err);
        err
    }

    /// 记录错误并返回
    fn reject(&mut self, err: AppError) -> AppError {
        warn!("⚠️ {}", err);
        self.error = Some(err.display_message());
        err
    }
}

fn non_blank_or(value: &str, default: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        default.to_string()
    } else {
        trimmed.to_string()
    }
}
