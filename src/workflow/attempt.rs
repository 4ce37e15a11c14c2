//! 学员作答引擎 - 流程层
//!
//! 核心职责：管理一次作答从组卷到出分的完整生命周期
//!
//! 流程顺序：
//! 1. Loading → NotStarted（组卷）/ EmptyPool / Failed
//! 2. NotStarted → InProgress（开始计时）
//! 3. InProgress → Submitted（全部作答后提交，停止计时并计分）
//! 4. Submitted → Loading → InProgress（重试：丢弃本次作答，重新组卷并自动开始）

use chrono::{DateTime, Local};
use tracing::{debug, info, warn};

use crate::clients::{AssemblyOutcome, QuizBackend};
use crate::config::Config;
use crate::error::{AppError, AppResult, TransitionError, ValidationError};
use crate::infrastructure::AttemptTimer;
use crate::models::question::{ModuleId, OptionLetter, Question, QuestionId, QuestionKey, Quiz, Selections};
use crate::services::assembly::QuizAssembler;
use crate::services::scoring::{score, AttemptResult};
use crate::workflow::pending::{Completion, Epoch, PendingRequest, RequestAction};
use crate::workflow::self_check::answered_count;

const COMPONENT: &str = "quiz attempt";

/// 一次作答
///
/// 题目顺序和选项字母在下发时确定，之后不再改变。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    quiz: Quiz,
    selections: Selections,
    started_at: DateTime<Local>,
    elapsed_seconds: u64,
}

impl Attempt {
    fn new(quiz: Quiz) -> Self {
        Self {
            quiz,
            selections: Selections::new(),
            started_at: Local::now(),
            elapsed_seconds: 0,
        }
    }

    pub fn title(&self) -> &str {
        &self.quiz.title
    }

    pub fn description(&self) -> &str {
        &self.quiz.description
    }

    pub fn questions(&self) -> &[Question] {
        &self.quiz.questions
    }

    pub fn selections(&self) -> &Selections {
        &self.selections
    }

    pub fn selection(&self, question_id: QuestionId) -> Option<OptionLetter> {
        self.selections.get(&QuestionKey::Id(question_id)).copied()
    }

    pub fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }

    /// 提交时冻结的用时；作答中请读 [`AttemptEngine::elapsed_seconds`]
    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed_seconds
    }

    /// (已作答, 总题数)
    pub fn progress(&self) -> (usize, usize) {
        (answered_count(self.questions(), &self.selections), self.questions().len())
    }
}

/// 作答引擎状态
#[derive(Debug)]
pub enum AttemptState {
    /// 正在组卷（或尚未开始组卷）
    Loading,
    /// 题库为空，只能返回，不能重试
    EmptyPool,
    Failed {
        message: String,
    },
    NotStarted {
        quiz: Quiz,
    },
    InProgress {
        attempt: Attempt,
        timer: AttemptTimer,
    },
    Submitted {
        attempt: Attempt,
        result: AttemptResult,
    },
}

impl AttemptState {
    pub fn name(&self) -> &'static str {
        match self {
            AttemptState::Loading => "loading",
            AttemptState::EmptyPool => "empty",
            AttemptState::Failed { .. } => "failed",
            AttemptState::NotStarted { .. } => "not started",
            AttemptState::InProgress { .. } => "in progress",
            AttemptState::Submitted { .. } => "submitted",
        }
    }
}

/// 学员作答引擎
///
/// - 每个实例只对应一次作答（重试会替换掉旧的作答）
/// - 同一时间最多一个组卷请求在途
/// - 计时器在离开 InProgress 的每条路径上都会被取消
pub struct AttemptEngine {
    module_id: ModuleId,
    requested: Option<usize>,
    assembler: QuizAssembler,
    state: AttemptState,
    epoch: Epoch,
    in_flight: bool,
    start_on_arrival: bool,
    notice: Option<String>,
}

impl AttemptEngine {
    /// 创建作答引擎
    ///
    /// # 参数
    /// - `module_id`: 模块 ID
    /// - `requested`: 题目数，`None` 时使用配置中的默认值
    pub fn new(config: &Config, module_id: ModuleId, requested: Option<usize>) -> Self {
        Self {
            module_id,
            requested,
            assembler: QuizAssembler::new(config),
            state: AttemptState::Loading,
            epoch: Epoch::default(),
            in_flight: false,
            start_on_arrival: false,
            notice: None,
        }
    }

    pub fn module_id(&self) -> ModuleId {
        self.module_id
    }

    pub fn state(&self) -> &AttemptState {
        &self.state
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight
    }

    /// 最近一次提示（结果评语）
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.state {
            AttemptState::Failed { message } => Some(message),
            _ => None,
        }
    }

    pub fn attempt(&self) -> Option<&Attempt> {
        match &self.state {
            AttemptState::InProgress { attempt, .. } | AttemptState::Submitted { attempt, .. } => Some(attempt),
            _ => None,
        }
    }

    /// 当前的题目集（开始前也可以读取标题和题数）
    pub fn quiz(&self) -> Option<&Quiz> {
        match &self.state {
            AttemptState::NotStarted { quiz } => Some(quiz),
            _ => self.attempt().map(|a| &a.quiz),
        }
    }

    pub fn result(&self) -> Option<&AttemptResult> {
        match &self.state {
            AttemptState::Submitted { result, .. } => Some(result),
            _ => None,
        }
    }

    /// (已作答, 总题数)，每次调用重新计算
    pub fn progress(&self) -> Option<(usize, usize)> {
        self.attempt().map(Attempt::progress)
    }

    /// 作答中读计时器，提交后读冻结值
    pub fn elapsed_seconds(&self) -> u64 {
        match &self.state {
            AttemptState::InProgress { timer, .. } => timer.elapsed_seconds(),
            AttemptState::Submitted { attempt, .. } => attempt.elapsed_seconds,
            _ => 0,
        }
    }

    // ========== 组卷 ==========

    /// 发起首次组卷（或失败后重新组卷）
    pub fn begin_load(&mut self) -> AppResult<PendingRequest> {
        self.ensure_not_busy("load the quiz")?;
        match self.state {
            AttemptState::Loading | AttemptState::Failed { .. } => {}
            _ => return Err(self.not_allowed("load the quiz")),
        }

        self.start_on_arrival = false;
        Ok(self.issue_assembly())
    }

    /// 应用组卷结果
    pub fn complete_load(
        &mut self,
        ticket: PendingRequest,
        result: AppResult<AssemblyOutcome>,
    ) -> AppResult<Completion> {
        if !self.in_flight || ticket.action() != RequestAction::Assemble || !self.epoch.is_current(&ticket) {
            debug!("丢弃过期组卷结果 {}", ticket);
            return Ok(Completion::Stale);
        }
        self.in_flight = false;

        match result {
            Ok(AssemblyOutcome::Ready(quiz)) if quiz.questions.is_empty() => {
                info!("模块 {} 下发了空试卷，按空题库处理", self.module_id);
                self.start_on_arrival = false;
                self.state = AttemptState::EmptyPool;
                Ok(Completion::Applied)
            }
            Ok(AssemblyOutcome::Ready(quiz)) => {
                info!("✓ 试卷就绪: {} ({} 道题)", quiz.title, quiz.questions.len());
                self.state = AttemptState::NotStarted { quiz };
                if std::mem::take(&mut self.start_on_arrival) {
                    self.start()?;
                }
                Ok(Completion::Applied)
            }
            Ok(AssemblyOutcome::EmptyPool) => {
                self.start_on_arrival = false;
                self.state = AttemptState::EmptyPool;
                Ok(Completion::Applied)
            }
            Err(e) => {
                warn!("⚠️ 组卷失败: {}", e);
                self.start_on_arrival = false;
                self.state = AttemptState::Failed {
                    message: e.display_message(),
                };
                Err(e)
            }
        }
    }

    /// 组卷
    pub async fn load<B: QuizBackend>(&mut self, backend: &B) -> AppResult<Completion> {
        let ticket = self.begin_load()?;
        let result = self.assembler.assemble(backend, self.module_id, self.requested).await;
        self.complete_load(ticket, result)
    }

    // ========== 作答 ==========

    /// 开始作答并启动计时器，需要在 tokio 运行时内调用
    pub fn start(&mut self) -> AppResult<()> {
        self.ensure_not_busy("start the quiz")?;
        let AttemptState::NotStarted { .. } = self.state else {
            return Err(self.not_allowed("start the quiz"));
        };
        let AttemptState::NotStarted { quiz } = std::mem::replace(&mut self.state, AttemptState::Loading) else {
            return Err(self.not_allowed("start the quiz"));
        };

        info!("📝 开始作答: {} 道题", quiz.questions.len());
        self.notice = None;
        self.state = AttemptState::InProgress {
            attempt: Attempt::new(quiz),
            timer: AttemptTimer::start(),
        };
        Ok(())
    }

    /// 选择答案，覆盖之前的选择；提交后静默忽略
    pub fn select(&mut self, question_id: QuestionId, letter: OptionLetter) -> AppResult<()> {
        let state = self.state.name();
        let attempt = match &mut self.state {
            AttemptState::InProgress { attempt, .. } => attempt,
            AttemptState::Submitted { .. } => {
                debug!("已提交，忽略第 {} 题的选择", question_id);
                return Ok(());
            }
            _ => return Err(AppError::not_allowed(COMPONENT, "select an answer", state)),
        };

        let key = QuestionKey::Id(question_id);
        let question = attempt
            .questions()
            .iter()
            .find(|q| q.question_id == Some(question_id))
            .ok_or(ValidationError::UnknownQuestion { key })?;
        if !question.has_option(letter) {
            return Err(ValidationError::OptionNotAvailable { key, letter }.into());
        }

        attempt.selections.insert(key, letter);
        Ok(())
    }

    /// 提交；还有题目没作答时拒绝且状态不变
    pub fn submit(&mut self) -> AppResult<AttemptResult> {
        let AttemptState::InProgress { attempt, .. } = &self.state else {
            return Err(self.not_allowed("submit"));
        };

        let (answered, total) = attempt.progress();
        if answered < total {
            warn!("⚠️ 还有 {} 道题未作答", total - answered);
            return Err(ValidationError::IncompleteAnswers { answered, total }.into());
        }
        let result = score(attempt.questions(), &attempt.selections)?;

        let AttemptState::InProgress { mut attempt, mut timer } =
            std::mem::replace(&mut self.state, AttemptState::Loading)
        else {
            return Err(self.not_allowed("submit"));
        };
        attempt.elapsed_seconds = timer.stop();

        info!(
            "✓ 已提交: {}/{} ({}%)，用时 {}",
            result.score,
            result.total,
            result.percentage,
            format_elapsed(attempt.elapsed_seconds)
        );
        self.notice = Some(result.verdict().message(result.percentage));
        self.state = AttemptState::Submitted {
            attempt,
            result: result.clone(),
        };
        Ok(result)
    }

    // ========== 重试 / 离开 ==========

    /// 丢弃本次作答并重新组卷；新试卷到达后自动开始
    pub fn begin_retry(&mut self) -> AppResult<PendingRequest> {
        self.ensure_not_busy("retry")?;
        let AttemptState::Submitted { .. } = self.state else {
            return Err(self.not_allowed("retry"));
        };

        info!("🔄 重试：重新组卷");
        self.state = AttemptState::Loading;
        self.notice = None;
        self.start_on_arrival = true;
        Ok(self.issue_assembly())
    }

    pub async fn retry<B: QuizBackend>(&mut self, backend: &B) -> AppResult<Completion> {
        let ticket = self.begin_retry()?;
        let result = self.assembler.assemble(backend, self.module_id, self.requested).await;
        self.complete_load(ticket, result)
    }

    /// 离开作答页面：取消计时器，在途的组卷结果将被丢弃
    pub fn leave(&mut self) {
        if self.in_flight {
            debug!("离开时组卷请求仍在途，结果将被丢弃");
        }
        self.epoch.advance();
        self.in_flight = false;
        self.start_on_arrival = false;
        self.notice = None;
        self.state = AttemptState::Loading;
    }

    // ========== 内部 ==========

    fn issue_assembly(&mut self) -> PendingRequest {
        let ticket = self.epoch.issue(RequestAction::Assemble);
        debug!("{} 模块 {} 组卷", ticket, self.module_id);
        self.in_flight = true;
        self.state = AttemptState::Loading;
        ticket
    }

    fn ensure_not_busy(&self, action: &'static str) -> AppResult<()> {
        if self.in_flight {
            return Err(TransitionError::Busy { action }.into());
        }
        Ok(())
    }

    fn not_allowed(&self, action: &'static str) -> AppError {
        let err = AppError::not_allowed(COMPONENT, action, self.state.name());
        warn!("⚠️ {}", err);
        err
    }
}

/// 用时显示为 `m:ss`
pub fn format_elapsed(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delivered(id: i64, correct: OptionLetter) -> Question {
        Question::new(
            Some(id),
            format!("Question {}", id),
            [
                (OptionLetter::A, "first".to_string()),
                (OptionLetter::B, "second".to_string()),
                (OptionLetter::C, "third".to_string()),
            ],
            correct,
        )
        .unwrap()
    }

    fn ready(questions: Vec<Question>) -> AppResult<AssemblyOutcome> {
        Ok(AssemblyOutcome::Ready(Quiz {
            quiz_id: Some(1),
            title: "Module Quiz".into(),
            description: "Randomized quiz from uploaded question pool".into(),
            questions,
        }))
    }

    fn loaded(questions: Vec<Question>) -> AttemptEngine {
        let mut engine = AttemptEngine::new(&Config::default(), 3, None);
        let ticket = engine.begin_load().unwrap();
        engine.complete_load(ticket, ready(questions)).unwrap();
        engine
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(0), "0:00");
        assert_eq!(format_elapsed(65), "1:05");
        assert_eq!(format_elapsed(600), "10:00");
    }

    #[tokio::test]
    async fn test_select_validation() {
        let mut engine = loaded(vec![delivered(10, OptionLetter::A)]);
        assert!(engine.select(10, OptionLetter::A).is_err());

        engine.start().unwrap();
        assert!(matches!(
            engine.select(99, OptionLetter::A),
            Err(AppError::Validation(ValidationError::UnknownQuestion { .. }))
        ));
        assert!(matches!(
            engine.select(10, OptionLetter::D),
            Err(AppError::Validation(ValidationError::OptionNotAvailable { .. }))
        ));

        engine.select(10, OptionLetter::B).unwrap();
        engine.select(10, OptionLetter::A).unwrap();
        assert_eq!(engine.attempt().unwrap().selection(10), Some(OptionLetter::A));
        assert_eq!(engine.progress(), Some((1, 1)));
    }

    #[tokio::test]
    async fn test_start_requires_quiz() {
        let mut engine = AttemptEngine::new(&Config::default(), 3, None);
        assert!(engine.start().is_err());

        let ticket = engine.begin_load().unwrap();
        assert!(matches!(engine.begin_load(), Err(AppError::Transition(TransitionError::Busy { .. }))));
        engine.complete_load(ticket, Ok(AssemblyOutcome::EmptyPool)).unwrap();
        assert_eq!(engine.state().name(), "empty");
        assert!(engine.start().is_err());
        assert!(engine.begin_load().is_err());
    }

    #[tokio::test]
    async fn test_empty_delivery_never_starts() {
        let mut engine = loaded(Vec::new());
        assert_eq!(engine.state().name(), "empty");
        assert!(engine.quiz().is_none());
        assert!(engine.start().is_err());
        assert_eq!(engine.elapsed_seconds(), 0);
    }

    #[tokio::test]
    async fn test_failed_load_can_be_reloaded() {
        let mut engine = AttemptEngine::new(&Config::default(), 3, None);
        let ticket = engine.begin_load().unwrap();
        let err = engine
            .complete_load(
                ticket,
                Err(AppError::collaborator(crate::error::Operation::AssembleAttempt, "")),
            )
            .unwrap_err();
        assert_eq!(err.display_message(), "Failed to generate randomized quiz.");
        assert_eq!(engine.error_message(), Some("Failed to generate randomized quiz."));

        let ticket = engine.begin_load().unwrap();
        engine.complete_load(ticket, ready(vec![delivered(1, OptionLetter::C)])).unwrap();
        assert_eq!(engine.state().name(), "not started");
    }

    #[tokio::test]
    async fn test_leave_discards_late_assembly() {
        let mut engine = AttemptEngine::new(&Config::default(), 3, None);
        let ticket = engine.begin_load().unwrap();
        engine.leave();

        let outcome = engine.complete_load(ticket, ready(vec![delivered(1, OptionLetter::A)])).unwrap();
        assert_eq!(outcome, Completion::Stale);
        assert!(engine.quiz().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_freezes_on_submit() {
        let mut engine = loaded(vec![delivered(1, OptionLetter::B)]);
        engine.start().unwrap();
        engine.select(1, OptionLetter::B).unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(2500)).await;
        assert_eq!(engine.elapsed_seconds(), 2);

        let result = engine.submit().unwrap();
        assert_eq!(result.percentage, 100);
        assert_eq!(engine.notice(), Some("Excellent! You scored 100%"));

        tokio::time::sleep(std::time::Duration::from_secs(30)).await;
        assert_eq!(engine.elapsed_seconds(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_leave_cancels_running_timer() {
        let metrics = tokio::runtime::Handle::current().metrics();
        let mut engine = loaded(vec![delivered(1, OptionLetter::A), delivered(2, OptionLetter::B)]);
        engine.start().unwrap();
        engine.select(1, OptionLetter::A).unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(1500)).await;
        assert_eq!(engine.elapsed_seconds(), 1);
        assert_eq!(metrics.num_alive_tasks(), 1);

        engine.leave();
        tokio::time::sleep(std::time::Duration::from_secs(10)).await;

        assert_eq!(metrics.num_alive_tasks(), 0);
        assert!(engine.attempt().is_none());
        assert_eq!(engine.elapsed_seconds(), 0);
        assert!(engine.submit().is_err());
    }
}
