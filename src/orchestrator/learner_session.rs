//! 学员作答会话 - 编排层
//!
//! ## 职责
//!
//! 在终端里驱动一个 [`AttemptEngine`]：组卷、作答、提交、查看回顾、重试。
//! 只做输入输出和调度，状态转换全部交给引擎。

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncWrite};
use tracing::info;

use crate::clients::QuizBackend;
use crate::config::Config;
use crate::models::question::ModuleId;
use crate::orchestrator::terminal::{parse_answer, Terminal};
use crate::services::scoring::AttemptResult;
use crate::utils::logging::truncate_text;
use crate::workflow::attempt::{format_elapsed, AttemptEngine, AttemptState};

/// 会话统计
#[derive(Debug, Default)]
pub struct LearnerSummary {
    /// 每次提交的结果，按时间顺序
    pub results: Vec<AttemptResult>,
    /// 题库为空
    pub empty_pool: bool,
}

enum Played {
    Submitted,
    Quit,
}

/// 运行一次学员会话
///
/// # 参数
/// - `backend`: 组卷协作方
/// - `module_id`: 模块 ID
/// - `count`: 题目数，`None` 时使用默认值
/// - `terminal`: 终端
///
/// # 返回
/// 返回本次会话的统计
pub async fn run_learner_session<B, R, W>(
    backend: &B,
    config: &Config,
    module_id: ModuleId,
    count: Option<usize>,
    terminal: &mut Terminal<R, W>,
) -> Result<LearnerSummary>
where
    B: QuizBackend,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut summary = LearnerSummary::default();
    let mut engine = AttemptEngine::new(config, module_id, count);

    terminal.say("Loading quiz...").await?;
    if let Err(e) = engine.load(backend).await {
        terminal.say(format!("⚠️ {}", e.display_message())).await?;
        return Ok(summary);
    }

    match engine.state() {
        AttemptState::EmptyPool => {
            show_empty_pool(terminal).await?;
            summary.empty_pool = true;
            return Ok(summary);
        }
        AttemptState::NotStarted { quiz } => {
            terminal.say(format!("\n{}", quiz.title)).await?;
            if !quiz.description.is_empty() {
                terminal.say(&quiz.description).await?;
            }
            terminal.say(format!("{} questions", quiz.questions.len())).await?;
            terminal.say("You can retry the quiz as many times as you want.").await?;
        }
        _ => {}
    }

    match terminal.ask("Press Enter to start (or type `quit`):").await? {
        Some(line) if !line.eq_ignore_ascii_case("quit") => engine.start()?,
        _ => {
            engine.leave();
            return Ok(summary);
        }
    }

    loop {
        if let Played::Quit = play_attempt(&mut engine, terminal).await? {
            engine.leave();
            break;
        }
        if let Some(result) = engine.result() {
            summary.results.push(result.clone());
        }
        show_result(&engine, terminal).await?;

        if !terminal.confirm("Retry with a fresh set of questions?").await? {
            engine.leave();
            break;
        }

        terminal.say("Loading quiz...").await?;
        if let Err(e) = engine.retry(backend).await {
            terminal.say(format!("⚠️ {}", e.display_message())).await?;
            break;
        }
        if let AttemptState::EmptyPool = engine.state() {
            show_empty_pool(terminal).await?;
            summary.empty_pool = true;
            break;
        }
    }

    info!("会话结束，共提交 {} 次", summary.results.len());
    Ok(summary)
}

/// 作答直到提交或退出
async fn play_attempt<R, W>(engine: &mut AttemptEngine, terminal: &mut Terminal<R, W>) -> Result<Played>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    show_questions(engine, terminal).await?;

    loop {
        let (answered, total) = engine.progress().unwrap_or((0, 0));
        let prompt = format!(
            "[{}/{} answered, {}] `<n> <letter>`, `show`, `submit` or `quit`:",
            answered,
            total,
            format_elapsed(engine.elapsed_seconds())
        );
        let Some(line) = terminal.ask(&prompt).await? else {
            return Ok(Played::Quit);
        };

        match line.to_lowercase().as_str() {
            "" => {}
            "quit" => return Ok(Played::Quit),
            "show" => show_questions(engine, terminal).await?,
            "submit" => match engine.submit() {
                Ok(_) => return Ok(Played::Submitted),
                Err(e) => terminal.say(format!("⚠️ {}", e.display_message())).await?,
            },
            other => match parse_answer(other) {
                Some((number, Ok(letter))) => {
                    let question_id = engine
                        .attempt()
                        .and_then(|a| a.questions().get(number.checked_sub(1)?))
                        .and_then(|q| q.question_id);
                    match question_id {
                        Some(id) => {
                            if let Err(e) = engine.select(id, letter) {
                                terminal.say(format!("⚠️ {}", e.display_message())).await?;
                            }
                        }
                        None => terminal.say(format!("⚠️ There is no question {}.", number)).await?,
                    }
                }
                Some((_, Err(e))) => terminal.say(format!("⚠️ {}", e)).await?,
                None => terminal.say("⚠️ Type an answer like `2 b`.").await?,
            },
        }
    }
}

async fn show_questions<R, W>(engine: &AttemptEngine, terminal: &mut Terminal<R, W>) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let Some(attempt) = engine.attempt() else {
        return Ok(());
    };
    for (index, question) in attempt.questions().iter().enumerate() {
        terminal.say("").await?;
        terminal.show_question(index + 1, question).await?;
        if let Some(letter) = question.question_id.and_then(|id| attempt.selection(id)) {
            terminal.say(format!("   -> {}", letter)).await?;
        }
    }
    terminal.say("").await?;
    Ok(())
}

async fn show_result<R, W>(engine: &AttemptEngine, terminal: &mut Terminal<R, W>) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let Some(result) = engine.result() else {
        return Ok(());
    };

    terminal.say(format!("\n{}", "=".repeat(40))).await?;
    terminal
        .say(format!(
            "Score: {}/{} ({}%) {}",
            result.score,
            result.total,
            result.percentage,
            if result.passed { "Passed" } else { "Not passed" }
        ))
        .await?;
    terminal.say(format!("Time: {}", format_elapsed(engine.elapsed_seconds()))).await?;
    if let Some(notice) = engine.notice() {
        terminal.say(notice).await?;
    }
    terminal.say("=".repeat(40)).await?;

    for (index, review) in result.per_question.iter().enumerate() {
        let mark = if review.correct { "✓" } else { "✗" };
        let selected = review.selected_option.map(|l| l.to_string()).unwrap_or_else(|| "-".into());
        terminal
            .say(format!(
                "{} {}. {} | your answer {}, correct {}",
                mark,
                index + 1,
                truncate_text(&review.question_text, 60),
                selected,
                review.correct_option
            ))
            .await?;
    }
    Ok(())
}

async fn show_empty_pool<R, W>(terminal: &mut Terminal<R, W>) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    terminal.say("No quiz questions available for this module.").await?;
    terminal
        .say("Your instructor has not uploaded any quizzes yet. Check back later.")
        .await?;
    Ok(())
}
