//! 讲师会话 - 编排层
//!
//! ## 职责
//!
//! 在终端里驱动 [`AuthoringPipeline`] 和 [`QuizLibrary`]：
//! 解析预览、自测、保存、解析并直接保存、手工组卷、列出和删除测验。

use anyhow::Result;
use std::path::Path;
use tokio::io::{AsyncBufRead, AsyncWrite};
use tracing::{info, warn};

use crate::clients::{LocalStore, QuizBackend};
use crate::config::Config;
use crate::models::loaders::{load_all_drafts, load_draft};
use crate::models::question::{ModuleId, Question, Quiz, QuizId};
use crate::orchestrator::terminal::{parse_answer, Terminal};
use crate::services::quiz_library::QuizLibrary;
use crate::utils::logging::truncate_text;
use crate::workflow::authoring::AuthoringPipeline;

/// 解析文档、自测，确认后保存
///
/// # 返回
/// 保存成功时返回新测验
pub async fn preview_document<B, R, W>(
    backend: &B,
    config: &Config,
    module_id: ModuleId,
    path: &Path,
    terminal: &mut Terminal<R, W>,
) -> Result<Option<Quiz>>
where
    B: QuizBackend,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut pipeline = AuthoringPipeline::new(config, module_id);
    if let Err(e) = pipeline.select_path(path).await {
        terminal.say(format!("⚠️ {}", e.display_message())).await?;
        return Ok(None);
    }

    terminal.say("Parsing quiz questions from file...").await?;
    if let Err(e) = pipeline.preview(backend).await {
        terminal.say(format!("⚠️ Failed to parse questions. {}", e.display_message())).await?;
        return Ok(None);
    }
    show_notice(&pipeline, terminal).await?;

    let questions = pipeline.questions().unwrap_or_default().to_vec();
    show_question_list(&questions, terminal).await?;
    if questions.is_empty() {
        return Ok(None);
    }

    if terminal.confirm("Try the questions yourself before saving?").await? {
        run_self_check(&mut pipeline, terminal).await?;
    }

    if !terminal.confirm("Save these questions as a new quiz?").await? {
        pipeline.abandon();
        return Ok(None);
    }

    let title = terminal
        .ask(&format!("Title [{}]:", config.default_quiz_title))
        .await?
        .unwrap_or_default();
    let description = terminal
        .ask(&format!("Description [{}]:", config.default_quiz_description))
        .await?
        .unwrap_or_default();

    // 保存失败时题目仍在本地，不需要重新上传
    loop {
        match pipeline.commit_previewed(backend, &title, &description).await {
            Ok(_) => {
                show_notice(&pipeline, terminal).await?;
                return Ok(pipeline.saved_quiz().cloned());
            }
            Err(e) => {
                terminal.say(format!("⚠️ Failed to save quiz. {}", e.display_message())).await?;
                if !terminal.confirm("Try saving again?").await? {
                    pipeline.abandon();
                    return Ok(None);
                }
            }
        }
    }
}

/// 解析并直接保存，不经过预览
pub async fn upload_document<B, R, W>(
    backend: &B,
    config: &Config,
    module_id: ModuleId,
    path: &Path,
    title: &str,
    description: &str,
    terminal: &mut Terminal<R, W>,
) -> Result<Option<Quiz>>
where
    B: QuizBackend,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut pipeline = AuthoringPipeline::new(config, module_id);
    if let Err(e) = pipeline.select_path(path).await {
        terminal.say(format!("⚠️ {}", e.display_message())).await?;
        return Ok(None);
    }

    terminal.say("Uploading and saving quiz questions...").await?;
    if let Err(e) = pipeline.upload_and_save(backend, title, description).await {
        terminal.say(format!("⚠️ Upload failed. {}", e.display_message())).await?;
        return Ok(None);
    }
    show_notice(&pipeline, terminal).await?;
    show_question_list(pipeline.questions().unwrap_or_default(), terminal).await?;

    Ok(pipeline.saved_quiz().cloned())
}

/// 保存一份手工编写的 TOML 测验
pub async fn commit_draft<B, R, W>(
    backend: &B,
    module_id: ModuleId,
    path: &Path,
    terminal: &mut Terminal<R, W>,
) -> Result<Quiz>
where
    B: QuizBackend,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let draft = load_draft(path).await?;
    info!("📤 提交 {} ({} 道题)", draft.title, draft.questions.len());

    let quiz = backend.commit_quiz(module_id, &draft).await?;
    terminal
        .say(format!(
            "✓ Saved quiz #{} \"{}\" with {} questions.",
            quiz.quiz_id.map(|id| id.to_string()).unwrap_or_else(|| "?".into()),
            quiz.title,
            draft.questions.len()
        ))
        .await?;
    Ok(quiz)
}

/// 列出模块下的测验
pub async fn list_quizzes<B, R, W>(
    backend: &B,
    module_id: ModuleId,
    terminal: &mut Terminal<R, W>,
) -> Result<QuizLibrary>
where
    B: QuizBackend,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut library = QuizLibrary::new(module_id);
    library.refresh(backend).await?;

    if library.quizzes().is_empty() {
        terminal.say("No quizzes uploaded for this module yet.").await?;
        return Ok(library);
    }

    for quiz in library.quizzes() {
        terminal
            .say(format!(
                "#{:<6} {} ({} questions)",
                quiz.quiz_id.map(|id| id.to_string()).unwrap_or_default(),
                quiz.title,
                quiz.questions.len()
            ))
            .await?;
    }
    terminal
        .say(format!(
            "{} quizzes, {} questions in the pool.",
            library.quizzes().len(),
            library.total_question_count()
        ))
        .await?;
    Ok(library)
}

/// 删除一个测验
pub async fn delete_quiz<B, R, W>(
    backend: &B,
    module_id: ModuleId,
    quiz_id: QuizId,
    terminal: &mut Terminal<R, W>,
) -> Result<()>
where
    B: QuizBackend,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut library = QuizLibrary::new(module_id);
    library.delete(backend, quiz_id).await?;
    terminal.say("Quiz deleted.").await?;
    Ok(())
}

/// 把目录下的 TOML 测验装入内存题库
///
/// # 返回
/// 返回装入的测验数量
pub async fn stock_local_store(store: &LocalStore, module_id: ModuleId, dir: &Path) -> Result<usize> {
    let drafts = load_all_drafts(dir).await?;
    if drafts.is_empty() {
        warn!("⚠️ {} 下没有可用的测验", dir.display());
    }

    for draft in &drafts {
        store.commit_quiz(module_id, draft).await?;
    }
    info!("✓ 已装入 {} 个测验", drafts.len());
    Ok(drafts.len())
}

/// 自测：逐题作答、提交、可重置
async fn run_self_check<R, W>(pipeline: &mut AuthoringPipeline, terminal: &mut Terminal<R, W>) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    loop {
        let Some(line) = terminal
            .ask("Self-check: `<n> <letter>`, `submit`, `reset` or `done`:")
            .await?
        else {
            return Ok(());
        };

        match line.to_lowercase().as_str() {
            "" => {}
            "done" => return Ok(()),
            "reset" => {
                pipeline.reset_self_check()?;
                terminal.say("Self-check cleared.").await?;
            }
            "submit" => match pipeline.submit_self_check() {
                Ok(result) => {
                    show_notice(pipeline, terminal).await?;
                    for (index, review) in result.per_question.iter().enumerate() {
                        let mark = if review.correct { "✓" } else { "✗" };
                        terminal
                            .say(format!("{} {}. correct answer {}", mark, index + 1, review.correct_option))
                            .await?;
                    }
                }
                Err(e) => terminal.say(format!("⚠️ {}", e.display_message())).await?,
            },
            other => match parse_answer(other) {
                Some((number, Ok(letter))) if number >= 1 => {
                    if let Err(e) = pipeline.select_answer(number - 1, letter) {
                        terminal.say(format!("⚠️ {}", e.display_message())).await?;
                    }
                }
                Some((_, Err(e))) => terminal.say(format!("⚠️ {}", e)).await?,
                _ => terminal.say("⚠️ Type an answer like `2 b`.").await?,
            },
        }
    }
}

async fn show_question_list<R, W>(questions: &[Question], terminal: &mut Terminal<R, W>) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    for (index, question) in questions.iter().enumerate() {
        terminal.say("").await?;
        terminal.show_question(index + 1, question).await?;
        terminal.say(format!("   correct: {}", question.correct_option())).await?;
    }
    if !questions.is_empty() {
        info!("题目预览: {}", truncate_text(&questions[0].question_text, 40));
    }
    Ok(())
}

async fn show_notice<R, W>(pipeline: &AuthoringPipeline, terminal: &mut Terminal<R, W>) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    if let Some(notice) = pipeline.notice() {
        terminal.say(format!("✓ {}", notice)).await?;
    }
    Ok(())
}
