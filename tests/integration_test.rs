mod common;

use common::{delivered, pdf, question, ScriptedBackend};
use learn_quiz::clients::{AssemblyOutcome, CommitReceipt, LocalStore, QuizBackend};
use learn_quiz::config::Config;
use learn_quiz::error::{AppError, Operation, ValidationError};
use learn_quiz::models::question::{OptionLetter, Quiz, QuizDraft};
use learn_quiz::orchestrator::instructor_session::stock_local_store;
use learn_quiz::orchestrator::{run_learner_session, Terminal};
use learn_quiz::workflow::{AttemptEngine, AttemptState, AuthoringPipeline, AuthoringState, Completion};
use std::fs;
use std::path::PathBuf;
use tokio_test::{assert_err, assert_ok};

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("learn_quiz_it_{}_{}", name, std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    dir
}

// ========== 出题流程 ==========

#[tokio::test]
async fn test_oversized_pdf_rejected_without_network_call() {
    let dir = scratch_dir("oversized");
    let path = dir.join("lecture.pdf");
    let file = fs::File::create(&path).unwrap();
    file.set_len(60 * 1024 * 1024).unwrap();

    let backend = ScriptedBackend::new();
    let mut pipeline = AuthoringPipeline::new(&Config::default(), 4);

    let err = pipeline.select_path(&path).await.unwrap_err();
    assert_eq!(err.display_message(), "File size (60.0 MB) exceeds the 50 MB limit.");
    assert_eq!(pipeline.state(), &AuthoringState::Idle);
    assert_eq!(
        pipeline.error_message(),
        Some("File size (60.0 MB) exceeds the 50 MB limit.")
    );

    // 没有文件可发送
    assert_err!(pipeline.preview(&backend).await);
    assert!(backend.calls().is_empty());

    fs::remove_dir_all(dir).ok();
}

#[tokio::test]
async fn test_preview_error_keeps_file_selected() {
    let backend = ScriptedBackend::new();
    backend.push_preview(Err(AppError::collaborator(Operation::ParseDocument, "Unreadable file")));

    let mut pipeline = AuthoringPipeline::new(&Config::default(), 4);
    pipeline.select_file(pdf("scan.pdf")).unwrap();

    let err = pipeline.preview(&backend).await.unwrap_err();
    assert!(err.is_collaborator());
    assert_eq!(pipeline.state().name(), "file selected");
    assert_eq!(pipeline.error_message(), Some("Unreadable file"));
    assert_eq!(pipeline.file().map(|f| f.file_name()), Some("scan.pdf"));

    // 同一个文件可以直接再试
    backend.push_preview(Ok(vec![question(None, "Retry works", OptionLetter::A)]));
    assert_ok!(pipeline.preview(&backend).await);
    assert_eq!(pipeline.state().name(), "previewed");
    assert_eq!(pipeline.error_message(), None);
}

#[tokio::test]
async fn test_commit_succeeds_after_failed_commit_without_reupload() {
    let backend = ScriptedBackend::new();
    backend
        .push_preview(Ok(vec![
            question(None, "Borrowing", OptionLetter::B),
            question(None, "Lifetimes", OptionLetter::C),
        ]))
        .push_commit(Err(AppError::collaborator_status(Operation::CommitQuiz, 503, None)))
        .push_commit(Ok(Quiz {
            quiz_id: Some(12),
            title: "Week 2".into(),
            description: "Uploaded Quiz".into(),
            questions: Vec::new(),
        }));

    let mut pipeline = AuthoringPipeline::new(&Config::default(), 4);
    pipeline.select_file(pdf("week2.docx")).unwrap();
    pipeline.preview(&backend).await.unwrap();

    // 自测的结果在保存失败后依然保留
    pipeline.select_answer(0, OptionLetter::B).unwrap();
    pipeline.select_answer(1, OptionLetter::A).unwrap();
    assert_eq!(pipeline.submit_self_check().unwrap().score, 1);

    let err = pipeline.commit_previewed(&backend, "Week 2", "").await.unwrap_err();
    assert_eq!(err.display_message(), "Failed to save quiz.");
    assert_eq!(pipeline.state().name(), "previewed");
    assert_eq!(pipeline.questions().unwrap().len(), 2);
    assert!(pipeline.self_check().unwrap().is_submitted());

    let applied = pipeline.commit_previewed(&backend, "Week 2", "").await.unwrap();
    assert_eq!(applied, Completion::Applied);
    assert_eq!(pipeline.state().name(), "saved");
    assert_eq!(
        pipeline.notice(),
        Some("Quiz saved successfully! Students can now take this quiz.")
    );

    assert_eq!(
        backend.calls(),
        vec![Operation::ParseDocument, Operation::CommitQuiz, Operation::CommitQuiz]
    );
    let committed = backend.committed();
    assert_eq!(committed[1].title, "Week 2");
    assert_eq!(committed[1].description, "Uploaded Quiz");
    assert_eq!(committed[0], committed[1]);
}

#[tokio::test]
async fn test_upload_and_save_skips_preview() {
    let backend = ScriptedBackend::new();
    backend.push_upload(Ok(CommitReceipt {
        quiz: Quiz {
            quiz_id: Some(3),
            title: "Module Quiz".into(),
            description: "Uploaded Quiz".into(),
            questions: vec![question(Some(31), "Saved question", OptionLetter::A)],
        },
        message: Some("Successfully uploaded 1 questions.".into()),
    }));

    let mut pipeline = AuthoringPipeline::new(&Config::default(), 4);
    pipeline.select_file(pdf("quiz.pdf")).unwrap();
    pipeline.upload_and_save(&backend, "", "").await.unwrap();

    assert_eq!(pipeline.state().name(), "saved");
    assert_eq!(pipeline.notice(), Some("Successfully uploaded 1 questions."));
    assert_eq!(backend.calls(), vec![Operation::ParseAndCommit]);

    // 已保存的题目也可以自测
    pipeline.select_answer(0, OptionLetter::A).unwrap();
    assert_eq!(pipeline.submit_self_check().unwrap().percentage, 100);
}

// ========== 作答引擎 ==========

#[tokio::test]
async fn test_single_question_full_score() {
    let backend = ScriptedBackend::new();
    backend.push_assembly(delivered(&[OptionLetter::B]));

    let mut engine = AttemptEngine::new(&Config::default(), 9, None);
    engine.load(&backend).await.unwrap();
    engine.start().unwrap();
    engine.select(100, OptionLetter::B).unwrap();

    let result = engine.submit().unwrap();
    assert_eq!((result.score, result.total, result.percentage), (1, 1, 100));
    assert!(result.passed);
}

#[tokio::test]
async fn test_three_of_four_correct() {
    use OptionLetter::*;
    let backend = ScriptedBackend::new();
    backend.push_assembly(delivered(&[A, B, C, A]));

    let mut engine = AttemptEngine::new(&Config::default(), 9, None);
    engine.load(&backend).await.unwrap();
    engine.start().unwrap();
    for (id, letter) in [(100, A), (101, B), (102, C), (103, B)] {
        engine.select(id, letter).unwrap();
    }

    let result = engine.submit().unwrap();
    assert_eq!(result.score, 3);
    assert_eq!(result.percentage, 75);
    assert!(result.passed);
    assert_eq!(engine.notice(), Some("Good effort! Keep practicing."));
    assert!(!result.per_question[3].correct);
}

#[tokio::test]
async fn test_incomplete_submit_rejected_without_state_change() {
    use OptionLetter::*;
    let backend = ScriptedBackend::new();
    backend.push_assembly(delivered(&[A, B, C]));

    let mut engine = AttemptEngine::new(&Config::default(), 9, None);
    engine.load(&backend).await.unwrap();
    engine.start().unwrap();
    engine.select(100, A).unwrap();
    engine.select(101, B).unwrap();

    let err = engine.submit().unwrap_err();
    assert!(matches!(
        err,
        AppError::Validation(ValidationError::IncompleteAnswers { answered: 2, total: 3 })
    ));
    assert_eq!(err.display_message(), "Please answer all questions before submitting.");
    assert_eq!(engine.state().name(), "in progress");
    assert_eq!(engine.progress(), Some((2, 3)));
}

#[tokio::test]
async fn test_select_after_submit_is_noop() {
    use OptionLetter::*;
    let backend = ScriptedBackend::new();
    backend.push_assembly(delivered(&[A, B]));

    let mut engine = AttemptEngine::new(&Config::default(), 9, None);
    engine.load(&backend).await.unwrap();
    engine.start().unwrap();
    engine.select(100, A).unwrap();
    engine.select(101, C).unwrap();
    engine.submit().unwrap();

    let frozen = engine.attempt().unwrap().selections().clone();
    assert_ok!(engine.select(101, B));
    assert_eq!(engine.attempt().unwrap().selections(), &frozen);
    assert_eq!(engine.result().unwrap().score, 1);
}

#[tokio::test]
async fn test_empty_pool_is_distinct_from_loading() {
    let backend = ScriptedBackend::new();
    backend.push_assembly(Ok(AssemblyOutcome::EmptyPool));

    let mut engine = AttemptEngine::new(&Config::default(), 9, None);
    assert!(matches!(engine.state(), AttemptState::Loading));

    engine.load(&backend).await.unwrap();
    assert!(matches!(engine.state(), AttemptState::EmptyPool));
    assert!(engine.quiz().is_none());
    assert!(engine.start().is_err());
}

#[tokio::test]
async fn test_retry_reassembles_and_starts() {
    use OptionLetter::*;
    let backend = ScriptedBackend::new();
    backend
        .push_assembly(delivered(&[A, B]))
        .push_assembly(delivered(&[C, A]));

    let mut engine = AttemptEngine::new(&Config::default(), 9, Some(2));
    engine.load(&backend).await.unwrap();
    engine.start().unwrap();
    engine.select(100, A).unwrap();
    engine.select(101, B).unwrap();
    assert_eq!(engine.submit().unwrap().percentage, 100);

    engine.retry(&backend).await.unwrap();
    assert_eq!(engine.state().name(), "in progress");
    assert_eq!(engine.progress(), Some((0, 2)));
    assert_eq!(engine.elapsed_seconds(), 0);

    // 新的一次下发里正确字母已经变了
    let first = &engine.attempt().unwrap().questions()[0];
    assert_eq!(first.correct_option(), C);
    assert_eq!(
        backend.calls(),
        vec![Operation::AssembleAttempt, Operation::AssembleAttempt]
    );
}

#[tokio::test]
async fn test_retry_only_after_submit() {
    let backend = ScriptedBackend::new();
    backend.push_assembly(delivered(&[OptionLetter::A]));

    let mut engine = AttemptEngine::new(&Config::default(), 9, None);
    engine.load(&backend).await.unwrap();
    engine.start().unwrap();

    assert_err!(engine.retry(&backend).await);
    assert_eq!(backend.calls().len(), 1);
}

#[tokio::test]
async fn test_delivery_without_ids_is_rejected() {
    let backend = ScriptedBackend::new();
    backend.push_assembly(Ok(AssemblyOutcome::Ready(Quiz {
        quiz_id: None,
        title: "Module Quiz".into(),
        description: String::new(),
        questions: vec![question(None, "No id", OptionLetter::A)],
    })));

    let mut engine = AttemptEngine::new(&Config::default(), 9, None);
    assert_err!(engine.load(&backend).await);
    assert_eq!(engine.state().name(), "failed");
    assert!(engine.error_message().unwrap().starts_with("Malformed response"));
}

// ========== 本地题库 ==========

#[tokio::test]
async fn test_retries_over_local_pool_are_independent() {
    let store = LocalStore::with_seed(2024);
    let questions = (0..20)
        .map(|i| question(None, &format!("Pool question {}", i), OptionLetter::A))
        .collect();
    store
        .commit_quiz(1, &QuizDraft::new("Big pool", "", questions))
        .await
        .unwrap();

    let mut engine = AttemptEngine::new(&Config::default(), 1, Some(5));
    engine.load(&store).await.unwrap();
    let first = engine.quiz().unwrap().questions.clone();
    engine.start().unwrap();
    for q in &first {
        engine.select(q.question_id.unwrap(), q.correct_option()).unwrap();
    }
    assert_eq!(engine.submit().unwrap().percentage, 100);

    let mut seen_different = false;
    for _ in 0..5 {
        engine.retry(&store).await.unwrap();
        let next = engine.attempt().unwrap().questions().to_vec();
        assert_eq!(next.len(), 5);
        seen_different |= next != first;

        for q in &next {
            engine.select(q.question_id.unwrap(), q.correct_option()).unwrap();
        }
        engine.submit().unwrap();
    }
    assert!(seen_different);
}

#[tokio::test]
async fn test_scripted_learner_session() {
    let backend = ScriptedBackend::new();
    backend.push_assembly(delivered(&[OptionLetter::B]));

    let script: &[u8] = b"\nsubmit\n1 d\n1 b\nsubmit\nn\n";
    let mut terminal = Terminal::new(script, Vec::new());
    let summary = run_learner_session(&backend, &Config::default(), 9, None, &mut terminal)
        .await
        .unwrap();

    assert_eq!(summary.results.len(), 1);
    assert_eq!(summary.results[0].percentage, 100);

    let output = String::from_utf8(terminal.into_output()).unwrap();
    assert!(output.contains("Please answer all questions before submitting."));
    assert!(output.contains("Option D is not available"));
    assert!(output.contains("Score: 1/1 (100%) Passed"));
    assert!(output.contains("Excellent! You scored 100%"));
}

#[tokio::test]
async fn test_practice_session_with_empty_drafts_dir() {
    let dir = scratch_dir("practice_empty");
    let store = LocalStore::with_seed(1);
    assert_eq!(stock_local_store(&store, 1, &dir).await.unwrap(), 0);

    let script: &[u8] = b"";
    let mut terminal = Terminal::new(script, Vec::new());
    let summary = run_learner_session(&store, &Config::default(), 1, None, &mut terminal)
        .await
        .unwrap();
    assert!(summary.empty_pool);

    let output = String::from_utf8(terminal.into_output()).unwrap();
    assert!(output.contains("No quiz questions available for this module."));

    fs::remove_dir_all(dir).ok();
}
