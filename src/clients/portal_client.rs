/// 课程门户 API 客户端
///
/// 封装所有与 `/modules/{moduleId}/quizzes` 相关的 HTTP 调用
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::clients::backend::{AssemblyOutcome, CommitReceipt, QuizBackend};
use crate::config::Config;
use crate::error::{AppError, AppResult, ConfigError, Operation};
use crate::models::question::{ModuleId, Question, QuestionRecord, Quiz, QuizDraft, QuizId};
use crate::services::upload_guard::UploadFile;

/// 课程门户客户端
pub struct PortalClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

#[derive(Deserialize)]
struct PreviewResponse {
    #[serde(default)]
    questions: Vec<Question>,
}

#[derive(Deserialize)]
struct UploadResponse {
    quiz: Quiz,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Serialize)]
struct CommitPayload<'a> {
    title: &'a str,
    description: &'a str,
    questions: Vec<QuestionRecord>,
}

impl PortalClient {
    /// 创建新的门户客户端
    pub fn new(config: &Config) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ConfigError::InvalidValue {
                name: "QUIZ_REQUEST_TIMEOUT_SECS",
                reason: e.to_string(),
            })?;

        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            token: config.api_token.clone(),
        })
    }

    fn url(&self, module_id: ModuleId, suffix: &str) -> String {
        format!("{}/modules/{}/quizzes{}", self.base_url, module_id, suffix)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// 发送请求，返回状态码和 JSON 响应体（非 JSON 时为 `Null`）
    async fn send(&self, operation: Operation, request: RequestBuilder) -> AppResult<(StatusCode, Value)> {
        debug!("调用 {}", operation);

        let response = self.authorized(request).send().await.map_err(|e| {
            warn!("{} 请求失败: {}", operation, e);
            AppError::collaborator(operation, operation.fallback_message())
        })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            warn!("{} 读取响应失败: {}", operation, e);
            AppError::collaborator(operation, operation.fallback_message())
        })?;
        let body = serde_json::from_str(&text).unwrap_or(Value::Null);

        debug!("{} 返回 {}，响应长度 {} 字节", operation, status, text.len());

        if !status.is_success() {
            warn!("{} 返回错误状态 {}: {}", operation, status, text);
            return Err(AppError::collaborator_status(operation, status.as_u16(), error_reason(&body)));
        }

        Ok((status, body))
    }

    fn file_part(operation: Operation, file: &UploadFile) -> AppResult<Part> {
        Part::bytes(file.bytes().to_vec())
            .file_name(file.file_name().to_string())
            .mime_str(file.mime_type())
            .map_err(|e| AppError::collaborator(operation, e.to_string()))
    }
}

impl QuizBackend for PortalClient {
    async fn parse_document(&self, module_id: ModuleId, file: &UploadFile) -> AppResult<Vec<Question>> {
        let operation = Operation::ParseDocument;
        let form = Form::new().part("file", Self::file_part(operation, file)?);
        let request = self.http.post(self.url(module_id, "/upload/preview")).multipart(form);

        let (_, body) = self.send(operation, request).await?;
        if let Some(reason) = reported_error(&body) {
            return Err(AppError::collaborator(operation, reason));
        }

        let preview: PreviewResponse = decode(operation, body)?;
        info!("解析完成，共 {} 道题", preview.questions.len());
        Ok(preview.questions)
    }

    async fn parse_and_commit(
        &self,
        module_id: ModuleId,
        file: &UploadFile,
        title: &str,
        description: &str,
    ) -> AppResult<CommitReceipt> {
        let operation = Operation::ParseAndCommit;
        let form = Form::new()
            .part("file", Self::file_part(operation, file)?)
            .text("title", title.to_string())
            .text("description", description.to_string());
        let request = self.http.post(self.url(module_id, "/upload")).multipart(form);

        let (_, body) = self.send(operation, request).await?;
        if let Some(reason) = reported_error(&body) {
            return Err(AppError::collaborator(operation, reason));
        }

        let upload: UploadResponse = decode(operation, body)?;
        Ok(CommitReceipt {
            quiz: upload.quiz,
            message: upload.message,
        })
    }

    async fn commit_quiz(&self, module_id: ModuleId, draft: &QuizDraft) -> AppResult<Quiz> {
        draft.validate()?;

        let payload = CommitPayload {
            title: &draft.title,
            description: &draft.description,
            questions: draft
                .questions
                .iter()
                .cloned()
                .map(|q| QuestionRecord::from(q).without_id())
                .collect(),
        };
        let request = self.http.post(self.url(module_id, "")).json(&payload);

        let (_, body) = self.send(Operation::CommitQuiz, request).await?;
        decode(Operation::CommitQuiz, body)
    }

    async fn list_quizzes(&self, module_id: ModuleId) -> AppResult<Vec<Quiz>> {
        let request = self.http.get(self.url(module_id, ""));
        let (_, body) = self.send(Operation::ListQuizzes, request).await?;
        if body.is_null() {
            return Ok(Vec::new());
        }
        decode(Operation::ListQuizzes, body)
    }

    async fn delete_quiz(&self, module_id: ModuleId, quiz_id: QuizId) -> AppResult<()> {
        let request = self.http.delete(self.url(module_id, &format!("/{}", quiz_id)));
        self.send(Operation::DeleteQuiz, request).await?;
        Ok(())
    }

    async fn assemble_random_attempt(&self, module_id: ModuleId, num_questions: usize) -> AppResult<AssemblyOutcome> {
        let operation = Operation::AssembleAttempt;
        let request = self
            .http
            .get(self.url(module_id, "/random"))
            .query(&[("numQuestions", num_questions)]);

        let (_, body) = self.send(operation, request).await?;

        // 200 + error 字段表示题库为空
        if let Some(reason) = reported_error(&body) {
            info!("模块 {} 没有可用题目: {}", module_id, reason);
            return Ok(AssemblyOutcome::EmptyPool);
        }

        let quiz: Quiz = decode(operation, body)?;
        if quiz.questions.is_empty() {
            return Ok(AssemblyOutcome::EmptyPool);
        }
        Ok(AssemblyOutcome::Ready(quiz))
    }
}

/// 错误状态响应里的原因：先看 `error`，再看 `message`
fn error_reason(body: &Value) -> Option<String> {
    ["error", "message"].iter().find_map(|field| text_field(body, field))
}

/// 成功响应里的错误原因：只看 `error`，`message` 是成功提示
fn reported_error(body: &Value) -> Option<String> {
    text_field(body, "error")
}

fn text_field(body: &Value, field: &str) -> Option<String> {
    body.get(field)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn decode<T: DeserializeOwned>(operation: Operation, body: Value) -> AppResult<T> {
    serde_json::from_value(body).map_err(|e| {
        warn!("{} 响应格式错误: {}", operation, e);
        AppError::collaborator(operation, format!("Malformed response from the quiz service: {}", e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_reason_prefers_error_field() {
        assert_eq!(
            error_reason(&json!({"error": "Unreadable file", "message": "x"})).as_deref(),
            Some("Unreadable file")
        );
        assert_eq!(error_reason(&json!({"message": "Please login"})).as_deref(), Some("Please login"));
        assert_eq!(error_reason(&json!({"error": "  "})), None);
        assert_eq!(error_reason(&Value::Null), None);
    }

    #[test]
    fn test_success_message_is_not_an_error() {
        let body = json!({"quiz": {}, "questionsCount": 1, "message": "Successfully uploaded 1 questions."});
        assert_eq!(reported_error(&body), None);
        assert_eq!(
            reported_error(&json!({"error": "No quiz questions available"})).as_deref(),
            Some("No quiz questions available")
        );
    }

    #[test]
    fn test_url_building() {
        let config = Config {
            api_base_url: "http://portal.test/api/".into(),
            ..Config::default()
        };
        let client = PortalClient::new(&config).unwrap();
        assert_eq!(client.url(4, "/random"), "http://portal.test/api/modules/4/quizzes/random");
        assert_eq!(client.url(4, ""), "http://portal.test/api/modules/4/quizzes");
    }

    #[test]
    fn test_decode_reports_malformed_payload() {
        let err = decode::<Quiz>(Operation::AssembleAttempt, json!({"questions": [{"questionText": "x"}]}))
            .unwrap_err();
        assert!(err.display_message().starts_with("Malformed response"));
    }
}
