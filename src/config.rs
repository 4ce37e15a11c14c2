use std::time::Duration;

use crate::error::ConfigError;

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    /// 课程门户 API 地址（不带结尾的 `/`）
    pub api_base_url: String,
    /// Bearer token，可选
    pub api_token: Option<String>,
    /// 单次请求超时（秒），解析大文件可能较慢
    pub request_timeout_secs: u64,
    /// 上传文件大小上限（MB）
    pub max_upload_size_mb: u64,
    /// 每次组卷默认题目数
    pub default_num_questions: usize,
    /// 每次组卷最多题目数
    pub max_num_questions: usize,
    /// 上传时默认的测验标题
    pub default_quiz_title: String,
    /// 上传时默认的测验描述
    pub default_quiz_description: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8081/api".to_string(),
            api_token: None,
            request_timeout_secs: 60,
            max_upload_size_mb: 50,
            default_num_questions: 10,
            max_num_questions: 50,
            default_quiz_title: "Module Quiz".to_string(),
            default_quiz_description: "Uploaded Quiz".to_string(),
            verbose_logging: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            api_base_url: std::env::var("QUIZ_API_BASE_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or(default.api_base_url),
            api_token: std::env::var("QUIZ_API_TOKEN").ok().filter(|v| !v.is_empty()).or(default.api_token),
            request_timeout_secs: std::env::var("QUIZ_REQUEST_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.request_timeout_secs),
            max_upload_size_mb: std::env::var("QUIZ_MAX_UPLOAD_MB").ok().and_then(|v| v.parse().ok()).unwrap_or(default.max_upload_size_mb),
            default_num_questions: std::env::var("QUIZ_DEFAULT_NUM_QUESTIONS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.default_num_questions),
            max_num_questions: std::env::var("QUIZ_MAX_NUM_QUESTIONS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.max_num_questions),
            default_quiz_title: std::env::var("QUIZ_DEFAULT_TITLE").unwrap_or(default.default_quiz_title),
            default_quiz_description: std::env::var("QUIZ_DEFAULT_DESCRIPTION").unwrap_or(default.default_quiz_description),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
        }
    }

    /// 检查各项上限是否可用
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_upload_size_mb == 0 {
            return Err(ConfigError::InvalidValue {
                name: "QUIZ_MAX_UPLOAD_MB",
                reason: "必须大于 0".into(),
            });
        }
        if self.max_num_questions == 0 {
            return Err(ConfigError::InvalidValue {
                name: "QUIZ_MAX_NUM_QUESTIONS",
                reason: "必须大于 0".into(),
            });
        }
        if self.default_num_questions == 0 || self.default_num_questions > self.max_num_questions {
            return Err(ConfigError::InvalidValue {
                name: "QUIZ_DEFAULT_NUM_QUESTIONS",
                reason: format!("必须在 1..={} 之间", self.max_num_questions),
            });
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                name: "QUIZ_REQUEST_TIMEOUT_SECS",
                reason: "必须大于 0".into(),
            });
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_size_mb * 1024 * 1024
    }
}
