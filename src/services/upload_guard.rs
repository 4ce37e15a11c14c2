//! 上传文件校验 - 业务能力层
//!
//! 只负责"这个文件能不能发给解析服务"，不合格的文件在本地直接拒绝，不会产生网络请求。

use phf::phf_map;
use std::path::Path;
use tracing::debug;

use crate::config::Config;
use crate::error::{AppResult, FileError, ValidationError};

pub const SUPPORTED_EXTENSIONS: [&str; 2] = ["pdf", "docx"];

static MIME_TYPES: phf::Map<&'static str, &'static str> = phf_map! {
    "pdf" => "application/pdf",
    "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
};

/// 待上传的文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    file_name: String,
    bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn extension(&self) -> String {
        file_extension(&self.file_name)
    }

    /// multipart 里使用的 MIME 类型
    pub fn mime_type(&self) -> &'static str {
        MIME_TYPES
            .get(self.extension().as_str())
            .copied()
            .unwrap_or("application/octet-stream")
    }
}

/// 上传校验器
#[derive(Debug, Clone, Copy)]
pub struct UploadGuard {
    limit_mb: u64,
}

impl UploadGuard {
    pub fn new(config: &Config) -> Self {
        Self::with_limit_mb(config.max_upload_size_mb)
    }

    pub fn with_limit_mb(limit_mb: u64) -> Self {
        Self { limit_mb }
    }

    pub fn limit_mb(&self) -> u64 {
        self.limit_mb
    }

    /// 校验文件类型和大小
    pub fn check(&self, file: &UploadFile) -> Result<(), ValidationError> {
        validate_upload(file.file_name(), file.size(), self.limit_mb)
    }

    /// 从磁盘读取文件；超限的文件不会被读入内存
    pub async fn read(&self, path: &Path) -> AppResult<UploadFile> {
        let path_label = path.display().to_string();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path_label.clone());

        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|source| FileError::ReadFailed {
                path: path_label.clone(),
                source,
            })?;
        validate_upload(&file_name, metadata.len(), self.limit_mb)?;

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| FileError::ReadFailed {
                path: path_label,
                source,
            })?;
        debug!("已读取 {} ({})", file_name, format_file_size(bytes.len() as u64));

        let file = UploadFile::new(file_name, bytes);
        // 读取期间文件可能被改写
        self.check(&file)?;
        Ok(file)
    }
}

/// 最后一个 `.` 之后的部分，转小写；没有 `.` 时返回整个文件名
pub fn file_extension(file_name: &str) -> String {
    file_name
        .rsplit('.')
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

/// 校验文件名和大小
pub fn validate_upload(file_name: &str, size_bytes: u64, limit_mb: u64) -> Result<(), ValidationError> {
    let extension = file_extension(file_name);
    if !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(ValidationError::UnsupportedFileType { extension });
    }

    if size_bytes > limit_mb * 1024 * 1024 {
        return Err(ValidationError::FileTooLarge {
            size_bytes,
            size_label: format_file_size(size_bytes),
            limit_mb,
        });
    }

    if size_bytes == 0 {
        return Err(ValidationError::EmptyFile);
    }

    Ok(())
}

/// 人类可读的文件大小：`512 B` / `1.5 KB` / `60.0 MB`
pub fn format_file_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
