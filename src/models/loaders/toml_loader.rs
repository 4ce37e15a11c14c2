//! 从 TOML 文件加载手工编写的测验
//!
//! ```toml
//! title = "Week 1"
//! description = "Ownership basics"
//!
//! [[questions]]
//! questionText = "Which keyword moves a closure's captures?"
//! optionA = "ref"
//! optionB = "move"
//! correctOption = "B"
//! ```

use crate::error::{AppResult, FileError};
use crate::models::question::QuizDraft;
use std::path::{Path, PathBuf};
use tokio::fs;

/// 从 TOML 文件加载数据并转换为 QuizDraft 对象
pub async fn load_draft(toml_file_path: &Path) -> AppResult<QuizDraft> {
    let path_label = toml_file_path.display().to_string();

    let content = fs::read_to_string(toml_file_path)
        .await
        .map_err(|source| FileError::ReadFailed {
            path: path_label.clone(),
            source,
        })?;

    let draft: QuizDraft = toml::from_str(&content).map_err(|source| FileError::TomlParseFailed {
        path: path_label.clone(),
        source,
    })?;

    draft.validate()?;

    tracing::debug!("已加载 {}: {} 道题", path_label, draft.questions.len());

    Ok(draft)
}

/// 从文件夹中加载所有 TOML 测验，跳过无法解析的文件
pub async fn load_all_drafts(folder_path: &Path) -> AppResult<Vec<QuizDraft>> {
    let folder = PathBuf::from(folder_path);

    let mut entries = fs::read_dir(&folder)
        .await
        .map_err(|source| FileError::ReadFailed {
            path: folder.display().to_string(),
            source,
        })?;

    let mut toml_files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            toml_files.push(path);
        }
    }
    toml_files.sort();

    let mut drafts = Vec::new();
    for path in toml_files {
        tracing::info!(
            "正在加载: {}",
            path.file_name().unwrap_or_default().to_string_lossy()
        );

        match load_draft(&path).await {
            Ok(draft) => {
                tracing::info!("成功加载 {} 道题目", draft.questions.len());
                drafts.push(draft);
            }
            Err(e) => {
                tracing::warn!("加载文件失败 {}: {}", path.display(), e);
            }
        }
    }

    Ok(drafts)
}
