//! 日志工具模块
//!
//! 提供日志初始化和输出的辅助函数

use tracing::info;
use tracing_subscriber::EnvFilter;

/// 初始化日志
///
/// `RUST_LOG` 优先；否则默认 `learn_quiz=info`，详细模式下为 `learn_quiz=debug`。
/// 重复调用不会报错。
///
/// # 参数
/// - `verbose`: 是否显示详细日志
pub fn init(verbose: bool) {
    let default_directive = if verbose { "learn_quiz=debug" } else { "learn_quiz=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// 记录程序启动信息
///
/// # 参数
/// - `command`: 子命令名称
/// - `module_id`: 模块 ID
/// - `api_base_url`: 门户地址（本地题库时为 `None`）
pub fn log_startup(command: &str, module_id: i64, api_base_url: Option<&str>) {
    info!("{}", "=".repeat(60));
    info!("🚀 learn-quiz {} - 模块 {}", command, module_id);
    match api_base_url {
        Some(url) => info!("🌐 课程门户: {}", url),
        None => info!("💾 使用本地题库"),
    }
    info!(
        "启动时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度（按字符计）
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
