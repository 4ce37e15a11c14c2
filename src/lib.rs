//! # Learn Quiz
//!
//! 课程模块测验子系统：讲师上传文档出题，学员从题库随机组卷作答
//!
//! ## 架构设计
//!
//! 本系统采用分层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（计时任务），只暴露能力
//! - `AttemptTimer` - 每秒加一的作答计时器，停止或丢弃时取消
//!
//! ### ② 协作方客户端（Clients）
//! - `clients/` - 课程门户的六个边界操作
//! - `QuizBackend` - 解析、保存、列出、删除、组卷
//! - `PortalClient` - 通过 HTTP 调用课程门户
//! - `LocalStore` - 内存题库，本地组卷
//!
//! ### ③ 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，不持有流程状态
//! - `UploadGuard` - 文件类型和大小校验
//! - `QuizAssembler` - 组卷题目数和下发结果校验
//! - `score` - 计分与回顾
//! - `QuizLibrary` - 模块测验列表
//!
//! ### ④ 流程层（Workflow）
//! - `workflow/` - 两个状态机
//! - `AuthoringPipeline` - 上传 → 预览 → 自测 → 保存
//! - `AttemptEngine` - 组卷 → 作答 → 提交 → 重试
//!
//! ### ⑤ 编排层（Orchestration）
//! - `orchestrator/learner_session` - 学员终端会话
//! - `orchestrator/instructor_session` - 讲师终端会话
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use clients::{AssemblyOutcome, LocalStore, PortalClient, QuizBackend};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::AttemptTimer;
pub use models::question::{OptionLetter, Question, Quiz, QuizDraft};
pub use services::{score, AttemptResult, QuizLibrary, UploadFile, UploadGuard};
pub use workflow::{AttemptEngine, AuthoringPipeline};
