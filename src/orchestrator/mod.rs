//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责把终端输入输出接到流程层的状态机上，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `learner_session` - 学员作答会话
//! - 组卷、作答、提交、回顾
//! - 重试时重新组卷
//!
//! ### `instructor_session` - 讲师会话
//! - 解析预览、自测、保存
//! - 解析并直接保存
//! - 手工组卷、列出和删除测验
//!
//! ### `terminal` - 终端输入输出
//!
//! ## 层次关系
//!
//! ```text
//! learner_session / instructor_session
//!     ↓
//! workflow (AttemptEngine / AuthoringPipeline)
//!     ↓
//! services (能力层：upload_guard / assembly / scoring / quiz_library)
//!     ↓
//! clients (QuizBackend) + infrastructure (AttemptTimer)
//! ```
//!
//! ## 设计原则
//!
//! 1. **向下依赖**：编排层 → workflow → services → clients / infrastructure
//! 2. **无业务逻辑**：只做输入输出和调度，状态转换全部交给流程层

pub mod instructor_session;
pub mod learner_session;
pub mod terminal;

// 重新导出主要类型
pub use learner_session::{run_learner_session, LearnerSummary};
pub use terminal::{stdio, Terminal};
