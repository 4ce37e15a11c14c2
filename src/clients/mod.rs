//! 外部协作方客户端
//!
//! [`QuizBackend`] 描述核心依赖的六个边界操作；[`PortalClient`] 通过 HTTP 调用课程门户，
//! [`LocalStore`] 在内存中维护题库并在本地组卷。

pub mod backend;
pub mod local_store;
pub mod portal_client;

pub use backend::{AssemblyOutcome, CommitReceipt, QuizBackend};
pub use local_store::LocalStore;
pub use portal_client::PortalClient;
