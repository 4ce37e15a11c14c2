//! 在途请求凭据
//!
//! 每个状态机实例同一时间最多一个请求在途。发起请求时拿到一张带 epoch 的凭据，
//! 响应回来时只有 epoch 仍是当前值才会被应用；实例被重置或离开后旧响应一律丢弃。

use std::fmt::Display;

/// 请求种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestAction {
    Preview,
    UploadAndSave,
    Commit,
    Assemble,
}

impl Display for RequestAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RequestAction::Preview => "preview",
            RequestAction::UploadAndSave => "upload and save",
            RequestAction::Commit => "commit",
            RequestAction::Assemble => "assemble",
        };
        f.write_str(name)
    }
}

/// 在途请求凭据，只能使用一次
#[derive(Debug, PartialEq, Eq)]
pub struct PendingRequest {
    epoch: u64,
    action: RequestAction,
}

impl PendingRequest {
    pub fn action(&self) -> RequestAction {
        self.action
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

impl Display for PendingRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{} #{}]", self.action, self.epoch)
    }
}

/// 响应是否被应用
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Applied,
    /// 实例已被重置或离开，响应被丢弃
    Stale,
}

/// epoch 计数器
#[derive(Debug, Default)]
pub struct Epoch(u64);

impl Epoch {
    /// 作废所有已发出的凭据
    pub fn advance(&mut self) {
        self.0 += 1;
    }

    /// 作废旧凭据并发出新凭据
    pub fn issue(&mut self, action: RequestAction) -> PendingRequest {
        self.advance();
        PendingRequest {
            epoch: self.0,
            action,
        }
    }

    pub fn is_current(&self, ticket: &PendingRequest) -> bool {
        ticket.epoch == self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_ticket_invalidates_old() {
        let mut epoch = Epoch::default();
        let first = epoch.issue(RequestAction::Preview);
        assert!(epoch.is_current(&first));

        let second = epoch.issue(RequestAction::Commit);
        assert!(!epoch.is_current(&first));
        assert!(epoch.is_current(&second));

        epoch.advance();
        assert!(!epoch.is_current(&second));
        assert_eq!(second.to_string(), "[commit #2]");
    }
}
