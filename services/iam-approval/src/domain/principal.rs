//! 请求主体
//!
//! 每个请求携带且仅携带一个已解析的主体；凭据签发与校验在网关完成，
//! 本服务只消费 `{ id, role }`。

use marlin_common::UserId;

/// 请求主体
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub role_code: String,
}

impl Principal {
    pub fn new(user_id: UserId, role_code: impl Into<String>) -> Self {
        Self {
            user_id,
            role_code: role_code.into(),
        }
    }

    /// 是否属于给定角色集合
    pub fn has_any_role(&self, roles: &[&str]) -> bool {
        roles.iter().any(|r| *r == self.role_code)
    }
}
