//! 用户目录端口
//!
//! 用户表由身份服务持有；此处只读显示名，用于审计行的 `action_by_name`。

use async_trait::async_trait;
use marlin_common::UserId;
use marlin_errors::AppResult;

/// 用户目录
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// 用户显示名；查不到时调用方以用户 ID 字符串兜底
    async fn display_name(&self, user_id: &UserId) -> AppResult<Option<String>>;
}
