//! 审批历史仓储接口
//!
//! 接口层面即只追加：没有更新或删除方法。

use async_trait::async_trait;
use marlin_errors::AppResult;

use super::ApprovalHistory;

/// 审批历史仓储
#[async_trait]
pub trait HistoryRepository: Send + Sync {
    /// 追加一条历史记录
    async fn append(&self, entry: &ApprovalHistory) -> AppResult<()>;

    /// 指定单据的全部历史，按 action_date 降序
    async fn list_for(
        &self,
        transaction_type: &str,
        transaction_id: i64,
    ) -> AppResult<Vec<ApprovalHistory>>;
}
