//! 审批矩阵仓储接口

use async_trait::async_trait;
use marlin_common::Pagination;
use marlin_errors::AppResult;

use super::{ApprovalMatrixRule, RuleId};

/// 审批矩阵仓储
///
/// `update` 对级别列表做整体替换（先删后插），与权限替换语义一致。
#[async_trait]
pub trait MatrixRepository: Send + Sync {
    async fn create(&self, rule: &ApprovalMatrixRule) -> AppResult<()>;

    async fn update(&self, rule: &ApprovalMatrixRule) -> AppResult<()>;

    async fn delete(&self, id: &RuleId) -> AppResult<()>;

    async fn find_by_id(&self, id: &RuleId) -> AppResult<Option<ApprovalMatrixRule>>;

    async fn list(&self, pagination: &Pagination) -> AppResult<(Vec<ApprovalMatrixRule>, i64)>;

    /// 指定交易类型的全部激活规则（路由求值的输入）
    async fn list_active_for_type(
        &self,
        transaction_type: &str,
    ) -> AppResult<Vec<ApprovalMatrixRule>>;
}
