//! 单据存取端口

use async_trait::async_trait;
use marlin_errors::AppResult;

use super::{ApprovableDocument, DocumentStatus};

/// 单据只读端口（连接池上的普通读取）
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find(
        &self,
        transaction_type: &str,
        id: i64,
    ) -> AppResult<Option<ApprovableDocument>>;
}

/// 事务内的单据写端口
///
/// `lock` 持有行锁直到事务结束，序列化同一单据上的并发转换；
/// 引擎在锁下复核预读状态，发现漂移即以 Conflict 中止。
#[async_trait]
pub trait DocumentWriteStore: Send + Sync {
    /// 加锁读取当前状态（SELECT ... FOR UPDATE 或等价物）
    async fn lock(&self, transaction_type: &str, id: i64) -> AppResult<ApprovableDocument>;

    /// 写入新状态；`approved_by` 仅在进入 approved 时设置
    async fn set_status(
        &self,
        transaction_type: &str,
        id: i64,
        status: DocumentStatus,
        approved_by: Option<&str>,
    ) -> AppResult<()>;
}
