//! Unit of Work 模式
//!
//! 状态写入与历史追加必须在同一事务内提交：要么全部生效，要么全部不生效。

use async_trait::async_trait;
use marlin_errors::AppResult;

use crate::domain::document::DocumentWriteStore;
use crate::domain::history::HistoryRepository;

/// Unit of Work trait
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    /// 事务内的单据写端口
    fn documents(&self) -> &dyn DocumentWriteStore;

    /// 事务内的历史仓储
    fn history(&self) -> &dyn HistoryRepository;

    /// 提交事务
    async fn commit(self: Box<Self>) -> AppResult<()>;

    /// 回滚事务
    async fn rollback(self: Box<Self>) -> AppResult<()>;
}

/// Unit of Work 工厂 trait
#[async_trait]
pub trait UnitOfWorkFactory: Send + Sync {
    /// 开始新的事务
    async fn begin(&self) -> AppResult<Box<dyn UnitOfWork>>;
}
