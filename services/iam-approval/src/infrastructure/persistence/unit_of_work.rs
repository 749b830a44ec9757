//! PostgreSQL Unit of Work 实现
//!
//! 事务内仓储共享同一个 Transaction。状态写入与历史追加要么一起提交，
//! 要么一起回滚；请求在提交前被取消时不会留下半套写入。

use async_trait::async_trait;
use marlin_errors::{AppError, AppResult};
use sqlx::{PgPool, Postgres, Transaction};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::domain::document::{
    ApprovableDocument, DocumentStatus, DocumentTypeRegistry, DocumentWriteStore,
};
use crate::domain::history::{ApprovalHistory, HistoryRepository};
use crate::domain::unit_of_work::{UnitOfWork, UnitOfWorkFactory};

use super::document_store::DocumentRow;
use super::error_mapper::map_sqlx_error;
use super::history_repository::{HistoryRow, INSERT_HISTORY_SQL, SELECT_HISTORY_SQL};

/// 事务句柄，事务内仓储共享
pub type SharedTx = Arc<Mutex<Option<Transaction<'static, Postgres>>>>;

/// Postgres Unit of Work 工厂
pub struct PostgresUnitOfWorkFactory {
    pool: PgPool,
    registry: Arc<DocumentTypeRegistry>,
}

impl PostgresUnitOfWorkFactory {
    pub fn new(pool: PgPool, registry: Arc<DocumentTypeRegistry>) -> Self {
        Self { pool, registry }
    }
}

#[async_trait]
impl UnitOfWorkFactory for PostgresUnitOfWorkFactory {
    async fn begin(&self) -> AppResult<Box<dyn UnitOfWork>> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::database(format!("Failed to begin transaction: {}", e)))?;

        Ok(Box::new(PostgresUnitOfWork::new(tx, self.registry.clone())))
    }
}

/// Postgres Unit of Work 实现
pub struct PostgresUnitOfWork {
    tx: SharedTx,
    documents: TxDocumentStore,
    history: TxHistoryRepository,
}

impl PostgresUnitOfWork {
    pub fn new(tx: Transaction<'static, Postgres>, registry: Arc<DocumentTypeRegistry>) -> Self {
        let tx: SharedTx = Arc::new(Mutex::new(Some(tx)));

        Self {
            tx: tx.clone(),
            documents: TxDocumentStore {
                tx: tx.clone(),
                registry,
            },
            history: TxHistoryRepository { tx },
        }
    }
}

#[async_trait]
impl UnitOfWork for PostgresUnitOfWork {
    fn documents(&self) -> &dyn DocumentWriteStore {
        &self.documents
    }

    fn history(&self) -> &dyn HistoryRepository {
        &self.history
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let mut guard = self.tx.lock().await;
        let tx = guard
            .take()
            .ok_or_else(|| AppError::internal("Transaction consumed"))?;
        tx.commit().await.map_err(map_sqlx_error)
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        let mut guard = self.tx.lock().await;
        let tx = guard
            .take()
            .ok_or_else(|| AppError::internal("Transaction consumed"))?;
        tx.rollback().await.map_err(map_sqlx_error)
    }
}

// ============ 事务内仓储 ============

/// 事务内单据写端口
pub struct TxDocumentStore {
    tx: SharedTx,
    registry: Arc<DocumentTypeRegistry>,
}

#[async_trait]
impl DocumentWriteStore for TxDocumentStore {
    async fn lock(&self, transaction_type: &str, id: i64) -> AppResult<ApprovableDocument> {
        let doc_type = self.registry.get(transaction_type)?;

        let mut guard = self.tx.lock().await;
        let tx = guard
            .as_mut()
            .ok_or_else(|| AppError::internal("Transaction consumed"))?;

        let row = sqlx::query_as::<_, DocumentRow>(&format!(
            r#"
            SELECT id, reference_no, department, amount, status, created_by, approved_by
            FROM {} WHERE id = $1
            FOR UPDATE
            "#,
            doc_type.table
        ))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        row.ok_or_else(|| {
            AppError::not_found(format!("Document {}/{} not found", transaction_type, id))
        })?
        .into_document(transaction_type)
    }

    async fn set_status(
        &self,
        transaction_type: &str,
        id: i64,
        status: DocumentStatus,
        approved_by: Option<&str>,
    ) -> AppResult<()> {
        let doc_type = self.registry.get(transaction_type)?;

        let mut guard = self.tx.lock().await;
        let tx = guard
            .as_mut()
            .ok_or_else(|| AppError::internal("Transaction consumed"))?;

        let result = sqlx::query(&format!(
            "UPDATE {} SET status = $2, approved_by = $3 WHERE id = $1",
            doc_type.table
        ))
        .bind(id)
        .bind(status.as_str())
        .bind(approved_by)
        .execute(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!(
                "Document {}/{} not found",
                transaction_type, id
            )));
        }
        Ok(())
    }
}

/// 事务内历史仓储（同样只有插入与查询）
pub struct TxHistoryRepository {
    tx: SharedTx,
}

#[async_trait]
impl HistoryRepository for TxHistoryRepository {
    async fn append(&self, entry: &ApprovalHistory) -> AppResult<()> {
        let mut guard = self.tx.lock().await;
        let tx = guard
            .as_mut()
            .ok_or_else(|| AppError::internal("Transaction consumed"))?;

        sqlx::query(INSERT_HISTORY_SQL)
            .bind(entry.id)
            .bind(&entry.transaction_type)
            .bind(entry.transaction_id)
            .bind(&entry.reference_no)
            .bind(entry.action.as_str())
            .bind(entry.level)
            .bind(entry.rule_id)
            .bind(entry.action_by.0)
            .bind(&entry.action_by_name)
            .bind(entry.action_date)
            .bind(&entry.comments)
            .execute(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn list_for(
        &self,
        transaction_type: &str,
        transaction_id: i64,
    ) -> AppResult<Vec<ApprovalHistory>> {
        let mut guard = self.tx.lock().await;
        let tx = guard
            .as_mut()
            .ok_or_else(|| AppError::internal("Transaction consumed"))?;

        let rows = sqlx::query_as::<_, HistoryRow>(SELECT_HISTORY_SQL)
            .bind(transaction_type)
            .bind(transaction_id)
            .fetch_all(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;

        rows.into_iter().map(HistoryRow::into_entry).collect()
    }
}
