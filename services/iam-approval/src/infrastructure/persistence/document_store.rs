//! PostgreSQL 单据读取实现
//!
//! 单据分散在各业务表中；注册表把 transaction_type 映射到表名。
//! 表名在注册表构建时已校验为合法标识符，方可拼入 SQL。

use async_trait::async_trait;
use marlin_common::UserId;
use marlin_errors::{AppError, AppResult};
use rust_decimal::Decimal;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::document::{
    ApprovableDocument, DocumentStatus, DocumentStore, DocumentTypeRegistry,
};

use super::error_mapper::map_sqlx_error;

pub struct PostgresDocumentStore {
    pool: PgPool,
    registry: Arc<DocumentTypeRegistry>,
}

impl PostgresDocumentStore {
    pub fn new(pool: PgPool, registry: Arc<DocumentTypeRegistry>) -> Self {
        Self { pool, registry }
    }
}

#[async_trait]
impl DocumentStore for PostgresDocumentStore {
    async fn find(
        &self,
        transaction_type: &str,
        id: i64,
    ) -> AppResult<Option<ApprovableDocument>> {
        let doc_type = self.registry.get(transaction_type)?;
        let row = sqlx::query_as::<_, DocumentRow>(&format!(
            r#"
            SELECT id, reference_no, department, amount, status, created_by, approved_by
            FROM {} WHERE id = $1
            "#,
            doc_type.table
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(|r| r.into_document(transaction_type)).transpose()
    }
}

// ============ 数据行映射 ============

#[derive(sqlx::FromRow)]
pub(crate) struct DocumentRow {
    pub(crate) id: i64,
    pub(crate) reference_no: String,
    pub(crate) department: Option<String>,
    pub(crate) amount: Decimal,
    pub(crate) status: String,
    pub(crate) created_by: Option<Uuid>,
    pub(crate) approved_by: Option<String>,
}

impl DocumentRow {
    pub(crate) fn into_document(self, transaction_type: &str) -> AppResult<ApprovableDocument> {
        let status = DocumentStatus::parse(&self.status).ok_or_else(|| {
            AppError::internal(format!(
                "Document {}/{} carries unknown status '{}'",
                transaction_type, self.id, self.status
            ))
        })?;

        Ok(ApprovableDocument {
            id: self.id,
            transaction_type: transaction_type.to_string(),
            reference_no: self.reference_no,
            department: self.department,
            amount: self.amount,
            status,
            created_by: self.created_by.map(UserId::from_uuid),
            approved_by: self.approved_by,
        })
    }
}
