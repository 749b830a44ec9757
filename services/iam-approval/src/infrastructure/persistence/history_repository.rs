//! PostgreSQL 审批历史仓储实现
//!
//! 数据访问层只实现插入与查询；历史行没有任何更新或删除路径。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use marlin_common::UserId;
use marlin_errors::{AppError, AppResult};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::history::{ApprovalHistory, HistoryAction, HistoryRepository};

use super::error_mapper::map_sqlx_error;

pub(crate) const INSERT_HISTORY_SQL: &str = r#"
INSERT INTO approval_history (id, transaction_type, transaction_id, reference_no, action,
                              level, rule_id, action_by, action_by_name, action_date, comments)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
"#;

pub(crate) const SELECT_HISTORY_SQL: &str = r#"
SELECT id, transaction_type, transaction_id, reference_no, action,
       level, rule_id, action_by, action_by_name, action_date, comments
FROM approval_history
WHERE transaction_type = $1 AND transaction_id = $2
ORDER BY action_date DESC, id DESC
"#;

pub struct PostgresHistoryRepository {
    pool: PgPool,
}

impl PostgresHistoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HistoryRepository for PostgresHistoryRepository {
    async fn append(&self, entry: &ApprovalHistory) -> AppResult<()> {
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
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn list_for(
        &self,
        transaction_type: &str,
        transaction_id: i64,
    ) -> AppResult<Vec<ApprovalHistory>> {
        let rows = sqlx::query_as::<_, HistoryRow>(SELECT_HISTORY_SQL)
            .bind(transaction_type)
            .bind(transaction_id)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        rows.into_iter().map(HistoryRow::into_entry).collect()
    }
}

// ============ 数据行映射 ============

#[derive(sqlx::FromRow)]
pub(crate) struct HistoryRow {
    pub(crate) id: Uuid,
    pub(crate) transaction_type: String,
    pub(crate) transaction_id: i64,
    pub(crate) reference_no: String,
    pub(crate) action: String,
    pub(crate) level: Option<i32>,
    pub(crate) rule_id: Option<Uuid>,
    pub(crate) action_by: Uuid,
    pub(crate) action_by_name: String,
    pub(crate) action_date: DateTime<Utc>,
    pub(crate) comments: Option<String>,
}

impl HistoryRow {
    pub(crate) fn into_entry(self) -> AppResult<ApprovalHistory> {
        let action = HistoryAction::parse(&self.action).ok_or_else(|| {
            AppError::internal(format!("Unknown history action '{}'", self.action))
        })?;

        Ok(ApprovalHistory {
            id: self.id,
            transaction_type: self.transaction_type,
            transaction_id: self.transaction_id,
            reference_no: self.reference_no,
            action,
            level: self.level,
            rule_id: self.rule_id,
            action_by: UserId::from_uuid(self.action_by),
            action_by_name: self.action_by_name,
            action_date: self.action_date,
            comments: self.comments,
        })
    }
}
