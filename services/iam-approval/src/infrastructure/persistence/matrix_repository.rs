//! PostgreSQL 审批矩阵仓储实现
//!
//! 规则与级别分两张表；更新时级别整体替换（同一事务先删后插）。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use marlin_common::{AuditInfo, Pagination, UserId};
use marlin_errors::AppResult;
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::matrix::{ApprovalLevel, ApprovalMatrixRule, MatrixRepository, RuleId};

use super::error_mapper::map_sqlx_error;

pub struct PostgresMatrixRepository {
    pool: PgPool,
}

impl PostgresMatrixRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_levels(
        tx: &mut Transaction<'static, Postgres>,
        rule_id: &RuleId,
        levels: &[ApprovalLevel],
    ) -> AppResult<()> {
        for level in levels {
            sqlx::query(
                r#"
                INSERT INTO approval_levels (rule_id, level, role_code, user_id, required, can_delegate)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(rule_id.0)
            .bind(level.level)
            .bind(&level.role_code)
            .bind(level.user_id.as_ref().map(|u| u.0))
            .bind(level.required)
            .bind(level.can_delegate)
            .execute(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;
        }
        Ok(())
    }

    async fn load_levels(&self, rule_ids: &[Uuid]) -> AppResult<Vec<LevelRow>> {
        sqlx::query_as::<_, LevelRow>(
            r#"
            SELECT rule_id, level, role_code, user_id, required, can_delegate
            FROM approval_levels
            WHERE rule_id = ANY($1)
            ORDER BY rule_id, level
            "#,
        )
        .bind(rule_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }

    fn assemble(rows: Vec<RuleRow>, level_rows: Vec<LevelRow>) -> Vec<ApprovalMatrixRule> {
        let mut levels_by_rule: std::collections::HashMap<Uuid, Vec<ApprovalLevel>> =
            std::collections::HashMap::new();
        for row in level_rows {
            levels_by_rule
                .entry(row.rule_id)
                .or_default()
                .push(row.into_level());
        }

        rows.into_iter()
            .map(|row| {
                let levels = levels_by_rule.remove(&row.id).unwrap_or_default();
                row.into_rule(levels)
            })
            .collect()
    }
}

#[async_trait]
impl MatrixRepository for PostgresMatrixRepository {
    async fn create(&self, rule: &ApprovalMatrixRule) -> AppResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        sqlx::query(
            r#"
            INSERT INTO approval_matrix (id, transaction_type, department, min_amount, max_amount,
                                         is_active, created_at, created_by, updated_at, updated_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(rule.id.0)
        .bind(&rule.transaction_type)
        .bind(&rule.department)
        .bind(rule.min_amount)
        .bind(rule.max_amount)
        .bind(rule.is_active)
        .bind(rule.audit_info.created_at)
        .bind(rule.audit_info.created_by.as_ref().map(|u| u.0))
        .bind(rule.audit_info.updated_at)
        .bind(rule.audit_info.updated_by.as_ref().map(|u| u.0))
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        Self::insert_levels(&mut tx, &rule.id, &rule.levels).await?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn update(&self, rule: &ApprovalMatrixRule) -> AppResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        sqlx::query(
            r#"
            UPDATE approval_matrix
            SET transaction_type = $2, department = $3, min_amount = $4, max_amount = $5,
                is_active = $6, updated_at = $7, updated_by = $8
            WHERE id = $1
            "#,
        )
        .bind(rule.id.0)
        .bind(&rule.transaction_type)
        .bind(&rule.department)
        .bind(rule.min_amount)
        .bind(rule.max_amount)
        .bind(rule.is_active)
        .bind(rule.audit_info.updated_at)
        .bind(rule.audit_info.updated_by.as_ref().map(|u| u.0))
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        // 级别整体替换
        sqlx::query("DELETE FROM approval_levels WHERE rule_id = $1")
            .bind(rule.id.0)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        Self::insert_levels(&mut tx, &rule.id, &rule.levels).await?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn delete(&self, id: &RuleId) -> AppResult<()> {
        // approval_levels 由外键级联删除
        sqlx::query("DELETE FROM approval_matrix WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn find_by_id(&self, id: &RuleId) -> AppResult<Option<ApprovalMatrixRule>> {
        let row = sqlx::query_as::<_, RuleRow>(
            r#"
            SELECT id, transaction_type, department, min_amount, max_amount, is_active,
                   created_at, created_by, updated_at, updated_by
            FROM approval_matrix WHERE id = $1
            "#,
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        match row {
            Some(row) => {
                let levels = self.load_levels(&[row.id]).await?;
                Ok(Self::assemble(vec![row], levels).pop())
            }
            None => Ok(None),
        }
    }

    async fn list(&self, pagination: &Pagination) -> AppResult<(Vec<ApprovalMatrixRule>, i64)> {
        let rows = sqlx::query_as::<_, RuleRow>(
            r#"
            SELECT id, transaction_type, department, min_amount, max_amount, is_active,
                   created_at, created_by, updated_at, updated_by
            FROM approval_matrix
            ORDER BY transaction_type, created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(pagination.page_size as i64)
        .bind(pagination.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM approval_matrix")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let rule_ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let levels = self.load_levels(&rule_ids).await?;

        Ok((Self::assemble(rows, levels), total.0))
    }

    async fn list_active_for_type(
        &self,
        transaction_type: &str,
    ) -> AppResult<Vec<ApprovalMatrixRule>> {
        let rows = sqlx::query_as::<_, RuleRow>(
            r#"
            SELECT id, transaction_type, department, min_amount, max_amount, is_active,
                   created_at, created_by, updated_at, updated_by
            FROM approval_matrix
            WHERE transaction_type = $1 AND is_active
            "#,
        )
        .bind(transaction_type)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let rule_ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let levels = self.load_levels(&rule_ids).await?;

        Ok(Self::assemble(rows, levels))
    }
}

// ============ 数据行映射 ============

#[derive(sqlx::FromRow)]
struct RuleRow {
    id: Uuid,
    transaction_type: String,
    department: Option<String>,
    min_amount: Decimal,
    max_amount: Option<Decimal>,
    is_active: bool,
    created_at: DateTime<Utc>,
    created_by: Option<Uuid>,
    updated_at: DateTime<Utc>,
    updated_by: Option<Uuid>,
}

impl RuleRow {
    fn into_rule(self, levels: Vec<ApprovalLevel>) -> ApprovalMatrixRule {
        ApprovalMatrixRule {
            id: RuleId::from_uuid(self.id),
            transaction_type: self.transaction_type,
            department: self.department,
            min_amount: self.min_amount,
            max_amount: self.max_amount,
            is_active: self.is_active,
            levels,
            audit_info: AuditInfo {
                created_at: self.created_at,
                created_by: self.created_by.map(UserId::from_uuid),
                updated_at: self.updated_at,
                updated_by: self.updated_by.map(UserId::from_uuid),
            },
        }
    }
}

#[derive(sqlx::FromRow)]
struct LevelRow {
    rule_id: Uuid,
    level: i32,
    role_code: String,
    user_id: Option<Uuid>,
    required: bool,
    can_delegate: bool,
}

impl LevelRow {
    fn into_level(self) -> ApprovalLevel {
        ApprovalLevel {
            level: self.level,
            role_code: self.role_code,
            user_id: self.user_id.map(UserId::from_uuid),
            required: self.required,
            can_delegate: self.can_delegate,
        }
    }
}
