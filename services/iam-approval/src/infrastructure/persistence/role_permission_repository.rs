//! PostgreSQL 角色权限仓储实现
//!
//! 替换在单个事务内先删后插；并发读取方只会看到旧集合或新集合。

use async_trait::async_trait;
use chrono::Utc;
use marlin_errors::AppResult;
use sqlx::PgPool;

use crate::domain::role::{PermissionGrant, RolePermissionRepository};

use super::error_mapper::map_sqlx_error;

pub struct PostgresRolePermissionRepository {
    pool: PgPool,
}

impl PostgresRolePermissionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RolePermissionRepository for PostgresRolePermissionRepository {
    async fn permissions_for_role(&self, role_code: &str) -> AppResult<Vec<PermissionGrant>> {
        let rows = sqlx::query_as::<_, GrantRow>(
            r#"
            SELECT module_id, action
            FROM role_permissions
            WHERE role_code = $1
            ORDER BY module_id, action
            "#,
        )
        .bind(role_code)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(GrantRow::into_grant).collect())
    }

    async fn replace_permissions(
        &self,
        role_code: &str,
        grants: &[PermissionGrant],
    ) -> AppResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        sqlx::query("DELETE FROM role_permissions WHERE role_code = $1")
            .bind(role_code)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        let granted_at = Utc::now();
        for grant in grants {
            sqlx::query(
                r#"
                INSERT INTO role_permissions (role_code, module_id, action, granted_at)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(role_code)
            .bind(&grant.module_id)
            .bind(&grant.action)
            .bind(granted_at)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn distinct_granted_pairs(&self) -> AppResult<Vec<PermissionGrant>> {
        let rows = sqlx::query_as::<_, GrantRow>(
            r#"
            SELECT DISTINCT module_id, action
            FROM role_permissions
            ORDER BY module_id, action
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(GrantRow::into_grant).collect())
    }
}

// ============ 数据行映射 ============

#[derive(sqlx::FromRow)]
struct GrantRow {
    module_id: String,
    action: String,
}

impl GrantRow {
    fn into_grant(self) -> PermissionGrant {
        PermissionGrant {
            module_id: self.module_id,
            action: self.action,
        }
    }
}
