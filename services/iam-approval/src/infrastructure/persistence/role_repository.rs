//! PostgreSQL 角色仓储实现

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use marlin_common::{AuditInfo, Pagination, UserId};
use marlin_errors::AppResult;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::role::{Role, RoleId, RoleRepository};

use super::error_mapper::map_sqlx_error;

pub struct PostgresRoleRepository {
    pool: PgPool,
}

impl PostgresRoleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoleRepository for PostgresRoleRepository {
    async fn create(&self, role: &Role) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO roles (id, code, name, description, is_active, created_at, created_by, updated_at, updated_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(role.id.0)
        .bind(&role.code)
        .bind(&role.name)
        .bind(&role.description)
        .bind(role.is_active)
        .bind(role.audit_info.created_at)
        .bind(role.audit_info.created_by.as_ref().map(|u| u.0))
        .bind(role.audit_info.updated_at)
        .bind(role.audit_info.updated_by.as_ref().map(|u| u.0))
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn update(&self, role: &Role) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE roles
            SET name = $2, description = $3, is_active = $4, updated_at = $5, updated_by = $6
            WHERE code = $1
            "#,
        )
        .bind(&role.code)
        .bind(&role.name)
        .bind(&role.description)
        .bind(role.is_active)
        .bind(role.audit_info.updated_at)
        .bind(role.audit_info.updated_by.as_ref().map(|u| u.0))
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn delete(&self, code: &str) -> AppResult<()> {
        sqlx::query("DELETE FROM roles WHERE code = $1")
            .bind(code)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn find_by_code(&self, code: &str) -> AppResult<Option<Role>> {
        let row = sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT id, code, name, description, is_active,
                   created_at, created_by, updated_at, updated_by
            FROM roles WHERE code = $1
            "#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(RoleRow::into_role))
    }

    async fn exists_by_code(&self, code: &str) -> AppResult<bool> {
        let result: (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM roles WHERE code = $1)")
                .bind(code)
                .fetch_one(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        Ok(result.0)
    }

    async fn list(&self, pagination: &Pagination) -> AppResult<(Vec<Role>, i64)> {
        let rows = sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT id, code, name, description, is_active,
                   created_at, created_by, updated_at, updated_by
            FROM roles
            ORDER BY code
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(pagination.page_size as i64)
        .bind(pagination.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM roles")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok((rows.into_iter().map(RoleRow::into_role).collect(), total.0))
    }

    async fn count_users_with_role(&self, code: &str) -> AppResult<i64> {
        let result: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE role_code = $1")
            .bind(code)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.0)
    }
}

// ============ 数据行映射 ============

#[derive(sqlx::FromRow)]
struct RoleRow {
    id: Uuid,
    code: String,
    name: String,
    description: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
    created_by: Option<Uuid>,
    updated_at: DateTime<Utc>,
    updated_by: Option<Uuid>,
}

impl RoleRow {
    fn into_role(self) -> Role {
        Role {
            id: RoleId::from_uuid(self.id),
            code: self.code,
            name: self.name,
            description: self.description,
            is_active: self.is_active,
            audit_info: AuditInfo {
                created_at: self.created_at,
                created_by: self.created_by.map(UserId::from_uuid),
                updated_at: self.updated_at,
                updated_by: self.updated_by.map(UserId::from_uuid),
            },
        }
    }
}
