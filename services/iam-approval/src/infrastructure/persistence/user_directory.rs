//! PostgreSQL 用户目录实现
//!
//! 用户表由身份服务持有，此处只读显示名。

use async_trait::async_trait;
use marlin_common::UserId;
use marlin_errors::AppResult;
use sqlx::PgPool;

use crate::domain::directory::UserDirectory;

use super::error_mapper::map_sqlx_error;

pub struct PostgresUserDirectory {
    pool: PgPool,
}

impl PostgresUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PostgresUserDirectory {
    async fn display_name(&self, user_id: &UserId) -> AppResult<Option<String>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT display_name FROM users WHERE id = $1")
                .bind(user_id.0)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        Ok(row.map(|r| r.0))
    }
}
