//! 角色与权限仓储接口

use async_trait::async_trait;
use marlin_common::Pagination;
use marlin_errors::AppResult;

use super::{PermissionGrant, Role};

/// 角色仓储
#[async_trait]
pub trait RoleRepository: Send + Sync {
    async fn create(&self, role: &Role) -> AppResult<()>;

    async fn update(&self, role: &Role) -> AppResult<()>;

    /// 物理删除。调用方必须先确认无用户引用该角色。
    async fn delete(&self, code: &str) -> AppResult<()>;

    async fn find_by_code(&self, code: &str) -> AppResult<Option<Role>>;

    async fn exists_by_code(&self, code: &str) -> AppResult<bool>;

    async fn list(&self, pagination: &Pagination) -> AppResult<(Vec<Role>, i64)>;

    /// 引用该角色的用户数（用户表由身份服务持有，此处只读）
    async fn count_users_with_role(&self, code: &str) -> AppResult<i64>;
}

/// 角色权限仓储
///
/// 替换是原子操作：同一事务内先删后插，读取方只会看到旧集合或新集合。
#[async_trait]
pub trait RolePermissionRepository: Send + Sync {
    async fn permissions_for_role(&self, role_code: &str) -> AppResult<Vec<PermissionGrant>>;

    async fn replace_permissions(
        &self,
        role_code: &str,
        grants: &[PermissionGrant],
    ) -> AppResult<()>;

    /// 曾被授予过的全部 (module_id, action) 去重列表
    async fn distinct_granted_pairs(&self) -> AppResult<Vec<PermissionGrant>>;
}
