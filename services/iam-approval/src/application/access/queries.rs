//! 角色与权限查询处理器

use std::sync::Arc;

use marlin_common::{PagedResult, Pagination};
use marlin_errors::{AppError, AppResult};

use crate::domain::role::{
    PermissionGrant, PermissionSet, Role, RolePermissionRepository, RoleRepository,
};

/// 角色与权限查询处理器
pub struct AccessQueryHandler {
    role_repo: Arc<dyn RoleRepository>,
    role_permission_repo: Arc<dyn RolePermissionRepository>,
}

impl AccessQueryHandler {
    pub fn new(
        role_repo: Arc<dyn RoleRepository>,
        role_permission_repo: Arc<dyn RolePermissionRepository>,
    ) -> Self {
        Self {
            role_repo,
            role_permission_repo,
        }
    }

    /// 角色的权限集合
    ///
    /// 角色缺失或停用返回 NotFound；是否把缺失当作空权限由调用方决定。
    pub async fn get_permissions(&self, role_code: &str) -> AppResult<PermissionSet> {
        let role = self
            .role_repo
            .find_by_code(role_code)
            .await?
            .filter(|r| r.is_active)
            .ok_or_else(|| AppError::not_found(format!("Role '{}' not found", role_code)))?;

        let grants = self
            .role_permission_repo
            .permissions_for_role(&role.code)
            .await?;
        Ok(PermissionSet::from_grants(grants))
    }

    /// 曾被授予过的全部 (module_id, action) 对，供管理界面使用
    pub async fn list_granted_catalog(&self) -> AppResult<Vec<PermissionGrant>> {
        self.role_permission_repo.distinct_granted_pairs().await
    }

    /// 角色分页列表
    pub async fn list_roles(&self, pagination: Pagination) -> AppResult<PagedResult<Role>> {
        let (roles, total) = self.role_repo.list(&pagination).await?;
        Ok(PagedResult::new(roles, total as u64, &pagination))
    }
}
