//! 授权检查服务
//!
//! 统一访问控制决策点。两种检查按操作组合：
//! 1. 角色集检查：操作声明允许的角色列表
//! 2. 能力检查：操作声明所需的 (module_id, action)
//!
//! 检查是对已加载数据的纯谓词，从不修改状态；工作流引擎在其上
//! 叠加级别归属等属性检查。

use std::sync::Arc;

use marlin_errors::{AppError, AppResult};
use metrics::counter;

use crate::domain::principal::Principal;
use crate::domain::role::{PermissionSet, RolePermissionRepository, RoleRepository};

/// 授权服务
pub struct AuthorizationService {
    role_repo: Arc<dyn RoleRepository>,
    role_permission_repo: Arc<dyn RolePermissionRepository>,
}

impl AuthorizationService {
    pub fn new(
        role_repo: Arc<dyn RoleRepository>,
        role_permission_repo: Arc<dyn RolePermissionRepository>,
    ) -> Self {
        Self {
            role_repo,
            role_permission_repo,
        }
    }

    /// 请求必须携带主体
    pub fn require_authenticated<'a>(
        principal: Option<&'a Principal>,
    ) -> AppResult<&'a Principal> {
        principal.ok_or_else(|| AppError::unauthenticated("No principal attached to request"))
    }

    /// 角色集检查
    pub fn require_any_role(&self, principal: &Principal, allowed: &[&str]) -> AppResult<()> {
        if principal.has_any_role(allowed) {
            counter!("authorization_checks_total", "check" => "role_set", "allowed" => "true")
                .increment(1);
            Ok(())
        } else {
            counter!("authorization_checks_total", "check" => "role_set", "allowed" => "false")
                .increment(1);
            Err(AppError::forbidden(format!(
                "Role '{}' is not permitted to perform this operation",
                principal.role_code
            )))
        }
    }

    /// 能力检查：主体角色的权限集合必须包含 (module_id, action)
    ///
    /// 角色缺失或停用视为空权限集合，直接拒绝，不向调用方泄露区别。
    pub async fn require_capability(
        &self,
        principal: &Principal,
        module_id: &str,
        action: &str,
    ) -> AppResult<()> {
        let permissions = self.resolved_permissions(&principal.role_code).await?;
        if permissions.contains(module_id, action) {
            counter!("authorization_checks_total", "check" => "capability", "allowed" => "true")
                .increment(1);
            Ok(())
        } else {
            counter!("authorization_checks_total", "check" => "capability", "allowed" => "false")
                .increment(1);
            Err(AppError::forbidden(format!(
                "Missing permission '{}:{}'",
                module_id, action
            )))
        }
    }

    /// 主体角色的已解析权限集合；角色缺失或停用返回空集合
    async fn resolved_permissions(&self, role_code: &str) -> AppResult<PermissionSet> {
        match self.role_repo.find_by_code(role_code).await? {
            Some(role) if role.is_active => {
                let grants = self
                    .role_permission_repo
                    .permissions_for_role(role_code)
                    .await?;
                Ok(PermissionSet::from_grants(grants))
            }
            _ => Ok(PermissionSet::new()),
        }
    }
}
