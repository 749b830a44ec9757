//! 角色与权限命令处理器

use std::sync::Arc;

use marlin_errors::{AppError, AppResult};
use tracing::info;

use crate::domain::role::{
    ModuleActionCatalog, PermissionSet, Role, RolePermissionRepository, RoleRepository,
};

use super::commands::*;

/// 角色与权限命令处理器
pub struct AccessCommandHandler {
    role_repo: Arc<dyn RoleRepository>,
    role_permission_repo: Arc<dyn RolePermissionRepository>,
    catalog: Arc<ModuleActionCatalog>,
}

impl AccessCommandHandler {
    pub fn new(
        role_repo: Arc<dyn RoleRepository>,
        role_permission_repo: Arc<dyn RolePermissionRepository>,
        catalog: Arc<ModuleActionCatalog>,
    ) -> Self {
        Self {
            role_repo,
            role_permission_repo,
            catalog,
        }
    }

    /// 创建角色
    pub async fn handle_create(&self, cmd: CreateRoleCommand) -> AppResult<Role> {
        if cmd.code.is_empty() {
            return Err(AppError::validation("Role code must not be empty"));
        }
        if self.role_repo.exists_by_code(&cmd.code).await? {
            return Err(AppError::conflict(format!(
                "Role with code '{}' already exists",
                cmd.code
            )));
        }

        let mut role = Role::new(cmd.code, cmd.name, cmd.description);
        role.audit_info = marlin_common::AuditInfo::new(cmd.performed_by);
        self.role_repo.create(&role).await?;

        info!(role_code = %role.code, "role created");
        Ok(role)
    }

    /// 更新角色
    pub async fn handle_update(&self, cmd: UpdateRoleCommand) -> AppResult<Role> {
        let mut role = self
            .role_repo
            .find_by_code(&cmd.code)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Role '{}' not found", cmd.code)))?;

        role.update(cmd.name, cmd.description, cmd.performed_by);
        self.role_repo.update(&role).await?;

        Ok(role)
    }

    /// 激活/停用角色
    pub async fn handle_set_active(&self, cmd: SetRoleActiveCommand) -> AppResult<Role> {
        let mut role = self
            .role_repo
            .find_by_code(&cmd.code)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Role '{}' not found", cmd.code)))?;

        if cmd.active {
            role.activate(cmd.performed_by);
        } else {
            role.deactivate(cmd.performed_by);
        }
        self.role_repo.update(&role).await?;

        info!(role_code = %role.code, active = cmd.active, "role activation changed");
        Ok(role)
    }

    /// 物理删除角色
    ///
    /// 仍被用户引用的角色不可删除，只能停用；历史记录不受影响。
    pub async fn handle_delete(&self, cmd: DeleteRoleCommand) -> AppResult<()> {
        if self.role_repo.find_by_code(&cmd.code).await?.is_none() {
            return Err(AppError::not_found(format!("Role '{}' not found", cmd.code)));
        }

        let referencing = self.role_repo.count_users_with_role(&cmd.code).await?;
        if referencing > 0 {
            return Err(AppError::conflict(format!(
                "Role '{}' is referenced by {} user(s); deactivate it instead",
                cmd.code, referencing
            )));
        }

        self.role_repo.delete(&cmd.code).await?;
        info!(role_code = %cmd.code, "role deleted");
        Ok(())
    }

    /// 整体替换角色权限
    ///
    /// 先对照静态目录校验每一对 (module_id, action)，再原子替换；
    /// 校验失败时旧集合保持不变。
    pub async fn handle_replace_permissions(
        &self,
        cmd: ReplacePermissionsCommand,
    ) -> AppResult<PermissionSet> {
        if self.role_repo.find_by_code(&cmd.role_code).await?.is_none() {
            return Err(AppError::not_found(format!(
                "Role '{}' not found",
                cmd.role_code
            )));
        }

        // 去重后校验
        let set = PermissionSet::from_grants(cmd.grants);
        let grants = set.grants();
        self.catalog.validate(&grants)?;

        self.role_permission_repo
            .replace_permissions(&cmd.role_code, &grants)
            .await?;

        info!(role_code = %cmd.role_code, grant_count = grants.len(), "role permissions replaced");
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use marlin_common::Pagination;
    use std::sync::Mutex;

    use crate::domain::role::PermissionGrant;

    // --- Mocks ---

    #[derive(Default)]
    struct MemRoleRepository {
        roles: Mutex<Vec<Role>>,
        user_counts: Mutex<std::collections::HashMap<String, i64>>,
    }

    #[async_trait]
    impl RoleRepository for MemRoleRepository {
        async fn create(&self, role: &Role) -> AppResult<()> {
            self.roles.lock().unwrap().push(role.clone());
            Ok(())
        }
        async fn update(&self, role: &Role) -> AppResult<()> {
            let mut roles = self.roles.lock().unwrap();
            if let Some(r) = roles.iter_mut().find(|r| r.code == role.code) {
                *r = role.clone();
            }
            Ok(())
        }
        async fn delete(&self, code: &str) -> AppResult<()> {
            self.roles.lock().unwrap().retain(|r| r.code != code);
            Ok(())
        }
        async fn find_by_code(&self, code: &str) -> AppResult<Option<Role>> {
            Ok(self
                .roles
                .lock()
                .unwrap()
                .iter()
                .find(|r| r.code == code)
                .cloned())
        }
        async fn exists_by_code(&self, code: &str) -> AppResult<bool> {
            Ok(self.roles.lock().unwrap().iter().any(|r| r.code == code))
        }
        async fn list(&self, _pagination: &Pagination) -> AppResult<(Vec<Role>, i64)> {
            let roles = self.roles.lock().unwrap();
            Ok((roles.clone(), roles.len() as i64))
        }
        async fn count_users_with_role(&self, code: &str) -> AppResult<i64> {
            Ok(*self.user_counts.lock().unwrap().get(code).unwrap_or(&0))
        }
    }

    #[derive(Default)]
    struct MemRolePermissionRepository {
        grants: Mutex<std::collections::HashMap<String, Vec<PermissionGrant>>>,
    }

    #[async_trait]
    impl RolePermissionRepository for MemRolePermissionRepository {
        async fn permissions_for_role(&self, role_code: &str) -> AppResult<Vec<PermissionGrant>> {
            Ok(self
                .grants
                .lock()
                .unwrap()
                .get(role_code)
                .cloned()
                .unwrap_or_default())
        }
        async fn replace_permissions(
            &self,
            role_code: &str,
            grants: &[PermissionGrant],
        ) -> AppResult<()> {
            self.grants
                .lock()
                .unwrap()
                .insert(role_code.to_string(), grants.to_vec());
            Ok(())
        }
        async fn distinct_granted_pairs(&self) -> AppResult<Vec<PermissionGrant>> {
            let mut all: Vec<PermissionGrant> = self
                .grants
                .lock()
                .unwrap()
                .values()
                .flatten()
                .cloned()
                .collect();
            all.sort();
            all.dedup();
            Ok(all)
        }
    }

    fn catalog() -> Arc<ModuleActionCatalog> {
        Arc::new(ModuleActionCatalog::from_entries([
            ("quotations", vec!["view", "approve"]),
            ("clients", vec!["view", "edit"]),
        ]))
    }

    fn handler() -> (
        AccessCommandHandler,
        Arc<MemRoleRepository>,
        Arc<MemRolePermissionRepository>,
    ) {
        let role_repo = Arc::new(MemRoleRepository::default());
        let perm_repo = Arc::new(MemRolePermissionRepository::default());
        let handler =
            AccessCommandHandler::new(role_repo.clone(), perm_repo.clone(), catalog());
        (handler, role_repo, perm_repo)
    }

    async fn seed_role(handler: &AccessCommandHandler, code: &str) {
        handler
            .handle_create(CreateRoleCommand {
                code: code.to_string(),
                name: code.to_string(),
                description: None,
                performed_by: None,
            })
            .await
            .unwrap();
    }

    // --- Tests ---

    #[tokio::test]
    async fn test_create_duplicate_code_conflicts() {
        let (handler, _, _) = handler();
        seed_role(&handler, "ops").await;

        let err = handler
            .handle_create(CreateRoleCommand {
                code: "ops".to_string(),
                name: "Ops again".to_string(),
                description: None,
                performed_by: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_replace_permissions_exact() {
        let (handler, _, perm_repo) = handler();
        seed_role(&handler, "ops").await;

        let grants = vec![
            PermissionGrant::new("quotations", "view"),
            PermissionGrant::new("quotations", "approve"),
        ];
        handler
            .handle_replace_permissions(ReplacePermissionsCommand {
                role_code: "ops".to_string(),
                grants: grants.clone(),
            })
            .await
            .unwrap();

        let stored = perm_repo.permissions_for_role("ops").await.unwrap();
        assert_eq!(
            PermissionSet::from_grants(stored),
            PermissionSet::from_grants(grants)
        );

        // 再次替换为更小的集合，旧授予不得残留
        handler
            .handle_replace_permissions(ReplacePermissionsCommand {
                role_code: "ops".to_string(),
                grants: vec![PermissionGrant::new("clients", "view")],
            })
            .await
            .unwrap();

        let stored = perm_repo.permissions_for_role("ops").await.unwrap();
        assert_eq!(stored, vec![PermissionGrant::new("clients", "view")]);
    }

    #[tokio::test]
    async fn test_replace_rejects_unknown_pair_and_keeps_old_set() {
        let (handler, _, perm_repo) = handler();
        seed_role(&handler, "ops").await;

        handler
            .handle_replace_permissions(ReplacePermissionsCommand {
                role_code: "ops".to_string(),
                grants: vec![PermissionGrant::new("quotations", "view")],
            })
            .await
            .unwrap();

        let err = handler
            .handle_replace_permissions(ReplacePermissionsCommand {
                role_code: "ops".to_string(),
                grants: vec![
                    PermissionGrant::new("quotations", "approve"),
                    PermissionGrant::new("quotations", "teleport"),
                ],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let stored = perm_repo.permissions_for_role("ops").await.unwrap();
        assert_eq!(stored, vec![PermissionGrant::new("quotations", "view")]);
    }

    #[tokio::test]
    async fn test_replace_for_unknown_role_not_found() {
        let (handler, _, _) = handler();
        let err = handler
            .handle_replace_permissions(ReplacePermissionsCommand {
                role_code: "ghost".to_string(),
                grants: vec![],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_refused_while_users_reference_role() {
        let (handler, role_repo, _) = handler();
        seed_role(&handler, "ops").await;
        role_repo
            .user_counts
            .lock()
            .unwrap()
            .insert("ops".to_string(), 3);

        let err = handler
            .handle_delete(DeleteRoleCommand {
                code: "ops".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        // 停用仍然允许
        let role = handler
            .handle_set_active(SetRoleActiveCommand {
                code: "ops".to_string(),
                active: false,
                performed_by: None,
            })
            .await
            .unwrap();
        assert!(!role.is_active);
    }

    #[tokio::test]
    async fn test_delete_with_no_references_succeeds() {
        let (handler, role_repo, _) = handler();
        seed_role(&handler, "ops").await;

        handler
            .handle_delete(DeleteRoleCommand {
                code: "ops".to_string(),
            })
            .await
            .unwrap();
        assert!(!role_repo.exists_by_code("ops").await.unwrap());
    }
}
