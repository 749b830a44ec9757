//! 角色与权限命令

use marlin_common::UserId;

use crate::domain::role::PermissionGrant;

/// 创建角色
#[derive(Debug, Clone)]
pub struct CreateRoleCommand {
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub performed_by: Option<UserId>,
}

/// 更新角色（code 不可变）
#[derive(Debug, Clone)]
pub struct UpdateRoleCommand {
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub performed_by: Option<UserId>,
}

/// 激活/停用角色
#[derive(Debug, Clone)]
pub struct SetRoleActiveCommand {
    pub code: String,
    pub active: bool,
    pub performed_by: Option<UserId>,
}

/// 物理删除角色
#[derive(Debug, Clone)]
pub struct DeleteRoleCommand {
    pub code: String,
}

/// 整体替换角色权限
#[derive(Debug, Clone)]
pub struct ReplacePermissionsCommand {
    pub role_code: String,
    pub grants: Vec<PermissionGrant>,
}
