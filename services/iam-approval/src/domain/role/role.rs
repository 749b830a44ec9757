//! 角色实体

use marlin_common::{AuditInfo, UserId};
use marlin_domain_core::{AggregateRoot, Entity};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 角色 ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoleId(pub Uuid);

impl RoleId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for RoleId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RoleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 角色实体
///
/// `code` 是不可变业务键；停用角色会将其从分配列表中隐藏，但保留历史。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub audit_info: AuditInfo,
}

impl Role {
    pub fn new(code: String, name: String, description: Option<String>) -> Self {
        Self {
            id: RoleId::new(),
            code,
            name,
            description,
            is_active: true,
            audit_info: AuditInfo::default(),
        }
    }

    /// 更新角色信息（code 不可变）
    pub fn update(&mut self, name: String, description: Option<String>, by: Option<UserId>) {
        self.name = name;
        self.description = description;
        self.audit_info.update(by);
    }

    /// 激活角色
    pub fn activate(&mut self, by: Option<UserId>) {
        self.is_active = true;
        self.audit_info.update(by);
    }

    /// 停用角色
    pub fn deactivate(&mut self, by: Option<UserId>) {
        self.is_active = false;
        self.audit_info.update(by);
    }
}

impl Entity for Role {
    type Id = RoleId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl AggregateRoot for Role {
    fn audit_info(&self) -> &AuditInfo {
        &self.audit_info
    }

    fn audit_info_mut(&mut self) -> &mut AuditInfo {
        &mut self.audit_info
    }
}
