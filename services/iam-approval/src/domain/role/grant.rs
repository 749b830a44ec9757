//! 权限授予
//!
//! 权限是集合语义：`(module_id, action)` 对存在即授予，无重复。

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// 单条权限授予
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PermissionGrant {
    pub module_id: String,
    pub action: String,
}

impl PermissionGrant {
    pub fn new(module_id: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            module_id: module_id.into(),
            action: action.into(),
        }
    }
}

/// 一个角色的完整权限集合，按模块分组
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionSet {
    modules: BTreeMap<String, BTreeSet<String>>,
}

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从授予列表构建，重复项自然去重
    pub fn from_grants<I>(grants: I) -> Self
    where
        I: IntoIterator<Item = PermissionGrant>,
    {
        let mut set = Self::new();
        for g in grants {
            set.insert(g);
        }
        set
    }

    pub fn insert(&mut self, grant: PermissionGrant) {
        self.modules
            .entry(grant.module_id)
            .or_default()
            .insert(grant.action);
    }

    pub fn contains(&self, module_id: &str, action: &str) -> bool {
        self.modules
            .get(module_id)
            .is_some_and(|actions| actions.contains(action))
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// 展开为授予列表（确定性顺序）
    pub fn grants(&self) -> Vec<PermissionGrant> {
        self.modules
            .iter()
            .flat_map(|(module, actions)| {
                actions
                    .iter()
                    .map(|a| PermissionGrant::new(module.clone(), a.clone()))
            })
            .collect()
    }

    /// 按模块迭代
    pub fn iter(&self) -> impl Iterator<Item = (&String, &BTreeSet<String>)> {
        self.modules.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_semantics() {
        let set = PermissionSet::from_grants([
            PermissionGrant::new("quotations", "view"),
            PermissionGrant::new("quotations", "approve"),
            PermissionGrant::new("quotations", "view"),
        ]);

        assert!(set.contains("quotations", "view"));
        assert!(set.contains("quotations", "approve"));
        assert!(!set.contains("quotations", "delete"));
        assert!(!set.contains("clients", "view"));
        assert_eq!(set.grants().len(), 2);
    }

    #[test]
    fn test_empty_set_denies_everything() {
        let set = PermissionSet::new();
        assert!(set.is_empty());
        assert!(!set.contains("quotations", "view"));
    }
}
