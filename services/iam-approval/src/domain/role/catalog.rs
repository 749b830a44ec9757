//! 权限目录
//!
//! 可授予的 `(module_id, action)` 全集由配置提供，写入时校验，
//! 不接受目录之外的键值。

use std::collections::{BTreeMap, BTreeSet};

use marlin_errors::{AppError, AppResult};

use super::PermissionGrant;

/// 静态权限目录
#[derive(Debug, Clone, Default)]
pub struct ModuleActionCatalog {
    modules: BTreeMap<String, BTreeSet<String>>,
}

impl ModuleActionCatalog {
    /// 从 (module_id, actions) 条目构建
    pub fn from_entries<I, S, A>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, A)>,
        S: Into<String>,
        A: IntoIterator<Item = S>,
    {
        let mut modules: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for (module, actions) in entries {
            modules
                .entry(module.into())
                .or_default()
                .extend(actions.into_iter().map(Into::into));
        }
        Self { modules }
    }

    pub fn contains(&self, module_id: &str, action: &str) -> bool {
        self.modules
            .get(module_id)
            .is_some_and(|actions| actions.contains(action))
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// 校验授予列表中的每一对都在目录内
    pub fn validate(&self, grants: &[PermissionGrant]) -> AppResult<()> {
        for g in grants {
            if !self.contains(&g.module_id, &g.action) {
                return Err(AppError::validation(format!(
                    "Unknown module/action pair '{}:{}'",
                    g.module_id, g.action
                )));
            }
        }
        Ok(())
    }
}
