//! 单据类型注册表
//!
//! 不同类型的单据存放在各自的业务表中。注册表把 `transaction_type`
//! 映射到承载表与权限模块；未注册的类型一律拒绝。

use std::collections::HashMap;

use marlin_errors::{AppError, AppResult};

/// 一种可审批的单据类型
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentType {
    pub transaction_type: String,
    /// 单据所在的 PostgreSQL 表名
    pub table: String,
    /// 权限目录中对应的模块
    pub module_id: String,
}

/// 单据类型注册表
#[derive(Debug, Clone, Default)]
pub struct DocumentTypeRegistry {
    types: HashMap<String, DocumentType>,
}

impl DocumentTypeRegistry {
    /// 从配置条目构建；表名必须是合法标识符（会拼入 SQL）
    pub fn from_entries<I>(entries: I) -> AppResult<Self>
    where
        I: IntoIterator<Item = DocumentType>,
    {
        let mut types = HashMap::new();
        for entry in entries {
            if !is_safe_identifier(&entry.table) {
                return Err(AppError::invalid_configuration(format!(
                    "Document table name '{}' is not a valid identifier",
                    entry.table
                )));
            }
            if types
                .insert(entry.transaction_type.clone(), entry)
                .is_some()
            {
                return Err(AppError::invalid_configuration(
                    "Duplicate transaction_type in document registry",
                ));
            }
        }
        Ok(Self { types })
    }

    pub fn get(&self, transaction_type: &str) -> AppResult<&DocumentType> {
        self.types.get(transaction_type).ok_or_else(|| {
            AppError::not_found(format!(
                "Unknown transaction type '{}'",
                transaction_type
            ))
        })
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

fn is_safe_identifier(s: &str) -> bool {
    !s.is_empty()
        && s.chars().next().is_some_and(|c| c.is_ascii_lowercase())
        && s.chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}
