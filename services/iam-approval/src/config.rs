//! 服务配置
//!
//! 权限目录与单据类型注册表是静态配置：随部署下发，不落库。

use figment::{
    Figment,
    providers::{Format, Toml},
};
use marlin_config::ConfigError;
use marlin_errors::AppResult;
use serde::Deserialize;

use crate::domain::document::{DocumentType, DocumentTypeRegistry};
use crate::domain::role::ModuleActionCatalog;

/// 权限目录条目
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogEntry {
    pub module_id: String,
    pub actions: Vec<String>,
}

/// 单据类型条目
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentTypeEntry {
    pub transaction_type: String,
    pub table: String,
    pub module_id: String,
}

/// 访问控制配置（config 文件的 [access] 段）
#[derive(Debug, Clone, Deserialize)]
pub struct AccessConfig {
    #[serde(default = "default_admin_role")]
    pub admin_role: String,
    #[serde(default)]
    pub catalog: Vec<CatalogEntry>,
    #[serde(default)]
    pub document_types: Vec<DocumentTypeEntry>,
}

fn default_admin_role() -> String {
    "admin".to_string()
}

impl AccessConfig {
    /// 与 AppConfig 相同的分层来源，聚焦 [access] 段
    pub fn load(config_dir: &str) -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config: Self = Figment::new()
            .merge(Toml::file(format!("{}/default.toml", config_dir)))
            .merge(Toml::file(format!("{}/{}.toml", config_dir, env)))
            .extract_inner("access")?;

        Ok(config)
    }

    pub fn catalog(&self) -> ModuleActionCatalog {
        ModuleActionCatalog::from_entries(
            self.catalog
                .iter()
                .map(|e| (e.module_id.clone(), e.actions.clone())),
        )
    }

    pub fn registry(&self) -> AppResult<DocumentTypeRegistry> {
        DocumentTypeRegistry::from_entries(self.document_types.iter().map(|e| DocumentType {
            transaction_type: e.transaction_type.clone(),
            table: e.table.clone(),
            module_id: e.module_id.clone(),
        }))
    }
}
