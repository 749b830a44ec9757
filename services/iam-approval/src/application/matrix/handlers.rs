//! 审批矩阵命令/查询处理器

use std::sync::Arc;

use marlin_common::{AuditInfo, PagedResult, Pagination};
use marlin_errors::{AppError, AppResult};
use tracing::info;

use crate::domain::matrix::{ApprovalMatrixRule, MatrixRepository, RuleId};

use super::commands::*;

fn parse_rule_id(raw: &str) -> AppResult<RuleId> {
    raw.parse::<uuid::Uuid>()
        .map(RuleId::from_uuid)
        .map_err(|_| AppError::validation("Invalid rule ID"))
}

/// 审批矩阵命令处理器
pub struct MatrixCommandHandler {
    matrix_repo: Arc<dyn MatrixRepository>,
}

impl MatrixCommandHandler {
    pub fn new(matrix_repo: Arc<dyn MatrixRepository>) -> Self {
        Self { matrix_repo }
    }

    /// 创建规则
    pub async fn handle_create(&self, cmd: CreateRuleCommand) -> AppResult<ApprovalMatrixRule> {
        let mut rule = ApprovalMatrixRule::new(
            cmd.transaction_type,
            cmd.department,
            cmd.min_amount,
            cmd.max_amount,
            cmd.levels,
        );
        rule.is_active = cmd.is_active;
        rule.audit_info = AuditInfo::new(cmd.performed_by);
        rule.validate()?;

        self.matrix_repo.create(&rule).await?;
        info!(rule_id = %rule.id, transaction_type = %rule.transaction_type, "approval matrix rule created");
        Ok(rule)
    }

    /// 更新规则：级别列表先删后插，整体替换
    pub async fn handle_update(&self, cmd: UpdateRuleCommand) -> AppResult<ApprovalMatrixRule> {
        let id = parse_rule_id(&cmd.id)?;
        let existing = self
            .matrix_repo
            .find_by_id(&id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Approval rule '{}' not found", cmd.id)))?;

        let mut rule = ApprovalMatrixRule {
            id: existing.id,
            transaction_type: cmd.transaction_type,
            department: cmd.department,
            min_amount: cmd.min_amount,
            max_amount: cmd.max_amount,
            is_active: cmd.is_active,
            levels: cmd.levels,
            audit_info: existing.audit_info,
        };
        rule.audit_info.update(cmd.performed_by);
        rule.validate()?;

        self.matrix_repo.update(&rule).await?;
        info!(rule_id = %rule.id, "approval matrix rule replaced");
        Ok(rule)
    }

    /// 删除规则
    pub async fn handle_delete(&self, cmd: DeleteRuleCommand) -> AppResult<()> {
        let id = parse_rule_id(&cmd.id)?;
        if self.matrix_repo.find_by_id(&id).await?.is_none() {
            return Err(AppError::not_found(format!(
                "Approval rule '{}' not found",
                cmd.id
            )));
        }
        self.matrix_repo.delete(&id).await?;
        info!(rule_id = %id, "approval matrix rule deleted");
        Ok(())
    }
}

/// 审批矩阵查询处理器
pub struct MatrixQueryHandler {
    matrix_repo: Arc<dyn MatrixRepository>,
}

impl MatrixQueryHandler {
    pub fn new(matrix_repo: Arc<dyn MatrixRepository>) -> Self {
        Self { matrix_repo }
    }

    pub async fn get_rule(&self, raw_id: &str) -> AppResult<ApprovalMatrixRule> {
        let id = parse_rule_id(raw_id)?;
        self.matrix_repo
            .find_by_id(&id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Approval rule '{}' not found", raw_id)))
    }

    pub async fn list_rules(
        &self,
        pagination: Pagination,
    ) -> AppResult<PagedResult<ApprovalMatrixRule>> {
        let (rules, total) = self.matrix_repo.list(&pagination).await?;
        Ok(PagedResult::new(rules, total as u64, &pagination))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use std::sync::Mutex;

    use crate::domain::matrix::ApprovalLevel;

    #[derive(Default)]
    struct MemMatrixRepository {
        rules: Mutex<Vec<ApprovalMatrixRule>>,
    }

    #[async_trait]
    impl MatrixRepository for MemMatrixRepository {
        async fn create(&self, rule: &ApprovalMatrixRule) -> AppResult<()> {
            self.rules.lock().unwrap().push(rule.clone());
            Ok(())
        }
        async fn update(&self, rule: &ApprovalMatrixRule) -> AppResult<()> {
            let mut rules = self.rules.lock().unwrap();
            if let Some(r) = rules.iter_mut().find(|r| r.id == rule.id) {
                *r = rule.clone();
            }
            Ok(())
        }
        async fn delete(&self, id: &RuleId) -> AppResult<()> {
            self.rules.lock().unwrap().retain(|r| r.id != *id);
            Ok(())
        }
        async fn find_by_id(&self, id: &RuleId) -> AppResult<Option<ApprovalMatrixRule>> {
            Ok(self
                .rules
                .lock()
                .unwrap()
                .iter()
                .find(|r| r.id == *id)
                .cloned())
        }
        async fn list(
            &self,
            _pagination: &Pagination,
        ) -> AppResult<(Vec<ApprovalMatrixRule>, i64)> {
            let rules = self.rules.lock().unwrap();
            Ok((rules.clone(), rules.len() as i64))
        }
        async fn list_active_for_type(
            &self,
            transaction_type: &str,
        ) -> AppResult<Vec<ApprovalMatrixRule>> {
            Ok(self
                .rules
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.is_active && r.transaction_type == transaction_type)
                .cloned()
                .collect())
        }
    }

    fn create_cmd(levels: Vec<ApprovalLevel>) -> CreateRuleCommand {
        CreateRuleCommand {
            transaction_type: "quotation".to_string(),
            department: None,
            min_amount: Decimal::ZERO,
            max_amount: Some(Decimal::new(10_000, 0)),
            is_active: true,
            levels,
            performed_by: None,
        }
    }

    #[tokio::test]
    async fn test_create_validates_dense_levels() {
        let handler = MatrixCommandHandler::new(Arc::new(MemMatrixRepository::default()));

        let err = handler
            .handle_create(create_cmd(vec![
                ApprovalLevel::by_role(1, "supervisor"),
                ApprovalLevel::by_role(3, "manager"),
            ]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_update_replaces_levels_entirely() {
        let repo = Arc::new(MemMatrixRepository::default());
        let handler = MatrixCommandHandler::new(repo.clone());

        let rule = handler
            .handle_create(create_cmd(vec![
                ApprovalLevel::by_role(1, "supervisor"),
                ApprovalLevel::by_role(2, "manager"),
            ]))
            .await
            .unwrap();

        let updated = handler
            .handle_update(UpdateRuleCommand {
                id: rule.id.to_string(),
                transaction_type: rule.transaction_type.clone(),
                department: Some("sales".to_string()),
                min_amount: rule.min_amount,
                max_amount: rule.max_amount,
                is_active: true,
                levels: vec![ApprovalLevel::by_role(1, "director")],
                performed_by: None,
            })
            .await
            .unwrap();

        assert_eq!(updated.id, rule.id);
        assert_eq!(updated.levels.len(), 1);
        assert_eq!(updated.levels[0].role_code, "director");

        let stored = repo.find_by_id(&rule.id).await.unwrap().unwrap();
        assert_eq!(stored.levels.len(), 1);
        assert_eq!(stored.department.as_deref(), Some("sales"));
    }

    #[tokio::test]
    async fn test_delete_unknown_rule_not_found() {
        let handler = MatrixCommandHandler::new(Arc::new(MemMatrixRepository::default()));
        let err = handler
            .handle_delete(DeleteRuleCommand {
                id: uuid::Uuid::now_v7().to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
