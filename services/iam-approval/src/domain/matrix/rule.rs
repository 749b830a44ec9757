//! 审批矩阵规则实体

use marlin_common::{AuditInfo, UserId};
use marlin_domain_core::{AggregateRoot, Entity};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use marlin_errors::{AppError, AppResult};

/// 规则 ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuleId(pub Uuid);

impl RuleId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for RuleId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 审批级别：路由序列中的一个有序步骤
///
/// `user_id` 给定时该级别指定到人，否则按角色匹配。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalLevel {
    pub level: i32,
    pub role_code: String,
    pub user_id: Option<UserId>,
    pub required: bool,
    pub can_delegate: bool,
}

impl ApprovalLevel {
    pub fn by_role(level: i32, role_code: impl Into<String>) -> Self {
        Self {
            level,
            role_code: role_code.into(),
            user_id: None,
            required: true,
            can_delegate: false,
        }
    }
}

/// 审批矩阵规则
///
/// 金额区间为闭区间；`max_amount = None` 表示无上界。
/// `department = None` 表示匹配任意部门。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalMatrixRule {
    pub id: RuleId,
    pub transaction_type: String,
    pub department: Option<String>,
    pub min_amount: Decimal,
    pub max_amount: Option<Decimal>,
    pub is_active: bool,
    pub levels: Vec<ApprovalLevel>,
    pub audit_info: AuditInfo,
}

impl ApprovalMatrixRule {
    pub fn new(
        transaction_type: String,
        department: Option<String>,
        min_amount: Decimal,
        max_amount: Option<Decimal>,
        levels: Vec<ApprovalLevel>,
    ) -> Self {
        Self {
            id: RuleId::new(),
            transaction_type,
            department,
            min_amount,
            max_amount,
            is_active: true,
            levels,
            audit_info: AuditInfo::default(),
        }
    }

    /// 校验规则自身的不变量
    ///
    /// 级别必须构成 1..N 的稠密序列；金额区间必须非空。
    pub fn validate(&self) -> AppResult<()> {
        if self.transaction_type.is_empty() {
            return Err(AppError::validation("transaction_type must not be empty"));
        }
        if self.min_amount < Decimal::ZERO {
            return Err(AppError::validation("min_amount must not be negative"));
        }
        if let Some(max) = self.max_amount {
            if max < self.min_amount {
                return Err(AppError::validation(
                    "max_amount must not be below min_amount",
                ));
            }
        }
        if self.levels.is_empty() {
            return Err(AppError::validation("rule must define at least one level"));
        }
        for (idx, level) in self.levels.iter().enumerate() {
            let expected = (idx + 1) as i32;
            if level.level != expected {
                return Err(AppError::validation(format!(
                    "levels must form a dense 1..N sequence, found {} at position {}",
                    level.level, expected
                )));
            }
            if level.role_code.is_empty() {
                return Err(AppError::validation(format!(
                    "level {} must name a role",
                    level.level
                )));
            }
        }
        Ok(())
    }

    /// 金额是否落入区间（闭区间，上界缺省为无穷）
    pub fn covers_amount(&self, amount: Decimal) -> bool {
        amount >= self.min_amount && self.max_amount.is_none_or(|max| amount <= max)
    }

    /// 部门是否匹配（规则未指定部门时匹配任意部门）
    pub fn covers_department(&self, department: Option<&str>) -> bool {
        match &self.department {
            None => true,
            Some(d) => department == Some(d.as_str()),
        }
    }

    /// 区间宽度，用于挑选最窄匹配；无上界时为 None
    pub fn band_width(&self) -> Option<Decimal> {
        self.max_amount.map(|max| max - self.min_amount)
    }
}

impl Entity for ApprovalMatrixRule {
    type Id = RuleId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl AggregateRoot for ApprovalMatrixRule {
    fn audit_info(&self) -> &AuditInfo {
        &self.audit_info
    }

    fn audit_info_mut(&mut self) -> &mut AuditInfo {
        &mut self.audit_info
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(levels: Vec<ApprovalLevel>) -> ApprovalMatrixRule {
        ApprovalMatrixRule::new(
            "quotation".to_string(),
            None,
            Decimal::ZERO,
            Some(Decimal::new(10_000, 0)),
            levels,
        )
    }

    #[test]
    fn test_validate_dense_levels() {
        let ok = rule(vec![
            ApprovalLevel::by_role(1, "supervisor"),
            ApprovalLevel::by_role(2, "manager"),
        ]);
        assert!(ok.validate().is_ok());

        let gap = rule(vec![
            ApprovalLevel::by_role(1, "supervisor"),
            ApprovalLevel::by_role(3, "manager"),
        ]);
        assert!(gap.validate().is_err());

        let not_one_based = rule(vec![ApprovalLevel::by_role(2, "manager")]);
        assert!(not_one_based.validate().is_err());

        let empty = rule(vec![]);
        assert!(empty.validate().is_err());
    }

    #[test]
    fn test_validate_amount_band() {
        let mut r = rule(vec![ApprovalLevel::by_role(1, "manager")]);
        r.min_amount = Decimal::new(5_000, 0);
        r.max_amount = Some(Decimal::new(1_000, 0));
        assert!(r.validate().is_err());
    }

    #[test]
    fn test_covers_amount_inclusive_bounds() {
        let r = rule(vec![ApprovalLevel::by_role(1, "manager")]);
        assert!(r.covers_amount(Decimal::ZERO));
        assert!(r.covers_amount(Decimal::new(10_000, 0)));
        assert!(!r.covers_amount(Decimal::new(10_001, 0)));
    }

    #[test]
    fn test_unbounded_above() {
        let mut r = rule(vec![ApprovalLevel::by_role(1, "manager")]);
        r.max_amount = None;
        assert!(r.covers_amount(Decimal::new(1_000_000_000, 0)));
        assert_eq!(r.band_width(), None);
    }

    #[test]
    fn test_covers_department() {
        let mut r = rule(vec![ApprovalLevel::by_role(1, "manager")]);
        assert!(r.covers_department(None));
        assert!(r.covers_department(Some("sales")));

        r.department = Some("sales".to_string());
        assert!(r.covers_department(Some("sales")));
        assert!(!r.covers_department(Some("ops")));
        assert!(!r.covers_department(None));
    }
}
