//! 审批矩阵命令

use marlin_common::UserId;
use rust_decimal::Decimal;

use crate::domain::matrix::ApprovalLevel;

/// 创建路由规则
#[derive(Debug, Clone)]
pub struct CreateRuleCommand {
    pub transaction_type: String,
    pub department: Option<String>,
    pub min_amount: Decimal,
    pub max_amount: Option<Decimal>,
    pub is_active: bool,
    pub levels: Vec<ApprovalLevel>,
    pub performed_by: Option<UserId>,
}

/// 更新路由规则（级别列表整体替换）
#[derive(Debug, Clone)]
pub struct UpdateRuleCommand {
    pub id: String,
    pub transaction_type: String,
    pub department: Option<String>,
    pub min_amount: Decimal,
    pub max_amount: Option<Decimal>,
    pub is_active: bool,
    pub levels: Vec<ApprovalLevel>,
    pub performed_by: Option<UserId>,
}

/// 删除路由规则
#[derive(Debug, Clone)]
pub struct DeleteRuleCommand {
    pub id: String,
}
