//! proto <-> 领域类型转换

use chrono::{DateTime, Utc};
use marlin_common::UserId;
use marlin_errors::AppError;
use rust_decimal::Decimal;
use std::str::FromStr;
use tonic::{Request, Status};

use crate::api::proto::approval as approval_proto;
use crate::api::proto::iam as iam_proto;
use crate::domain::document::DocumentStatus;
use crate::domain::history::{ApprovalHistory, HistoryAction};
use crate::domain::matrix::{ApprovalLevel, ApprovalMatrixRule};
use crate::domain::principal::Principal;
use crate::domain::role::{PermissionGrant, PermissionSet, Role};

/// 从请求扩展取出主体；缺失即 Unauthenticated
pub fn require_principal<T>(req: &Request<T>) -> Result<Principal, Status> {
    req.extensions()
        .get::<Principal>()
        .cloned()
        .ok_or_else(|| AppError::unauthenticated("No principal attached to request").into())
}

pub fn timestamp(dt: DateTime<Utc>) -> prost_types::Timestamp {
    prost_types::Timestamp {
        seconds: dt.timestamp(),
        nanos: dt.timestamp_subsec_nanos() as i32,
    }
}

// ============ IAM ============

pub fn role_to_proto(role: &Role) -> iam_proto::Role {
    iam_proto::Role {
        id: role.id.to_string(),
        code: role.code.clone(),
        name: role.name.clone(),
        description: role.description.clone().unwrap_or_default(),
        is_active: role.is_active,
        created_at: Some(timestamp(role.audit_info.created_at)),
        updated_at: Some(timestamp(role.audit_info.updated_at)),
    }
}

pub fn permission_set_to_proto(
    set: &PermissionSet,
) -> std::collections::HashMap<String, iam_proto::ActionSet> {
    set.iter()
        .map(|(module, actions)| {
            (
                module.clone(),
                iam_proto::ActionSet {
                    actions: actions.iter().cloned().collect(),
                },
            )
        })
        .collect()
}

/// 归一化替换载荷：映射形式与列表形式取并集
pub fn grants_from_payload(
    modules: &std::collections::HashMap<String, iam_proto::ActionSet>,
    grants: &[iam_proto::PermissionGrant],
) -> Vec<PermissionGrant> {
    let mut set = PermissionSet::new();
    for (module, actions) in modules {
        for action in &actions.actions {
            set.insert(PermissionGrant::new(module.clone(), action.clone()));
        }
    }
    for grant in grants {
        set.insert(PermissionGrant::new(
            grant.module_id.clone(),
            grant.action.clone(),
        ));
    }
    set.grants()
}

// ============ 审批 ============

pub fn status_to_proto(status: DocumentStatus) -> approval_proto::DocumentStatus {
    match status {
        DocumentStatus::Draft => approval_proto::DocumentStatus::Draft,
        DocumentStatus::PendingApproval => approval_proto::DocumentStatus::PendingApproval,
        DocumentStatus::Approved => approval_proto::DocumentStatus::Approved,
        DocumentStatus::Rejected => approval_proto::DocumentStatus::Rejected,
        DocumentStatus::ClientReview => approval_proto::DocumentStatus::ClientReview,
    }
}

pub fn action_to_proto(action: HistoryAction) -> approval_proto::HistoryAction {
    match action {
        HistoryAction::Submitted => approval_proto::HistoryAction::Submitted,
        HistoryAction::Approved => approval_proto::HistoryAction::Approved,
        HistoryAction::Rejected => approval_proto::HistoryAction::Rejected,
        HistoryAction::OverrideApproved => approval_proto::HistoryAction::OverrideApproved,
        HistoryAction::OverrideRejected => approval_proto::HistoryAction::OverrideRejected,
    }
}

pub fn history_to_proto(entry: &ApprovalHistory) -> approval_proto::HistoryEntry {
    approval_proto::HistoryEntry {
        id: entry.id.to_string(),
        transaction_type: entry.transaction_type.clone(),
        transaction_id: entry.transaction_id,
        reference_no: entry.reference_no.clone(),
        action: action_to_proto(entry.action) as i32,
        level: entry.level,
        rule_id: entry.rule_id.map(|id| id.to_string()),
        action_by: entry.action_by.to_string(),
        action_by_name: entry.action_by_name.clone(),
        action_date: Some(timestamp(entry.action_date)),
        comments: entry.comments.clone(),
    }
}

// ============ 审批矩阵 ============

pub fn parse_amount(raw: &str, field: &str) -> Result<Decimal, Status> {
    Decimal::from_str(raw)
        .map_err(|_| AppError::validation(format!("Invalid decimal for {}: '{}'", field, raw)).into())
}

pub fn level_from_proto(level: &approval_proto::ApprovalLevel) -> Result<ApprovalLevel, Status> {
    let user_id = match &level.user_id {
        Some(raw) => Some(
            UserId::from_str(raw)
                .map_err(|_| Status::from(AppError::validation("Invalid level user ID")))?,
        ),
        None => None,
    };

    Ok(ApprovalLevel {
        level: level.level,
        role_code: level.role_code.clone(),
        user_id,
        required: level.required,
        can_delegate: level.can_delegate,
    })
}

pub fn level_to_proto(level: &ApprovalLevel) -> approval_proto::ApprovalLevel {
    approval_proto::ApprovalLevel {
        level: level.level,
        role_code: level.role_code.clone(),
        user_id: level.user_id.map(|u| u.to_string()),
        required: level.required,
        can_delegate: level.can_delegate,
    }
}

pub fn rule_to_proto(rule: &ApprovalMatrixRule) -> approval_proto::MatrixRule {
    approval_proto::MatrixRule {
        id: rule.id.to_string(),
        transaction_type: rule.transaction_type.clone(),
        department: rule.department.clone(),
        min_amount: rule.min_amount.to_string(),
        max_amount: rule.max_amount.map(|m| m.to_string()),
        is_active: rule.is_active,
        levels: rule.levels.iter().map(level_to_proto).collect(),
        created_at: Some(timestamp(rule.audit_info.created_at)),
        updated_at: Some(timestamp(rule.audit_info.updated_at)),
    }
}
