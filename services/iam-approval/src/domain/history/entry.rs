//! 审批历史条目
//!
//! 历史只追加、不修改、不删除，是"谁在何时做了什么决定"的唯一事实来源。

use chrono::{DateTime, Utc};
use marlin_common::UserId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 历史动作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    Submitted,
    Approved,
    Rejected,
    OverrideApproved,
    OverrideRejected,
}

impl HistoryAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::OverrideApproved => "override_approved",
            Self::OverrideRejected => "override_rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "submitted" => Some(Self::Submitted),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            "override_approved" => Some(Self::OverrideApproved),
            "override_rejected" => Some(Self::OverrideRejected),
            _ => None,
        }
    }

    pub fn is_override(&self) -> bool {
        matches!(self, Self::OverrideApproved | Self::OverrideRejected)
    }
}

impl std::fmt::Display for HistoryAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 审批历史条目
///
/// `rule_id` 为空表示该决定发生在单决策回退模式下（无匹配路由规则）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalHistory {
    pub id: Uuid,
    pub transaction_type: String,
    pub transaction_id: i64,
    pub reference_no: String,
    pub action: HistoryAction,
    pub level: Option<i32>,
    pub rule_id: Option<Uuid>,
    pub action_by: UserId,
    pub action_by_name: String,
    pub action_date: DateTime<Utc>,
    pub comments: Option<String>,
}

impl ApprovalHistory {
    #[allow(clippy::too_many_arguments)]
    pub fn record(
        transaction_type: impl Into<String>,
        transaction_id: i64,
        reference_no: impl Into<String>,
        action: HistoryAction,
        level: Option<i32>,
        rule_id: Option<Uuid>,
        action_by: UserId,
        action_by_name: impl Into<String>,
        comments: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            transaction_type: transaction_type.into(),
            transaction_id,
            reference_no: reference_no.into(),
            action,
            level,
            rule_id,
            action_by,
            action_by_name: action_by_name.into(),
            action_date: Utc::now(),
            comments,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_parse_roundtrip() {
        for a in [
            HistoryAction::Submitted,
            HistoryAction::Approved,
            HistoryAction::Rejected,
            HistoryAction::OverrideApproved,
            HistoryAction::OverrideRejected,
        ] {
            assert_eq!(HistoryAction::parse(a.as_str()), Some(a));
        }
        assert_eq!(HistoryAction::parse("escalated"), None);
    }

    #[test]
    fn test_override_detection() {
        assert!(HistoryAction::OverrideApproved.is_override());
        assert!(HistoryAction::OverrideRejected.is_override());
        assert!(!HistoryAction::Approved.is_override());
        assert!(!HistoryAction::Submitted.is_override());
    }
}
