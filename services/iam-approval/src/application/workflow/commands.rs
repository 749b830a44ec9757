//! 工作流命令

use crate::domain::document::DocumentStatus;
use crate::domain::principal::Principal;

/// 提交单据进入审批流
#[derive(Debug, Clone)]
pub struct SubmitDocumentCommand {
    pub transaction_type: String,
    pub document_id: i64,
    pub principal: Principal,
}

/// 审批通过
#[derive(Debug, Clone)]
pub struct ApproveDocumentCommand {
    pub transaction_type: String,
    pub document_id: i64,
    pub comments: Option<String>,
    /// 特权改写终态；非特权角色请求时直接拒绝
    pub override_requested: bool,
    pub principal: Principal,
}

/// 审批驳回（必须附理由）
#[derive(Debug, Clone)]
pub struct RejectDocumentCommand {
    pub transaction_type: String,
    pub document_id: i64,
    pub comments: String,
    pub override_requested: bool,
    pub principal: Principal,
}

/// 转换结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionOutcome {
    pub status: DocumentStatus,
    pub overridden: bool,
}
