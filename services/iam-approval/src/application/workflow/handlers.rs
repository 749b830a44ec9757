//! 审批工作流引擎
//!
//! 状态机按 (当前状态, 请求动作, 调用方) 判定转换。存在匹配路由规则时
//! 按级别顺序推进；无匹配规则时退化为单决策模式（记录日志并在审计行
//! 留下空规则引用）。特权 override 改写终态，并把前一状态写入审计。
//!
//! 并发控制：事务外预读校验，事务内行锁下复核；发现状态或级别指针
//! 漂移即以 Conflict 中止，由调用方重读后重试。

use std::sync::Arc;

use marlin_errors::{AppError, AppResult};
use metrics::counter;
use tracing::{info, warn};

use crate::domain::directory::UserDirectory;
use crate::domain::document::{
    ApprovableDocument, DocumentStatus, DocumentStore, DocumentTypeRegistry,
};
use crate::domain::history::{ApprovalHistory, HistoryAction, HistoryRepository};
use crate::domain::matrix::{ApprovalLevel, MatrixRepository, Resolution, resolve};
use crate::domain::principal::Principal;
use crate::domain::unit_of_work::{UnitOfWork, UnitOfWorkFactory};
use crate::application::authorization::AuthorizationService;

use super::commands::*;

/// 自最近一次提交以来的审批通过次数，即当前级别指针（0 起）
///
/// `entries` 按 action_date 降序。遇到 submitted 或上一轮的终态
/// 决定即停止计数。
pub(crate) fn approvals_since_submission(entries: &[ApprovalHistory]) -> usize {
    let mut count = 0;
    for entry in entries {
        match entry.action {
            HistoryAction::Approved => count += 1,
            _ => break,
        }
    }
    count
}

fn is_level_eligible(principal: &Principal, level: &ApprovalLevel) -> bool {
    match &level.user_id {
        Some(user_id) => *user_id == principal.user_id,
        None => level.role_code == principal.role_code,
    }
}

fn ensure_level_eligible(principal: &Principal, level: &ApprovalLevel) -> AppResult<()> {
    if is_level_eligible(principal, level) {
        Ok(())
    } else {
        Err(AppError::forbidden(format!(
            "Approval level {} is not assigned to the caller",
            level.level
        )))
    }
}

/// 把前一状态并入 override 审计备注，保证轨迹可重建
fn override_comments(supplied: Option<&str>, previous: DocumentStatus) -> String {
    match supplied {
        Some(text) if !text.trim().is_empty() => {
            format!("{} (previous status: {})", text, previous)
        }
        _ => format!("previous status: {}", previous),
    }
}

/// 审批工作流命令处理器
pub struct WorkflowCommandHandler {
    registry: Arc<DocumentTypeRegistry>,
    documents: Arc<dyn DocumentStore>,
    matrix_repo: Arc<dyn MatrixRepository>,
    history: Arc<dyn HistoryRepository>,
    uow_factory: Arc<dyn UnitOfWorkFactory>,
    directory: Arc<dyn UserDirectory>,
    authz: Arc<AuthorizationService>,
    /// 允许 override 的特权角色
    admin_role: String,
}

impl WorkflowCommandHandler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        registry: Arc<DocumentTypeRegistry>,
        documents: Arc<dyn DocumentStore>,
        matrix_repo: Arc<dyn MatrixRepository>,
        history: Arc<dyn HistoryRepository>,
        uow_factory: Arc<dyn UnitOfWorkFactory>,
        directory: Arc<dyn UserDirectory>,
        authz: Arc<AuthorizationService>,
        admin_role: String,
    ) -> Self {
        Self {
            registry,
            documents,
            matrix_repo,
            history,
            uow_factory,
            directory,
            authz,
            admin_role,
        }
    }

    /// 提交单据
    pub async fn handle_submit(&self, cmd: SubmitDocumentCommand) -> AppResult<TransitionOutcome> {
        let doc_type = self.registry.get(&cmd.transaction_type)?;
        self.authz
            .require_capability(&cmd.principal, &doc_type.module_id, "submit")
            .await?;

        let doc = self.load_document(&cmd.transaction_type, cmd.document_id).await?;
        if !doc.is_owned_by(&cmd.principal.user_id) {
            return Err(AppError::forbidden(
                "Only the document author may submit it for approval",
            ));
        }
        if !doc.status.allows_submit() {
            return Err(AppError::invalid_transition(format!(
                "Cannot submit a document in status '{}'",
                doc.status
            )));
        }

        let entry = ApprovalHistory::record(
            cmd.transaction_type.clone(),
            cmd.document_id,
            doc.reference_no.clone(),
            HistoryAction::Submitted,
            None,
            None,
            cmd.principal.user_id,
            self.display_name(&cmd.principal).await?,
            None,
        );

        self.commit_transition(
            &cmd.transaction_type,
            cmd.document_id,
            doc.status,
            None,
            DocumentStatus::PendingApproval,
            None,
            entry,
        )
        .await?;

        counter!("workflow_transitions_total", "action" => "submitted").increment(1);
        info!(
            transaction_type = %cmd.transaction_type,
            document_id = cmd.document_id,
            "document submitted for approval"
        );
        Ok(TransitionOutcome {
            status: DocumentStatus::PendingApproval,
            overridden: false,
        })
    }

    /// 审批通过（含特权 override）
    pub async fn handle_approve(
        &self,
        cmd: ApproveDocumentCommand,
    ) -> AppResult<TransitionOutcome> {
        if cmd.override_requested {
            return self
                .handle_override(
                    &cmd.transaction_type,
                    cmd.document_id,
                    cmd.comments.as_deref(),
                    &cmd.principal,
                    HistoryAction::OverrideApproved,
                    DocumentStatus::Approved,
                )
                .await;
        }

        let doc_type = self.registry.get(&cmd.transaction_type)?;
        self.authz
            .require_capability(&cmd.principal, &doc_type.module_id, "approve")
            .await?;

        let doc = self.load_document(&cmd.transaction_type, cmd.document_id).await?;
        if doc.status != DocumentStatus::PendingApproval {
            return Err(AppError::invalid_transition(format!(
                "Cannot approve a document in status '{}'",
                doc.status
            )));
        }

        let resolution = self.resolve_route(&doc).await?;
        let (new_status, level_no, level_idx, rule_id, mode) = match &resolution {
            Resolution::Route(route) => {
                let entries = self
                    .history
                    .list_for(&cmd.transaction_type, cmd.document_id)
                    .await?;
                let idx = approvals_since_submission(&entries);
                let Some(level) = route.levels.get(idx) else {
                    // 历史已越过路由序列而状态仍为 pending：并发修改
                    return Err(AppError::conflict(
                        "Document history advanced past the routing sequence; retry with fresh state",
                    ));
                };
                ensure_level_eligible(&cmd.principal, level)?;

                let is_final = idx + 1 == route.levels.len();
                let status = if is_final {
                    DocumentStatus::Approved
                } else {
                    DocumentStatus::PendingApproval
                };
                (status, Some(level.level), Some(idx), Some(route.rule_id.0), "matrix")
            }
            Resolution::NotConfigured => {
                self.log_fallback(&doc);
                (DocumentStatus::Approved, None, None, None, "fallback")
            }
        };

        let approved_by = (new_status == DocumentStatus::Approved)
            .then(|| cmd.principal.user_id.to_string());

        let entry = ApprovalHistory::record(
            cmd.transaction_type.clone(),
            cmd.document_id,
            doc.reference_no.clone(),
            HistoryAction::Approved,
            level_no,
            rule_id,
            cmd.principal.user_id,
            self.display_name(&cmd.principal).await?,
            cmd.comments.clone(),
        );

        self.commit_transition(
            &cmd.transaction_type,
            cmd.document_id,
            doc.status,
            level_idx,
            new_status,
            approved_by,
            entry,
        )
        .await?;

        counter!("workflow_transitions_total", "action" => "approved", "mode" => mode)
            .increment(1);
        Ok(TransitionOutcome {
            status: new_status,
            overridden: false,
        })
    }

    /// 审批驳回（含特权 override）
    pub async fn handle_reject(&self, cmd: RejectDocumentCommand) -> AppResult<TransitionOutcome> {
        // 驳回理由先于一切校验：无理由必须在任何状态变更之前失败
        if cmd.comments.trim().is_empty() {
            return Err(AppError::validation("Rejection requires comments"));
        }

        if cmd.override_requested {
            return self
                .handle_override(
                    &cmd.transaction_type,
                    cmd.document_id,
                    Some(cmd.comments.as_str()),
                    &cmd.principal,
                    HistoryAction::OverrideRejected,
                    DocumentStatus::Rejected,
                )
                .await;
        }

        let doc_type = self.registry.get(&cmd.transaction_type)?;
        self.authz
            .require_capability(&cmd.principal, &doc_type.module_id, "reject")
            .await?;

        let doc = self.load_document(&cmd.transaction_type, cmd.document_id).await?;
        if doc.status != DocumentStatus::PendingApproval {
            return Err(AppError::invalid_transition(format!(
                "Cannot reject a document in status '{}'",
                doc.status
            )));
        }

        let resolution = self.resolve_route(&doc).await?;
        let (level_no, rule_id, mode) = match &resolution {
            Resolution::Route(route) => {
                // 任意级别归属者皆可驳回
                if !route.levels.iter().any(|l| is_level_eligible(&cmd.principal, l)) {
                    return Err(AppError::forbidden(
                        "Caller is not assigned to any approval level of this document",
                    ));
                }
                let entries = self
                    .history
                    .list_for(&cmd.transaction_type, cmd.document_id)
                    .await?;
                let idx = approvals_since_submission(&entries);
                (
                    route.levels.get(idx).map(|l| l.level),
                    Some(route.rule_id.0),
                    "matrix",
                )
            }
            Resolution::NotConfigured => {
                self.log_fallback(&doc);
                (None, None, "fallback")
            }
        };

        let entry = ApprovalHistory::record(
            cmd.transaction_type.clone(),
            cmd.document_id,
            doc.reference_no.clone(),
            HistoryAction::Rejected,
            level_no,
            rule_id,
            cmd.principal.user_id,
            self.display_name(&cmd.principal).await?,
            Some(cmd.comments.clone()),
        );

        self.commit_transition(
            &cmd.transaction_type,
            cmd.document_id,
            doc.status,
            None,
            DocumentStatus::Rejected,
            None,
            entry,
        )
        .await?;

        counter!("workflow_transitions_total", "action" => "rejected", "mode" => mode)
            .increment(1);
        Ok(TransitionOutcome {
            status: DocumentStatus::Rejected,
            overridden: false,
        })
    }

    /// 特权改写终态
    ///
    /// 特权检查先于单据加载：非特权调用方得不到任何关于单据状态的信息。
    async fn handle_override(
        &self,
        transaction_type: &str,
        document_id: i64,
        comments: Option<&str>,
        principal: &Principal,
        action: HistoryAction,
        new_status: DocumentStatus,
    ) -> AppResult<TransitionOutcome> {
        self.authz
            .require_any_role(principal, &[self.admin_role.as_str()])?;
        self.registry.get(transaction_type)?;

        let doc = self.load_document(transaction_type, document_id).await?;
        if !doc.status.is_terminal() {
            return Err(AppError::invalid_transition(format!(
                "Override only rewrites a terminal status, document is '{}'",
                doc.status
            )));
        }

        let approved_by = (new_status == DocumentStatus::Approved)
            .then(|| principal.user_id.to_string());

        let entry = ApprovalHistory::record(
            transaction_type.to_string(),
            document_id,
            doc.reference_no.clone(),
            action,
            None,
            None,
            principal.user_id,
            self.display_name(principal).await?,
            Some(override_comments(comments, doc.status)),
        );

        self.commit_transition(
            transaction_type,
            document_id,
            doc.status,
            None,
            new_status,
            approved_by,
            entry,
        )
        .await?;

        counter!("workflow_transitions_total", "action" => action.as_str()).increment(1);
        warn!(
            transaction_type,
            document_id,
            previous_status = %doc.status,
            new_status = %new_status,
            "terminal status overridden"
        );
        Ok(TransitionOutcome {
            status: new_status,
            overridden: true,
        })
    }

    async fn load_document(
        &self,
        transaction_type: &str,
        document_id: i64,
    ) -> AppResult<ApprovableDocument> {
        self.documents
            .find(transaction_type, document_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!(
                    "Document {}/{} not found",
                    transaction_type, document_id
                ))
            })
    }

    async fn resolve_route(&self, doc: &ApprovableDocument) -> AppResult<Resolution> {
        let rules = self
            .matrix_repo
            .list_active_for_type(&doc.transaction_type)
            .await?;
        resolve(
            &rules,
            &doc.transaction_type,
            doc.department.as_deref(),
            doc.amount,
        )
    }

    fn log_fallback(&self, doc: &ApprovableDocument) {
        warn!(
            transaction_type = %doc.transaction_type,
            document_id = doc.id,
            amount = %doc.amount,
            "no approval matrix rule matches; using single-decision mode"
        );
    }

    async fn display_name(&self, principal: &Principal) -> AppResult<String> {
        Ok(self
            .directory
            .display_name(&principal.user_id)
            .await?
            .unwrap_or_else(|| principal.user_id.to_string()))
    }

    /// 事务内提交一次状态转换：行锁下复核预读，写状态，追加一条历史
    #[allow(clippy::too_many_arguments)]
    async fn commit_transition(
        &self,
        transaction_type: &str,
        document_id: i64,
        expected_status: DocumentStatus,
        expected_level_idx: Option<usize>,
        new_status: DocumentStatus,
        approved_by: Option<String>,
        entry: ApprovalHistory,
    ) -> AppResult<()> {
        let uow = self.uow_factory.begin().await?;
        let applied = Self::apply_in_tx(
            &*uow,
            transaction_type,
            document_id,
            expected_status,
            expected_level_idx,
            new_status,
            approved_by.as_deref(),
            &entry,
        )
        .await;

        match applied {
            Ok(()) => uow.commit().await,
            Err(e) => {
                let _ = uow.rollback().await;
                Err(e)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn apply_in_tx(
        uow: &dyn UnitOfWork,
        transaction_type: &str,
        document_id: i64,
        expected_status: DocumentStatus,
        expected_level_idx: Option<usize>,
        new_status: DocumentStatus,
        approved_by: Option<&str>,
        entry: &ApprovalHistory,
    ) -> AppResult<()> {
        let current = uow.documents().lock(transaction_type, document_id).await?;
        if current.status != expected_status {
            return Err(AppError::conflict(
                "Document status changed since read; retry with fresh state",
            ));
        }
        if let Some(idx) = expected_level_idx {
            let entries = uow.history().list_for(transaction_type, document_id).await?;
            if approvals_since_submission(&entries) != idx {
                return Err(AppError::conflict(
                    "Approval level advanced since read; retry with fresh state",
                ));
            }
        }

        uow.documents()
            .set_status(transaction_type, document_id, new_status, approved_by)
            .await?;
        uow.history().append(entry).await?;
        Ok(())
    }
}

/// 工作流查询处理器
pub struct WorkflowQueryHandler {
    registry: Arc<DocumentTypeRegistry>,
    documents: Arc<dyn DocumentStore>,
    history: Arc<dyn HistoryRepository>,
    authz: Arc<AuthorizationService>,
}

impl WorkflowQueryHandler {
    pub fn new(
        registry: Arc<DocumentTypeRegistry>,
        documents: Arc<dyn DocumentStore>,
        history: Arc<dyn HistoryRepository>,
        authz: Arc<AuthorizationService>,
    ) -> Self {
        Self {
            registry,
            documents,
            history,
            authz,
        }
    }

    /// 单据审批历史，最新在前
    pub async fn document_history(
        &self,
        transaction_type: &str,
        document_id: i64,
        principal: &Principal,
    ) -> AppResult<Vec<ApprovalHistory>> {
        let doc_type = self.registry.get(transaction_type)?;
        self.authz
            .require_capability(principal, &doc_type.module_id, "view")
            .await?;

        if self
            .documents
            .find(transaction_type, document_id)
            .await?
            .is_none()
        {
            return Err(AppError::not_found(format!(
                "Document {}/{} not found",
                transaction_type, document_id
            )));
        }

        self.history.list_for(transaction_type, document_id).await
    }
}
