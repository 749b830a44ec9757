//! 审批工作流 gRPC 服务实现

use std::sync::Arc;

use tonic::{Request, Response, Status};

use crate::api::proto::approval::{
    ApproveDocumentRequest, ApproveDocumentResponse, GetDocumentHistoryRequest,
    GetDocumentHistoryResponse, RejectDocumentRequest, RejectDocumentResponse,
    SubmitDocumentRequest, SubmitDocumentResponse, approval_service_server::ApprovalService,
};
use crate::application::workflow::{
    ApproveDocumentCommand, RejectDocumentCommand, SubmitDocumentCommand, WorkflowCommandHandler,
    WorkflowQueryHandler,
};

use super::conversions::{history_to_proto, require_principal, status_to_proto};

/// 审批工作流 gRPC 服务
pub struct ApprovalServiceImpl {
    workflow: Arc<WorkflowCommandHandler>,
    queries: WorkflowQueryHandler,
}

impl ApprovalServiceImpl {
    pub fn new(workflow: Arc<WorkflowCommandHandler>, queries: WorkflowQueryHandler) -> Self {
        Self { workflow, queries }
    }
}

#[tonic::async_trait]
impl ApprovalService for ApprovalServiceImpl {
    async fn submit_document(
        &self,
        request: Request<SubmitDocumentRequest>,
    ) -> Result<Response<SubmitDocumentResponse>, Status> {
        let principal = require_principal(&request)?;
        let req = request.into_inner();

        let outcome = self
            .workflow
            .handle_submit(SubmitDocumentCommand {
                transaction_type: req.transaction_type,
                document_id: req.document_id,
                principal,
            })
            .await?;

        Ok(Response::new(SubmitDocumentResponse {
            status: status_to_proto(outcome.status) as i32,
        }))
    }

    async fn approve_document(
        &self,
        request: Request<ApproveDocumentRequest>,
    ) -> Result<Response<ApproveDocumentResponse>, Status> {
        let principal = require_principal(&request)?;
        let req = request.into_inner();

        let outcome = self
            .workflow
            .handle_approve(ApproveDocumentCommand {
                transaction_type: req.transaction_type,
                document_id: req.document_id,
                comments: req.comments,
                override_requested: req.r#override,
                principal,
            })
            .await?;

        Ok(Response::new(ApproveDocumentResponse {
            status: status_to_proto(outcome.status) as i32,
            overridden: outcome.overridden,
        }))
    }

    async fn reject_document(
        &self,
        request: Request<RejectDocumentRequest>,
    ) -> Result<Response<RejectDocumentResponse>, Status> {
        let principal = require_principal(&request)?;
        let req = request.into_inner();

        let outcome = self
            .workflow
            .handle_reject(RejectDocumentCommand {
                transaction_type: req.transaction_type,
                document_id: req.document_id,
                comments: req.comments,
                override_requested: req.r#override,
                principal,
            })
            .await?;

        Ok(Response::new(RejectDocumentResponse {
            status: status_to_proto(outcome.status) as i32,
            overridden: outcome.overridden,
        }))
    }

    async fn get_document_history(
        &self,
        request: Request<GetDocumentHistoryRequest>,
    ) -> Result<Response<GetDocumentHistoryResponse>, Status> {
        let principal = require_principal(&request)?;
        let req = request.into_inner();

        let entries = self
            .queries
            .document_history(&req.transaction_type, req.document_id, &principal)
            .await?;

        Ok(Response::new(GetDocumentHistoryResponse {
            entries: entries.iter().map(history_to_proto).collect(),
        }))
    }
}
