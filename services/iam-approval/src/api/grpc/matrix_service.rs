//! 审批矩阵 gRPC 服务实现

use std::sync::Arc;

use marlin_common::Pagination;
use tonic::{Request, Response, Status};

use crate::api::proto::approval::{
    CreateRuleRequest, CreateRuleResponse, DeleteRuleRequest, DeleteRuleResponse, GetRuleRequest,
    GetRuleResponse, ListRulesRequest, ListRulesResponse, UpdateRuleRequest, UpdateRuleResponse,
    approval_matrix_service_server::ApprovalMatrixService,
};
use crate::application::authorization::AuthorizationService;
use crate::application::matrix::{
    CreateRuleCommand, DeleteRuleCommand, MatrixCommandHandler, MatrixQueryHandler,
    UpdateRuleCommand,
};

use super::conversions::{level_from_proto, parse_amount, require_principal, rule_to_proto};

/// 审批矩阵 gRPC 服务
pub struct ApprovalMatrixServiceImpl {
    commands: MatrixCommandHandler,
    queries: MatrixQueryHandler,
    authz: Arc<AuthorizationService>,
    admin_role: String,
}

impl ApprovalMatrixServiceImpl {
    pub fn new(
        commands: MatrixCommandHandler,
        queries: MatrixQueryHandler,
        authz: Arc<AuthorizationService>,
        admin_role: String,
    ) -> Self {
        Self {
            commands,
            queries,
            authz,
            admin_role,
        }
    }

    fn require_admin<T>(
        &self,
        req: &Request<T>,
    ) -> Result<crate::domain::principal::Principal, Status> {
        let principal = require_principal(req)?;
        self.authz
            .require_any_role(&principal, &[self.admin_role.as_str()])?;
        Ok(principal)
    }
}

#[tonic::async_trait]
impl ApprovalMatrixService for ApprovalMatrixServiceImpl {
    async fn create_rule(
        &self,
        request: Request<CreateRuleRequest>,
    ) -> Result<Response<CreateRuleResponse>, Status> {
        let principal = self.require_admin(&request)?;
        let req = request.into_inner();

        let levels = req
            .levels
            .iter()
            .map(level_from_proto)
            .collect::<Result<Vec<_>, _>>()?;
        let min_amount = parse_amount(&req.min_amount, "min_amount")?;
        let max_amount = req
            .max_amount
            .as_deref()
            .map(|raw| parse_amount(raw, "max_amount"))
            .transpose()?;

        let rule = self
            .commands
            .handle_create(CreateRuleCommand {
                transaction_type: req.transaction_type,
                department: req.department,
                min_amount,
                max_amount,
                is_active: req.is_active,
                levels,
                performed_by: Some(principal.user_id),
            })
            .await?;

        Ok(Response::new(CreateRuleResponse {
            rule: Some(rule_to_proto(&rule)),
        }))
    }

    async fn update_rule(
        &self,
        request: Request<UpdateRuleRequest>,
    ) -> Result<Response<UpdateRuleResponse>, Status> {
        let principal = self.require_admin(&request)?;
        let req = request.into_inner();

        let levels = req
            .levels
            .iter()
            .map(level_from_proto)
            .collect::<Result<Vec<_>, _>>()?;
        let min_amount = parse_amount(&req.min_amount, "min_amount")?;
        let max_amount = req
            .max_amount
            .as_deref()
            .map(|raw| parse_amount(raw, "max_amount"))
            .transpose()?;

        let rule = self
            .commands
            .handle_update(UpdateRuleCommand {
                id: req.id,
                transaction_type: req.transaction_type,
                department: req.department,
                min_amount,
                max_amount,
                is_active: req.is_active,
                levels,
                performed_by: Some(principal.user_id),
            })
            .await?;

        Ok(Response::new(UpdateRuleResponse {
            rule: Some(rule_to_proto(&rule)),
        }))
    }

    async fn delete_rule(
        &self,
        request: Request<DeleteRuleRequest>,
    ) -> Result<Response<DeleteRuleResponse>, Status> {
        self.require_admin(&request)?;
        let req = request.into_inner();

        self.commands
            .handle_delete(DeleteRuleCommand { id: req.id })
            .await?;

        Ok(Response::new(DeleteRuleResponse {}))
    }

    async fn get_rule(
        &self,
        request: Request<GetRuleRequest>,
    ) -> Result<Response<GetRuleResponse>, Status> {
        require_principal(&request)?;
        let req = request.into_inner();

        let rule = self.queries.get_rule(&req.id).await?;

        Ok(Response::new(GetRuleResponse {
            rule: Some(rule_to_proto(&rule)),
        }))
    }

    async fn list_rules(
        &self,
        request: Request<ListRulesRequest>,
    ) -> Result<Response<ListRulesResponse>, Status> {
        require_principal(&request)?;
        let req = request.into_inner();

        let page = self
            .queries
            .list_rules(Pagination {
                page: req.page.max(1),
                page_size: if req.page_size == 0 { 20 } else { req.page_size },
            })
            .await?;

        Ok(Response::new(ListRulesResponse {
            rules: page.items.iter().map(rule_to_proto).collect(),
            total: page.total as i64,
        }))
    }
}
