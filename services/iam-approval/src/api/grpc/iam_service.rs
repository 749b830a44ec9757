//! IAM gRPC 服务实现

use std::sync::Arc;

use marlin_common::Pagination;
use tonic::{Request, Response, Status};

use crate::api::proto::iam::{
    CreateRoleRequest, CreateRoleResponse, DeleteRoleRequest, DeleteRoleResponse,
    GetRolePermissionsRequest, GetRolePermissionsResponse, ListPermissionCatalogRequest,
    ListPermissionCatalogResponse, ListRolesRequest, ListRolesResponse,
    PermissionGrant as ProtoPermissionGrant, ReplaceRolePermissionsRequest,
    ReplaceRolePermissionsResponse, SetRoleActiveRequest, SetRoleActiveResponse,
    UpdateRoleRequest, UpdateRoleResponse, iam_service_server::IamService,
};
use crate::application::access::{
    AccessCommandHandler, AccessQueryHandler, CreateRoleCommand, DeleteRoleCommand,
    ReplacePermissionsCommand, SetRoleActiveCommand, UpdateRoleCommand,
};
use crate::application::authorization::AuthorizationService;

use super::conversions::{
    grants_from_payload, permission_set_to_proto, require_principal, role_to_proto,
};

fn pagination(page: u32, page_size: u32) -> Pagination {
    Pagination {
        page: page.max(1),
        page_size: if page_size == 0 { 20 } else { page_size },
    }
}

/// IAM gRPC 服务
pub struct IamServiceImpl {
    commands: AccessCommandHandler,
    queries: AccessQueryHandler,
    authz: Arc<AuthorizationService>,
    admin_role: String,
}

impl IamServiceImpl {
    pub fn new(
        commands: AccessCommandHandler,
        queries: AccessQueryHandler,
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

    fn require_admin<T>(&self, req: &Request<T>) -> Result<crate::domain::principal::Principal, Status> {
        let principal = require_principal(req)?;
        self.authz
            .require_any_role(&principal, &[self.admin_role.as_str()])?;
        Ok(principal)
    }
}

#[tonic::async_trait]
impl IamService for IamServiceImpl {
    async fn create_role(
        &self,
        request: Request<CreateRoleRequest>,
    ) -> Result<Response<CreateRoleResponse>, Status> {
        let principal = self.require_admin(&request)?;
        let req = request.into_inner();

        let role = self
            .commands
            .handle_create(CreateRoleCommand {
                code: req.code,
                name: req.name,
                description: req.description,
                performed_by: Some(principal.user_id),
            })
            .await?;

        Ok(Response::new(CreateRoleResponse {
            role: Some(role_to_proto(&role)),
        }))
    }

    async fn update_role(
        &self,
        request: Request<UpdateRoleRequest>,
    ) -> Result<Response<UpdateRoleResponse>, Status> {
        let principal = self.require_admin(&request)?;
        let req = request.into_inner();

        let role = self
            .commands
            .handle_update(UpdateRoleCommand {
                code: req.code,
                name: req.name,
                description: req.description,
                performed_by: Some(principal.user_id),
            })
            .await?;

        Ok(Response::new(UpdateRoleResponse {
            role: Some(role_to_proto(&role)),
        }))
    }

    async fn set_role_active(
        &self,
        request: Request<SetRoleActiveRequest>,
    ) -> Result<Response<SetRoleActiveResponse>, Status> {
        let principal = self.require_admin(&request)?;
        let req = request.into_inner();

        let role = self
            .commands
            .handle_set_active(SetRoleActiveCommand {
                code: req.code,
                active: req.active,
                performed_by: Some(principal.user_id),
            })
            .await?;

        Ok(Response::new(SetRoleActiveResponse {
            role: Some(role_to_proto(&role)),
        }))
    }

    async fn delete_role(
        &self,
        request: Request<DeleteRoleRequest>,
    ) -> Result<Response<DeleteRoleResponse>, Status> {
        self.require_admin(&request)?;
        let req = request.into_inner();

        self.commands
            .handle_delete(DeleteRoleCommand { code: req.code })
            .await?;

        Ok(Response::new(DeleteRoleResponse {}))
    }

    async fn list_roles(
        &self,
        request: Request<ListRolesRequest>,
    ) -> Result<Response<ListRolesResponse>, Status> {
        require_principal(&request)?;
        let req = request.into_inner();

        let page = self
            .queries
            .list_roles(pagination(req.page, req.page_size))
            .await?;

        Ok(Response::new(ListRolesResponse {
            roles: page.items.iter().map(role_to_proto).collect(),
            total: page.total as i64,
        }))
    }

    async fn get_role_permissions(
        &self,
        request: Request<GetRolePermissionsRequest>,
    ) -> Result<Response<GetRolePermissionsResponse>, Status> {
        require_principal(&request)?;
        let req = request.into_inner();

        let set = self.queries.get_permissions(&req.role_code).await?;

        Ok(Response::new(GetRolePermissionsResponse {
            modules: permission_set_to_proto(&set),
        }))
    }

    async fn replace_role_permissions(
        &self,
        request: Request<ReplaceRolePermissionsRequest>,
    ) -> Result<Response<ReplaceRolePermissionsResponse>, Status> {
        self.require_admin(&request)?;
        let req = request.into_inner();

        let grants = grants_from_payload(&req.modules, &req.grants);
        let set = self
            .commands
            .handle_replace_permissions(ReplacePermissionsCommand {
                role_code: req.role_code,
                grants,
            })
            .await?;

        Ok(Response::new(ReplaceRolePermissionsResponse {
            modules: permission_set_to_proto(&set),
        }))
    }

    async fn list_permission_catalog(
        &self,
        request: Request<ListPermissionCatalogRequest>,
    ) -> Result<Response<ListPermissionCatalogResponse>, Status> {
        require_principal(&request)?;

        let pairs = self.queries.list_granted_catalog().await?;

        Ok(Response::new(ListPermissionCatalogResponse {
            grants: pairs
                .into_iter()
                .map(|g| ProtoPermissionGrant {
                    module_id: g.module_id,
                    action: g.action,
                })
                .collect(),
        }))
    }
}
