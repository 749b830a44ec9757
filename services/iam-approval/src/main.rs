#![allow(dead_code)]

//! IAM Approval Service - 授权与审批工作流服务入口
//!
//! 负责角色/权限管理、统一鉴权、审批矩阵路由与单据审批状态机。

mod api;
mod application;
mod config;
mod domain;
mod infrastructure;

use std::sync::Arc;

use marlin_adapter_postgres::{PostgresConfig, check_connection, create_pool};
use marlin_config::AppConfig;
use secrecy::ExposeSecret;
use tonic::transport::Server;
use tonic_reflection::server::Builder as ReflectionBuilder;
use tracing::info;

use api::proto::approval::approval_matrix_service_server::ApprovalMatrixServiceServer;
use api::proto::approval::approval_service_server::ApprovalServiceServer;
use api::proto::iam::iam_service_server::IamServiceServer;
use api::grpc::principal_interceptor;
use api::{ApprovalMatrixServiceImpl, ApprovalServiceImpl, IamServiceImpl};
use application::access::{AccessCommandHandler, AccessQueryHandler};
use application::authorization::AuthorizationService;
use application::matrix::{MatrixCommandHandler, MatrixQueryHandler};
use application::workflow::{WorkflowCommandHandler, WorkflowQueryHandler};
use config::AccessConfig;
use domain::directory::UserDirectory;
use domain::document::DocumentStore;
use domain::history::HistoryRepository;
use domain::matrix::MatrixRepository;
use domain::role::{RolePermissionRepository, RoleRepository};
use domain::unit_of_work::UnitOfWorkFactory;
use infrastructure::persistence::{
    PostgresDocumentStore, PostgresHistoryRepository, PostgresMatrixRepository,
    PostgresRolePermissionRepository, PostgresRoleRepository, PostgresUnitOfWorkFactory,
    PostgresUserDirectory,
};

/// 文件描述符集 (用于 gRPC 反射)
pub const FILE_DESCRIPTOR_SET: &[u8] =
    tonic::include_file_descriptor_set!("iam_approval_descriptor");

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load("config")?;
    if config.is_production() {
        marlin_telemetry::init_tracing_json(&config.telemetry.log_level);
    } else {
        marlin_telemetry::init_tracing(&config.telemetry.log_level);
    }
    let _metrics_handle = marlin_telemetry::init_metrics();

    info!(app_name = %config.app_name, env = %config.app_env, "starting service");

    let access_config = AccessConfig::load("config")?;
    let catalog = Arc::new(access_config.catalog());
    let registry = Arc::new(access_config.registry()?);
    if catalog.is_empty() {
        info!("permission catalog is empty; every replace request will be rejected");
    }

    // 数据库
    let pg_config = PostgresConfig::new(config.database.url.expose_secret())
        .with_max_connections(config.database.max_connections);
    let pool = create_pool(&pg_config).await?;
    check_connection(&pool).await?;
    info!("database connection established");

    // 仓储
    let role_repo: Arc<dyn RoleRepository> = Arc::new(PostgresRoleRepository::new(pool.clone()));
    let role_permission_repo: Arc<dyn RolePermissionRepository> =
        Arc::new(PostgresRolePermissionRepository::new(pool.clone()));
    let matrix_repo: Arc<dyn MatrixRepository> =
        Arc::new(PostgresMatrixRepository::new(pool.clone()));
    let history_repo: Arc<dyn HistoryRepository> =
        Arc::new(PostgresHistoryRepository::new(pool.clone()));
    let documents: Arc<dyn DocumentStore> =
        Arc::new(PostgresDocumentStore::new(pool.clone(), registry.clone()));
    let directory: Arc<dyn UserDirectory> = Arc::new(PostgresUserDirectory::new(pool.clone()));
    let uow_factory: Arc<dyn UnitOfWorkFactory> =
        Arc::new(PostgresUnitOfWorkFactory::new(pool.clone(), registry.clone()));

    // 应用服务
    let authz = Arc::new(AuthorizationService::new(
        role_repo.clone(),
        role_permission_repo.clone(),
    ));
    let admin_role = access_config.admin_role.clone();

    let iam_service = IamServiceImpl::new(
        AccessCommandHandler::new(
            role_repo.clone(),
            role_permission_repo.clone(),
            catalog.clone(),
        ),
        AccessQueryHandler::new(role_repo.clone(), role_permission_repo.clone()),
        authz.clone(),
        admin_role.clone(),
    );

    let workflow = Arc::new(WorkflowCommandHandler::new(
        registry.clone(),
        documents.clone(),
        matrix_repo.clone(),
        history_repo.clone(),
        uow_factory,
        directory,
        authz.clone(),
        admin_role.clone(),
    ));
    let approval_service = ApprovalServiceImpl::new(
        workflow,
        WorkflowQueryHandler::new(
            registry.clone(),
            documents.clone(),
            history_repo.clone(),
            authz.clone(),
        ),
    );

    let matrix_service = ApprovalMatrixServiceImpl::new(
        MatrixCommandHandler::new(matrix_repo.clone()),
        MatrixQueryHandler::new(matrix_repo.clone()),
        authz.clone(),
        admin_role,
    );

    let reflection_service = ReflectionBuilder::configure()
        .register_encoded_file_descriptor_set(FILE_DESCRIPTOR_SET)
        .build_v1()?;

    let addr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!(%addr, "gRPC server listening");

    Server::builder()
        .add_service(IamServiceServer::with_interceptor(
            iam_service,
            principal_interceptor,
        ))
        .add_service(ApprovalServiceServer::with_interceptor(
            approval_service,
            principal_interceptor,
        ))
        .add_service(ApprovalMatrixServiceServer::with_interceptor(
            matrix_service,
            principal_interceptor,
        ))
        .add_service(reflection_service)
        .serve_with_shutdown(addr, shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}
