//! gRPC 服务实现

mod approval_service;
mod conversions;
mod iam_service;
mod interceptor;
mod matrix_service;

pub use approval_service::ApprovalServiceImpl;
pub use iam_service::IamServiceImpl;
pub use interceptor::{principal_interceptor, TraceInfo};
pub use matrix_service::ApprovalMatrixServiceImpl;
