//! API 层

pub mod grpc;
pub mod proto;

pub use grpc::{ApprovalMatrixServiceImpl, ApprovalServiceImpl, IamServiceImpl};
