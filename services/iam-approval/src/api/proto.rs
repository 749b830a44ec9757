//! gRPC 生成代码引入

pub mod iam {
    tonic::include_proto!("marlin.iam.v1");
}

pub mod approval {
    tonic::include_proto!("marlin.approval.v1");
}
