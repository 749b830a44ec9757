//! gRPC 拦截器
//!
//! 从请求元数据中提取追踪 ID 与已解析的主体（`x-user-id` / `x-user-role`，
//! 由网关在凭据校验后注入），放入请求扩展。主体缺失不在这里拒绝，
//! 是否要求认证由各操作自行声明。

use std::str::FromStr;

use marlin_common::UserId;
use tonic::{Request, Status};
use uuid::Uuid;

use crate::domain::principal::Principal;

/// 追踪信息
#[derive(Debug, Clone)]
pub struct TraceInfo {
    pub trace_id: String,
}

/// 拦截器：提取追踪 ID 与主体
pub fn principal_interceptor(mut req: Request<()>) -> Result<Request<()>, Status> {
    let metadata = req.metadata();

    let trace_id = metadata
        .get("x-trace-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| {
            metadata
                .get("x-request-id")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        })
        .unwrap_or_else(|| Uuid::now_v7().to_string());

    let principal = extract_principal(&req);

    req.extensions_mut().insert(TraceInfo { trace_id });
    if let Some(principal) = principal {
        req.extensions_mut().insert(principal);
    }

    Ok(req)
}

fn extract_principal(req: &Request<()>) -> Option<Principal> {
    let metadata = req.metadata();

    let user_id = metadata
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| UserId::from_str(s).ok())?;
    let role_code = metadata
        .get("x-user-role")
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())?;

    Some(Principal::new(user_id, role_code))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_with(headers: &[(&'static str, String)]) -> Request<()> {
        let mut req = Request::new(());
        for (key, value) in headers {
            req.metadata_mut().insert(*key, value.parse().unwrap());
        }
        req
    }

    #[test]
    fn test_principal_extracted_from_metadata() {
        let user_id = Uuid::now_v7();
        let req = request_with(&[
            ("x-user-id", user_id.to_string()),
            ("x-user-role", "ops_manager".to_string()),
        ]);

        let req = principal_interceptor(req).unwrap();
        let principal = req.extensions().get::<Principal>().unwrap();
        assert_eq!(principal.user_id.0, user_id);
        assert_eq!(principal.role_code, "ops_manager");
    }

    #[test]
    fn test_missing_or_malformed_principal_is_absent() {
        let req = principal_interceptor(Request::new(())).unwrap();
        assert!(req.extensions().get::<Principal>().is_none());

        let req = request_with(&[
            ("x-user-id", "not-a-uuid".to_string()),
            ("x-user-role", "ops".to_string()),
        ]);
        let req = principal_interceptor(req).unwrap();
        assert!(req.extensions().get::<Principal>().is_none());
    }

    #[test]
    fn test_trace_id_generated_when_absent() {
        let req = principal_interceptor(Request::new(())).unwrap();
        let trace = req.extensions().get::<TraceInfo>().unwrap();
        assert!(!trace.trace_id.is_empty());
    }
}
