//! 单据快照
//!
//! 单据本体由各业务服务持有，这里只读取审批所需的字段。

use marlin_common::UserId;
use rust_decimal::Decimal;

use super::DocumentStatus;

/// 可审批单据快照
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovableDocument {
    pub id: i64,
    pub transaction_type: String,
    pub reference_no: String,
    pub department: Option<String>,
    pub amount: Decimal,
    pub status: DocumentStatus,
    pub created_by: Option<UserId>,
    pub approved_by: Option<String>,
}

impl ApprovableDocument {
    /// 提交守卫：只有单据作者可以提交
    pub fn is_owned_by(&self, user_id: &UserId) -> bool {
        self.created_by.as_ref() == Some(user_id)
    }
}
