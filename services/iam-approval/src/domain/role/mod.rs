//! 角色与权限领域模型

mod catalog;
mod grant;
mod repository;
mod role;

pub use catalog::*;
pub use grant::*;
pub use repository::*;
pub use role::*;
