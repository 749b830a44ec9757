//! PostgreSQL 持久化实现

mod document_store;
mod error_mapper;
mod history_repository;
mod matrix_repository;
mod role_permission_repository;
mod role_repository;
mod unit_of_work;
mod user_directory;

pub use document_store::*;
pub use error_mapper::map_sqlx_error;
pub use history_repository::*;
pub use matrix_repository::*;
pub use role_permission_repository::*;
pub use role_repository::*;
pub use unit_of_work::*;
pub use user_directory::*;
