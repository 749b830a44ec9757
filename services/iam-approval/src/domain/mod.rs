//! 领域层

pub mod directory;
pub mod document;
pub mod history;
pub mod matrix;
pub mod principal;
pub mod role;
pub mod unit_of_work;
