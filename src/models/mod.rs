//! # 数据模型模块
//!
//! 定义统一的表格和版本号数据模型。
//!
//! ## 依赖关系
//! - 被 `io/`, `formats/`, `ctf/`, `dispatch.rs` 使用
//! - 子模块: table, version

pub mod table;
pub mod version;

pub use table::{Column, ColumnData, DType, Table, Value};
pub use version::Version;
