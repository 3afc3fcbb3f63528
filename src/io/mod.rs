//! # 文件读写模块
//!
//! 分隔符文本表格的底层读写，供各格式适配器复用。
//!
//! ## 依赖关系
//! - 被 `formats/` 使用
//! - 子模块: tabular

pub mod tabular;

pub use tabular::{create_header, dump_file, load_file, LoadOptions};
