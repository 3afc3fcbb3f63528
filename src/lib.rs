//! # cryoconv - 冷冻电镜元数据格式转换
//!
//! 在 STAR、CTER、CTFFIND、MotionCor2、Unblur、box、MRC 头部与 XML
//! 仪器元数据之间转换。各格式先读为统一的内部表格，再按目标格式写出。
//!
//! ## 依赖关系
//! ```text
//! lib.rs
//!   ├── formats/   (格式适配器, 统一 load / dump)
//!   │     ├── keys/      (STAR 键字典与版本检测)
//!   │     ├── ctf/       (CTF 参数换算)
//!   │     ├── io/        (文本表格读写)
//!   │     └── dispatch.rs(按版本选择实现)
//!   ├── models/    (表格与版本号)
//!   └── error.rs   (错误处理)
//! ```

pub mod ctf;
pub mod dispatch;
pub mod error;
pub mod formats;
pub mod io;
pub mod keys;
pub mod models;

pub use error::{Result, TransformError};
pub use formats::{dump, load, Format, FormatOptions};
pub use keys::KeyRegistry;
pub use models::Table;
