//! # 统一错误处理模块
//!
//! 定义 cryoconv 的所有错误类型，使用 `thiserror` 派生。
//! 所有错误都是致命的：发现错误的操作直接返回给调用者，不降级为警告。
//!
//! ## 依赖关系
//! - 被所有其他模块使用
//! - 无外部模块依赖

use thiserror::Error;

/// cryoconv 统一错误类型
#[derive(Error, Debug)]
pub enum TransformError {
    // ─────────────────────────────────────────────────────────────
    // I/O 错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to read file: {path}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}")]
    FileWriteError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: String },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    // ─────────────────────────────────────────────────────────────
    // 输入格式错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to parse {format} file: {path}\nReason: {reason}")]
    ParseError {
        format: String,
        path: String,
        reason: String,
    },

    #[error("Cannot write empty data to {path}")]
    EmptyData { path: String },

    #[error("Cannot create header from empty sequence")]
    EmptyHeader,

    #[error("No header information found in {path}")]
    NoHeader { path: String },

    #[error("Key definition '{key}' is not allowed to contain whitespace")]
    InvalidKeyToken { key: String },

    #[error("Line {line} of {path} has {found} columns, expected {expected}")]
    ColumnCount {
        path: String,
        line: usize,
        expected: usize,
        found: usize,
    },

    // ─────────────────────────────────────────────────────────────
    // 模式解析错误
    // ─────────────────────────────────────────────────────────────
    #[error("Star key not known in present versions: {key}")]
    UnknownKey { key: String },

    #[error("No single schema version explains all header keys: {}", keys.join(", "))]
    NoCommonVersion { keys: Vec<String> },

    #[error("Exporting to version '{version}' drops every column")]
    NothingToExport { version: String },

    #[error("Unknown schema version '{version}' (known: {})", known.join(", "))]
    UnknownSchema { version: String, known: Vec<String> },

    #[error("Key definition resource '{version}' does not define STAR_PREFIX")]
    MissingPrefix { version: String },

    // ─────────────────────────────────────────────────────────────
    // 版本格式错误
    // ─────────────────────────────────────────────────────────────
    #[error("Invalid version '{version}' (known: {})", known.join(", "))]
    VersionFormat { version: String, known: Vec<String> },

    #[error("Version '{version}' is smaller than every known version ({})", known.join(", "))]
    VersionTooSmall { version: String, known: Vec<String> },

    // ─────────────────────────────────────────────────────────────
    // 数值域错误
    // ─────────────────────────────────────────────────────────────
    #[error("Amplitude contrast {value} is outside of [-100, 100] percent")]
    AmplitudeContrastOutOfRange { value: f64 },

    // ─────────────────────────────────────────────────────────────
    // 重复键错误
    // ─────────────────────────────────────────────────────────────
    #[error("Duplicate key: {key}")]
    DuplicateKey { key: String },

    // ─────────────────────────────────────────────────────────────
    // 表格错误
    // ─────────────────────────────────────────────────────────────
    #[error("Column not found: {name}")]
    MissingColumn { name: String },

    #[error("Column '{name}' is not numeric")]
    NotNumeric { name: String },

    #[error("Column '{name}' has {found} rows, expected {expected}")]
    LengthMismatch {
        name: String,
        expected: usize,
        found: usize,
    },

    // ─────────────────────────────────────────────────────────────
    // 外部格式错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to read XML file: {path}\nReason: {reason}")]
    XmlError { path: String, reason: String },

    #[error("Metadata key '{key}' expects a number, found '{value}'")]
    MetaParse { key: String, value: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    // ─────────────────────────────────────────────────────────────
    // 参数错误
    // ─────────────────────────────────────────────────────────────
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

/// Result 类型别名
pub type Result<T> = std::result::Result<T, TransformError>;

impl TransformError {
    /// 从 I/O 错误构造读取错误
    pub fn read(path: &std::path::Path, source: std::io::Error) -> Self {
        TransformError::FileReadError {
            path: path.display().to_string(),
            source,
        }
    }

    /// 从 I/O 错误构造写入错误
    pub fn write(path: &std::path::Path, source: std::io::Error) -> Self {
        TransformError::FileWriteError {
            path: path.display().to_string(),
            source,
        }
    }

    /// 构造格式解析错误
    pub fn parse(format: &str, path: &std::path::Path, reason: impl Into<String>) -> Self {
        TransformError::ParseError {
            format: format.to_string(),
            path: path.display().to_string(),
            reason: reason.into(),
        }
    }
}
