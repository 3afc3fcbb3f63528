//! # 版本号模型
//!
//! 点分隔的非负整数元组（例如 `4.1.0`），按元组字典序比较。
//! 同一格式族内所有版本的元数必须一致。
//!
//! ## 依赖关系
//! - 被 `dispatch.rs` 使用

use crate::error::{Result, TransformError};
use std::fmt;

/// 严格数值版本号
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version(Vec<u64>);

impl Version {
    /// 解析版本字符串；任一分量不是非负整数即报错
    pub fn parse(text: &str, known: &[String]) -> Result<Self> {
        let parts: Option<Vec<u64>> = text
            .split('.')
            .map(|p| {
                if p.is_empty() || !p.bytes().all(|b| b.is_ascii_digit()) {
                    None
                } else {
                    p.parse().ok()
                }
            })
            .collect();

        parts.map(Version).ok_or_else(|| TransformError::VersionFormat {
            version: text.to_string(),
            known: known.to_vec(),
        })
    }

    /// 分量个数
    pub fn arity(&self) -> usize {
        self.0.len()
    }

    pub fn parts(&self) -> &[u64] {
        &self.0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text: Vec<String> = self.0.iter().map(|p| p.to_string()).collect();
        write!(f, "{}", text.join("."))
    }
}
