//! # 版本分派
//!
//! 按版本号注册格式处理器，并为请求的版本选择"不超过请求的最近版本"。
//!
//! ## 选择规则
//! - 未指定版本：使用最新版本
//! - 比所有已注册版本都新：使用最新版本
//! - 与某个已注册版本相等：使用该版本
//! - 比所有已注册版本都旧：报错
//! - 其余情况：使用插入位置之前的版本
//!
//! ## 依赖关系
//! - 被 `formats/` 各适配器使用
//! - 使用 `models/version.rs`

use crate::error::{Result, TransformError};
use crate::models::Version;
use log::debug;

/// 已排序的 (版本, 处理器) 关联表
#[derive(Debug, Clone)]
pub struct VersionRegistry<H> {
    entries: Vec<(Version, H)>,
}

impl<H: Copy> VersionRegistry<H> {
    /// 创建注册表；所有版本必须同元数
    pub fn new(handlers: &[(&str, H)]) -> Result<Self> {
        let known: Vec<String> = handlers.iter().map(|(v, _)| v.to_string()).collect();

        let mut entries = Vec::with_capacity(handlers.len());
        for (text, handler) in handlers {
            entries.push((Version::parse(text, &known)?, *handler));
        }

        if let Some((first, _)) = entries.first() {
            let arity = first.arity();
            if let Some((bad, _)) = entries.iter().find(|(v, _)| v.arity() != arity) {
                return Err(TransformError::VersionFormat {
                    version: bad.to_string(),
                    known,
                });
            }
        } else {
            return Err(TransformError::InvalidArgument(
                "Version registry needs at least one handler".to_string(),
            ));
        }

        entries.sort_by(|a, b| a.0.cmp(&b.0));
        for pair in entries.windows(2) {
            if pair[0].0 == pair[1].0 {
                return Err(TransformError::DuplicateKey {
                    key: pair[0].0.to_string(),
                });
            }
        }

        Ok(VersionRegistry { entries })
    }

    /// 已注册版本（升序）
    pub fn versions(&self) -> Vec<String> {
        self.entries.iter().map(|(v, _)| v.to_string()).collect()
    }

    /// 最新版本的处理器
    pub fn latest(&self) -> (&Version, H) {
        let (version, handler) = &self.entries[self.entries.len() - 1];
        (version, *handler)
    }

    /// 根据请求版本选择处理器
    pub fn select(&self, requested: Option<&str>) -> Result<(&Version, H)> {
        let Some(text) = requested else {
            let (version, handler) = self.latest();
            debug!("No version requested, using latest {}", version);
            return Ok((version, handler));
        };

        let known = self.versions();
        let wanted = Version::parse(text, &known)?;
        if wanted.arity() != self.entries[0].0.arity() {
            return Err(TransformError::VersionFormat {
                version: text.to_string(),
                known,
            });
        }

        let idx = self.entries.partition_point(|(v, _)| *v < wanted);
        let (version, handler) = if idx == self.entries.len() {
            let (v, h) = &self.entries[idx - 1];
            (v, *h)
        } else if self.entries[idx].0 == wanted {
            let (v, h) = &self.entries[idx];
            (v, *h)
        } else if idx == 0 {
            return Err(TransformError::VersionTooSmall {
                version: text.to_string(),
                known,
            });
        } else {
            let (v, h) = &self.entries[idx - 1];
            (v, *h)
        };

        debug!("Requested version {} resolved to {}", text, version);
        Ok((version, handler))
    }
}
