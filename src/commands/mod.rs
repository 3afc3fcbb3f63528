//! # 命令执行模块
//!
//! 实现各子命令的业务逻辑。
//!
//! ## 依赖关系
//! - 被 `main.rs` 调用
//! - 使用 `cli/`, `batch/`, `utils/` 与 cryoconv 库
//! - 子模块: convert, show, keys

pub mod convert;
pub mod keys;
pub mod show;

use crate::cli::Commands;

use anyhow::{Context, Result};
use cryoconv::formats::XmlLevels;
use cryoconv::KeyRegistry;
use log::debug;
use std::path::Path;

/// 执行命令
pub fn run(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Convert(args) => convert::execute(args),
        Commands::Show(args) => show::execute(args),
        Commands::Keys(args) => keys::execute(args),
    }
}

/// 构建键注册表：指定目录时从目录扫描，否则使用内置定义
fn load_registry(keys_dir: Option<&Path>) -> Result<KeyRegistry> {
    let registry = match keys_dir {
        Some(dir) => KeyRegistry::from_dir(dir)
            .with_context(|| format!("Failed to load key definitions from {}", dir.display()))?,
        None => KeyRegistry::builtin().context("Built-in key definitions are invalid")?,
    };
    debug!("Key registry versions: {}", registry.versions().join(", "));
    Ok(registry)
}

/// 读取 XML 层级配置；未指定时为空配置
fn load_levels(levels: Option<&Path>) -> Result<XmlLevels> {
    match levels {
        Some(path) => XmlLevels::load(path)
            .with_context(|| format!("Failed to load XML levels from {}", path.display())),
        None => Ok(XmlLevels::default()),
    }
}
