//! # keys 子命令 CLI 定义
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/keys.rs`

use clap::Args;
use std::path::PathBuf;

/// keys 子命令参数
#[derive(Args, Debug)]
pub struct KeysArgs {
    /// Show the keys of one schema version instead of the version list
    #[arg(long)]
    pub version: Option<String>,

    /// Directory with star_keys_<version>.txt files
    #[arg(long, env = "CRYOCONV_KEYS_DIR")]
    pub keys_dir: Option<PathBuf>,
}
