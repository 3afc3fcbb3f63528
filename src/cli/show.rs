//! # show 子命令 CLI 定义
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/show.rs`

use super::convert::{DialectArg, FormatArg};

use clap::Args;
use std::path::PathBuf;

/// show 子命令参数
#[derive(Args, Debug)]
pub struct ShowArgs {
    /// File to load
    pub file: PathBuf,

    /// Input format
    #[arg(short, long, value_enum)]
    pub format: FormatArg,

    /// Schema version (STAR: detected when omitted)
    #[arg(long)]
    pub version: Option<String>,

    /// CTER column dialect
    #[arg(long, value_enum, default_value_t = DialectArg::Relion)]
    pub dialect: DialectArg,

    /// TOML file with the XML extraction levels
    #[arg(long)]
    pub levels: Option<PathBuf>,

    /// Directory with star_keys_<version>.txt files
    #[arg(long, env = "CRYOCONV_KEYS_DIR")]
    pub keys_dir: Option<PathBuf>,

    /// Number of rows to print
    #[arg(short = 'n', long, default_value_t = 10)]
    pub rows: usize,
}
