//! # convert 子命令 CLI 定义
//!
//! 批量转换元数据文件格式，以及 `show` 共用的格式参数。
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/convert.rs`

use clap::{Args, ValueEnum};
use cryoconv::ctf::CterDialect;
use cryoconv::Format;
use std::path::PathBuf;

/// 支持的文件格式
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum FormatArg {
    /// RELION STAR file
    Star,
    /// SPHIRE CTER partres file
    Cter,
    /// CTFFIND4 output
    Ctffind,
    /// MotionCor2 shift log
    Motioncor2,
    /// Unblur shift file
    Unblur,
    /// eman1 box file
    Box,
    /// MRC header (read only)
    Mrc,
    /// EPU XML metadata (read only)
    Xml,
}

impl From<FormatArg> for Format {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Star => Format::Star,
            FormatArg::Cter => Format::Cter,
            FormatArg::Ctffind => Format::Ctffind,
            FormatArg::Motioncor2 => Format::Motioncor2,
            FormatArg::Unblur => Format::Unblur,
            FormatArg::Box => Format::Box,
            FormatArg::Mrc => Format::Mrc,
            FormatArg::Xml => Format::Xml,
        }
    }
}

impl std::fmt::Display for FormatArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", Format::from(*self))
    }
}

/// CTER 字段方言
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
pub enum DialectArg {
    /// Column roles as written by RELION-compatible SPHIRE
    #[default]
    Relion,
    /// Generic column roles without a maximum resolution field
    Generic,
}

impl From<DialectArg> for CterDialect {
    fn from(arg: DialectArg) -> Self {
        match arg {
            DialectArg::Relion => CterDialect::Relion,
            DialectArg::Generic => CterDialect::Generic,
        }
    }
}

/// 解析 `W,H` 形式的 box 尺寸
pub fn parse_box_size(value: &str) -> Result<[i64; 2], String> {
    let parts: Vec<&str> = value.split(',').map(str::trim).collect();
    let [w, h] = parts.as_slice() else {
        return Err(format!("expected W,H, got '{}'", value));
    };
    let parse = |s: &str| {
        s.parse::<i64>()
            .ok()
            .filter(|v| *v > 0)
            .ok_or_else(|| format!("'{}' is not a positive integer", s))
    };
    Ok([parse(w)?, parse(h)?])
}

/// convert 子命令参数
#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Input file or directory
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output directory for converted files
    #[arg(short, long)]
    pub output: PathBuf,

    /// Input format
    #[arg(long, value_enum)]
    pub from: FormatArg,

    /// Output format
    #[arg(long, value_enum)]
    pub to: FormatArg,

    /// Glob pattern for input files (comma separated for several)
    #[arg(short, long, default_value = "*")]
    pub pattern: String,

    /// Recurse into subdirectories
    #[arg(short, long, default_value_t = false)]
    pub recursive: bool,

    /// Input schema version (STAR: detected when omitted)
    #[arg(long)]
    pub from_version: Option<String>,

    /// Output schema version (latest when omitted)
    #[arg(long)]
    pub to_version: Option<String>,

    /// CTER column dialect
    #[arg(long, value_enum, default_value_t = DialectArg::Relion)]
    pub dialect: DialectArg,

    /// Box size used when writing box files
    #[arg(long, value_parser = parse_box_size)]
    pub box_size: Option<[i64; 2]>,

    /// TOML file with the XML extraction levels
    #[arg(long)]
    pub levels: Option<PathBuf>,

    /// Directory with star_keys_<version>.txt files
    #[arg(long, env = "CRYOCONV_KEYS_DIR")]
    pub keys_dir: Option<PathBuf>,

    /// Number of parallel jobs (0 = auto)
    #[arg(short, long, default_value_t = 1)]
    pub jobs: usize,

    /// Overwrite existing output files
    #[arg(long, default_value_t = false)]
    pub overwrite: bool,
}
