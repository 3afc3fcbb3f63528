//! # CLI 模块
//!
//! 使用 `clap` 定义命令行参数和子命令。
//!
//! ## 命令结构
//! - `convert`: 批量格式转换
//! - `show`: 读取单个文件并预览内部表格
//! - `keys`: 列出 STAR 键字典
//!
//! ## 依赖关系
//! - 被 `main.rs` 使用
//! - 子模块: convert, show, keys

pub mod convert;
pub mod keys;
pub mod show;

use clap::{Parser, Subcommand};

/// cryoconv - 冷冻电镜元数据格式转换
#[derive(Parser)]
#[command(name = "cryoconv")]
#[command(author = "Changjiang Wu")]
#[command(version)]
#[command(about = "Convert cryo-EM metadata between STAR, CTER, CTFFIND, MotionCor2, Unblur, box, MRC and XML", long_about = None)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// 可用的子命令
#[derive(Subcommand)]
pub enum Commands {
    /// Convert metadata files from one format to another
    Convert(convert::ConvertArgs),

    /// Load one file and print the converted table
    Show(show::ShowArgs),

    /// List STAR key dictionaries
    Keys(keys::KeysArgs),
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_subcommand_version_argument() {
        let cli = Cli::try_parse_from([
            "cryoconv", "show", "a.star", "--format", "star", "--version", "relion_2",
        ])
        .unwrap();
        match cli.command {
            Commands::Show(args) => assert_eq!(args.version.as_deref(), Some("relion_2")),
            _ => panic!("expected show"),
        }

        let cli = Cli::try_parse_from(["cryoconv", "-v", "keys", "--version", "relion_3"]).unwrap();
        assert_eq!(cli.verbose, 1);
        match cli.command {
            Commands::Keys(args) => assert_eq!(args.version.as_deref(), Some("relion_3")),
            _ => panic!("expected keys"),
        }
    }
}
