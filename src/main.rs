//! # cryoconv - 冷冻电镜元数据转换工具
//!
//! ## 子命令
//! - `convert` - 批量格式转换 (STAR, CTER, CTFFIND, MotionCor2, Unblur, box)
//! - `show`    - 读取并预览单个文件
//! - `keys`    - 列出 STAR 键字典
//!
//! ## 依赖关系
//! ```text
//! main.rs
//!   ├── cli/        (命令行参数定义)
//!   ├── commands/   (命令执行逻辑)
//!   │     └── cryoconv 库 (formats/, keys/, ctf/)
//!   ├── batch/      (文件收集与并行执行)
//!   └── utils/      (输出与进度条)
//! ```

mod batch;
mod cli;
mod commands;
mod utils;

use clap::Parser;
use cli::Cli;

fn main() {
    // Initialize colored output for Windows compatibility
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();

    if let Err(e) = commands::run(cli.command) {
        utils::output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}
