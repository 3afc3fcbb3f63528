//! # 终端输出
//!
//! 带状态标签的单行消息与标题栏。错误与失败写到 stderr，其余写到 stdout。
//!
//! ## 依赖关系
//! - 被 `commands/` 模块和 `main.rs` 使用
//! - 使用 `colored` crate

use colored::{ColoredString, Colorize};

fn emit(tag: ColoredString, msg: &str) {
    println!("{} {}", tag, msg);
}

pub fn print_success(msg: &str) {
    emit("[OK]".green().bold(), msg);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "[ERR]".red().bold(), msg);
}

pub fn print_warning(msg: &str) {
    emit("[WARN]".yellow().bold(), msg);
}

pub fn print_info(msg: &str) {
    emit("[*]".blue().bold(), msg);
}

/// 已存在且未要求覆盖的输出文件
pub fn print_skip(path: &str) {
    emit("[SKIP]".dimmed(), &format!("{} already exists", path));
}

/// 单个输入文件的转换失败
pub fn print_failure(path: &str, reason: &str) {
    eprintln!("{} {}\n      {}", "[FAIL]".red().bold(), path, reason.dimmed());
}

pub fn print_done(msg: &str) {
    emit("[DONE]".green().bold(), msg);
}

/// 源格式与目标格式，如 `star (detected) -> cter 1.0`
pub fn print_conversion(from: &str, to: &str) {
    emit(
        "[*]".blue().bold(),
        &format!("{} {} {}", from.dimmed(), "->".cyan(), to),
    );
}

pub fn print_header(title: &str) {
    let line = "─".repeat(60).dimmed();
    println!("\n{}\n  {}\n{}\n", line, title.bold(), line);
}
