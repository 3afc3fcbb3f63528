//! # show 命令实现
//!
//! 读取单个文件并以表格形式打印内部列。
//!
//! ## 依赖关系
//! - 使用 `cli/show.rs` 定义的参数
//! - 使用 `tabled` 渲染表格

use super::{load_levels, load_registry};
use crate::cli::show::ShowArgs;
use crate::utils::output;

use anyhow::{Context, Result};
use cryoconv::{load, Format, FormatOptions, Table};
use tabled::builder::Builder;
use tabled::settings::Style;

/// 执行 show 命令
pub fn execute(args: ShowArgs) -> Result<()> {
    let format = Format::from(args.format);
    let keys = load_registry(args.keys_dir.as_deref())?;
    let levels = load_levels(args.levels.as_deref())?;

    let options = FormatOptions::new()
        .version(args.version.clone())
        .dialect(args.dialect.into())
        .levels(levels);
    let table = load(&args.file, format, &keys, &options)
        .with_context(|| format!("Failed to load {} as {}", args.file.display(), format))?;

    output::print_header(&format!("{} ({})", args.file.display(), format));
    output::print_info(&format!(
        "{} rows, {} columns",
        table.n_rows(),
        table.n_cols()
    ));

    if table.n_cols() == 0 {
        output::print_warning("Nothing was extracted");
        return Ok(());
    }

    println!("{}", render(&table, args.rows));
    if table.n_rows() > args.rows {
        output::print_info(&format!("Showing first {} of {} rows", args.rows, table.n_rows()));
    }
    Ok(())
}

/// 渲染前 `rows` 行
fn render(table: &Table, rows: usize) -> String {
    let mut builder = Builder::default();
    builder.push_record(table.names().into_iter().map(String::from));
    for row in table.head(rows).rows() {
        builder.push_record(row);
    }
    let mut rendered = builder.build();
    rendered.with(Style::rounded());
    rendered.to_string()
}
