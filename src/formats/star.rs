//! # STAR 格式
//!
//! 读取时自动检测模式版本并映射为内部列名；写出时按目标版本映射，
//! 丢弃目标版本不认识的列。
//!
//! ## 文件结构
//! ```text
//!
//! data_
//!
//! loop_
//! _rlnMicrographName #1
//! _rlnDefocusU #2
//! a.mrc	20000.0
//! ```
//!
//! ## 依赖关系
//! - 使用 `keys/registry.rs` 解析头部
//! - 使用 `io/tabular.rs` 读写数据行

use crate::error::{Result, TransformError};
use crate::io::{create_header, dump_file, load_file, LoadOptions};
use crate::keys::KeyRegistry;
use crate::models::Table;

use std::fs;
use std::path::Path;

/// 带前缀的 STAR 头部块
pub fn create_star_header<S: AsRef<str>>(names: &[S], prefix: &str) -> Result<Vec<String>> {
    let prefixed: Vec<String> = names
        .iter()
        .map(|n| format!("_{}{}", prefix, n.as_ref()))
        .collect();

    let mut lines = vec![
        String::new(),
        "data_".to_string(),
        String::new(),
        "loop_".to_string(),
    ];
    lines.extend(create_header(&prefixed, true)?);
    Ok(lines)
}

/// 读取头部字段名及数据起始行
///
/// 头部为第一段连续的 `_` 开头行，每行取第一个空白分隔的词。
pub fn load_star_header(path: &Path) -> Result<(Vec<String>, usize)> {
    let content = fs::read_to_string(path).map_err(|e| TransformError::read(path, e))?;
    parse_star_header(&content).ok_or_else(|| TransformError::NoHeader {
        path: path.display().to_string(),
    })
}

fn parse_star_header(content: &str) -> Option<(Vec<String>, usize)> {
    let mut names = Vec::new();
    let mut end = 0;
    for (idx, line) in content.lines().enumerate() {
        if line.starts_with('_') {
            if let Some(name) = line.split_whitespace().next() {
                names.push(name.to_string());
            }
            end = idx + 1;
        } else if !names.is_empty() {
            break;
        }
    }
    if names.is_empty() {
        None
    } else {
        Some((names, end))
    }
}

/// 读取 STAR 文件；`version` 为空时自动检测
pub fn load_star(path: &Path, keys: &KeyRegistry, version: Option<&str>) -> Result<Table> {
    let (header, skip_rows) = load_star_header(path)?;
    let (names, _) = keys.import_header(&header, version)?;
    load_file(path, &LoadOptions::new().names(&names).skip_rows(skip_rows))
}

/// 写出 STAR 文件；`version` 为空时使用最新版本
pub fn dump_star(
    path: &Path,
    table: &Table,
    keys: &KeyRegistry,
    version: Option<&str>,
) -> Result<()> {
    let export = keys.export_header(&table.names(), version)?;
    let header = create_star_header(&export.on_disk, &export.prefix)?;
    let data = table.select(&export.kept)?;
    dump_file(path, &data, Some(header.as_slice()), true)
}
