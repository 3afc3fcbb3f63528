//! # Unblur 漂移文件
//!
//! 转置布局：第一行为所有帧的 x 漂移，第二行为 y 漂移。
//!
//! ## 依赖关系
//! - 使用 `dispatch.rs` 选择版本
//! - 使用 `formats/mod.rs` 的漂移归零

use super::{rebase_shifts, SHIFT_COLUMNS};
use crate::dispatch::VersionRegistry;
use crate::error::{Result, TransformError};
use crate::io::{dump_file, load_file, LoadOptions};
use crate::models::{Column, ColumnData, Table};

use std::path::Path;

type LoadFn = fn(&Path) -> Result<Table>;
type DumpFn = fn(&Path, &Table) -> Result<()>;

/// 读取 Unblur 漂移文件；`version` 为空时使用最新版本
pub fn load_unblur(path: &Path, version: Option<&str>) -> Result<Table> {
    let registry = VersionRegistry::new(&[("1.0.2", load_unblur_1_0_2 as LoadFn)])?;
    let (_, handler) = registry.select(version)?;
    handler(path)
}

/// 写出 Unblur 漂移文件；`version` 为空时使用最新版本
pub fn dump_unblur(path: &Path, table: &Table, version: Option<&str>) -> Result<()> {
    let registry = VersionRegistry::new(&[("1.0.2", dump_unblur_1_0_2 as DumpFn)])?;
    let (_, handler) = registry.select(version)?;
    handler(path, table)
}

fn load_unblur_1_0_2(path: &Path) -> Result<Table> {
    let raw = load_file(path, &LoadOptions::new().comment('#'))?;
    if raw.n_rows() != 2 {
        return Err(TransformError::parse(
            "Unblur",
            path,
            format!("expected 2 shift rows, found {}", raw.n_rows()),
        ));
    }

    let mut x = Vec::with_capacity(raw.n_cols());
    let mut y = Vec::with_capacity(raw.n_cols());
    for column in raw.columns() {
        let values = raw.floats(&column.name)?;
        x.push(values[0]);
        y.push(values[1]);
    }

    rebase_shifts(Table::from_columns(vec![
        Column::new(SHIFT_COLUMNS[0], ColumnData::Float(x)),
        Column::new(SHIFT_COLUMNS[1], ColumnData::Float(y)),
    ])?)
}

fn dump_unblur_1_0_2(path: &Path, table: &Table) -> Result<()> {
    let x = table.floats(SHIFT_COLUMNS[0])?;
    let y = table.floats(SHIFT_COLUMNS[1])?;
    let columns = x
        .into_iter()
        .zip(y)
        .enumerate()
        .map(|(i, (x, y))| Column::new(i.to_string(), ColumnData::Float(vec![x, y])))
        .collect();
    let output = Table::from_columns(columns)?;
    let header = [
        "# Unblur shifts file".to_string(),
        "# Shifts below are given in Angstroms".to_string(),
        format!("# Number of frames: {}", table.n_rows()),
    ];
    dump_file(path, &output, Some(&header[..]), true)
}
