//! # MotionCor2 漂移文件
//!
//! 每帧一行：帧号、x 漂移、y 漂移，`#` 开头的行为注释。
//! 读取后所有帧相对第一帧归零。
//!
//! ## 依赖关系
//! - 使用 `dispatch.rs` 选择版本
//! - 使用 `formats/mod.rs` 的漂移归零

use super::{rebase_shifts, SHIFT_COLUMNS};
use crate::dispatch::VersionRegistry;
use crate::error::Result;
use crate::io::{dump_file, load_file, LoadOptions};
use crate::models::{Column, ColumnData, Table};

use std::path::Path;

type LoadFn = fn(&Path) -> Result<Table>;
type DumpFn = fn(&Path, &Table) -> Result<()>;

/// 读取 MotionCor2 漂移文件；`version` 为空时使用最新版本
pub fn load_motioncor2(path: &Path, version: Option<&str>) -> Result<Table> {
    let registry = VersionRegistry::new(&[("1.0.0", load_motioncor2_1_0_0 as LoadFn)])?;
    let (_, handler) = registry.select(version)?;
    handler(path)
}

/// 写出 MotionCor2 漂移文件；`version` 为空时使用最新版本
pub fn dump_motioncor2(path: &Path, table: &Table, version: Option<&str>) -> Result<()> {
    let registry = VersionRegistry::new(&[("1.0.0", dump_motioncor2_1_0_0 as DumpFn)])?;
    let (_, handler) = registry.select(version)?;
    handler(path, table)
}

fn load_motioncor2_1_0_0(path: &Path) -> Result<Table> {
    let options = LoadOptions::new()
        .names(&SHIFT_COLUMNS)
        .usecols(&[1, 2])
        .comment('#');
    rebase_shifts(load_file(path, &options)?)
}

fn dump_motioncor2_1_0_0(path: &Path, table: &Table) -> Result<()> {
    let shifts = table.select(&SHIFT_COLUMNS)?;
    let frames = ColumnData::Int((1..=shifts.n_rows() as i64).collect());
    let output = Table::from_columns(vec![Column::new("frame", frames)])?.hconcat(shifts)?;
    let header = ["# full-frame alignment shift", "# Frame     x Shift     y Shift"];
    dump_file(path, &output, Some(&header[..]), true)
}
