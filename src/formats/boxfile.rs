//! # 颗粒 box 文件
//!
//! eman1 风格：每行 4 列（角点 x、角点 y、box 宽、box 高），无头部。
//! 内部只保留中心坐标 `CoordinateX` / `CoordinateY`。
//!
//! ## 依赖关系
//! - 使用 `io/tabular.rs` 读写

use crate::error::{Result, TransformError};
use crate::io::{dump_file, load_file, LoadOptions};
use crate::models::{Column, ColumnData, Table};

use std::path::Path;

const BOX_COLUMNS: [&str; 4] = ["CoordinateX", "CoordinateY", "box_x", "box_y"];

/// box 文件变体
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BoxKind {
    #[default]
    Eman1,
}

impl BoxKind {
    pub const KNOWN: [&'static str; 1] = ["eman1"];

    /// 由版本名解析；未指定时为 eman1
    pub fn parse(version: Option<&str>) -> Result<Self> {
        match version {
            None | Some("eman1") => Ok(BoxKind::Eman1),
            Some(other) => Err(TransformError::UnknownSchema {
                version: other.to_string(),
                known: Self::KNOWN.iter().map(|k| k.to_string()).collect(),
            }),
        }
    }
}

/// 读取 box 文件，返回中心坐标
pub fn load_box(path: &Path, kind: BoxKind) -> Result<Table> {
    match kind {
        BoxKind::Eman1 => load_eman1(path),
    }
}

/// 写出 box 文件
///
/// `box_size` 缺省时使用表中的 `box_x` / `box_y` 列。
pub fn dump_box(
    path: &Path,
    table: &Table,
    kind: BoxKind,
    box_size: Option<[i64; 2]>,
) -> Result<()> {
    match kind {
        BoxKind::Eman1 => dump_eman1(path, table, box_size),
    }
}

fn load_eman1(path: &Path) -> Result<Table> {
    let options = LoadOptions::new().names(&BOX_COLUMNS).comment('#');
    let raw = load_file(path, &options)?;

    let mut columns = Vec::with_capacity(2);
    for (coordinate, size) in [("CoordinateX", "box_x"), ("CoordinateY", "box_y")] {
        let corner = lookup(&raw, coordinate)?;
        let size = lookup(&raw, size)?;
        columns.push(Column::new(coordinate, shift_by_half(corner, size, 1)?));
    }
    Table::from_columns(columns)
}

fn dump_eman1(path: &Path, table: &Table, box_size: Option<[i64; 2]>) -> Result<()> {
    let n = table.n_rows();
    let sizes = match box_size {
        Some([w, h]) => [ColumnData::Int(vec![w; n]), ColumnData::Int(vec![h; n])],
        None => match (table.column("box_x"), table.column("box_y")) {
            (Some(w), Some(h)) => [w.clone(), h.clone()],
            _ => {
                return Err(TransformError::InvalidArgument(
                    "Writing a box file needs a box size".to_string(),
                ))
            }
        },
    };

    let mut columns = Vec::with_capacity(4);
    for (coordinate, size) in ["CoordinateX", "CoordinateY"].into_iter().zip(&sizes) {
        let center = lookup(table, coordinate)?;
        columns.push(Column::new(coordinate, shift_by_half(center, size, -1)?));
    }
    for (name, size) in ["box_x", "box_y"].into_iter().zip(sizes) {
        columns.push(Column::new(name, size));
    }
    dump_file::<&str>(path, &Table::from_columns(columns)?, None, true)
}

fn lookup<'a>(table: &'a Table, name: &str) -> Result<&'a ColumnData> {
    table.column(name).ok_or_else(|| TransformError::MissingColumn {
        name: name.to_string(),
    })
}

/// `coordinate + sign * (size // 2)`，整数列保持整数
fn shift_by_half(coordinate: &ColumnData, size: &ColumnData, sign: i64) -> Result<ColumnData> {
    match (coordinate, size) {
        (ColumnData::Int(c), ColumnData::Int(s)) => Ok(ColumnData::Int(
            c.iter().zip(s).map(|(c, s)| c + sign * s.div_euclid(2)).collect(),
        )),
        _ => {
            let c = coordinate.to_f64().ok_or_else(not_numeric("CoordinateX"))?;
            let s = size.to_f64().ok_or_else(not_numeric("box_x"))?;
            Ok(ColumnData::Float(
                c.iter()
                    .zip(&s)
                    .map(|(c, s)| c + sign as f64 * (s / 2.0).floor())
                    .collect(),
            ))
        }
    }
}

fn not_numeric(name: &str) -> impl FnOnce() -> TransformError + '_ {
    move || TransformError::NotNumeric {
        name: name.to_string(),
    }
}
