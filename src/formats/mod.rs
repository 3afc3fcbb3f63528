//! # 文件格式适配器
//!
//! 每种格式一个子模块，对外统一为 `load` / `dump` 两个入口。
//! 版本化的格式通过 `dispatch.rs` 选择具体实现。
//!
//! ## 依赖关系
//! - 被 `commands/` 使用
//! - 子模块: star, cter, ctffind, motioncor2, unblur, boxfile, mrc, xml

pub mod boxfile;
pub mod cter;
pub mod ctffind;
pub mod motioncor2;
pub mod mrc;
pub mod star;
pub mod unblur;
pub mod xml;

pub use boxfile::{dump_box, load_box, BoxKind};
pub use cter::{dump_cter, load_cter};
pub use ctffind::{dump_ctffind, load_ctffind};
pub use motioncor2::{dump_motioncor2, load_motioncor2};
pub use mrc::load_mrc_header;
pub use star::{dump_star, load_star};
pub use unblur::{dump_unblur, load_unblur};
pub use xml::{load_xml, XmlLevels};

use crate::ctf::CterDialect;
use crate::error::{Result, TransformError};
use crate::keys::KeyRegistry;
use crate::models::Table;

use log::info;
use std::fmt;
use std::path::Path;

/// 漂移表的内部列名
pub const SHIFT_COLUMNS: [&str; 2] = ["shift_x", "shift_y"];

/// 所有漂移相对第一帧归零；空表原样返回
pub(crate) fn rebase_shifts(table: Table) -> Result<Table> {
    if table.n_rows() == 0 {
        return Ok(table);
    }
    let mut table = table;
    for name in SHIFT_COLUMNS {
        let values = table.floats(name)?;
        let first = values[0];
        table = table.with_floats(name, values.iter().map(|v| v - first).collect())?;
    }
    Ok(table)
}

/// 支持的文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Star,
    Cter,
    Ctffind,
    Motioncor2,
    Unblur,
    Box,
    Mrc,
    Xml,
}

impl Format {
    pub const ALL: [Format; 8] = [
        Format::Star,
        Format::Cter,
        Format::Ctffind,
        Format::Motioncor2,
        Format::Unblur,
        Format::Box,
        Format::Mrc,
        Format::Xml,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Format::Star => "star",
            Format::Cter => "cter",
            Format::Ctffind => "ctffind",
            Format::Motioncor2 => "motioncor2",
            Format::Unblur => "unblur",
            Format::Box => "box",
            Format::Mrc => "mrc",
            Format::Xml => "xml",
        }
    }

    /// MRC 与 XML 只读
    pub fn can_dump(self) -> bool {
        !matches!(self, Format::Mrc | Format::Xml)
    }

    /// 写出文件的默认扩展名
    pub fn extension(self) -> &'static str {
        match self {
            Format::Star => "star",
            Format::Cter | Format::Ctffind | Format::Unblur => "txt",
            Format::Motioncor2 => "log",
            Format::Box => "box",
            Format::Mrc => "mrc",
            Format::Xml => "xml",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 单侧（读或写）的格式选项
#[derive(Debug, Clone, Default)]
pub struct FormatOptions {
    /// 请求的版本；为空时读取自动检测（STAR）或取最新版本
    pub version: Option<String>,
    pub dialect: CterDialect,
    /// 写出 box 文件时的 box 尺寸
    pub box_size: Option<[i64; 2]>,
    pub levels: XmlLevels,
}

impl FormatOptions {
    pub fn new() -> Self {
        FormatOptions::default()
    }

    pub fn version(mut self, version: Option<String>) -> Self {
        self.version = version;
        self
    }

    pub fn dialect(mut self, dialect: CterDialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn box_size(mut self, box_size: Option<[i64; 2]>) -> Self {
        self.box_size = box_size;
        self
    }

    pub fn levels(mut self, levels: XmlLevels) -> Self {
        self.levels = levels;
        self
    }
}

/// 按格式读取文件为内部表格
pub fn load(
    path: &Path,
    format: Format,
    keys: &KeyRegistry,
    options: &FormatOptions,
) -> Result<Table> {
    let version = options.version.as_deref();
    let table = match format {
        Format::Star => load_star(path, keys, version)?,
        Format::Cter => load_cter(path, options.dialect, version)?,
        Format::Ctffind => load_ctffind(path, version)?,
        Format::Motioncor2 => load_motioncor2(path, version)?,
        Format::Unblur => load_unblur(path, version)?,
        Format::Box => load_box(path, BoxKind::parse(version)?)?,
        Format::Mrc => load_mrc_header(path)?,
        Format::Xml => load_xml(path, &options.levels)?,
    };
    info!(
        "Loaded {} as {}: {} rows, {} columns",
        path.display(),
        format,
        table.n_rows(),
        table.n_cols()
    );
    Ok(table)
}

/// 按格式写出内部表格
pub fn dump(
    path: &Path,
    table: &Table,
    format: Format,
    keys: &KeyRegistry,
    options: &FormatOptions,
) -> Result<()> {
    let version = options.version.as_deref();
    match format {
        Format::Star => dump_star(path, table, keys, version)?,
        Format::Cter => dump_cter(path, table, options.dialect, version)?,
        Format::Ctffind => dump_ctffind(path, table, version)?,
        Format::Motioncor2 => dump_motioncor2(path, table, version)?,
        Format::Unblur => dump_unblur(path, table, version)?,
        Format::Box => dump_box(path, table, BoxKind::parse(version)?, options.box_size)?,
        Format::Mrc | Format::Xml => {
            return Err(TransformError::Unsupported(format!(
                "Writing {} files is not supported",
                format
            )))
        }
    }
    info!(
        "Wrote {} as {}: {} rows, {} columns",
        path.display(),
        format,
        table.n_rows(),
        table.n_cols()
    );
    Ok(())
}
