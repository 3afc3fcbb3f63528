//! # CTER ↔ 内部表示的表级换算
//!
//! CTER partres 的两种字段方言共用同一套换算，只是列名不同。
//!
//! ## 换算
//! | 字段            | 磁盘         | 内部            |
//! |-----------------|--------------|-----------------|
//! | 离焦            | 平均 + 像散  | DefocusU/V (Å)  |
//! | 振幅衬度        | 百分比       | 分数            |
//! | 像散角          | `45 − θ`     | `[0, 180)`      |
//! | 分辨率类字段    | `1/Å`        | Å               |
//!
//! ## 依赖关系
//! - 被 `formats/cter.rs` 使用
//! - 使用 `ctf/mod.rs` 的数值函数

use super::{
    defocus_to_u_v_series, normalize_angle, reciprocal, total_amplitude_contrast,
    u_v_to_defocus_series, OUTPUT_DIGITS,
};
use crate::error::Result;
use crate::models::{Column, ColumnData, Table};

/// CTER 字段方言
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CterDialect {
    /// RELION 风格的 CamelCase 名称
    #[default]
    Relion,
    /// 通用 snake_case 名称
    Generic,
}

impl CterDialect {
    pub fn schema(self) -> &'static CterSchema {
        match self {
            CterDialect::Relion => &RELION_SCHEMA,
            CterDialect::Generic => &GENERIC_SCHEMA,
        }
    }
}

impl std::fmt::Display for CterDialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CterDialect::Relion => write!(f, "relion"),
            CterDialect::Generic => write!(f, "generic"),
        }
    }
}

/// 一种方言下的 CTER 列布局与各换算角色对应的列名
#[derive(Debug)]
pub struct CterSchema {
    /// 文件中的列顺序
    pub columns: &'static [&'static str],
    pub defocus: &'static str,
    pub astigmatism: &'static str,
    pub defocus_u: &'static str,
    pub defocus_v: &'static str,
    pub pixel_size: &'static str,
    pub total_ac: &'static str,
    pub angle: &'static str,
    pub amplitude_contrast: &'static str,
    pub phase_shift: &'static str,
    pub nyquist: &'static str,
    pub resolution_limits: [&'static str; 2],
    pub max_resolution: Option<&'static str>,
}

pub static RELION_SCHEMA: CterSchema = CterSchema {
    columns: &[
        "defocus",
        "SphericalAberration",
        "Voltage",
        "PixelSize",
        "b_factor",
        "total_ac",
        "astigmatism_amplitude",
        "DefocusAngle",
        "std_defocus",
        "std_total_ac",
        "std_astigmatism_amplitude",
        "std_astigmatism_angle",
        "variation_defocus",
        "variation_astigmatism_amplitude",
        "resolution_limit_defocus",
        "resolution_limit_defocus_astig",
        "nyquist",
        "CtfMaxResolution",
        "spare",
        "AmplitudeContrast",
        "PhaseShift",
        "MicrographNameNoDW",
    ],
    defocus: "defocus",
    astigmatism: "astigmatism_amplitude",
    defocus_u: "DefocusU",
    defocus_v: "DefocusV",
    pixel_size: "PixelSize",
    total_ac: "total_ac",
    angle: "DefocusAngle",
    amplitude_contrast: "AmplitudeContrast",
    phase_shift: "PhaseShift",
    nyquist: "nyquist",
    resolution_limits: ["resolution_limit_defocus", "resolution_limit_defocus_astig"],
    max_resolution: Some("CtfMaxResolution"),
};

pub static GENERIC_SCHEMA: CterSchema = CterSchema {
    columns: &[
        "defocus",
        "cs",
        "kv",
        "pixel_size",
        "b_factor",
        "total_ac",
        "astigmatism_amplitude",
        "astigmatism_angle",
        "std_defocus",
        "std_total_ac",
        "std_astigmatism_amplitude",
        "std_astigmatism_angle",
        "variation_defocus",
        "variation_astigmatism_amplitude",
        "resolution_limit_defocus",
        "resolution_limit",
        "nyquist",
        "spare_1",
        "spare_2",
        "ac",
        "phase_shift",
        "micrograph_name",
    ],
    defocus: "defocus",
    astigmatism: "astigmatism_amplitude",
    defocus_u: "defocus_u",
    defocus_v: "defocus_v",
    pixel_size: "pixel_size",
    total_ac: "total_ac",
    angle: "astigmatism_angle",
    amplitude_contrast: "ac",
    phase_shift: "phase_shift",
    nyquist: "nyquist",
    resolution_limits: ["resolution_limit_defocus", "resolution_limit"],
    max_resolution: None,
};

impl CterSchema {
    /// 以倒数存储的字段
    fn reciprocal_fields(&self) -> Vec<&'static str> {
        let mut fields = vec![self.nyquist];
        fields.extend(self.resolution_limits);
        fields.extend(self.max_resolution);
        fields
    }
}

/// 磁盘 CTER 表 → 内部表
///
/// 输出以 DefocusU/DefocusV 开头，去掉平均离焦与像散差两列。
pub fn cter_to_internal(table: Table, schema: &CterSchema) -> Result<Table> {
    let mut table = table;

    let ac = table.floats(schema.amplitude_contrast)?;
    table = table.with_floats(schema.amplitude_contrast, scale(&ac, 0.01))?;
    let total_ac = table.floats(schema.total_ac)?;
    table = table.with_floats(schema.total_ac, scale(&total_ac, 0.01))?;

    let angle = table.floats(schema.angle)?;
    table = table.with_floats(schema.angle, flip_angle(&angle))?;

    for field in schema.reciprocal_fields() {
        let values = table.floats(field)?;
        table = table.with_floats(field, reciprocal(&values))?;
    }

    let defocus = table.floats(schema.defocus)?;
    let astigmatism = table.floats(schema.astigmatism)?;
    let (defocus_u, defocus_v) = defocus_to_u_v_series(&defocus, &astigmatism);

    let uv = Table::from_columns(vec![
        Column::new(schema.defocus_u, ColumnData::Float(defocus_u)),
        Column::new(schema.defocus_v, ColumnData::Float(defocus_v)),
    ])?;
    uv.hconcat(table.without(&[schema.defocus, schema.astigmatism]))
}

/// 内部表 → 磁盘 CTER 表（已舍入到 7 位小数）
///
/// 缺失的列以 0 填充；缺失的派生字段按固定顺序回退：
/// `total_ac` 由振幅衬度与相移推导，`nyquist` 由像素尺寸推导，
/// 分辨率类字段取已算出的 `nyquist`。
pub fn internal_to_cter(table: &Table, schema: &CterSchema) -> Result<Table> {
    let n = table.n_rows();
    let present = |name: &str| table.contains(name);

    let defocus_u = table.floats(schema.defocus_u)?;
    let defocus_v = table.floats(schema.defocus_v)?;
    let (defocus, astigmatism) = u_v_to_defocus_series(&defocus_u, &defocus_v);

    let mut columns = Vec::with_capacity(schema.columns.len());
    for &name in schema.columns {
        let data = if name == schema.defocus {
            ColumnData::Float(defocus.clone())
        } else if name == schema.astigmatism {
            ColumnData::Float(astigmatism.clone())
        } else if let Some(data) = table.column(name) {
            data.clone()
        } else {
            ColumnData::Int(vec![0; n])
        };
        columns.push(Column::new(name, data));
    }
    let mut output = Table::from_columns(columns)?;

    let ac = scale(&output.floats(schema.amplitude_contrast)?, 100.0);
    output = output.with_floats(schema.amplitude_contrast, ac.clone())?;

    let angle = output.floats(schema.angle)?;
    output = output.with_floats(schema.angle, flip_angle(&angle))?;

    let total_ac = if present(schema.total_ac) {
        scale(&output.floats(schema.total_ac)?, 100.0)
    } else {
        let phase_shift = output.floats(schema.phase_shift)?;
        ac.iter()
            .zip(&phase_shift)
            .map(|(a, p)| total_amplitude_contrast(*a, *p))
            .collect::<Result<Vec<_>>>()?
    };
    output = output.with_floats(schema.total_ac, total_ac)?;

    let nyquist = if present(schema.nyquist) {
        reciprocal(&output.floats(schema.nyquist)?)
    } else {
        let pixel_size = output.floats(schema.pixel_size)?;
        pixel_size.iter().map(|p| 1.0 / (2.0 * p)).collect()
    };
    output = output.with_floats(schema.nyquist, nyquist.clone())?;

    for field in schema.resolution_limits.into_iter().chain(schema.max_resolution) {
        let values = if present(field) {
            reciprocal(&output.floats(field)?)
        } else {
            nyquist.clone()
        };
        output = output.with_floats(field, values)?;
    }

    Ok(output.round(OUTPUT_DIGITS))
}

fn scale(values: &[f64], factor: f64) -> Vec<f64> {
    values.iter().map(|v| v * factor).collect()
}

/// CTER 角度约定 `45 − θ`，其自身即为逆变换
fn flip_angle(values: &[f64]) -> Vec<f64> {
    values.iter().map(|v| normalize_angle(45.0 - v)).collect()
}
