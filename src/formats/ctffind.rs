//! # CTFFIND4 输出格式
//!
//! 5 行注释头，其后每行 7 列：序号、DefocusU、DefocusV、像散角、
//! 相移（弧度）、拟合互相关、拟合分辨率。读入时像散角归一化到 [0, 180)。
//!
//! 注释头中的运行参数通过固定正则表达式提取为单行元数据表，
//! 广播到每一行。
//!
//! ## 依赖关系
//! - 使用 `regex` 提取元数据
//! - 使用 `dispatch.rs` 选择版本

use crate::ctf::normalize_angle;
use crate::dispatch::VersionRegistry;
use crate::error::{Result, TransformError};
use crate::io::{dump_file, load_file, LoadOptions};
use crate::models::{Column, ColumnData, Table};

use regex::Regex;
use std::fs;
use std::path::Path;

/// 数据列（文件第 1–6 列）
pub const CTFFIND4_COLUMNS: [&str; 6] = [
    "DefocusU",
    "DefocusV",
    "DefocusAngle",
    "PhaseShift",
    "CtfFigureOfMerit",
    "CtfMaxResolution",
];

/// 注释头行数
const COMMENT_LINES: usize = 5;

/// 只允许为字符串的元数据键
const TEXT_META_KEYS: [&str; 2] = ["version", "MicrographNameNoDW"];

/// 元数据键与提取用的正则表达式
const CTFFIND4_META: [(&str, &str); 6] = [
    ("version", r".*CTFFind version ([^, ]*).*"),
    ("MicrographNameNoDW", r".*Input file: ([^ ]*).*"),
    ("PixelSize", r".*Pixel size: ([^ ]*).*"),
    ("Voltage", r".*acceleration voltage: ([^ ]*).*"),
    ("SphericalAberration", r".*spherical aberration: ([^ ]*).*"),
    ("AmplitudeContrast", r".*amplitude contrast: ([^ ]*).*"),
];

type LoadFn = fn(&Path) -> Result<Table>;
type DumpFn = fn(&Path, &Table) -> Result<()>;

/// 读取 CTFFIND 文件；`version` 为空时使用最新版本
pub fn load_ctffind(path: &Path, version: Option<&str>) -> Result<Table> {
    let registry = VersionRegistry::new(&[("4.1.0", load_ctffind4 as LoadFn)])?;
    let (_, handler) = registry.select(version)?;
    handler(path)
}

/// 写出 CTFFIND 文件；`version` 为空时使用最新版本
pub fn dump_ctffind(path: &Path, table: &Table, version: Option<&str>) -> Result<()> {
    let registry = VersionRegistry::new(&[("4.1.0", dump_ctffind4 as DumpFn)])?;
    let (_, handler) = registry.select(version)?;
    handler(path, table)
}

/// 从注释头提取元数据（单行表，只含匹配到的键）
pub fn parse_ctffind4_meta(content: &str) -> Result<Table> {
    let patterns = CTFFIND4_META
        .iter()
        .map(|(key, pattern)| {
            Regex::new(pattern)
                .map(|re| (*key, re))
                .map_err(|e| TransformError::InvalidArgument(e.to_string()))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut table = Table::new();
    for line in content.lines() {
        for (key, re) in &patterns {
            let Some(caps) = re.captures(line) else {
                continue;
            };
            let raw = &caps[1];
            let data = match raw.parse::<f64>() {
                Ok(value) if !TEXT_META_KEYS.contains(key) => ColumnData::Float(vec![value]),
                _ if TEXT_META_KEYS.contains(key) => ColumnData::Text(vec![raw.to_string()]),
                _ => {
                    return Err(TransformError::MetaParse {
                        key: key.to_string(),
                        value: raw.to_string(),
                    })
                }
            };
            table = table.with_column(key, data)?;
        }
    }
    Ok(table)
}

fn load_ctffind4(path: &Path) -> Result<Table> {
    let options = LoadOptions::new()
        .names(&CTFFIND4_COLUMNS)
        .skip_rows(COMMENT_LINES)
        .usecols(&[1, 2, 3, 4, 5, 6]);
    let data = load_file(path, &options)?;

    let phase = data.floats("PhaseShift")?;
    let data = data.with_floats("PhaseShift", phase.iter().map(|p| p.to_degrees()).collect())?;
    let angle = data.floats("DefocusAngle")?;
    let data = data.with_floats(
        "DefocusAngle",
        angle.iter().map(|a| normalize_angle(*a)).collect(),
    )?;

    let content = fs::read_to_string(path).map_err(|e| TransformError::read(path, e))?;
    let meta = parse_ctffind4_meta(&content)?;
    data.hconcat(meta)
}

fn dump_ctffind4(path: &Path, table: &Table) -> Result<()> {
    let n = table.n_rows();
    let mut columns = vec![Column::new(
        "index",
        ColumnData::Float((1..=n).map(|i| i as f64).collect()),
    )];
    for name in CTFFIND4_COLUMNS {
        let data = match table.floats(name) {
            Ok(values) if name == "PhaseShift" => {
                ColumnData::Float(values.iter().map(|p| p.to_radians()).collect())
            }
            Ok(values) => ColumnData::Float(values),
            Err(TransformError::MissingColumn { .. }) => ColumnData::Float(vec![0.0; n]),
            Err(e) => return Err(e),
        };
        columns.push(Column::new(name, data));
    }
    let output = Table::from_columns(columns)?;
    dump_file(path, &output, Some(comment_header(table).as_slice()), true)
}

/// 由第一行的元数据重建 5 行注释头
fn comment_header(table: &Table) -> Vec<String> {
    let meta = |key: &str| table.column(key).and_then(|c| c.get(0)).map(|v| v.to_string());

    let version = meta("version").unwrap_or_else(|| "4.1.0".to_string());
    let input = match meta("MicrographNameNoDW") {
        Some(name) => format!("# Input file: {} ; Number of micrographs: {}", name, table.n_rows()),
        None => format!("# Number of micrographs: {}", table.n_rows()),
    };

    let parameters: Vec<String> = [
        ("Pixel size", "PixelSize", " Angstroms"),
        ("acceleration voltage", "Voltage", " keV"),
        ("spherical aberration", "SphericalAberration", " mm"),
        ("amplitude contrast", "AmplitudeContrast", ""),
    ]
    .iter()
    .filter_map(|(label, key, unit)| meta(key).map(|v| format!("{}: {}{}", label, v, unit)))
    .collect();
    let parameters = if parameters.is_empty() {
        "# Microscope parameters not recorded".to_string()
    } else {
        format!("# {}", parameters.join(" ; "))
    };

    vec![
        format!("# Output from CTFFind version {}, converted by cryoconv", version),
        input,
        parameters,
        "# Box size and search ranges not recorded".to_string(),
        "# Columns: #1 - micrograph number; #2 - defocus 1 [Angstroms]; #3 - defocus 2; \
         #4 - azimuth of astigmatism; #5 - additional phase shift [radians]; \
         #6 - cross correlation; #7 - spacing (in Angstroms) up to which CTF rings were fit successfully"
            .to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const CTFFIND4: &str = "\
# Output from CTFFind version 4.1.8, run on 2017-11-17 15:46:29
# Input file: /path/to/test_file.mrc ; Number of micrographs: 1
# Pixel size: 1.140 Angstroms ; acceleration voltage: 300.0 keV ; spherical aberration: 0.01 mm ; amplitude contrast: 0.10
# Box size: 512 pixels ; min. res.: 30.0 Angstroms ; max. res.: 5.0 Angstroms ; min. def.: 5000.0 um; max. def. 50000.0 um
# Columns: #1 - micrograph number; #2 - defocus 1 [Angstroms]; #3 - defocus 2; #4 - azimuth of astigmatism; #5 - additional phase shift [radians]; #6 - cross correlation; #7 - spacing (in Angstroms) up to which CTF rings were fit successfully
1.000000 22257.635742 22862.365234 -25.565001 0.000000 0.051134 3.243243
";

    fn write_fixture(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("ctffind.txt");
        fs::write(&path, CTFFIND4).unwrap();
        path
    }

    #[test]
    fn test_meta_extraction() {
        let meta = parse_ctffind4_meta(CTFFIND4).unwrap();
        assert_eq!(
            meta.names(),
            vec![
                "version",
                "MicrographNameNoDW",
                "PixelSize",
                "Voltage",
                "SphericalAberration",
                "AmplitudeContrast"
            ]
        );
        assert_eq!(meta.column("version"), Some(&ColumnData::Text(vec!["4.1.8".to_string()])));
        assert_eq!(meta.floats("PixelSize").unwrap(), vec![1.14]);
        assert_eq!(meta.floats("AmplitudeContrast").unwrap(), vec![0.1]);
    }

    #[test]
    fn test_meta_numeric_violation() {
        let err = parse_ctffind4_meta("# Pixel size: large Angstroms\n").unwrap_err();
        assert!(matches!(err, TransformError::MetaParse { .. }));
    }

    #[test]
    fn test_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(dir.path());
        let table = load_ctffind(&path, None).unwrap();

        assert_eq!(table.n_rows(), 1);
        assert_eq!(&table.names()[..6], &CTFFIND4_COLUMNS);
        assert_abs_diff_eq!(table.floats("DefocusU").unwrap()[0], 22257.635742);
        assert_abs_diff_eq!(table.floats("PhaseShift").unwrap()[0], 0.0);
        assert_abs_diff_eq!(table.floats("DefocusAngle").unwrap()[0], 154.434999, epsilon = 1e-9);
        assert_abs_diff_eq!(table.floats("Voltage").unwrap()[0], 300.0);
    }

    #[test]
    fn test_phase_shift_radians_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let table = Table::from_columns(vec![
            Column::new("DefocusU", ColumnData::Float(vec![20000.0, 21000.0])),
            Column::new("DefocusV", ColumnData::Float(vec![20000.0, 20500.0])),
            Column::new("PhaseShift", ColumnData::Float(vec![90.0, 45.0])),
        ])
        .unwrap();
        dump_ctffind(&path, &table, None).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let first_row = content.lines().nth(COMMENT_LINES).unwrap();
        let phase: f64 = first_row.split('\t').nth(4).unwrap().parse().unwrap();
        assert_abs_diff_eq!(phase, std::f64::consts::FRAC_PI_2, epsilon = 1e-12);

        let loaded = load_ctffind(&path, None).unwrap();
        assert_abs_diff_eq!(loaded.floats("PhaseShift").unwrap()[1], 45.0, epsilon = 1e-9);
        assert_eq!(loaded.floats("CtfFigureOfMerit").unwrap(), vec![0.0, 0.0]);
    }

    #[test]
    fn test_round_trip_keeps_meta() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_fixture(dir.path());
        let output = dir.path().join("out.txt");

        let first = load_ctffind(&input, None).unwrap();
        dump_ctffind(&output, &first, None).unwrap();
        let second = load_ctffind(&output, None).unwrap();

        assert_eq!(first.names(), second.names());
        for name in CTFFIND4_COLUMNS {
            let a = first.floats(name).unwrap()[0];
            let b = second.floats(name).unwrap()[0];
            assert_abs_diff_eq!(a, b, epsilon = 1e-7);
        }
        assert_eq!(first.column("version"), second.column("version"));
        assert_eq!(first.floats("PixelSize").unwrap(), second.floats("PixelSize").unwrap());
    }
}
