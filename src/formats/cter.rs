//! # CTER partres 格式
//!
//! 每个显微图像一行、无头部的定宽表格。两种字段方言分别注册版本。
//!
//! ## 依赖关系
//! - 使用 `ctf/convert.rs` 完成单位换算
//! - 使用 `dispatch.rs` 选择版本

use crate::ctf::{cter_to_internal, internal_to_cter, CterDialect, CterSchema};
use crate::dispatch::VersionRegistry;
use crate::error::Result;
use crate::io::{dump_file, load_file, LoadOptions};
use crate::models::Table;

use std::path::Path;

type LoadFn = fn(&Path, &CterSchema) -> Result<Table>;
type DumpFn = fn(&Path, &Table, &CterSchema) -> Result<()>;

/// 方言已知的版本
fn versions(dialect: CterDialect) -> &'static [&'static str] {
    match dialect {
        CterDialect::Relion => &["1.0"],
        CterDialect::Generic => &["1.0"],
    }
}

fn loaders(dialect: CterDialect) -> Result<VersionRegistry<LoadFn>> {
    let handlers: Vec<(&str, LoadFn)> = versions(dialect)
        .iter()
        .map(|v| (*v, load_cter_v1_0 as LoadFn))
        .collect();
    VersionRegistry::new(&handlers)
}

fn dumpers(dialect: CterDialect) -> Result<VersionRegistry<DumpFn>> {
    let handlers: Vec<(&str, DumpFn)> = versions(dialect)
        .iter()
        .map(|v| (*v, dump_cter_v1_0 as DumpFn))
        .collect();
    VersionRegistry::new(&handlers)
}

/// 读取 CTER 文件；`version` 为空时使用最新版本
pub fn load_cter(path: &Path, dialect: CterDialect, version: Option<&str>) -> Result<Table> {
    let registry = loaders(dialect)?;
    let (_, handler) = registry.select(version)?;
    handler(path, dialect.schema())
}

/// 写出 CTER 文件；`version` 为空时使用最新版本
pub fn dump_cter(
    path: &Path,
    table: &Table,
    dialect: CterDialect,
    version: Option<&str>,
) -> Result<()> {
    let registry = dumpers(dialect)?;
    let (_, handler) = registry.select(version)?;
    handler(path, table, dialect.schema())
}

fn load_cter_v1_0(path: &Path, schema: &CterSchema) -> Result<Table> {
    let raw = load_file(path, &LoadOptions::new().names(schema.columns))?;
    cter_to_internal(raw, schema)
}

fn dump_cter_v1_0(path: &Path, table: &Table, schema: &CterSchema) -> Result<()> {
    let output = internal_to_cter(table, schema)?;
    dump_file::<&str>(path, &output, None, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransformError;
    use approx::assert_abs_diff_eq;
    use std::fs;

    const PARTRES: &str = "2.25600\t0.01000\t300.00000\t1.14000\t0.00000\t10.00000\t0.06047\t25.56500\t0.00102\t0.00000\t0.00210\t6.58490\t0.04527\t3.47340\t0.43346\t0.35979\t0.43860\t0.43860\t0.00000\t10.00000\t0.00000\ttest_file.mrc\n";

    #[test]
    fn test_load_relion_dialect() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partres.txt");
        fs::write(&path, PARTRES).unwrap();

        let table = load_cter(&path, CterDialect::Relion, None).unwrap();
        assert_eq!(table.n_rows(), 1);
        assert_eq!(table.names()[0], "DefocusU");
        assert_abs_diff_eq!(table.floats("DefocusU").unwrap()[0], 22257.65, epsilon = 1e-6);
        assert_abs_diff_eq!(table.floats("DefocusV").unwrap()[0], 22862.35, epsilon = 1e-6);
        assert_abs_diff_eq!(table.floats("AmplitudeContrast").unwrap()[0], 0.1, epsilon = 1e-12);
        assert_abs_diff_eq!(table.floats("DefocusAngle").unwrap()[0], 19.435, epsilon = 1e-9);
        assert_abs_diff_eq!(
            table.floats("CtfMaxResolution").unwrap()[0],
            1.0 / 0.4386,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_load_generic_dialect() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partres.txt");
        fs::write(&path, PARTRES).unwrap();

        let table = load_cter(&path, CterDialect::Generic, Some("1.0")).unwrap();
        assert_eq!(&table.names()[..2], &["defocus_u", "defocus_v"]);
        assert_abs_diff_eq!(table.floats("ac").unwrap()[0], 0.1, epsilon = 1e-12);
        // spare_1 不做倒数换算
        assert_abs_diff_eq!(table.floats("spare_1").unwrap()[0], 0.4386, epsilon = 1e-12);
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("partres.txt");
        let output = dir.path().join("partres_out.txt");
        fs::write(&input, PARTRES).unwrap();

        let first = load_cter(&input, CterDialect::Relion, None).unwrap();
        dump_cter(&output, &first, CterDialect::Relion, None).unwrap();
        let second = load_cter(&output, CterDialect::Relion, None).unwrap();

        assert_eq!(first.names(), second.names());
        for name in first.names() {
            match (first.floats(name), second.floats(name)) {
                (Ok(a), Ok(b)) => assert_abs_diff_eq!(a[0], b[0], epsilon = 1e-6),
                _ => assert_eq!(first.column(name), second.column(name)),
            }
        }
    }

    #[test]
    fn test_version_too_small() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partres.txt");
        fs::write(&path, PARTRES).unwrap();
        let err = load_cter(&path, CterDialect::Relion, Some("0.9")).unwrap_err();
        assert!(matches!(err, TransformError::VersionTooSmall { .. }));
    }

    #[test]
    fn test_wrong_column_count() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partres.txt");
        fs::write(&path, "1.0 2.0 3.0\n").unwrap();
        assert!(load_cter(&path, CterDialect::Relion, None).is_err());
    }
}
