//! # convert 命令实现
//!
//! 批量转换元数据文件格式。
//!
//! ## 功能
//! - 收集单个文件或目录下的匹配文件
//! - 每个文件独立执行 load -> dump，失败只影响该文件
//! - 支持并行处理
//!
//! ## 依赖关系
//! - 使用 `cli/convert.rs` 定义的参数
//! - 使用 `batch/` 收集与执行
//! - 使用 `utils/output.rs`

use super::{load_levels, load_registry};
use crate::batch::{BatchRunner, FileCollector, ProcessResult};
use crate::cli::convert::ConvertArgs;
use crate::utils::output;

use anyhow::{bail, Context, Result};
use cryoconv::{dump, load, Format, FormatOptions, KeyRegistry, TransformError};
use std::fs;
use std::path::{Path, PathBuf};

enum ConvertStatus {
    Success,
    /// 输出文件已存在
    Skipped(PathBuf),
}

/// 一次转换的双侧设置
struct Conversion<'a> {
    from: Format,
    to: Format,
    keys: &'a KeyRegistry,
    load_options: FormatOptions,
    dump_options: FormatOptions,
    output_dir: &'a Path,
    overwrite: bool,
}

/// 执行 convert 命令
pub fn execute(args: ConvertArgs) -> Result<()> {
    let from = Format::from(args.from);
    let to = Format::from(args.to);
    output::print_header(&format!("Converting {} to {}", from, to));

    if !to.can_dump() {
        bail!(TransformError::Unsupported(format!(
            "Writing {} files is not supported",
            to
        )));
    }

    // 验证输入
    if !args.input.exists() {
        return Err(TransformError::FileNotFound {
            path: args.input.display().to_string(),
        }
        .into());
    }

    let keys = load_registry(args.keys_dir.as_deref())?;
    let levels = load_levels(args.levels.as_deref())?;

    // 创建输出目录
    fs::create_dir_all(&args.output).map_err(|e| TransformError::write(&args.output, e))?;

    // 收集输入文件
    let files = FileCollector::new(args.input.clone())
        .with_pattern(&args.pattern)?
        .recursive(args.recursive)
        .collect();

    if files.is_empty() {
        output::print_warning(&format!(
            "No files matched '{}' under {}",
            args.pattern,
            args.input.display()
        ));
        return Ok(());
    }

    output::print_info(&format!("Found {} files to convert", files.len()));
    output::print_conversion(
        &describe(from, args.from_version.as_deref()),
        &describe(to, args.to_version.as_deref()),
    );

    let conversion = Conversion {
        from,
        to,
        keys: &keys,
        load_options: FormatOptions::new()
            .version(args.from_version.clone())
            .dialect(args.dialect.into())
            .levels(levels),
        dump_options: FormatOptions::new()
            .version(args.to_version.clone())
            .dialect(args.dialect.into())
            .box_size(args.box_size),
        output_dir: &args.output,
        overwrite: args.overwrite,
    };

    let runner = BatchRunner::new(args.jobs);
    let result = runner.run(&files, |input| {
        let name = input.display().to_string();
        match convert_file(input, &conversion) {
            Ok(ConvertStatus::Success) => ProcessResult::Success,
            Ok(ConvertStatus::Skipped(output)) => {
                ProcessResult::Skipped(output.display().to_string())
            }
            Err(e) => ProcessResult::Failed(name, format!("{:#}", e)),
        }
    })?;

    for path in &result.skipped_files {
        output::print_skip(path);
    }
    for (path, err) in &result.failures {
        output::print_failure(path, err);
    }

    output::print_done(&format!(
        "Converted {} file(s) to '{}' in '{}' ({} skipped, {} failed)",
        result.success,
        to,
        args.output.display(),
        result.skipped,
        result.failed
    ));

    if result.failed > 0 {
        bail!("{} of {} file(s) failed to convert", result.failed, result.total());
    }
    Ok(())
}

fn describe(format: Format, version: Option<&str>) -> String {
    match version {
        Some(v) => format!("{} ({})", format, v),
        None => format.to_string(),
    }
}

/// 输出文件路径：输入文件名主干 + 目标格式扩展名
fn output_path(input: &Path, output_dir: &Path, to: Format) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("metadata");
    output_dir.join(format!("{}.{}", stem, to.extension()))
}

fn convert_file(input: &Path, conversion: &Conversion) -> Result<ConvertStatus> {
    let output_path = output_path(input, conversion.output_dir, conversion.to);

    // 检查是否需要跳过
    if output_path.exists() && !conversion.overwrite {
        return Ok(ConvertStatus::Skipped(output_path));
    }

    let table = load(input, conversion.from, conversion.keys, &conversion.load_options)
        .with_context(|| format!("Failed to load {} as {}", input.display(), conversion.from))?;
    dump(
        &output_path,
        &table,
        conversion.to,
        conversion.keys,
        &conversion.dump_options,
    )
    .with_context(|| format!("Failed to write {}", output_path.display()))?;

    Ok(ConvertStatus::Success)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::convert::{DialectArg, FormatArg};

    fn args(input: PathBuf, output: PathBuf, from: FormatArg, to: FormatArg) -> ConvertArgs {
        ConvertArgs {
            input,
            output,
            from,
            to,
            pattern: "*".to_string(),
            recursive: false,
            from_version: None,
            to_version: None,
            dialect: DialectArg::Relion,
            box_size: None,
            levels: None,
            keys_dir: None,
            jobs: 1,
            overwrite: false,
        }
    }

    #[test]
    fn test_output_path_uses_target_extension() {
        let path = output_path(Path::new("/data/mic_001.log"), Path::new("/out"), Format::Unblur);
        assert_eq!(path, PathBuf::from("/out/mic_001.txt"));
    }

    #[test]
    fn test_convert_directory() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in");
        let out = dir.path().join("out");
        fs::create_dir(&input).unwrap();
        fs::write(input.join("a.log"), "1 1.0 2.0\n2 2.0 3.0\n").unwrap();
        fs::write(input.join("b.log"), "1 0.5 0.5\n").unwrap();

        execute(args(input, out.clone(), FormatArg::Motioncor2, FormatArg::Unblur)).unwrap();
        assert!(out.join("a.txt").exists());
        assert!(out.join("b.txt").exists());
    }

    #[test]
    fn test_failed_file_does_not_stop_others() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in");
        let out = dir.path().join("out");
        fs::create_dir(&input).unwrap();
        fs::write(input.join("good.box"), "995\t11\t352\t352\n").unwrap();
        fs::write(input.join("bad.box"), "995\t11\n").unwrap();

        let err = execute(args(input, out.clone(), FormatArg::Box, FormatArg::Star)).unwrap_err();
        assert!(err.to_string().contains("1 of 2"));
        assert!(out.join("good.star").exists());
        assert!(!out.join("bad.star").exists());
    }

    #[test]
    fn test_load_only_target_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let result = execute(args(
            dir.path().to_path_buf(),
            dir.path().join("out"),
            FormatArg::Star,
            FormatArg::Mrc,
        ));
        assert!(result.is_err());
    }
}
