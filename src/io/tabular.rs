//! # 分隔符表格读写
//!
//! 读取以空白分隔的文本表格，写出以制表符分隔的表格。
//!
//! ## 读取
//! - 可跳过固定数量的前导行
//! - `#` 等注释字符之后的内容被忽略，空行跳过
//! - 列名由调用者给出；未给出时按位置编号为 `"0"`, `"1"`, ...
//! - 每列的类型独立推断（整数 → 浮点 → 文本）
//!
//! ## 写出
//! - 空表格拒绝写出
//! - 可选头部：每行一个名称（纵向）或同一行制表符分隔（横向）
//! - 数据行制表符分隔，无行号列
//!
//! ## 依赖关系
//! - 被 `formats/` 使用
//! - 使用 `csv` 写出数据行

use crate::error::{Result, TransformError};
use crate::models::{Column, ColumnData, Table};

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

/// 表格读取选项
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// 列名
    pub names: Option<Vec<String>>,
    /// 跳过的前导行数
    pub skip_rows: usize,
    /// 只保留这些位置的列
    pub usecols: Option<Vec<usize>>,
    /// 注释字符
    pub comment: Option<char>,
}

impl LoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn names<S: AsRef<str>>(mut self, names: &[S]) -> Self {
        self.names = Some(names.iter().map(|n| n.as_ref().to_string()).collect());
        self
    }

    pub fn skip_rows(mut self, rows: usize) -> Self {
        self.skip_rows = rows;
        self
    }

    pub fn usecols(mut self, columns: &[usize]) -> Self {
        self.usecols = Some(columns.to_vec());
        self
    }

    pub fn comment(mut self, comment: char) -> Self {
        self.comment = Some(comment);
        self
    }
}

/// 读取分隔符表格
pub fn load_file(path: &Path, options: &LoadOptions) -> Result<Table> {
    let content = fs::read_to_string(path).map_err(|e| TransformError::read(path, e))?;
    parse_table(&content, path, options)
}

/// 从文本解析表格，`path` 只用于报错
pub fn parse_table(content: &str, path: &Path, options: &LoadOptions) -> Result<Table> {
    let mut rows: Vec<Vec<&str>> = Vec::new();
    let mut width: Option<usize> = None;

    for (line_no, line) in content.lines().enumerate().skip(options.skip_rows) {
        let line = match options.comment {
            Some(c) => line.split(c).next().unwrap_or(""),
            None => line,
        };
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }

        let expected = *width.get_or_insert(tokens.len());
        if tokens.len() != expected {
            return Err(TransformError::ColumnCount {
                path: path.display().to_string(),
                line: line_no + 1,
                expected,
                found: tokens.len(),
            });
        }

        let tokens = match &options.usecols {
            Some(cols) => {
                let mut picked = Vec::with_capacity(cols.len());
                for &c in cols {
                    let token = tokens.get(c).ok_or_else(|| TransformError::ColumnCount {
                        path: path.display().to_string(),
                        line: line_no + 1,
                        expected: c + 1,
                        found: tokens.len(),
                    })?;
                    picked.push(*token);
                }
                picked
            }
            None => tokens,
        };
        rows.push(tokens);
    }

    let n_cols = match (&options.names, rows.first()) {
        (_, Some(first)) => first.len(),
        (Some(names), None) => names.len(),
        (None, None) => 0,
    };

    let names: Vec<String> = match &options.names {
        Some(names) if names.len() != n_cols => {
            return Err(TransformError::ColumnCount {
                path: path.display().to_string(),
                line: options.skip_rows + 1,
                expected: names.len(),
                found: n_cols,
            });
        }
        Some(names) => names.clone(),
        None => (0..n_cols).map(|i| i.to_string()).collect(),
    };

    let columns = names
        .into_iter()
        .enumerate()
        .map(|(i, name)| {
            let cells: Vec<&str> = rows.iter().map(|r| r[i]).collect();
            let data = if cells.is_empty() {
                ColumnData::Float(Vec::new())
            } else {
                ColumnData::infer(&cells)
            };
            Column::new(name, data)
        })
        .collect();

    Table::from_columns(columns)
}

/// 创建头部；`index` 为真时每个名称后附加 ` #<序号>`（从 1 开始）
pub fn create_header<S: AsRef<str>>(names: &[S], index: bool) -> Result<Vec<String>> {
    if names.is_empty() {
        return Err(TransformError::EmptyHeader);
    }
    Ok(names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            if index {
                format!("{} #{}", name.as_ref(), i + 1)
            } else {
                name.as_ref().to_string()
            }
        })
        .collect())
}

/// 写出表格
pub fn dump_file<S: AsRef<str>>(
    path: &Path,
    table: &Table,
    header: Option<&[S]>,
    vertical: bool,
) -> Result<()> {
    if table.is_empty() {
        return Err(TransformError::EmptyData {
            path: path.display().to_string(),
        });
    }

    let file = File::create(path).map_err(|e| TransformError::write(path, e))?;
    let mut writer = BufWriter::new(file);

    if let Some(header) = header {
        let separator = if vertical { "\n" } else { "\t" };
        let lines: Vec<&str> = header.iter().map(|h| h.as_ref()).collect();
        writeln!(writer, "{}", lines.join(separator)).map_err(|e| TransformError::write(path, e))?;
    }

    let mut csv_writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .quote_style(csv::QuoteStyle::Never)
        .from_writer(writer);
    for row in table.rows() {
        csv_writer.write_record(&row)?;
    }
    csv_writer.flush().map_err(|e| TransformError::write(path, e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DType;

    fn sample() -> Table {
        Table::from_columns(vec![
            Column::new("col1", ColumnData::Int(vec![1, 2])),
            Column::new("col2", ColumnData::Float(vec![0.5, 2.25])),
            Column::new(
                "col3",
                ColumnData::Text(vec!["a.mrc".to_string(), "b.mrc".to_string()]),
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_create_header_indexed() {
        assert_eq!(
            create_header(&["a", "b"], true).unwrap(),
            vec!["a #1", "b #2"]
        );
        assert_eq!(create_header(&["a", "b"], false).unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_create_header_empty() {
        let empty: [&str; 0] = [];
        let err = create_header(&empty, true).unwrap_err();
        assert_eq!(err.to_string(), "Cannot create header from empty sequence");
    }

    #[test]
    fn test_dump_vertical_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        dump_file(&path, &sample(), Some(&["h1", "h2"][..]), true).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "h1\nh2\n1\t0.5\ta.mrc\n2\t2.25\tb.mrc\n");
    }

    #[test]
    fn test_dump_horizontal_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        dump_file(&path, &sample(), Some(&["h1", "h2"][..]), false).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("h1\th2\n1\t"));
    }

    #[test]
    fn test_dump_without_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        dump_file::<&str>(&path, &sample(), None, true).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "1\t0.5\ta.mrc\n2\t2.25\tb.mrc\n");
    }

    #[test]
    fn test_dump_empty_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let err = dump_file::<&str>(&path, &Table::new(), None, true).unwrap_err();
        assert!(matches!(err, TransformError::EmptyData { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn test_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        dump_file::<&str>(&path, &sample(), None, true).unwrap();
        let loaded = load_file(&path, &LoadOptions::new().names(&["col1", "col2", "col3"])).unwrap();
        assert_eq!(loaded, sample());
    }

    #[test]
    fn test_load_default_names_and_comments() {
        let content = "# comment\n1 2.5   x\n\n3 4.0 y # trailing\n";
        let table = parse_table(content, Path::new("t"), &LoadOptions::new().comment('#')).unwrap();
        assert_eq!(table.names(), vec!["0", "1", "2"]);
        assert_eq!(table.column("0").unwrap().dtype(), DType::Int);
        assert_eq!(table.column("1").unwrap().dtype(), DType::Float);
        assert_eq!(table.column("2").unwrap().dtype(), DType::Text);
    }

    #[test]
    fn test_load_skip_rows_and_usecols() {
        let content = "header line\nother\n1 10 20 30\n2 11 21 31\n";
        let options = LoadOptions::new()
            .skip_rows(2)
            .usecols(&[1, 3])
            .names(&["a", "b"]);
        let table = parse_table(content, Path::new("t"), &options).unwrap();
        assert_eq!(table.column("a"), Some(&ColumnData::Int(vec![10, 11])));
        assert_eq!(table.column("b"), Some(&ColumnData::Int(vec![30, 31])));
    }

    #[test]
    fn test_load_ragged_rows() {
        let content = "1 2 3\n4 5\n";
        let err = parse_table(content, Path::new("t"), &LoadOptions::new()).unwrap_err();
        assert!(matches!(err, TransformError::ColumnCount { line: 2, .. }));
    }

    #[test]
    fn test_load_name_count_mismatch() {
        let content = "1 2 3\n";
        let options = LoadOptions::new().names(&["a", "b"]);
        assert!(parse_table(content, Path::new("t"), &options).is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_file(Path::new("/nonexistent/file.txt"), &LoadOptions::new()).unwrap_err();
        assert!(matches!(err, TransformError::FileReadError { .. }));
    }
}
