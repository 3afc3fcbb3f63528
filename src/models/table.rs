//! # 表格数据模型
//!
//! 有序的命名列集合，所有列长度相同（每行一个显微图像/颗粒/帧）。
//! 列的顺序决定文件中的列位置和 STAR 头部编号。
//!
//! 所有变换都按值消费旧表并返回新表，不修改调用者持有的数据。
//!
//! ## 依赖关系
//! - 被 `io/`, `formats/`, `ctf/` 使用
//! - 无外部模块依赖

use crate::error::{Result, TransformError};

/// 单元格值
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Text(String),
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", format_float(*v)),
            Value::Text(v) => write!(f, "{}", v),
        }
    }
}

/// 列的数据类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DType {
    Int,
    Float,
    Text,
}

fn has_leading_zero(token: &str) -> bool {
    let digits = token.strip_prefix(['-', '+']).unwrap_or(token);
    let int_part = digits
        .split(|c: char| !c.is_ascii_digit())
        .next()
        .unwrap_or("");
    int_part.len() > 1 && int_part.starts_with('0')
}

/// 同质列数据
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Int(Vec<i64>),
    Float(Vec<f64>),
    Text(Vec<String>),
}

impl ColumnData {
    /// 从文本单元推断列类型：整数 → 浮点 → 文本
    ///
    /// 整数部分带前导零的单元（如 `001`）按文本保留，写出后可原样读回。
    pub fn infer<S: AsRef<str>>(tokens: &[S]) -> Self {
        if tokens.iter().any(|t| has_leading_zero(t.as_ref())) {
            return ColumnData::Text(tokens.iter().map(|t| t.as_ref().to_string()).collect());
        }
        if let Some(ints) = tokens
            .iter()
            .map(|t| t.as_ref().parse::<i64>().ok())
            .collect::<Option<Vec<_>>>()
        {
            return ColumnData::Int(ints);
        }
        if let Some(floats) = tokens
            .iter()
            .map(|t| t.as_ref().parse::<f64>().ok())
            .collect::<Option<Vec<_>>>()
        {
            return ColumnData::Float(floats);
        }
        ColumnData::Text(tokens.iter().map(|t| t.as_ref().to_string()).collect())
    }

    pub fn len(&self) -> usize {
        match self {
            ColumnData::Int(v) => v.len(),
            ColumnData::Float(v) => v.len(),
            ColumnData::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dtype(&self) -> DType {
        match self {
            ColumnData::Int(_) => DType::Int,
            ColumnData::Float(_) => DType::Float,
            ColumnData::Text(_) => DType::Text,
        }
    }

    /// 获取第 `row` 行的值
    pub fn get(&self, row: usize) -> Option<Value> {
        match self {
            ColumnData::Int(v) => v.get(row).map(|x| Value::Int(*x)),
            ColumnData::Float(v) => v.get(row).map(|x| Value::Float(*x)),
            ColumnData::Text(v) => v.get(row).map(|x| Value::Text(x.clone())),
        }
    }

    /// 数值列转换为 f64；文本列返回 None
    pub fn to_f64(&self) -> Option<Vec<f64>> {
        match self {
            ColumnData::Int(v) => Some(v.iter().map(|x| *x as f64).collect()),
            ColumnData::Float(v) => Some(v.clone()),
            ColumnData::Text(_) => None,
        }
    }

    /// 浮点列四舍五入到 `digits` 位小数（整数与文本列不变）
    pub fn round(&self, digits: i32) -> Self {
        match self {
            ColumnData::Float(v) => {
                ColumnData::Float(v.iter().map(|x| round_to(*x, digits)).collect())
            }
            other => other.clone(),
        }
    }

    /// 把第 `row` 行格式化为写文件用的文本
    pub fn format_cell(&self, row: usize) -> String {
        self.get(row).map(|v| v.to_string()).unwrap_or_default()
    }

    /// 取前 `n` 行
    fn head(&self, n: usize) -> Self {
        match self {
            ColumnData::Int(v) => ColumnData::Int(v.iter().take(n).copied().collect()),
            ColumnData::Float(v) => ColumnData::Float(v.iter().take(n).copied().collect()),
            ColumnData::Text(v) => ColumnData::Text(v.iter().take(n).cloned().collect()),
        }
    }

    /// 把单行列广播为 `n` 行
    fn broadcast(&self, n: usize) -> Self {
        match self {
            ColumnData::Int(v) => ColumnData::Int(vec![v[0]; n]),
            ColumnData::Float(v) => ColumnData::Float(vec![v[0]; n]),
            ColumnData::Text(v) => ColumnData::Text(vec![v[0].clone(); n]),
        }
    }
}

/// 命名列
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

impl Column {
    pub fn new(name: impl Into<String>, data: ColumnData) -> Self {
        Column {
            name: name.into(),
            data,
        }
    }
}

/// 有序命名列表格
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<Column>,
}

impl Table {
    pub fn new() -> Self {
        Table::default()
    }

    /// 从列创建表格，检查列名唯一与长度一致
    pub fn from_columns(columns: Vec<Column>) -> Result<Self> {
        columns
            .into_iter()
            .try_fold(Table::new(), |table, col| table.push(col))
    }

    /// 行数
    pub fn n_rows(&self) -> usize {
        self.columns.first().map(|c| c.data.len()).unwrap_or(0)
    }

    /// 列数
    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    /// 没有列或没有行
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() || self.n_rows() == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnData> {
        self.columns.iter().find(|c| c.name == name).map(|c| &c.data)
    }

    /// 读取数值列
    pub fn floats(&self, name: &str) -> Result<Vec<f64>> {
        let data = self
            .column(name)
            .ok_or_else(|| TransformError::MissingColumn {
                name: name.to_string(),
            })?;
        data.to_f64().ok_or_else(|| TransformError::NotNumeric {
            name: name.to_string(),
        })
    }

    /// 追加新列（列名已存在时报错）
    pub fn push(mut self, column: Column) -> Result<Self> {
        if self.contains(&column.name) {
            return Err(TransformError::DuplicateKey { key: column.name });
        }
        self.check_len(&column)?;
        self.columns.push(column);
        Ok(self)
    }

    /// 设置列：已存在则原位替换，否则追加到末尾
    pub fn with_column(mut self, name: &str, data: ColumnData) -> Result<Self> {
        let column = Column::new(name, data);
        if let Some(pos) = self.columns.iter().position(|c| c.name == name) {
            if self.columns.len() > 1 || pos != 0 {
                self.check_len(&column)?;
            }
            self.columns[pos] = column;
            Ok(self)
        } else {
            self.push(column)
        }
    }

    /// 设置浮点列的便捷形式
    pub fn with_floats(self, name: &str, values: Vec<f64>) -> Result<Self> {
        self.with_column(name, ColumnData::Float(values))
    }

    /// 按给定顺序选择列
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Table> {
        let mut columns = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            let data = self
                .column(name)
                .ok_or_else(|| TransformError::MissingColumn {
                    name: name.to_string(),
                })?;
            columns.push(Column::new(name, data.clone()));
        }
        Table::from_columns(columns)
    }

    /// 删除列（不存在的列忽略）
    pub fn without(mut self, names: &[&str]) -> Table {
        self.columns.retain(|c| !names.contains(&c.name.as_str()));
        self
    }

    /// 按位置重命名所有列
    pub fn renamed<S: AsRef<str>>(mut self, names: &[S]) -> Result<Table> {
        if names.len() != self.columns.len() {
            return Err(TransformError::InvalidArgument(format!(
                "Cannot rename {} columns with {} names",
                self.columns.len(),
                names.len()
            )));
        }
        let columns = std::mem::take(&mut self.columns);
        Table::from_columns(
            columns
                .into_iter()
                .zip(names)
                .map(|(c, n)| Column::new(n.as_ref(), c.data))
                .collect(),
        )
    }

    /// 水平拼接：`other` 的列追加在后面。单行的 `other` 广播到所有行。
    pub fn hconcat(self, other: Table) -> Result<Table> {
        let n = self.n_rows();
        let broadcast = other.n_rows() == 1 && n != 1 && !self.columns.is_empty();
        other.columns.into_iter().try_fold(self, |table, col| {
            let data = if broadcast { col.data.broadcast(n) } else { col.data };
            table.push(Column::new(col.name, data))
        })
    }

    /// 前 `n` 行
    pub fn head(&self, n: usize) -> Table {
        Table {
            columns: self
                .columns
                .iter()
                .map(|c| Column::new(c.name.clone(), c.data.head(n)))
                .collect(),
        }
    }

    /// 所有浮点列四舍五入到 `digits` 位小数
    pub fn round(&self, digits: i32) -> Table {
        Table {
            columns: self
                .columns
                .iter()
                .map(|c| Column::new(c.name.clone(), c.data.round(digits)))
                .collect(),
        }
    }

    /// 以文本形式逐行迭代
    pub fn rows(&self) -> impl Iterator<Item = Vec<String>> + '_ {
        (0..self.n_rows()).map(move |i| {
            self.columns
                .iter()
                .map(|c| c.data.format_cell(i))
                .collect()
        })
    }

    fn check_len(&self, column: &Column) -> Result<()> {
        if !self.columns.is_empty() && column.data.len() != self.n_rows() {
            return Err(TransformError::LengthMismatch {
                name: column.name.clone(),
                expected: self.n_rows(),
                found: column.data.len(),
            });
        }
        Ok(())
    }
}

/// 按 `digits` 位小数舍入（半数取偶）
pub fn round_to(value: f64, digits: i32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let factor = 10f64.powi(digits);
    let scaled = value * factor;
    if !scaled.is_finite() {
        return value;
    }
    scaled.round_ties_even() / factor
}

/// 浮点数写出格式：最短可逆表示，整数值保留 `.0` 以保持列类型
pub fn format_float(value: f64) -> String {
    format!("{:?}", value)
}
