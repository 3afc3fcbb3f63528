//! # MRC 头部元数据
//!
//! 读取 1024 字节主头部（MRC2014 布局），字节序由 machine stamp 决定；
//! 扩展头为 `FEI1` / `FEI2` 时还解码第一帧记录的前导字段。
//! 结果为单行表格，不读取像素数据。
//!
//! ## 依赖关系
//! - 使用 `byteorder` 解码二进制字段

use crate::error::{Result, TransformError};
use crate::models::{Column, ColumnData, Table, Value};

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use log::warn;
use std::fs::File;
use std::io::Read;
use std::path::Path;

const HEADER_SIZE: usize = 1024;
const LABEL_SIZE: usize = 80;
const MACHST_OFFSET: usize = 212;

/// FEI 扩展头记录中解码的字段：(名称, 偏移, 类型)
const FEI_FIELDS: [(&str, usize, FeiType); 19] = [
    ("Metadata size", 0, FeiType::I32),
    ("Metadata version", 4, FeiType::I32),
    ("Bitmask 1", 8, FeiType::U32),
    ("Timestamp", 12, FeiType::F64),
    ("Microscope type", 20, FeiType::Text),
    ("D-Number", 36, FeiType::Text),
    ("Application", 52, FeiType::Text),
    ("Application version", 68, FeiType::Text),
    ("HT", 84, FeiType::F64),
    ("Dose", 92, FeiType::F64),
    ("Alpha tilt", 100, FeiType::F64),
    ("Beta tilt", 108, FeiType::F64),
    ("X-Stage", 116, FeiType::F64),
    ("Y-Stage", 124, FeiType::F64),
    ("Z-Stage", 132, FeiType::F64),
    ("Tilt axis angle", 140, FeiType::F64),
    ("Dual axis rotation", 148, FeiType::F64),
    ("Pixel size X", 156, FeiType::F64),
    ("Pixel size Y", 164, FeiType::F64),
];

/// FEI 记录中解码部分的长度
const FEI_DECODED_SIZE: usize = 172;
const FEI_TEXT_SIZE: usize = 16;

#[derive(Debug, Clone, Copy)]
enum FeiType {
    I32,
    U32,
    F64,
    Text,
}

/// 读取 MRC 头部元数据
pub fn load_mrc_header(path: &Path) -> Result<Table> {
    let mut file = File::open(path).map_err(|e| TransformError::read(path, e))?;
    let mut header = [0u8; HEADER_SIZE];
    file.read_exact(&mut header)
        .map_err(|e| short_file(path, "primary header", e))?;

    let little = match header[MACHST_OFFSET] {
        0x44 | 0x41 => true,
        0x11 => false,
        other => {
            warn!(
                "Unrecognised MRC machine stamp 0x{:02x} in {}, assuming little endian",
                other,
                path.display()
            );
            true
        }
    };

    let mut fields = if little {
        primary_fields::<LittleEndian>(&header)
    } else {
        primary_fields::<BigEndian>(&header)
    };

    let nsymbt = if little {
        LittleEndian::read_i32(&header[92..96])
    } else {
        BigEndian::read_i32(&header[92..96])
    };
    let exttyp = text(&header[104..108]);

    if matches!(exttyp.as_str(), "FEI1" | "FEI2") {
        if nsymbt < 0 || (nsymbt as usize) < FEI_DECODED_SIZE {
            return Err(TransformError::parse(
                "MRC",
                path,
                format!("{} extended header is only {} bytes", exttyp, nsymbt),
            ));
        }
        let mut record = [0u8; FEI_DECODED_SIZE];
        file.read_exact(&mut record)
            .map_err(|e| short_file(path, "extended header", e))?;
        fields.extend(fei_fields(&record));
    }

    let columns = fields
        .into_iter()
        .map(|(name, value)| Column::new(name, single(value)))
        .collect();
    Table::from_columns(columns)
}

fn primary_fields<B: ByteOrder>(h: &[u8]) -> Vec<(String, Value)> {
    let int = |offset: usize| Value::Int(B::read_i32(&h[offset..offset + 4]) as i64);
    let float = |offset: usize| Value::Float(B::read_f32(&h[offset..offset + 4]) as f64);

    let mut fields: Vec<(String, Value)> = Vec::new();
    let ints = [
        "nx", "ny", "nz", "mode", "nxstart", "nystart", "nzstart", "mx", "my", "mz",
    ];
    for (i, name) in ints.iter().enumerate() {
        fields.push((name.to_string(), int(i * 4)));
    }
    let cell = [
        "cella_x", "cella_y", "cella_z", "cellb_alpha", "cellb_beta", "cellb_gamma",
    ];
    for (i, name) in cell.iter().enumerate() {
        fields.push((name.to_string(), float(40 + i * 4)));
    }
    for (i, name) in ["mapc", "mapr", "maps"].iter().enumerate() {
        fields.push((name.to_string(), int(64 + i * 4)));
    }
    for (i, name) in ["dmin", "dmax", "dmean"].iter().enumerate() {
        fields.push((name.to_string(), float(76 + i * 4)));
    }
    fields.push(("ispg".to_string(), int(88)));
    fields.push(("nsymbt".to_string(), int(92)));
    fields.push(("exttyp".to_string(), Value::Text(text(&h[104..108]))));
    fields.push(("nversion".to_string(), int(108)));
    for (i, name) in ["origin_x", "origin_y", "origin_z"].iter().enumerate() {
        fields.push((name.to_string(), float(196 + i * 4)));
    }
    fields.push(("map".to_string(), Value::Text(text(&h[208..212]))));
    fields.push((
        "machst".to_string(),
        Value::Text(
            h[MACHST_OFFSET..MACHST_OFFSET + 4]
                .iter()
                .map(|b| format!("{:02x}", b))
                .collect(),
        ),
    ));
    fields.push(("rms".to_string(), float(216)));

    let nlabl = B::read_i32(&h[220..224]).clamp(0, 10) as usize;
    fields.push(("nlabl".to_string(), Value::Int(nlabl as i64)));
    for i in 0..nlabl {
        let start = 224 + i * LABEL_SIZE;
        fields.push((
            format!("label_{}", i),
            Value::Text(text(&h[start..start + LABEL_SIZE])),
        ));
    }
    fields
}

/// FEI 扩展头固定为小端
fn fei_fields(record: &[u8]) -> Vec<(String, Value)> {
    FEI_FIELDS
        .iter()
        .map(|(name, offset, kind)| {
            let o = *offset;
            let value = match kind {
                FeiType::I32 => Value::Int(LittleEndian::read_i32(&record[o..o + 4]) as i64),
                FeiType::U32 => Value::Int(LittleEndian::read_u32(&record[o..o + 4]) as i64),
                FeiType::F64 => Value::Float(LittleEndian::read_f64(&record[o..o + 8])),
                FeiType::Text => Value::Text(text(&record[o..o + FEI_TEXT_SIZE])),
            };
            (name.to_string(), value)
        })
        .collect()
}

fn text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_end_matches(['\0', ' '])
        .to_string()
}

fn single(value: Value) -> ColumnData {
    match value {
        Value::Int(v) => ColumnData::Int(vec![v]),
        Value::Float(v) => ColumnData::Float(vec![v]),
        Value::Text(v) => ColumnData::Text(vec![v]),
    }
}

fn short_file(path: &Path, part: &str, e: std::io::Error) -> TransformError {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        TransformError::parse("MRC", path, format!("file ends inside the {}", part))
    } else {
        TransformError::read(path, e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::WriteBytesExt;
    use std::io::Write;

    fn header<B: ByteOrder>(stamp: [u8; 4], exttyp: &[u8; 4], nsymbt: i32) -> Vec<u8> {
        let mut h = Vec::with_capacity(HEADER_SIZE);
        for v in [4u32, 5, 1, 2] {
            h.write_u32::<B>(v).unwrap();
        }
        h.resize(40, 0);
        for v in [4.5f32, 5.5, 1.0, 90.0, 90.0, 90.0] {
            h.write_f32::<B>(v).unwrap();
        }
        h.resize(92, 0);
        h.write_i32::<B>(nsymbt).unwrap();
        h.resize(104, 0);
        h.write_all(exttyp).unwrap();
        h.write_i32::<B>(20140).unwrap();
        h.resize(208, 0);
        h.write_all(b"MAP ").unwrap();
        h.write_all(&stamp).unwrap();
        h.write_f32::<B>(0.25).unwrap();
        h.write_i32::<B>(1).unwrap();
        h.write_all(b"cryoconv test label").unwrap();
        h.resize(HEADER_SIZE, 0);
        h
    }

    #[test]
    fn test_little_endian_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.mrc");
        std::fs::write(&path, header::<LittleEndian>([0x44, 0x44, 0, 0], b"    ", 0)).unwrap();

        let table = load_mrc_header(&path).unwrap();
        assert_eq!(table.n_rows(), 1);
        assert_eq!(table.column("nx"), Some(&ColumnData::Int(vec![4])));
        assert_eq!(table.column("mode"), Some(&ColumnData::Int(vec![2])));
        assert_eq!(table.floats("cella_x").unwrap(), vec![4.5]);
        assert_eq!(table.column("nversion"), Some(&ColumnData::Int(vec![20140])));
        assert_eq!(
            table.column("label_0"),
            Some(&ColumnData::Text(vec!["cryoconv test label".to_string()]))
        );
        assert!(!table.contains("HT"));
    }

    #[test]
    fn test_big_endian_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.mrc");
        std::fs::write(&path, header::<BigEndian>([0x11, 0x11, 0, 0], b"    ", 0)).unwrap();

        let table = load_mrc_header(&path).unwrap();
        assert_eq!(table.column("ny"), Some(&ColumnData::Int(vec![5])));
        assert_eq!(table.floats("rms").unwrap(), vec![0.25]);
    }

    #[test]
    fn test_fei_extended_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.mrc");
        let mut data = header::<LittleEndian>([0x44, 0x44, 0, 0], b"FEI1", 768);
        let mut record = Vec::new();
        record.write_i32::<LittleEndian>(768).unwrap();
        record.write_i32::<LittleEndian>(2).unwrap();
        record.write_u32::<LittleEndian>(7).unwrap();
        record.write_f64::<LittleEndian>(43000.5).unwrap();
        for name in [&b"TITAN52"[..], b"D1234", b"EPU", b"2.3.0"] {
            let mut field = name.to_vec();
            field.resize(FEI_TEXT_SIZE, 0);
            record.extend(field);
        }
        record.write_f64::<LittleEndian>(300000.0).unwrap();
        record.write_f64::<LittleEndian>(1.5).unwrap();
        record.resize(768, 0);
        data.extend(record);
        std::fs::write(&path, data).unwrap();

        let table = load_mrc_header(&path).unwrap();
        assert_eq!(table.column("exttyp"), Some(&ColumnData::Text(vec!["FEI1".to_string()])));
        assert_eq!(table.column("Metadata version"), Some(&ColumnData::Int(vec![2])));
        assert_eq!(
            table.column("Microscope type"),
            Some(&ColumnData::Text(vec!["TITAN52".to_string()]))
        );
        assert_eq!(table.floats("HT").unwrap(), vec![300000.0]);
        assert_eq!(table.floats("Dose").unwrap(), vec![1.5]);
    }

    #[test]
    fn test_truncated_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.mrc");
        std::fs::write(&path, [0u8; 100]).unwrap();
        assert!(matches!(
            load_mrc_header(&path),
            Err(TransformError::ParseError { .. })
        ));
    }
}
