//! # 键定义模块
//!
//! 读取按版本划分的键定义资源，并构建内部名与磁盘名之间的映射。
//!
//! ## 资源格式
//! ```text
//! # 注释
//! STAR_PREFIX:rln
//! DefocusU                     # 内部名与磁盘名相同
//! internal_name:OnDiskName     # 内部名:磁盘名
//! ```
//!
//! ## 依赖关系
//! - 被 `keys/registry.rs` 使用
//! - 子模块: registry

pub mod registry;

pub use registry::{ExportHeader, KeyDictionary, KeyRegistry};

use crate::error::{Result, TransformError};
use indexmap::IndexMap;
use std::fs;
use std::path::Path;

/// 保留键：命名空间前缀
pub const PREFIX_KEY: &str = "STAR_PREFIX";

/// 键映射（保持资源中的顺序）
pub type KeyMap = IndexMap<String, String>;

/// 从文件读取原始键列表
pub fn load_key_file(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path).map_err(|e| TransformError::read(path, e))?;
    load_key_definitions(&content)
}

/// 从资源文本读取原始键列表
///
/// 每个非空行去掉 `#` 之后的内容即为一个键；键内不允许出现空白。
pub fn load_key_definitions(content: &str) -> Result<Vec<String>> {
    let mut keys = Vec::new();
    for line in content.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let key = line.split('#').next().unwrap_or("").trim();
        if key.is_empty() {
            // 纯注释行
            continue;
        }
        if key.chars().any(char::is_whitespace) {
            return Err(TransformError::InvalidKeyToken {
                key: key.to_string(),
            });
        }
        keys.push(key.to_string());
    }
    Ok(keys)
}

/// 把原始键解析为映射
///
/// - `export == false`: 磁盘名 → 内部名（导入方向）
/// - `export == true`: 内部名 → 磁盘名（导出方向）
///
/// `STAR_PREFIX` 在两个方向上都保持 `STAR_PREFIX → 前缀`。
pub fn parse_keys<S: AsRef<str>>(raw_keys: &[S], export: bool) -> Result<KeyMap> {
    let mut output = KeyMap::new();
    for raw in raw_keys {
        let raw = raw.as_ref();
        let (map_key, map_value) = match split_key(raw)? {
            (PREFIX_KEY, prefix) => (PREFIX_KEY, prefix.unwrap_or("")),
            (internal, None) => (internal, internal),
            (internal, Some(on_disk)) if export => (internal, on_disk),
            (internal, Some(on_disk)) => (on_disk, internal),
        };
        if output.contains_key(map_key) {
            return Err(TransformError::DuplicateKey {
                key: map_key.to_string(),
            });
        }
        output.insert(map_key.to_string(), map_value.to_string());
    }
    Ok(output)
}

/// 拆分 `internal[:on_disk]`
fn split_key(raw: &str) -> Result<(&str, Option<&str>)> {
    let mut parts = raw.split(':');
    let first = parts.next().unwrap_or("");
    let second = parts.next();
    if parts.next().is_some() || first.is_empty() || second == Some("") && first != PREFIX_KEY {
        return Err(TransformError::InvalidKeyToken {
            key: raw.to_string(),
        });
    }
    Ok((first, second))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_keys_strips_comments() {
        let content = "test_a # test\ntest_b # TEST1 # test2\n\n   \ntest_c\n";
        let keys = load_key_definitions(content).unwrap();
        assert_eq!(keys, vec!["test_a", "test_b", "test_c"]);
    }

    #[test]
    fn test_load_keys_empty_resource() {
        assert!(load_key_definitions("").unwrap().is_empty());
    }

    #[test]
    fn test_load_keys_whitespace_rejected() {
        let result = load_key_definitions("test_a TEST1 # test\n");
        assert!(matches!(result, Err(TransformError::InvalidKeyToken { .. })));
    }

    #[test]
    fn test_load_key_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("star_keys_test.txt");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "STAR_PREFIX:rln").unwrap();
        writeln!(file, "CoordinateX # x").unwrap();
        drop(file);
        assert_eq!(
            load_key_file(&path).unwrap(),
            vec!["STAR_PREFIX:rln", "CoordinateX"]
        );
    }

    #[test]
    fn test_parse_plain_key_both_directions() {
        let expected: KeyMap = [("test".to_string(), "test".to_string())].into_iter().collect();
        assert_eq!(parse_keys(&["test"], false).unwrap(), expected);
        assert_eq!(parse_keys(&["test"], true).unwrap(), expected);
    }

    #[test]
    fn test_parse_mapped_key() {
        let import = parse_keys(&["test:test2"], false).unwrap();
        assert_eq!(import.get("test2").map(String::as_str), Some("test"));
        let export = parse_keys(&["test:test2"], true).unwrap();
        assert_eq!(export.get("test").map(String::as_str), Some("test2"));
    }

    #[test]
    fn test_prefix_never_inverted() {
        for export in [false, true] {
            let map = parse_keys(&["STAR_PREFIX:rln", "a:b"], export).unwrap();
            assert_eq!(map.get(PREFIX_KEY).map(String::as_str), Some("rln"));
        }
        let bare = parse_keys(&["STAR_PREFIX"], false).unwrap();
        assert_eq!(bare.get(PREFIX_KEY).map(String::as_str), Some(""));
    }

    #[test]
    fn test_duplicate_on_disk_name_rejected() {
        let result = parse_keys(&["a:x", "b:x"], false);
        assert!(matches!(result, Err(TransformError::DuplicateKey { .. })));
        // 导出方向上同一内部名映射两次同样报错
        let result = parse_keys(&["a:x", "a:y"], true);
        assert!(matches!(result, Err(TransformError::DuplicateKey { .. })));
    }

    #[test]
    fn test_malformed_key_rejected() {
        assert!(parse_keys(&["a:b:c"], false).is_err());
        assert!(parse_keys(&[":b"], false).is_err());
    }
}
