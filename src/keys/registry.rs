//! # STAR 键注册表
//!
//! 按模式版本保存 STAR 键字典，负责头部版本检测与导出头部构建。
//!
//! ## 功能
//! - 内置 RELION 2 / RELION 3 键定义（编译进二进制）
//! - 从目录扫描 `star_keys_<version>.txt`
//! - 头部版本自动检测（取能解释全部字段的最新版本）
//! - 导出时丢弃目标版本未知的字段
//!
//! ## 依赖关系
//! - 被 `formats/star.rs`, `commands/keys.rs` 使用
//! - 使用 `keys/mod.rs` 解析键定义

use super::{load_key_definitions, load_key_file, parse_keys, KeyMap, PREFIX_KEY};
use crate::error::{Result, TransformError};
use log::{debug, warn};
use regex::Regex;
use std::path::Path;

const RELION_2_KEYS: &str = include_str!("../../keys/star_keys_relion_2.txt");
const RELION_3_KEYS: &str = include_str!("../../keys/star_keys_relion_3.txt");

/// 单个模式版本的键字典
#[derive(Debug, Clone)]
pub struct KeyDictionary {
    version: String,
    prefix: String,
    /// 磁盘名 → 内部名
    import: KeyMap,
    /// 内部名 → 磁盘名
    export: KeyMap,
}

impl KeyDictionary {
    /// 从原始键列表构建；资源必须声明 `STAR_PREFIX`
    pub fn from_definitions<S: AsRef<str>>(version: &str, raw_keys: &[S]) -> Result<Self> {
        let mut import = parse_keys(raw_keys, false)?;
        let mut export = parse_keys(raw_keys, true)?;

        let prefix = import
            .shift_remove(PREFIX_KEY)
            .ok_or_else(|| TransformError::MissingPrefix {
                version: version.to_string(),
            })?;
        export.shift_remove(PREFIX_KEY);

        Ok(KeyDictionary {
            version: version.to_string(),
            prefix,
            import,
            export,
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// 键数量（不含前缀）
    pub fn len(&self) -> usize {
        self.import.len()
    }

    pub fn is_empty(&self) -> bool {
        self.import.is_empty()
    }

    /// 所有 (内部名, 磁盘名) 对
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.export.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// 去掉头部字段的 `_<prefix>` 命名空间
    pub fn strip_prefix<'a>(&self, field: &'a str) -> Option<&'a str> {
        field.strip_prefix('_')?.strip_prefix(self.prefix.as_str())
    }

    /// 头部字段 → 内部名
    pub fn to_internal(&self, field: &str) -> Option<&str> {
        let bare = self.strip_prefix(field)?;
        self.import.get(bare).map(String::as_str)
    }

    /// 内部名 → 磁盘名（不带前缀）
    pub fn to_on_disk(&self, internal: &str) -> Option<&str> {
        self.export.get(internal).map(String::as_str)
    }

    /// 该版本能否解释给定的头部字段
    pub fn explains(&self, field: &str) -> bool {
        self.to_internal(field).is_some()
    }
}

/// 导出头部结果
#[derive(Debug, Clone, PartialEq)]
pub struct ExportHeader {
    /// 目标版本
    pub version: String,
    /// 目标版本的磁盘名（不带前缀）
    pub on_disk: Vec<String>,
    /// 被保留的内部列名，与 `on_disk` 一一对应
    pub kept: Vec<String>,
    /// 目标版本的命名空间前缀
    pub prefix: String,
}

/// 版本化键注册表，版本按从旧到新排列
#[derive(Debug, Clone)]
pub struct KeyRegistry {
    dictionaries: Vec<KeyDictionary>,
}

impl KeyRegistry {
    /// 内置的 RELION 键定义
    pub fn builtin() -> Result<Self> {
        Self::from_sources(&[("relion_2", RELION_2_KEYS), ("relion_3", RELION_3_KEYS)])
    }

    /// 从 (版本名, 资源文本) 列表构建
    pub fn from_sources(sources: &[(&str, &str)]) -> Result<Self> {
        let mut dictionaries = Vec::with_capacity(sources.len());
        for (version, content) in sources {
            let raw = load_key_definitions(content)?;
            dictionaries.push(KeyDictionary::from_definitions(version, &raw)?);
        }
        Self::from_dictionaries(dictionaries)
    }

    /// 扫描目录中的 `star_keys_*.txt`
    pub fn from_dir(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(TransformError::DirectoryNotFound {
                path: dir.display().to_string(),
            });
        }

        let pattern = dir.join("star_keys_*.txt");
        let pattern = pattern.to_string_lossy();
        let version_match = Regex::new(r"star_keys_(.*)\.txt$")
            .map_err(|e| TransformError::InvalidArgument(e.to_string()))?;
        let paths = glob::glob(&pattern)
            .map_err(|e| TransformError::InvalidArgument(e.to_string()))?;

        let mut dictionaries = Vec::new();
        for entry in paths {
            let path = entry.map_err(|e| TransformError::InvalidArgument(e.to_string()))?;
            let file_name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default()
                .to_string();
            let Some(caps) = version_match.captures(&file_name) else {
                continue;
            };
            let raw = load_key_file(&path)?;
            debug!("Loaded {} key definitions from {}", raw.len(), path.display());
            dictionaries.push(KeyDictionary::from_definitions(&caps[1], &raw)?);
        }

        if dictionaries.is_empty() {
            return Err(TransformError::FileNotFound {
                path: pattern.to_string(),
            });
        }
        Self::from_dictionaries(dictionaries)
    }

    fn from_dictionaries(mut dictionaries: Vec<KeyDictionary>) -> Result<Self> {
        if dictionaries.is_empty() {
            return Err(TransformError::InvalidArgument(
                "Key registry needs at least one schema version".to_string(),
            ));
        }
        dictionaries.sort_by_cached_key(|d| natural_key(&d.version));
        for pair in dictionaries.windows(2) {
            if pair[0].version == pair[1].version {
                return Err(TransformError::DuplicateKey {
                    key: pair[0].version.clone(),
                });
            }
        }
        Ok(KeyRegistry { dictionaries })
    }

    /// 已注册版本（从旧到新）
    pub fn versions(&self) -> Vec<String> {
        self.dictionaries.iter().map(|d| d.version.clone()).collect()
    }

    pub fn dictionaries(&self) -> &[KeyDictionary] {
        &self.dictionaries
    }

    /// 最新版本
    pub fn latest(&self) -> &KeyDictionary {
        &self.dictionaries[self.dictionaries.len() - 1]
    }

    /// 按名称查找版本
    pub fn get(&self, version: &str) -> Result<&KeyDictionary> {
        self.dictionaries
            .iter()
            .find(|d| d.version == version)
            .ok_or_else(|| TransformError::UnknownSchema {
                version: version.to_string(),
                known: self.versions(),
            })
    }

    /// 指定版本或最新版本
    pub fn resolve(&self, version: Option<&str>) -> Result<&KeyDictionary> {
        match version {
            Some(v) => self.get(v),
            None => Ok(self.latest()),
        }
    }

    /// 检测头部所属的模式版本
    ///
    /// 每个字段都必须被至少一个版本解释；所有字段共同的候选版本中取最新的。
    pub fn detect_version<S: AsRef<str>>(&self, header: &[S]) -> Result<&KeyDictionary> {
        if header.is_empty() {
            return Err(TransformError::EmptyHeader);
        }

        let mut candidates: Vec<&KeyDictionary> = self.dictionaries.iter().collect();
        for field in header {
            let field = field.as_ref();
            let holders: Vec<&KeyDictionary> = self
                .dictionaries
                .iter()
                .filter(|d| d.explains(field))
                .collect();
            if holders.is_empty() {
                return Err(TransformError::UnknownKey {
                    key: field.to_string(),
                });
            }
            candidates.retain(|c| holders.iter().any(|h| h.version == c.version));
        }

        let Some(&chosen) = candidates.last() else {
            return Err(TransformError::NoCommonVersion {
                keys: header.iter().map(|f| f.as_ref().to_string()).collect(),
            });
        };
        debug!(
            "Detected STAR schema {} from {} header fields",
            chosen.version,
            header.len()
        );
        Ok(chosen)
    }

    /// 把磁盘头部转换为内部列名；未指定版本时自动检测
    pub fn import_header<S: AsRef<str>>(
        &self,
        header: &[S],
        version: Option<&str>,
    ) -> Result<(Vec<String>, &KeyDictionary)> {
        let dictionary = match version {
            Some(v) => self.get(v)?,
            None => self.detect_version(header)?,
        };

        let mut names = Vec::with_capacity(header.len());
        for field in header {
            let field = field.as_ref();
            let internal = dictionary
                .to_internal(field)
                .ok_or_else(|| TransformError::UnknownKey {
                    key: field.to_string(),
                })?;
            names.push(internal.to_string());
        }
        Ok((names, dictionary))
    }

    /// 为内部列名构建目标版本的导出头部
    ///
    /// 目标版本不认识的列被丢弃；全部被丢弃时报错。
    pub fn export_header<S: AsRef<str>>(
        &self,
        names: &[S],
        version: Option<&str>,
    ) -> Result<ExportHeader> {
        let dictionary = self.resolve(version)?;

        let mut on_disk = Vec::with_capacity(names.len());
        let mut kept = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            match dictionary.to_on_disk(name) {
                Some(target) => {
                    on_disk.push(target.to_string());
                    kept.push(name.to_string());
                }
                None => warn!(
                    "Column '{}' is not part of STAR schema {}, dropping it",
                    name, dictionary.version
                ),
            }
        }

        if on_disk.is_empty() {
            return Err(TransformError::NothingToExport {
                version: dictionary.version.clone(),
            });
        }

        Ok(ExportHeader {
            version: dictionary.version.clone(),
            on_disk,
            kept,
            prefix: dictionary.prefix.clone(),
        })
    }
}

/// 自然排序键：连续数字按数值比较
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Chunk {
    Number(u64),
    Text(String),
}

fn natural_key(text: &str) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut digits = String::new();
    let mut letters = String::new();
    for ch in text.chars() {
        if ch.is_ascii_digit() {
            if !letters.is_empty() {
                chunks.push(Chunk::Text(std::mem::take(&mut letters)));
            }
            digits.push(ch);
        } else {
            if !digits.is_empty() {
                chunks.push(Chunk::Number(digits.parse().unwrap_or(u64::MAX)));
                digits.clear();
            }
            letters.push(ch);
        }
    }
    if !digits.is_empty() {
        chunks.push(Chunk::Number(digits.parse().unwrap_or(u64::MAX)));
    }
    if !letters.is_empty() {
        chunks.push(Chunk::Text(letters));
    }
    chunks
}
