//! # XML 仪器元数据
//!
//! 递归遍历 XML 树，按层级配置提取键值对。标签使用 Clark 记法
//! `{namespace}local`，与配置中的键一一比较。
//!
//! 四种提取形态：
//! - `key_value`：兄弟节点 `<Key>k</Key><Value>v</Value>` 成对出现
//! - `level_0`：`<key>value</key>`
//! - `level_1`：`<key><sub>value</sub></key>`，结果键为 `key_sub`
//! - `level_3`：`<key><a><b><sub>value</sub></b></a></key>`，结果键为 `a_b`
//!
//! ## 依赖关系
//! - 使用 `quick-xml` 解析，`NsReader` 解析命名空间
//! - 层级配置由 `serde` + `toml` 读取，`indexmap` 保持顺序

use crate::error::{Result, TransformError};
use crate::models::{Column, ColumnData, Table};

use indexmap::IndexMap;
use log::warn;
use quick_xml::events::Event;
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::reader::NsReader;
use regex::Regex;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

/// 帧分组子模式所在的命名空间
const OMP_NAMESPACE: &str =
    "http://schemas.datacontract.org/2004/07/Fei.Applications.Common.Omp.Interface";

/// 标签到待查找子标签列表的映射
pub type LevelMap = IndexMap<String, Vec<String>>;

/// XML 提取层级配置
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct XmlLevels {
    #[serde(alias = "key value")]
    pub key_value: LevelMap,
    #[serde(alias = "level 0")]
    pub level_0: LevelMap,
    #[serde(alias = "level 1")]
    pub level_1: LevelMap,
    #[serde(alias = "level 3")]
    pub level_3: LevelMap,
}

impl XmlLevels {
    /// 从 TOML 文本解析
    pub fn from_toml(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| TransformError::parse("TOML", path, e.to_string()))
    }

    /// 从 TOML 文件读取
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| TransformError::read(path, e))?;
        Self::from_toml(&content, path)
    }

    pub fn is_empty(&self) -> bool {
        self.key_value.is_empty()
            && self.level_0.is_empty()
            && self.level_1.is_empty()
            && self.level_3.is_empty()
    }
}

/// XML 元素节点
///
/// `text` 只保留第一个子元素之前的文本，去除首尾空白后为空视为无文本。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Node {
    pub tag: String,
    pub text: Option<String>,
    pub children: Vec<Node>,
}

impl Node {
    fn new(tag: String) -> Self {
        Node {
            tag,
            ..Default::default()
        }
    }

    /// 直接子节点中标签为 `tag` 的节点
    fn find_all<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Node> + 'a {
        self.children.iter().filter(move |c| c.tag == tag)
    }

    /// 自身及所有后代（文档顺序）
    fn descendants(&self) -> Vec<&Node> {
        let mut out = vec![self];
        for child in &self.children {
            out.extend(child.descendants());
        }
        out
    }
}

/// 去掉命名空间、首尾空白和下划线
pub fn get_key_without_prefix(key: &str) -> String {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| Regex::new(r".*\{.*\}(.*)").ok());

    let local = pattern
        .as_ref()
        .and_then(|re| re.captures(key))
        .and_then(|caps| caps.get(1))
        .map_or(key, |m| m.as_str());
    local.trim().trim_matches('_').to_string()
}

/// 插入新键；键已存在时报错
pub fn add_to_dict(data: &mut IndexMap<String, String>, key: &str, value: &str) -> Result<()> {
    if data.contains_key(key) {
        return Err(TransformError::DuplicateKey {
            key: key.to_string(),
        });
    }
    data.insert(key.to_string(), value.to_string());
    Ok(())
}

/// 读取 XML 文件并按层级配置提取为单行表格
pub fn load_xml(path: &Path, levels: &XmlLevels) -> Result<Table> {
    if levels.is_empty() {
        warn!("No XML levels configured, {} yields no columns", path.display());
    }
    let content = fs::read_to_string(path).map_err(|e| TransformError::read(path, e))?;
    let root = parse_tree(&content, path)?;
    let data = extract(&root, levels, path)?;

    let columns = data
        .into_iter()
        .map(|(key, value)| Column::new(key, ColumnData::Text(vec![value])))
        .collect();
    Table::from_columns(columns)
}

/// 解析为元素树
pub fn parse_tree(content: &str, path: &Path) -> Result<Node> {
    let xml_error = |reason: String| TransformError::XmlError {
        path: path.display().to_string(),
        reason,
    };

    let mut reader = NsReader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Node> = Vec::new();
    let mut root: Option<Node> = None;

    loop {
        let (ns, event) = reader
            .read_resolved_event()
            .map_err(|e| xml_error(e.to_string()))?;
        match event {
            Event::Start(e) => {
                let tag = clark(ns, e.local_name().as_ref()).map_err(xml_error)?;
                stack.push(Node::new(tag));
            }
            Event::Empty(e) => {
                let tag = clark(ns, e.local_name().as_ref()).map_err(xml_error)?;
                attach(&mut stack, &mut root, Node::new(tag));
            }
            Event::End(_) => {
                let node = stack
                    .pop()
                    .ok_or_else(|| xml_error("unbalanced closing tag".to_string()))?;
                attach(&mut stack, &mut root, node);
            }
            Event::Text(t) => {
                let text = t.unescape().map_err(|e| xml_error(e.to_string()))?;
                push_text(&mut stack, &text);
            }
            Event::CData(c) => {
                push_text(&mut stack, &String::from_utf8_lossy(&c.into_inner()));
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(xml_error("unclosed element at end of file".to_string()));
    }
    root.ok_or_else(|| xml_error("no root element".to_string()))
}

fn clark(ns: ResolveResult<'_>, local: &[u8]) -> std::result::Result<String, String> {
    let local = String::from_utf8_lossy(local);
    match ns {
        ResolveResult::Bound(Namespace(uri)) => {
            Ok(format!("{{{}}}{}", String::from_utf8_lossy(uri), local))
        }
        ResolveResult::Unbound => Ok(local.into_owned()),
        ResolveResult::Unknown(prefix) => Err(format!(
            "unknown namespace prefix '{}'",
            String::from_utf8_lossy(&prefix)
        )),
    }
}

fn attach(stack: &mut [Node], root: &mut Option<Node>, node: Node) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => {
            if root.is_none() {
                *root = Some(node);
            }
        }
    }
}

fn push_text(stack: &mut [Node], text: &str) {
    let text = text.trim();
    if text.is_empty() {
        return;
    }
    if let Some(node) = stack.last_mut() {
        if node.children.is_empty() {
            node.text.get_or_insert_with(String::new).push_str(text);
        }
    }
}

/// 在整棵树上应用所有层级配置
pub fn extract(root: &Node, levels: &XmlLevels, path: &Path) -> Result<IndexMap<String, String>> {
    let mut extractor = Extractor {
        levels,
        path,
        data: IndexMap::new(),
    };
    extractor.visit(root)?;
    Ok(extractor.data)
}

struct Extractor<'a> {
    levels: &'a XmlLevels,
    path: &'a Path,
    data: IndexMap<String, String>,
}

impl Extractor<'_> {
    fn visit(&mut self, node: &Node) -> Result<()> {
        let levels = self.levels;
        for (key, search) in &levels.key_value {
            self.key_value(node, key, search)?;
        }
        for key in levels.level_0.keys() {
            self.level_0(node, key)?;
        }
        for (key, search) in &levels.level_1 {
            self.level_1(node, key, search)?;
        }
        for (key, search) in &levels.level_3 {
            self.level_3(node, key, search)?;
        }
        for child in &node.children {
            self.visit(child)?;
        }
        Ok(())
    }

    fn add(&mut self, key: &str, value: &str) -> Result<()> {
        add_to_dict(&mut self.data, key, value)
    }

    fn missing_text(&self, tag: &str) -> TransformError {
        TransformError::XmlError {
            path: self.path.display().to_string(),
            reason: format!("element {} has no text", tag),
        }
    }

    fn key_value(&mut self, node: &Node, key: &str, search: &[String]) -> Result<()> {
        let keys: Vec<&Node> = node.find_all(key).collect();
        if keys.is_empty() {
            return Ok(());
        }
        let value_tag = search.first().ok_or_else(|| {
            TransformError::InvalidArgument(format!("key_value entry '{}' has no value tag", key))
        })?;
        let values: Vec<&Node> = node.find_all(value_tag).collect();
        if keys.len() != values.len() {
            return Err(TransformError::LengthMismatch {
                name: value_tag.clone(),
                expected: keys.len(),
                found: values.len(),
            });
        }

        let mut nested = Vec::new();
        for (entry_key, entry_value) in keys.into_iter().zip(values) {
            match &entry_value.text {
                Some(value) => {
                    let name = entry_key
                        .text
                        .as_deref()
                        .ok_or_else(|| self.missing_text(&entry_key.tag))?;
                    self.add(name, value)?;
                }
                None => nested.push(entry_value),
            }
        }

        let dose_fractions = format!("{{{}}}DoseFractions", OMP_NAMESPACE);
        let number_of_fractions = format!("{{{}}}NumberOffractions", OMP_NAMESPACE);
        for child in nested {
            for grand_child in &child.children {
                if grand_child.tag == dose_fractions {
                    self.dose_fractions(grand_child)?;
                } else if grand_child.tag == number_of_fractions {
                    self.number_of_fractions(grand_child)?;
                }
            }
        }
        Ok(())
    }

    /// Falcon：分组数与每组帧数
    fn dose_fractions(&mut self, node: &Node) -> Result<()> {
        let mut start = None;
        let mut end = None;
        for descendant in node.descendants() {
            if descendant.tag.contains("StartFrameNumber") {
                start = descendant.text.as_deref();
            }
            if descendant.tag.contains("EndFrameNumber") {
                end = descendant.text.as_deref();
            }
            if start.is_some() && end.is_some() {
                break;
            }
        }

        let (Some(start), Some(end)) = (start, end) else {
            return Ok(());
        };
        let start = parse_frame("StartFrameNumber", start)?;
        let end = parse_frame("EndFrameNumber", end)?;
        self.add("NumberOffractions", &node.children.len().to_string())?;
        self.add("FramesPerFraction", &(end - start + 1).to_string())
    }

    /// K2：每组一帧
    fn number_of_fractions(&mut self, node: &Node) -> Result<()> {
        let text = node
            .text
            .as_deref()
            .ok_or_else(|| self.missing_text(&node.tag))?;
        let count = parse_frame("NumberOffractions", text)?;
        self.add("NumberOffractions", &count.to_string())?;
        self.add("FramesPerFraction", "1")
    }

    fn level_0(&mut self, node: &Node, key: &str) -> Result<()> {
        if node.tag != key {
            return Ok(());
        }
        match &node.text {
            Some(text) => self.add(&get_key_without_prefix(&node.tag), text),
            None => Ok(()),
        }
    }

    fn level_1(&mut self, node: &Node, key: &str, search: &[String]) -> Result<()> {
        if node.tag != key {
            return Ok(());
        }
        let search = stripped(search);
        let key_1 = get_key_without_prefix(key);
        for child in &node.children {
            let key_2 = get_key_without_prefix(&child.tag);
            for _ in search.iter().filter(|s| **s == key_2) {
                let text = child
                    .text
                    .as_deref()
                    .ok_or_else(|| self.missing_text(&child.tag))?;
                self.add(&format!("{}_{}", key_1, key_2), text)?;
            }
        }
        Ok(())
    }

    fn level_3(&mut self, node: &Node, key: &str, search: &[String]) -> Result<()> {
        if node.tag != key {
            return Ok(());
        }
        let search = stripped(search);
        for child in &node.children {
            let key_1 = get_key_without_prefix(&child.tag);
            for grand_child in &child.children {
                let combined = format!("{}_{}", key_1, get_key_without_prefix(&grand_child.tag));
                for leaf in &grand_child.children {
                    let tag = get_key_without_prefix(&leaf.tag);
                    for _ in search.iter().filter(|s| **s == tag) {
                        let text = leaf
                            .text
                            .as_deref()
                            .ok_or_else(|| self.missing_text(&leaf.tag))?;
                        self.add(&combined, text)?;
                    }
                }
            }
        }
        Ok(())
    }
}

fn stripped(keys: &[String]) -> Vec<String> {
    keys.iter().map(|k| get_key_without_prefix(k)).collect()
}

fn parse_frame(key: &str, text: &str) -> Result<i64> {
    text.trim().parse().map_err(|_| TransformError::MetaParse {
        key: key.to_string(),
        value: text.to_string(),
    })
}
