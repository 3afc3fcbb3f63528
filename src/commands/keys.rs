//! # keys 命令实现
//!
//! 列出已注册的 STAR 模式版本，或某一版本的全部键。
//!
//! ## 依赖关系
//! - 使用 `cli/keys.rs` 定义的参数
//! - 使用 `tabled` 渲染表格

use super::load_registry;
use crate::cli::keys::KeysArgs;
use crate::utils::output;

use anyhow::Result;
use cryoconv::keys::KeyDictionary;
use cryoconv::KeyRegistry;
use tabled::{Table, Tabled};

#[derive(Debug, Clone, Tabled)]
struct VersionRow {
    #[tabled(rename = "Version")]
    version: String,
    #[tabled(rename = "Prefix")]
    prefix: String,
    #[tabled(rename = "Keys")]
    keys: usize,
}

#[derive(Debug, Clone, Tabled)]
struct KeyRow {
    #[tabled(rename = "Internal")]
    internal: String,
    #[tabled(rename = "On disk")]
    on_disk: String,
}

/// 执行 keys 命令
pub fn execute(args: KeysArgs) -> Result<()> {
    let registry = load_registry(args.keys_dir.as_deref())?;

    match args.version.as_deref() {
        None => {
            output::print_header("STAR schema versions");
            println!("{}", Table::new(version_rows(&registry)));
            output::print_info(&format!("Latest: {}", registry.latest().version()));
        }
        Some(version) => {
            let dictionary = registry.get(version)?;
            output::print_header(&format!(
                "STAR keys of {} (prefix '{}')",
                dictionary.version(),
                dictionary.prefix()
            ));
            println!("{}", Table::new(key_rows(dictionary)));
            output::print_success(&format!("{} keys", dictionary.len()));
        }
    }
    Ok(())
}

fn version_rows(registry: &KeyRegistry) -> Vec<VersionRow> {
    registry
        .dictionaries()
        .iter()
        .map(|d| VersionRow {
            version: d.version().to_string(),
            prefix: d.prefix().to_string(),
            keys: d.len(),
        })
        .collect()
}

fn key_rows(dictionary: &KeyDictionary) -> Vec<KeyRow> {
    dictionary
        .entries()
        .map(|(internal, on_disk)| KeyRow {
            internal: internal.to_string(),
            on_disk: format!("_{}{}", dictionary.prefix(), on_disk),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_rows_follow_registry_order() {
        let registry = KeyRegistry::builtin().unwrap();
        let rows = version_rows(&registry);
        let versions: Vec<_> = rows.iter().map(|r| r.version.as_str()).collect();
        assert_eq!(versions, vec!["relion_2", "relion_3"]);
        assert!(rows.iter().all(|r| r.prefix == "rln" && r.keys > 0));
    }

    #[test]
    fn test_key_rows_carry_prefix() {
        let registry =
            KeyRegistry::from_sources(&[("custom", "STAR_PREFIX:rln\nDefocusU\nPixel:DetectorPixelSize\n")])
                .unwrap();
        let rows = key_rows(registry.latest());
        assert_eq!(rows[0].on_disk, "_rlnDefocusU");
        assert_eq!(rows[1].internal, "Pixel");
        assert_eq!(rows[1].on_disk, "_rlnDetectorPixelSize");
    }
}
