//! 目录树清单

use crate::storage::EntryKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 清单条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryEntry {
    /// 相对扫描根的路径，使用 `/` 分隔，无前导分隔符
    pub relative_path: String,
    pub kind: EntryKind,
    /// 文件字节数；目录为 None（统一的"无大小"标记）
    pub size: Option<u64>,
}

impl InventoryEntry {
    pub fn file(relative_path: impl Into<String>, size: u64) -> Self {
        Self {
            relative_path: relative_path.into(),
            kind: EntryKind::File,
            size: Some(size),
        }
    }

    pub fn directory(relative_path: impl Into<String>) -> Self {
        Self {
            relative_path: relative_path.into(),
            kind: EntryKind::Directory,
            size: None,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    /// 用于比较的大小标记
    pub fn size_marker(&self) -> Option<u64> {
        self.size
    }
}

/// 格式化大小标记（日志用）
pub fn format_marker(marker: Option<u64>) -> String {
    match marker {
        Some(size) => format!("{} 字节", size),
        None => "目录".to_string(),
    }
}

/// 一次扫描得到的清单：相对路径 -> 条目
///
/// 按相对路径排序迭代。扫描完成后只读。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    entries: BTreeMap<String, InventoryEntry>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, entry: InventoryEntry) {
        self.entries.insert(entry.relative_path.clone(), entry);
    }

    pub fn get(&self, relative_path: &str) -> Option<&InventoryEntry> {
        self.entries.get(relative_path)
    }

    pub fn contains(&self, relative_path: &str) -> bool {
        self.entries.contains_key(relative_path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &InventoryEntry> {
        self.entries.values()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn file_count(&self) -> usize {
        self.iter().filter(|e| !e.is_dir()).count()
    }

    pub fn dir_count(&self) -> usize {
        self.iter().filter(|e| e.is_dir()).count()
    }

    /// 所有文件的总字节数
    pub fn total_bytes(&self) -> u64 {
        self.iter().filter_map(|e| e.size).sum()
    }
}

impl FromIterator<InventoryEntry> for Inventory {
    fn from_iter<T: IntoIterator<Item = InventoryEntry>>(iter: T) -> Self {
        let mut inventory = Inventory::new();
        for entry in iter {
            inventory.insert(entry);
        }
        inventory
    }
}
