use crate::core::inventory::{format_marker, Inventory, InventoryEntry};
use crate::error::{Result, SyncError};
use crate::storage::EntryKind;
use serde::Serialize;
use tracing::{debug, info};

/// 选中复制的原因
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum ChangeReason {
    /// 目标中不存在
    Missing { size: Option<u64> },
    /// 两边都有，但大小标记不同
    SizeChanged {
        source: Option<u64>,
        destination: Option<u64>,
    },
}

/// 需要复制的单个条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Change {
    pub path: String,
    pub kind: EntryKind,
    pub reason: ChangeReason,
}

impl Change {
    /// 源文件字节数（目录为 0）
    pub fn source_bytes(&self) -> u64 {
        match self.reason {
            ChangeReason::Missing { size } => size.unwrap_or(0),
            ChangeReason::SizeChanged { source, .. } => source.unwrap_or(0),
        }
    }
}

/// 比较结果：按源清单顺序排列的待复制路径
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeSet {
    changes: Vec<Change>,
    unchanged: usize,
}

impl ChangeSet {
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Change> {
        self.changes.iter()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.changes.iter().map(|c| c.path.as_str())
    }

    pub fn contains(&self, path: &str) -> bool {
        self.changes.iter().any(|c| c.path == path)
    }

    /// 大小标记相同、无需复制的条目数
    pub fn unchanged_count(&self) -> usize {
        self.unchanged
    }

    pub fn summary(&self) -> ActionSummary {
        ActionSummary {
            copy_count: self.changes.len(),
            copy_bytes: self.changes.iter().map(Change::source_bytes).sum(),
            skip_count: self.unchanged,
        }
    }
}

impl<'a> IntoIterator for &'a ChangeSet {
    type Item = &'a Change;
    type IntoIter = std::slice::Iter<'a, Change>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.iter()
    }
}

/// 文件比较结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileRelation {
    /// 大小标记相同
    Equal,
    /// 大小标记不同
    Different,
}

/// 清单比较器（只比较大小，不计算内容哈希）
#[derive(Debug, Default)]
pub struct FileComparator;

impl FileComparator {
    pub fn new() -> Self {
        Self
    }

    /// 比较两个条目
    ///
    /// 目录的标记统一为 None，所以两边都是目录时总是相等；
    /// 一边文件一边目录时标记不同。
    pub fn compare_files(&self, source: &InventoryEntry, dest: &InventoryEntry) -> FileRelation {
        if source.size_marker() == dest.size_marker() {
            FileRelation::Equal
        } else {
            FileRelation::Different
        }
    }

    /// 比较两个清单，返回需要复制的路径
    ///
    /// 只遍历源清单，不递归，目标中多出的条目不处理。
    /// 任一清单缺失（上游扫描失败）时返回 `SyncError::InvalidInput`。
    pub fn compare_trees(
        &self,
        source: Option<&Inventory>,
        dest: Option<&Inventory>,
    ) -> Result<ChangeSet> {
        let source =
            source.ok_or_else(|| SyncError::InvalidInput("缺少源清单".to_string()))?;
        let dest = dest.ok_or_else(|| SyncError::InvalidInput("缺少目标清单".to_string()))?;

        let mut change_set = ChangeSet::default();

        for src in source.iter() {
            let path = &src.relative_path;

            match dest.get(path) {
                None => {
                    info!("未备份: {} ({})", path, format_marker(src.size_marker()));
                    change_set.changes.push(Change {
                        path: path.clone(),
                        kind: src.kind,
                        reason: ChangeReason::Missing {
                            size: src.size_marker(),
                        },
                    });
                }
                Some(dst) => match self.compare_files(src, dst) {
                    FileRelation::Equal => {
                        debug!("与已有文件一致: {}", path);
                        change_set.unchanged += 1;
                    }
                    FileRelation::Different => {
                        info!(
                            "与已有文件不同: {} 源: {} 目标: {}",
                            path,
                            format_marker(src.size_marker()),
                            format_marker(dst.size_marker())
                        );
                        change_set.changes.push(Change {
                            path: path.clone(),
                            kind: src.kind,
                            reason: ChangeReason::SizeChanged {
                                source: src.size_marker(),
                                destination: dst.size_marker(),
                            },
                        });
                    }
                },
            }
        }

        debug!(
            "比较完成: {} 个需要复制, {} 个一致",
            change_set.len(),
            change_set.unchanged
        );

        Ok(change_set)
    }
}

/// 动作统计
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionSummary {
    pub copy_count: usize,
    pub copy_bytes: u64,
    pub skip_count: usize,
}

impl ActionSummary {
    pub fn total_files(&self) -> usize {
        self.copy_count + self.skip_count
    }
}
