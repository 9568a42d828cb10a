use crate::core::comparator::ChangeSet;
use crate::storage::Storage;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info};

/// 复制结果
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyReport {
    /// 成功复制的条目数
    pub copied: usize,
    pub failed: usize,
    /// 成功复制的文件字节数（按源清单大小统计）
    pub bytes_copied: u64,
    pub errors: Vec<String>,
}

/// 同步执行器：逐个复制 ChangeSet 中的路径
pub struct SyncExecutor {
    storage: Arc<dyn Storage>,
}

impl SyncExecutor {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// 把每个选中的路径从 source_root 递归复制到 dest_root
    ///
    /// 单个路径失败只记录错误并继续，返回值只统计成功的条目。
    pub async fn copy(
        &self,
        change_set: &ChangeSet,
        source_root: &Path,
        dest_root: &Path,
    ) -> CopyReport {
        let mut report = CopyReport::default();

        for change in change_set {
            let from = source_root.join(&change.path);
            let to = dest_root.join(&change.path);

            info!("复制: {}", change.path);
            debug!("  {:?} -> {:?}", from, to);

            match self.storage.copy_tree(&from, &to).await {
                Ok(()) => {
                    report.copied += 1;
                    report.bytes_copied += change.source_bytes();
                }
                Err(e) => {
                    error!("复制失败: {} - {}", change.path, e);
                    report.failed += 1;
                    report.errors.push(format!("{}: {}", change.path, e));
                }
            }
        }

        debug!(
            "复制结束: 成功 {}, 失败 {}, {} 字节",
            report.copied, report.failed, report.bytes_copied
        );

        report
    }
}
