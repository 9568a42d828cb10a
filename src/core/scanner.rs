use crate::core::inventory::{Inventory, InventoryEntry};
use crate::error::{Result, SyncError};
use crate::storage::{EntryKind, Storage};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 文件扫描器：把目录树转换为扁平清单
pub struct FileScanner {
    storage: Arc<dyn Storage>,
}

impl FileScanner {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// 计算相对路径键（`/` 分隔）；根目录本身返回 None
    fn relative_key(root: &Path, path: &Path) -> Result<Option<String>> {
        let relative = path
            .strip_prefix(root)
            .map_err(|_| SyncError::entry(path, "路径不在扫描根之下"))?;

        if relative.as_os_str().is_empty() {
            return Ok(None);
        }

        let mut parts = Vec::new();
        for component in relative.components() {
            let part = component
                .as_os_str()
                .to_str()
                .ok_or_else(|| SyncError::entry(path, "路径不是有效的 UTF-8"))?;
            parts.push(part);
        }
        Ok(Some(parts.join("/")))
    }

    /// 扫描 root 下的所有条目
    ///
    /// root 为空或无法列举时返回 `SyncError::Scan`；单个条目失败只记录并跳过。
    pub async fn scan(&self, root: &Path) -> Result<Inventory> {
        if root.as_os_str().is_empty() {
            return Err(SyncError::scan(root, "扫描路径为空"));
        }

        info!("开始扫描: {:?} ({})", root, self.storage.name());

        let paths = self.storage.list_tree(root).await?;
        debug!("list_tree 返回 {} 个条目", paths.len());

        let mut inventory = Inventory::new();
        let mut skipped = 0usize;

        for path in paths {
            let key = match Self::relative_key(root, &path) {
                Ok(Some(key)) => key,
                // 跳过根目录本身
                Ok(None) => continue,
                Err(e) => {
                    warn!("跳过条目: {}", e);
                    skipped += 1;
                    continue;
                }
            };

            // 逐个获取元数据，等待完成后再处理下一个
            let meta = match self.storage.stat(&path).await {
                Ok(meta) => meta,
                Err(e) if e.is_entry_level() => {
                    warn!("无法获取元数据，已跳过: {}", e);
                    skipped += 1;
                    continue;
                }
                Err(e) => return Err(e),
            };

            let entry = match meta.kind {
                EntryKind::Directory => InventoryEntry::directory(key),
                EntryKind::File => InventoryEntry::file(key, meta.size),
            };
            inventory.insert(entry);
        }

        info!(
            "扫描完成: {} 个文件 ({} 字节), {} 个目录, {} 个被跳过",
            inventory.file_count(),
            inventory.total_bytes(),
            inventory.dir_count(),
            skipped
        );

        Ok(inventory)
    }
}
