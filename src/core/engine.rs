use crate::core::comparator::FileComparator;
use crate::core::executor::SyncExecutor;
use crate::core::scanner::FileScanner;
use crate::error::{Result, SyncError};
use crate::storage::Storage;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// 同步状态
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Completed,
    /// 有条目复制失败
    Failed,
}

impl SyncStatus {
    /// 进程退出码：完成为 0，否则为 1
    pub fn exit_code(self) -> u8 {
        match self {
            SyncStatus::Completed => 0,
            SyncStatus::Failed => 1,
        }
    }
}

/// 同步报告
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub source_root: PathBuf,
    pub backup_root: PathBuf,
    pub start_time: i64,
    pub end_time: i64,
    pub duration_ms: u64,
    pub status: SyncStatus,
    /// 源清单条目数
    pub files_scanned: usize,
    pub files_to_copy: usize,
    pub files_unchanged: usize,
    pub files_copied: usize,
    pub files_failed: usize,
    pub bytes_copied: u64,
    pub errors: Vec<String>,
}

impl SyncReport {
    pub fn exit_code(&self) -> u8 {
        self.status.exit_code()
    }
}

/// 去掉末尾的一个路径分隔符（根目录 `/` 保持不变）
pub fn clean_root(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.len() > 1 && (trimmed.ends_with('/') || trimmed.ends_with('\\')) {
        trimmed[..trimmed.len() - 1].to_string()
    } else {
        trimmed.to_string()
    }
}

/// 备份目录 = 备份基目录 / 源目录名
///
/// 以 `.` 或 `..` 结尾的源路径先解析为真实路径再取目录名。
pub fn resolve_backup_root(source_root: &Path, backup_base: &Path) -> Result<PathBuf> {
    if let Some(folder) = source_root.file_name() {
        return Ok(backup_base.join(folder));
    }

    let resolved = std::fs::canonicalize(source_root).ok();
    let folder = resolved
        .as_deref()
        .and_then(Path::file_name)
        .ok_or_else(|| {
            SyncError::InvalidInput(format!("无法确定源目录名称: {:?}", source_root))
        })?;
    Ok(backup_base.join(folder))
}

/// 同步引擎：扫描源、扫描目标、比较、复制，依次执行
pub struct SyncEngine {
    storage: Arc<dyn Storage>,
    scanner: FileScanner,
    comparator: FileComparator,
    executor: SyncExecutor,
}

impl SyncEngine {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            scanner: FileScanner::new(storage.clone()),
            comparator: FileComparator::new(),
            executor: SyncExecutor::new(storage.clone()),
            storage,
        }
    }

    /// 把 source_root 备份到 `backup_base/<源目录名>`，目录不存在时先创建
    pub async fn run(&self, source_root: &Path, backup_base: &Path) -> Result<SyncReport> {
        let backup_root = resolve_backup_root(source_root, backup_base)?;

        if let Err(e) = self.storage.create_dir(&backup_root).await {
            error!("创建备份目录失败: {:?} - {}", backup_root, e);
            return Err(e);
        }

        self.sync_roots(source_root, &backup_root).await
    }

    /// 对两个已解析的根目录执行一次完整的 扫描 -> 比较 -> 复制
    pub async fn sync_roots(&self, source_root: &Path, dest_root: &Path) -> Result<SyncReport> {
        let start_time = chrono::Utc::now().timestamp();
        let started = Instant::now();

        info!("源目录: {:?}", source_root);
        info!("目标目录: {:?}", dest_root);

        let source_tree = self.scanner.scan(source_root).await?;
        let dest_tree = self.scanner.scan(dest_root).await?;

        let change_set = self
            .comparator
            .compare_trees(Some(&source_tree), Some(&dest_tree))?;
        let summary = change_set.summary();

        info!("{} 个文件将被复制", summary.copy_count);
        info!("{} 个文件不会被复制", change_set.unchanged_count());

        let copy_report = self.executor.copy(&change_set, source_root, dest_root).await;
        if copy_report.copied > 0 {
            info!("已复制 {} 个文件", copy_report.copied);
        }

        let status = if copy_report.failed > 0 {
            SyncStatus::Failed
        } else {
            SyncStatus::Completed
        };

        info!(
            "同步完成: 复制 {}, 失败 {}, 一致 {}",
            copy_report.copied, copy_report.failed, summary.skip_count
        );

        Ok(SyncReport {
            source_root: source_root.to_path_buf(),
            backup_root: dest_root.to_path_buf(),
            start_time,
            end_time: chrono::Utc::now().timestamp(),
            duration_ms: started.elapsed().as_millis() as u64,
            status,
            files_scanned: summary.total_files(),
            files_to_copy: summary.copy_count,
            files_unchanged: change_set.unchanged_count(),
            files_copied: copy_report.copied,
            files_failed: copy_report.failed,
            bytes_copied: copy_report.bytes_copied,
            errors: copy_report.errors,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::LocalStorage;
    use tempfile::TempDir;

    #[test]
    fn test_clean_root() {
        assert_eq!(clean_root("/home/user/docs/"), "/home/user/docs");
        assert_eq!(clean_root("/home/user/docs"), "/home/user/docs");
        assert_eq!(clean_root("/"), "/");
        assert_eq!(clean_root("C:\\data\\"), "C:\\data");
        // 只去掉一个
        assert_eq!(clean_root("/tmp//"), "/tmp/");
    }

    #[test]
    fn test_resolve_backup_root_appends_folder_name() {
        let root = resolve_backup_root(Path::new("/home/user/docs"), Path::new("/mnt/backup"))
            .unwrap();
        assert_eq!(root, PathBuf::from("/mnt/backup/docs"));

        assert!(resolve_backup_root(Path::new("/"), Path::new("/mnt/backup")).is_err());
    }

    #[test]
    fn test_resolve_backup_root_parent_component() {
        let tmp = TempDir::new().unwrap();
        let docs = tmp.path().join("docs");
        std::fs::create_dir_all(docs.join("sub")).unwrap();

        let root = resolve_backup_root(&docs.join("sub").join(".."), Path::new("/mnt/backup"))
            .unwrap();
        assert_eq!(root, PathBuf::from("/mnt/backup/docs"));
    }

    fn report(status: SyncStatus) -> SyncReport {
        SyncReport {
            source_root: PathBuf::from("/data/docs"),
            backup_root: PathBuf::from("/mnt/backup/docs"),
            start_time: 0,
            end_time: 1,
            duration_ms: 1000,
            status,
            files_scanned: 3,
            files_to_copy: 2,
            files_unchanged: 1,
            files_copied: 1,
            files_failed: 1,
            bytes_copied: 100,
            errors: vec!["b.txt: permission denied".into()],
        }
    }

    #[test]
    fn test_exit_code_follows_status() {
        assert_eq!(report(SyncStatus::Completed).exit_code(), 0);
        assert_eq!(report(SyncStatus::Failed).exit_code(), 1);
    }

    #[test]
    fn test_report_json_fields() {
        let value = serde_json::to_value(report(SyncStatus::Failed)).unwrap();
        assert_eq!(value["status"], "failed");
        assert_eq!(value["backupRoot"], "/mnt/backup/docs");
        assert_eq!(value["filesToCopy"], 2);
        assert_eq!(value["filesUnchanged"], 1);
        assert_eq!(value["filesFailed"], 1);
        assert_eq!(value["bytesCopied"], 100);
        assert_eq!(value["errors"][0], "b.txt: permission denied");
    }

    #[tokio::test]
    async fn test_run_fails_when_backup_root_cannot_be_created() {
        let src_parent = TempDir::new().unwrap();
        let source = src_parent.path().join("docs");
        std::fs::create_dir(&source).unwrap();
        std::fs::write(source.join("a.txt"), b"abc").unwrap();
        let tmp = TempDir::new().unwrap();
        let base = tmp.path().join("not-a-dir");
        std::fs::write(&base, b"plain file").unwrap();

        let engine = SyncEngine::new(Arc::new(LocalStorage::new()));
        let err = engine.run(&source, &base).await.unwrap_err();

        assert!(matches!(err, SyncError::Io(_)));
        assert!(base.is_file());
    }

    #[tokio::test]
    async fn test_run_creates_backup_folder() {
        let src_parent = TempDir::new().unwrap();
        let source = src_parent.path().join("docs");
        std::fs::create_dir(&source).unwrap();
        std::fs::write(source.join("a.txt"), vec![0u8; 100]).unwrap();
        let base = TempDir::new().unwrap();

        let engine = SyncEngine::new(Arc::new(LocalStorage::new()));
        let report = engine.run(&source, base.path()).await.unwrap();

        assert_eq!(report.backup_root, base.path().join("docs"));
        assert_eq!(report.files_to_copy, 1);
        assert_eq!(report.files_copied, 1);
        assert_eq!(report.status, SyncStatus::Completed);
        assert_eq!(report.exit_code(), 0);
        assert_eq!(
            std::fs::metadata(base.path().join("docs/a.txt")).unwrap().len(),
            100
        );
    }

    #[tokio::test]
    async fn test_sync_roots_missing_source_is_scan_error() {
        let dst = TempDir::new().unwrap();
        let engine = SyncEngine::new(Arc::new(LocalStorage::new()));
        let err = engine
            .sync_roots(&dst.path().join("nope"), dst.path())
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Scan { .. }));
    }
}
