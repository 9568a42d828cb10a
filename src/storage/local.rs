use super::{EntryKind, FileMeta, Storage};
use crate::error::{Result, SyncError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// 原生文件系统存储
pub struct LocalStorage {
    name: String,
}

impl LocalStorage {
    pub fn new() -> Self {
        Self {
            name: "local".to_string(),
        }
    }

    /// 在阻塞线程上遍历目录树（按文件名排序，保证顺序稳定）
    async fn walk(root: &Path) -> Result<Vec<PathBuf>> {
        let base = root.to_path_buf();

        // 使用 spawn_blocking 避免阻塞 async runtime
        tokio::task::spawn_blocking(move || {
            let mut paths = Vec::new();
            for entry in WalkDir::new(&base).follow_links(false).sort_by_file_name() {
                match entry {
                    Ok(entry) => paths.push(entry.into_path()),
                    Err(e) if e.depth() == 0 => return Err(SyncError::scan(&base, e)),
                    Err(e) => {
                        let path = e.path().map(Path::to_path_buf).unwrap_or_default();
                        warn!("无法列举条目，已跳过: {:?} - {}", path, e);
                    }
                }
            }
            Ok(paths)
        })
        .await
        .map_err(|e| SyncError::scan(root, e))?
    }

    /// 确保目标是目录：同名文件先删除
    async fn prepare_dir(path: &Path) -> Result<()> {
        if let Ok(meta) = fs::symlink_metadata(path).await {
            if !meta.is_dir() {
                fs::remove_file(path)
                    .await
                    .map_err(|e| SyncError::entry(path, e))?;
            }
        }
        fs::create_dir_all(path)
            .await
            .map_err(|e| SyncError::entry(path, e))
    }

    /// 复制单个文件：同名目录先删除，父目录按需创建
    async fn copy_file(from: &Path, to: &Path) -> Result<()> {
        if let Ok(meta) = fs::symlink_metadata(to).await {
            if meta.is_dir() {
                fs::remove_dir_all(to)
                    .await
                    .map_err(|e| SyncError::entry(to, e))?;
            }
        }
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| SyncError::entry(parent, e))?;
        }

        let bytes = fs::copy(from, to)
            .await
            .map_err(|e| SyncError::entry(from, e))?;
        debug!("  写入完成: {:?} ({} 字节)", to, bytes);
        Ok(())
    }
}

/// 特殊文件的类型名称
fn special_kind(file_type: &std::fs::FileType) -> &'static str {
    #[cfg(unix)]
    {
        use std::os::unix::fs::FileTypeExt;

        if file_type.is_fifo() {
            return "管道";
        }
        if file_type.is_socket() {
            return "套接字";
        }
        if file_type.is_char_device() || file_type.is_block_device() {
            return "设备";
        }
    }

    let _ = file_type;
    "特殊文件"
}

impl Default for LocalStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn list_tree(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let metadata = fs::metadata(root)
            .await
            .map_err(|e| SyncError::scan(root, e))?;
        if !metadata.is_dir() {
            return Err(SyncError::scan(root, "不是目录"));
        }

        Self::walk(root).await
    }

    async fn stat(&self, path: &Path) -> Result<FileMeta> {
        // 跟随符号链接：悬空链接在这里失败
        let metadata = fs::metadata(path)
            .await
            .map_err(|e| SyncError::entry(path, e))?;
        let file_type = metadata.file_type();

        if file_type.is_dir() {
            Ok(FileMeta {
                kind: EntryKind::Directory,
                size: 0,
            })
        } else if file_type.is_file() {
            Ok(FileMeta {
                kind: EntryKind::File,
                size: metadata.len(),
            })
        } else {
            // 打开管道读取会一直阻塞，不能当作普通文件复制
            Err(SyncError::Unsupported {
                path: path.to_path_buf(),
                kind: special_kind(&file_type),
            })
        }
    }

    async fn copy_tree(&self, from: &Path, to: &Path) -> Result<()> {
        let meta = self.stat(from).await?;
        if !meta.is_dir() {
            return Self::copy_file(from, to).await;
        }

        Self::prepare_dir(to).await?;

        let entries = Self::walk(from)
            .await
            .map_err(|e| SyncError::entry(from, e))?;

        // 子条目失败不中断，全部处理完后返回第一个错误
        let mut first_error = None;
        for entry in entries {
            let relative = match entry.strip_prefix(from) {
                Ok(r) if !r.as_os_str().is_empty() => r.to_path_buf(),
                _ => continue,
            };
            let target = to.join(&relative);

            let result = match self.stat(&entry).await {
                Ok(m) if m.is_dir() => Self::prepare_dir(&target).await,
                Ok(_) => Self::copy_file(&entry, &target).await,
                Err(SyncError::Unsupported { path, kind }) => {
                    warn!("跳过特殊文件: {:?} ({})", path, kind);
                    continue;
                }
                Err(e) => Err(e),
            };

            if let Err(e) = result {
                warn!("复制子条目失败: {:?} - {}", entry, e);
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn create_dir(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path).await?;
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_list_tree_includes_root() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir(tmp.path().join("sub")).unwrap();
        std::fs::write(tmp.path().join("sub").join("c.txt"), b"abc").unwrap();

        let paths = LocalStorage::new().list_tree(tmp.path()).await.unwrap();
        assert_eq!(paths.len(), 3);
        assert_eq!(paths[0], tmp.path());
    }

    #[tokio::test]
    async fn test_list_tree_rejects_file_root() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("plain");
        std::fs::write(&file, b"x").unwrap();

        let err = LocalStorage::new().list_tree(&file).await.unwrap_err();
        assert!(matches!(err, SyncError::Scan { .. }));
    }

    #[tokio::test]
    async fn test_stat_classifies_by_metadata() {
        let tmp = TempDir::new().unwrap();
        // 没有扩展名的文件仍然是文件
        std::fs::write(tmp.path().join("README"), vec![0u8; 42]).unwrap();
        std::fs::create_dir(tmp.path().join("data.d")).unwrap();

        let storage = LocalStorage::new();
        let file = storage.stat(&tmp.path().join("README")).await.unwrap();
        assert_eq!(file.kind, EntryKind::File);
        assert_eq!(file.size, 42);

        let dir = storage.stat(&tmp.path().join("data.d")).await.unwrap();
        assert_eq!(dir.kind, EntryKind::Directory);
    }

    #[tokio::test]
    async fn test_copy_tree_overwrites_and_creates_parents() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        std::fs::create_dir_all(src.path().join("a/b")).unwrap();
        std::fs::write(src.path().join("a/b/f.bin"), vec![1u8; 100]).unwrap();
        std::fs::create_dir_all(dst.path().join("a/b")).unwrap();
        std::fs::write(dst.path().join("a/b/f.bin"), vec![2u8; 10]).unwrap();

        let storage = LocalStorage::new();
        storage
            .copy_tree(&src.path().join("a"), &dst.path().join("a"))
            .await
            .unwrap();

        let copied = std::fs::read(dst.path().join("a/b/f.bin")).unwrap();
        assert_eq!(copied, vec![1u8; 100]);
        // 不会嵌套成 a/a
        assert!(!dst.path().join("a/a").exists());
    }

    #[tokio::test]
    async fn test_copy_file_replaces_directory() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        std::fs::write(src.path().join("x"), b"file").unwrap();
        std::fs::create_dir_all(dst.path().join("x/inner")).unwrap();

        LocalStorage::new()
            .copy_tree(&src.path().join("x"), &dst.path().join("x"))
            .await
            .unwrap();

        assert!(dst.path().join("x").is_file());
    }

    #[cfg(unix)]
    fn mkfifo(path: &Path) {
        let status = std::process::Command::new("mkfifo").arg(path).status().unwrap();
        assert!(status.success());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stat_rejects_fifo() {
        let tmp = TempDir::new().unwrap();
        let pipe = tmp.path().join("pipe");
        mkfifo(&pipe);

        let err = LocalStorage::new().stat(&pipe).await.unwrap_err();
        assert!(matches!(err, SyncError::Unsupported { kind: "管道", .. }));
        assert!(err.is_entry_level());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_copy_tree_skips_fifo_in_directory() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        std::fs::create_dir(src.path().join("sub")).unwrap();
        std::fs::write(src.path().join("sub/c.txt"), b"abc").unwrap();
        mkfifo(&src.path().join("sub/pipe"));

        let storage = LocalStorage::new();
        let src_sub = src.path().join("sub");
        let dst_sub = dst.path().join("sub");
        let copy = storage.copy_tree(&src_sub, &dst_sub);
        tokio::time::timeout(std::time::Duration::from_secs(5), copy)
            .await
            .expect("复制不应阻塞在管道上")
            .unwrap();

        assert_eq!(std::fs::read(dst.path().join("sub/c.txt")).unwrap(), b"abc");
        assert!(!dst.path().join("sub/pipe").exists());
    }
}
