pub mod local;
pub mod shell;

use crate::error::{Result, SyncError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

pub use local::LocalStorage;
pub use shell::ShellStorage;

/// 条目类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
}

/// 文件元数据
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileMeta {
    pub kind: EntryKind,
    /// 文件字节数；目录为 0
    pub size: u64,
}

impl FileMeta {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

/// 文件系统能力抽象
///
/// 扫描与复制只依赖这四个操作，原生 API 与外部命令两种实现可以互换。
/// 所有方法都是"一次调用一个操作"，调用方逐个 await。
#[async_trait]
pub trait Storage: Send + Sync {
    /// 递归列出 root 及其所有后代（包含 root 本身）
    ///
    /// root 不存在、不可读或不是目录时返回 `SyncError::Scan`；
    /// 后代条目列举失败只记录日志并跳过。
    async fn list_tree(&self, root: &Path) -> Result<Vec<PathBuf>>;

    /// 获取单个路径的类型与大小
    ///
    /// 管道、套接字、设备返回 `SyncError::Unsupported`。
    async fn stat(&self, path: &Path) -> Result<FileMeta>;

    /// 递归强制复制：覆盖已有内容，按需创建中间目录
    async fn copy_tree(&self, from: &Path, to: &Path) -> Result<()>;

    /// 递归创建目录
    async fn create_dir(&self, path: &Path) -> Result<()>;

    /// 获取存储名称（用于日志）
    fn name(&self) -> &str;
}

/// 存储后端类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// walkdir + tokio::fs
    #[default]
    Native,
    /// find / stat / cp 外部命令
    Shell,
}

impl FromStr for StorageBackend {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "native" | "local" => Ok(StorageBackend::Native),
            "shell" => Ok(StorageBackend::Shell),
            other => Err(SyncError::Config(format!("未知的存储后端: {}", other))),
        }
    }
}

/// 根据后端类型创建存储实例
pub fn create_storage(backend: StorageBackend) -> Arc<dyn Storage> {
    match backend {
        StorageBackend::Native => {
            tracing::debug!("使用原生文件系统后端");
            Arc::new(LocalStorage::new()) as Arc<dyn Storage>
        }
        StorageBackend::Shell => {
            tracing::debug!("使用外部命令后端 (find/stat/cp)");
            Arc::new(ShellStorage::new()) as Arc<dyn Storage>
        }
    }
}
