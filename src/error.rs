//! 错误类型

use std::path::PathBuf;
use thiserror::Error;

/// 同步流程中的错误
///
/// `Scan` / `InvalidInput` / `Config` / `Io` 会终止整次运行；
/// `Entry` / `Unsupported` 只针对单个条目，调用方记录日志后跳过。
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("扫描失败 {root:?}: {reason}")]
    Scan { root: PathBuf, reason: String },

    #[error("条目处理失败 {path:?}: {reason}")]
    Entry { path: PathBuf, reason: String },

    /// 管道、套接字、设备等无法按普通文件读取的条目
    #[error("不支持的特殊文件 {path:?} ({kind})")]
    Unsupported { path: PathBuf, kind: &'static str },

    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("配置错误: {0}")]
    Config(String),

    #[error("I/O 错误: {0}")]
    Io(#[from] std::io::Error),
}

impl SyncError {
    pub fn scan(root: impl Into<PathBuf>, reason: impl ToString) -> Self {
        SyncError::Scan {
            root: root.into(),
            reason: reason.to_string(),
        }
    }

    pub fn entry(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        SyncError::Entry {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// 是否只影响单个条目（可跳过继续）
    pub fn is_entry_level(&self) -> bool {
        matches!(self, SyncError::Entry { .. } | SyncError::Unsupported { .. })
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
