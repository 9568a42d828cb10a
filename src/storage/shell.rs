//! 外部命令存储后端 - 通过 find / stat / cp 完成列举、元数据与复制
//!
//! 每个命令都通过 `output()` 等待结束并读完输出后才发起下一个。

use super::{EntryKind, FileMeta, Storage};
use crate::error::{Result, SyncError};
use async_trait::async_trait;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use tokio::process::Command;
use tracing::{debug, warn};

pub struct ShellStorage {
    name: String,
}

impl ShellStorage {
    pub fn new() -> Self {
        Self {
            name: "shell".to_string(),
        }
    }

    /// 运行命令并等待其结束
    async fn run<I, S>(program: &str, args: I) -> std::io::Result<Output>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
    }

    /// 运行命令，非零退出码转为条目错误
    async fn run_checked<I, S>(path: &Path, program: &str, args: I) -> Result<Output>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let output = Self::run(program, args)
            .await
            .map_err(|e| SyncError::entry(path, format!("无法执行 {}: {}", program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SyncError::entry(
                path,
                format!("{} 失败 ({}): {}", program, output.status, stderr.trim()),
            ));
        }
        Ok(output)
    }

    /// 解析 `stat -c '%s:%F'` 的输出，例如 `1234:regular file`
    fn parse_stat(path: &Path, line: &str) -> Result<FileMeta> {
        let (size, file_type) = line
            .trim()
            .split_once(':')
            .ok_or_else(|| SyncError::entry(path, format!("无法解析 stat 输出: {}", line)))?;

        match file_type {
            "directory" => {
                return Ok(FileMeta {
                    kind: EntryKind::Directory,
                    size: 0,
                })
            }
            "regular file" | "regular empty file" => {}
            "fifo" => return Err(Self::unsupported(path, "管道")),
            "socket" => return Err(Self::unsupported(path, "套接字")),
            "character special file" | "block special file" => {
                return Err(Self::unsupported(path, "设备"))
            }
            _ => return Err(Self::unsupported(path, "特殊文件")),
        }

        let size = size
            .parse::<u64>()
            .map_err(|e| SyncError::entry(path, format!("无效的文件大小 {:?}: {}", size, e)))?;
        Ok(FileMeta {
            kind: EntryKind::File,
            size,
        })
    }

    fn unsupported(path: &Path, kind: &'static str) -> SyncError {
        SyncError::Unsupported {
            path: path.to_path_buf(),
            kind,
        }
    }

    async fn remove_if_kind_differs(&self, to: &Path, kind: EntryKind) -> Result<()> {
        if let Ok(existing) = self.stat(to).await {
            if existing.kind != kind {
                debug!("目标类型不同，先删除: {:?}", to);
                Self::run_checked(to, "rm", [OsStr::new("-rf"), to.as_os_str()]).await?;
            }
        }
        Ok(())
    }
}

impl Default for ShellStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Storage for ShellStorage {
    async fn list_tree(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let meta = self
            .stat(root)
            .await
            .map_err(|e| SyncError::scan(root, e))?;
        if !meta.is_dir() {
            return Err(SyncError::scan(root, "不是目录"));
        }

        let output = Self::run("find", [root.as_os_str()])
            .await
            .map_err(|e| SyncError::scan(root, format!("无法执行 find: {}", e)))?;

        // find 遇到不可读的子目录时返回非零，但已列出的条目仍然可用
        if !output.status.success() {
            warn!(
                "find 部分失败 ({}): {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let mut paths: Vec<PathBuf> = stdout
            .lines()
            .filter(|l| !l.is_empty())
            .map(PathBuf::from)
            .collect();

        if paths.is_empty() {
            return Err(SyncError::scan(root, "find 没有返回任何条目"));
        }
        paths.sort();
        Ok(paths)
    }

    async fn stat(&self, path: &Path) -> Result<FileMeta> {
        let output = Self::run_checked(
            path,
            "stat",
            [
                OsStr::new("-L"),
                OsStr::new("-c"),
                OsStr::new("%s:%F"),
                path.as_os_str(),
            ],
        )
        .await?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let line = stdout
            .lines()
            .next()
            .ok_or_else(|| SyncError::entry(path, "stat 没有输出"))?;
        Self::parse_stat(path, line)
    }

    async fn copy_tree(&self, from: &Path, to: &Path) -> Result<()> {
        let meta = self.stat(from).await?;
        self.remove_if_kind_differs(to, meta.kind).await?;

        if meta.is_dir() {
            // 复制目录内容而不是目录本身，避免目标已存在时嵌套一层
            self.create_dir(to).await?;
            let contents = from.join(".");
            Self::run_checked(
                from,
                "cp",
                [OsStr::new("-Rf"), contents.as_os_str(), to.as_os_str()],
            )
            .await?;
        } else {
            if let Some(parent) = to.parent() {
                self.create_dir(parent).await?;
            }
            Self::run_checked(
                from,
                "cp",
                [OsStr::new("-Rf"), from.as_os_str(), to.as_os_str()],
            )
            .await?;
        }

        Ok(())
    }

    async fn create_dir(&self, path: &Path) -> Result<()> {
        Self::run_checked(path, "mkdir", [OsStr::new("-p"), path.as_os_str()]).await?;
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_stat_file() {
        let meta = ShellStorage::parse_stat(Path::new("a"), "100:regular file\n").unwrap();
        assert_eq!(meta.kind, EntryKind::File);
        assert_eq!(meta.size, 100);

        let empty = ShellStorage::parse_stat(Path::new("e"), "0:regular empty file").unwrap();
        assert_eq!(empty.size, 0);
    }

    #[test]
    fn test_parse_stat_directory() {
        let meta = ShellStorage::parse_stat(Path::new("d"), "4096:directory").unwrap();
        assert!(meta.is_dir());
        assert_eq!(meta.size, 0);
    }

    #[test]
    fn test_parse_stat_garbage() {
        assert!(ShellStorage::parse_stat(Path::new("x"), "no separator").is_err());
        assert!(ShellStorage::parse_stat(Path::new("x"), "abc:regular file").is_err());
    }

    #[test]
    fn test_parse_stat_special_files() {
        for (line, kind) in [
            ("0:fifo", "管道"),
            ("0:socket", "套接字"),
            ("0:character special file", "设备"),
            ("0:block special file", "设备"),
        ] {
            let err = ShellStorage::parse_stat(Path::new("s"), line).unwrap_err();
            assert!(
                matches!(err, SyncError::Unsupported { kind: k, .. } if k == kind),
                "{}",
                line
            );
        }
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_shell_roundtrip_copy() {
        let src = tempfile::TempDir::new().unwrap();
        let dst = tempfile::TempDir::new().unwrap();
        std::fs::create_dir(src.path().join("sub")).unwrap();
        std::fs::write(src.path().join("sub/c.txt"), vec![7u8; 30]).unwrap();
        std::fs::create_dir(dst.path().join("sub")).unwrap();

        let storage = ShellStorage::new();
        let listed = storage.list_tree(src.path()).await.unwrap();
        assert_eq!(listed.len(), 3);

        storage
            .copy_tree(&src.path().join("sub"), &dst.path().join("sub"))
            .await
            .unwrap();
        assert_eq!(std::fs::metadata(dst.path().join("sub/c.txt")).unwrap().len(), 30);
        assert!(!dst.path().join("sub/sub").exists());
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_shell_stat_rejects_fifo() {
        let tmp = tempfile::TempDir::new().unwrap();
        let pipe = tmp.path().join("pipe");
        let status = std::process::Command::new("mkfifo").arg(&pipe).status().unwrap();
        assert!(status.success());

        let err = ShellStorage::new().stat(&pipe).await.unwrap_err();
        assert!(matches!(err, SyncError::Unsupported { kind: "管道", .. }));
    }
}
