//! 应用配置模块 - key=value 格式的配置文件

use crate::error::Result;
use crate::storage::StorageBackend;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// 配置文件名
pub const CONFIG_FILE_NAME: &str = "backupConfig";
/// 默认日志文件名
pub const LOG_FILE_NAME: &str = "logFile";

/// 备份配置
#[derive(Debug, Clone, Default)]
pub struct BackupConfig {
    values: HashMap<String, String>,
    /// 配置所在目录，用于推导默认日志路径
    config_dir: Option<PathBuf>,
    loaded: bool,
}

impl BackupConfig {
    /// 解析配置内容
    ///
    /// `#` 开头的行和空行忽略；一行只有按 `=` 恰好分成两段且两段都非空时才生效。
    pub fn parse(content: &str) -> Self {
        let mut values = HashMap::new();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let parts: Vec<&str> = line.split('=').collect();
            if parts.len() != 2 {
                continue;
            }
            let (key, value) = (parts[0].trim(), parts[1].trim());
            if key.is_empty() || value.is_empty() {
                continue;
            }
            values.insert(key.to_string(), value.to_string());
        }

        Self {
            values,
            config_dir: None,
            loaded: true,
        }
    }

    /// 从配置文件加载；文件不存在时使用默认值
    pub fn load(path: &Path) -> Self {
        let mut config = match fs::read_to_string(path) {
            Ok(content) => Self::parse(&content),
            Err(e) => {
                tracing::info!("配置文件不存在或无法读取: {:?} ({})", path, e);
                Self::default()
            }
        };
        config.config_dir = path.parent().map(Path::to_path_buf);
        config
    }

    /// 是否成功读取了配置文件
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// 默认备份目录
    pub fn default_directory(&self) -> Option<PathBuf> {
        self.get("defaultDirectory").map(PathBuf::from)
    }

    /// 日志文件路径：`logFile` 配置项，否则为配置目录下的 logFile
    pub fn log_file(&self) -> Option<PathBuf> {
        self.get("logFile")
            .map(PathBuf::from)
            .or_else(|| self.config_dir.as_ref().map(|d| d.join(LOG_FILE_NAME)))
    }

    pub fn log_level(&self) -> Option<&str> {
        self.get("logLevel")
    }

    pub fn backend(&self) -> Result<StorageBackend> {
        match self.get("backend") {
            Some(value) => value.parse(),
            None => Ok(StorageBackend::default()),
        }
    }
}

/// 默认配置文件路径
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|p| p.join("sizesync"))
        .unwrap_or_else(|| PathBuf::from(".sizesync"))
        .join(CONFIG_FILE_NAME)
}

pub mod dirs {
    use std::path::PathBuf;

    pub fn config_dir() -> Option<PathBuf> {
        if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
            return Some(PathBuf::from(xdg));
        }
        if cfg!(target_os = "windows") {
            std::env::var("APPDATA").ok().map(PathBuf::from)
        } else if cfg!(target_os = "macos") {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join("Library").join("Application Support"))
        } else {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join(".config"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_key_values() {
        let config = BackupConfig::parse(
            "# backup settings\n\
             defaultDirectory=/mnt/backup\n\
             \n\
             broken line\n\
             a=b=c\n\
             empty=\n\
             backend = shell\n",
        );

        assert_eq!(config.default_directory(), Some(PathBuf::from("/mnt/backup")));
        assert_eq!(config.backend().unwrap(), StorageBackend::Shell);
        assert_eq!(config.get("a"), None);
        assert_eq!(config.get("empty"), None);
        assert_eq!(config.get("broken line"), None);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = BackupConfig::load(&tmp.path().join(CONFIG_FILE_NAME));

        assert!(!config.is_loaded());
        assert_eq!(config.default_directory(), None);
        assert_eq!(config.backend().unwrap(), StorageBackend::Native);
        assert_eq!(config.log_file(), Some(tmp.path().join(LOG_FILE_NAME)));
    }

    #[test]
    fn test_load_from_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "defaultDirectory=/srv/backups\nlogFile=/var/log/sizesync.log\nlogLevel=debug\n")
            .unwrap();

        let config = BackupConfig::load(&path);
        assert_eq!(config.default_directory(), Some(PathBuf::from("/srv/backups")));
        assert_eq!(config.log_file(), Some(PathBuf::from("/var/log/sizesync.log")));
        assert_eq!(config.log_level(), Some("debug"));
    }

    #[test]
    fn test_invalid_backend_is_config_error() {
        let config = BackupConfig::parse("backend=ftp");
        assert!(matches!(
            config.backend(),
            Err(crate::error::SyncError::Config(_))
        ));
    }
}
