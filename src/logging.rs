//! 日志模块 - 控制台输出 + 日志文件（运行结束时刷新）

use crate::config::BackupConfig;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// 日志配置
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// 日志级别: "error", "warn", "info", "debug", "trace"
    pub level: String,
    /// 日志文件路径；None 表示只输出到控制台
    pub file: Option<PathBuf>,
    /// 最大日志文件大小（MB）
    pub max_size_mb: u32,
}

fn default_max_size_mb() -> u32 {
    5 // 默认 5MB
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            max_size_mb: default_max_size_mb(),
        }
    }
}

impl LogConfig {
    /// 从备份配置读取日志设置
    pub fn from_config(config: &BackupConfig) -> Self {
        Self {
            level: config.log_level().unwrap_or("info").to_lowercase(),
            file: config.log_file(),
            max_size_mb: default_max_size_mb(),
        }
    }

    /// 将配置的日志级别转换为 tracing Level
    pub fn tracing_level(&self) -> tracing::Level {
        match self.level.to_lowercase().as_str() {
            "error" => tracing::Level::ERROR,
            "warn" => tracing::Level::WARN,
            "debug" => tracing::Level::DEBUG,
            "trace" => tracing::Level::TRACE,
            _ => tracing::Level::INFO,
        }
    }
}

/// 超过大小限制时把日志轮转为 `<name>.old`
pub fn rotate_if_oversized(file_path: &Path, max_size_mb: u32) -> io::Result<bool> {
    let max_size = (max_size_mb as u64) * 1024 * 1024;
    match fs::metadata(file_path) {
        Ok(metadata) if metadata.len() > max_size => {
            let mut backup = file_path.as_os_str().to_owned();
            backup.push(".old");
            let backup_path = PathBuf::from(backup);

            if backup_path.exists() {
                fs::remove_file(&backup_path)?;
            }
            fs::rename(file_path, &backup_path)?;
            Ok(true)
        }
        _ => Ok(false),
    }
}

/// 初始化日志系统
///
/// 控制台只显示警告及以上；文件记录配置级别的全部明细。
/// 返回的 guard 在运行结束时 drop，负责把缓冲的日志写入文件。
pub fn init_logging(config: &LogConfig) -> io::Result<Option<WorkerGuard>> {
    let level = config.tracing_level();

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .without_time()
        .with_filter(LevelFilter::WARN);

    let Some(file_path) = &config.file else {
        let _ = tracing_subscriber::registry().with(console_layer).try_init();
        return Ok(None);
    };

    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent)?;
    }
    rotate_if_oversized(file_path, config.max_size_mb)?;

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(file_path)?;
    let (writer, guard) = tracing_appender::non_blocking(file);

    let env_filter = EnvFilter::from_default_env().add_directive(level.into());
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_filter(env_filter);

    let _ = tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init();

    Ok(Some(guard))
}
