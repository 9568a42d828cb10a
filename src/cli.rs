//! 命令行参数与交互式目录选择

use crate::config::BackupConfig;
use crate::core::clean_root;
use crate::error::{Result, SyncError};
use crate::storage::StorageBackend;
use clap::Parser;
use std::path::{Path, PathBuf};

/// 单向、按大小比较的目录备份工具
#[derive(Debug, Parser)]
#[command(name = "sizesync", version)]
pub struct Cli {
    /// 源目录（默认当前目录）
    pub source: Option<PathBuf>,

    /// 备份基目录（默认读取配置中的 defaultDirectory）
    #[arg(short, long)]
    pub dest: Option<PathBuf>,

    /// 配置文件路径
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// 存储后端 (native, shell)
    #[arg(long)]
    pub backend: Option<StorageBackend>,

    /// 日志级别 (error, warn, info, debug, trace)
    #[arg(long)]
    pub log_level: Option<String>,

    /// 不询问，直接使用给定或默认的目录
    #[arg(short, long)]
    pub yes: bool,

    /// 以 JSON 输出同步报告
    #[arg(long)]
    pub json: bool,
}

/// 用户交互接口
pub trait Prompter {
    fn confirm(&self, prompt: &str) -> Result<bool>;
    fn input(&self, prompt: &str) -> Result<String>;
}

/// 基于 dialoguer 的终端交互
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn confirm(&self, prompt: &str) -> Result<bool> {
        dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(true)
            .interact()
            .map_err(|e| SyncError::Config(format!("读取用户输入失败: {}", e)))
    }

    fn input(&self, prompt: &str) -> Result<String> {
        dialoguer::Input::<String>::new()
            .with_prompt(prompt)
            .interact_text()
            .map_err(|e| SyncError::Config(format!("读取用户输入失败: {}", e)))
    }
}

/// 转为绝对路径并去掉末尾分隔符
///
/// 以 `..` 结尾的路径在存在时解析为真实路径，保证能取到目录名。
fn cleaned(path: impl AsRef<Path>) -> Result<PathBuf> {
    let trimmed = clean_root(&path.as_ref().to_string_lossy());
    let absolute = std::path::absolute(&trimmed)?;
    let absolute = if absolute.file_name().is_none() {
        std::fs::canonicalize(&absolute).unwrap_or(absolute)
    } else {
        absolute
    };
    Ok(PathBuf::from(clean_root(&absolute.to_string_lossy())))
}

/// 确定源目录：参数或当前目录，交互模式下允许用户改写
pub fn resolve_source(cli: &Cli, prompter: Option<&dyn Prompter>) -> Result<PathBuf> {
    let default = match &cli.source {
        Some(path) => path.clone(),
        None => std::env::current_dir()?,
    };

    let Some(prompter) = prompter else {
        return cleaned(&default);
    };

    println!("源目录: {}", default.display());
    if prompter.confirm("使用此目录?")? {
        cleaned(&default)
    } else {
        cleaned(prompter.input("输入源目录")?)
    }
}

/// 确定备份基目录：`--dest`，否则配置中的 defaultDirectory
pub fn resolve_backup_base(
    cli: &Cli,
    config: &BackupConfig,
    prompter: Option<&dyn Prompter>,
) -> Result<PathBuf> {
    let default = cli.dest.clone().or_else(|| config.default_directory());

    let Some(prompter) = prompter else {
        let path = default.ok_or_else(|| {
            SyncError::Config("未指定备份目录，且配置中没有 defaultDirectory".into())
        })?;
        return cleaned(&path);
    };

    if let Some(path) = default {
        println!("备份目录: {}", path.display());
        if prompter.confirm("使用此目录?")? {
            return cleaned(&path);
        }
    } else {
        println!("未找到默认备份目录");
    }

    let input = prompter.input("输入备份目录")?;
    if input.trim().is_empty() {
        return Err(SyncError::Config("备份目录为空".into()));
    }
    cleaned(&input)
}
