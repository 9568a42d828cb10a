use anyhow::Context;
use clap::Parser;
use sizesync_lib::cli::{resolve_backup_base, resolve_source, Cli, Prompter, TerminalPrompter};
use sizesync_lib::config::{default_config_path, BackupConfig};
use sizesync_lib::logging::{init_logging, LogConfig};
use sizesync_lib::{create_storage, SyncEngine, SyncReport};
use std::process::ExitCode;
use tracing::{error, info};

fn print_summary(report: &SyncReport) {
    println!("{} 个文件将被复制", report.files_to_copy);
    println!("{} 个文件不会被复制", report.files_unchanged);
    if report.files_copied > 0 {
        println!("已复制 {} 个文件", report.files_copied);
    }
    if report.files_failed > 0 {
        println!("{} 个文件复制失败，详见日志", report.files_failed);
    }
}

async fn run(cli: Cli, config: BackupConfig) -> anyhow::Result<SyncReport> {
    let prompter = TerminalPrompter;
    let prompter: Option<&dyn Prompter> = if cli.yes { None } else { Some(&prompter) };

    let source = resolve_source(&cli, prompter).context("无法确定源目录")?;
    let backup_base =
        resolve_backup_base(&cli, &config, prompter).context("无法确定备份目录")?;

    let backend = match cli.backend {
        Some(backend) => backend,
        None => config.backend()?,
    };

    let engine = SyncEngine::new(create_storage(backend));
    let report = engine
        .run(&source, &backup_base)
        .await
        .with_context(|| format!("备份 {} 失败", source.display()))?;

    Ok(report)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let config = BackupConfig::load(&config_path);

    let mut log_config = LogConfig::from_config(&config);
    if let Some(level) = &cli.log_level {
        log_config.level = level.to_lowercase();
    }

    let guard = match init_logging(&log_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("无法初始化日志文件: {}", e);
            log_config.file = None;
            init_logging(&log_config).ok().flatten()
        }
    };

    info!(
        "开始运行: {}",
        chrono::Local::now().format("%B %d %Y %I:%M %p")
    );
    if !config.is_loaded() {
        info!("配置文件不存在: {}", config_path.display());
    }

    let json = cli.json;
    let code = match run(cli, config).await {
        Ok(report) => {
            if json {
                match serde_json::to_string_pretty(&report) {
                    Ok(s) => println!("{}", s),
                    Err(e) => error!("序列化报告失败: {}", e),
                }
            } else {
                print_summary(&report);
            }
            ExitCode::from(report.exit_code())
        }
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    };

    // 刷新日志文件
    drop(guard);
    code
}
