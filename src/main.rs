// ==========================================
// 飞行日志导入导出 - 命令行入口
// ==========================================
// 子命令: import <file> / export <file>
// 退出码: 0 成功; 1 存在被拒绝记录; 2 致命错误
// ==========================================

use anyhow::Context;
use clap::{Parser, Subcommand};
use pilotlog_transfer::config::{get_default_db_path, ConfigManager};
use pilotlog_transfer::{
    logging, CancelToken, CsvExporter, ExportLayout, LogbookImporter, PilotLogImporter,
    PipelineConfig, SqliteEntityRepository,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info, warn};

const EXIT_REJECTIONS: u8 = 1;
const EXIT_FATAL: u8 = 2;

/// 飞行日志 JSON/CSV 导入 SQLite,以及 CSV 导出
#[derive(Parser, Debug)]
#[command(name = "pilotlog")]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// SQLite 数据库路径
    #[arg(long, env = "PILOTLOG_DB_PATH", global = true)]
    db: Option<PathBuf>,

    /// JSON 管道配置文件
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// 严格模式: 出现任何拒绝记录则不写入
    #[arg(long, global = true)]
    strict: bool,

    /// 缺失引用默认创建占位实体
    #[arg(long, global = true)]
    auto_stub: bool,

    /// 每个写入事务的最大记录数
    #[arg(long, global = true)]
    batch_size: Option<usize>,

    /// 输出 debug 日志
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 导入 JSON 或 CSV 日志文件
    Import {
        /// 输入文件（.json / .csv）
        file: PathBuf,

        /// 以 JSON 输出导入报告
        #[arg(long)]
        json: bool,

        /// 存在被拒绝记录时仍以 0 退出
        #[arg(long)]
        allow_rejections: bool,
    },

    /// 导出全部实体为 CSV
    Export {
        /// 输出文件
        file: PathBuf,

        /// 每种实体类型单独一个文件
        #[arg(long)]
        split: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    logging::init_with(if cli.verbose { "debug" } else { "info" }, false);

    info!("{} v{}", pilotlog_transfer::APP_NAME, pilotlog_transfer::VERSION);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("错误: 无法创建异步运行时: {}", e);
            return ExitCode::from(EXIT_FATAL);
        }
    };

    match runtime.block_on(execute_command(&cli)) {
        Ok(code) => code,
        Err(e) => {
            error!(error = %format!("{:#}", e), "命令执行失败");
            eprintln!("错误: {:#}", e);
            ExitCode::from(EXIT_FATAL)
        }
    }
}

async fn execute_command(cli: &Cli) -> anyhow::Result<ExitCode> {
    let db_path = cli
        .db
        .as_ref()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(get_default_db_path);
    info!(db_path = %db_path, "使用数据库");

    let repo = SqliteEntityRepository::new(&db_path)
        .with_context(|| format!("无法打开数据库: {}", db_path))?;

    match &cli.command {
        Commands::Import {
            file,
            json,
            allow_rejections,
        } => {
            let config = load_config(cli, &repo, Some(file))?;
            run_import(repo, config, file, *json, *allow_rejections).await
        }
        Commands::Export { file, split } => {
            let layout = if *split {
                ExportLayout::PerEntity
            } else {
                ExportLayout::Unified
            };
            let summary = CsvExporter::new(repo)
                .export(file, layout)
                .await
                .with_context(|| format!("导出失败: {}", file.display()))?;

            for (kind, rows) in &summary.rows_per_kind {
                println!("{:<14} {:>8}", kind.as_str(), rows);
            }
            for path in &summary.files {
                println!("已写出: {}", path.display());
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// 分层加载: 默认值 → JSON 配置文件 → config_kv 覆写 → 命令行参数
fn load_config(
    cli: &Cli,
    repo: &SqliteEntityRepository,
    input: Option<&PathBuf>,
) -> anyhow::Result<PipelineConfig> {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };

    let manager = ConfigManager::from_connection(repo.connection())?;
    let applied = manager.apply_overrides(&mut config)?;
    if applied > 0 {
        info!(applied, "已应用 config_kv 覆写");
    }

    if cli.strict {
        config.strict_mode = true;
    }
    if cli.auto_stub {
        config.auto_create_missing_refs = true;
    }
    if let Some(batch_size) = cli.batch_size {
        config.batch_size = batch_size;
    }
    config.input_path = input.map(|p| p.to_string_lossy().to_string());
    config.db_path = cli.db.as_ref().map(|p| p.to_string_lossy().to_string());

    config.validate()?;
    Ok(config)
}

async fn run_import(
    repo: SqliteEntityRepository,
    config: PipelineConfig,
    file: &Path,
    json: bool,
    allow_rejections: bool,
) -> anyhow::Result<ExitCode> {
    let importer = PilotLogImporter::with_defaults(repo, config);

    // Ctrl-C 在下一个阶段边界生效
    let cancel = CancelToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("收到中断信号,将在当前阶段结束后取消导入");
            signal_token.cancel();
        }
    });

    let report = importer
        .import_file_with_cancel(file, &cancel)
        .await
        .with_context(|| format!("导入失败: {}", file.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report);
    }

    if report.has_rejections() && !allow_rejections {
        return Ok(ExitCode::from(EXIT_REJECTIONS));
    }
    Ok(ExitCode::SUCCESS)
}
