//! 通达信历史行情导入工具
//!
//! 将通达信导出的日线文件导入 SQLite 的 stock_history 表，
//! 并提供名称修正、选股查询和数据概况等命令

mod config;   // 配置加载
mod errors;   // 错误类型
mod models;   // 数据模型定义
mod services; // 业务逻辑服务

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use env_logger::Env;

use crate::config::AppConfig;
use crate::services::history_store::HistoryStore;
use crate::services::import_driver::{ImportDriver, ImportOptions, ImportSettings};
use crate::services::registry::StockRegistry;
use crate::services::screen::{rising_stocks, ScreenCriteria};

#[derive(Parser)]
#[command(name = "tdx-import")]
#[command(about = "通达信历史行情导入工具", long_about = None)]
struct Cli {
    /// 配置文件路径（默认查找 config.json、config/config.json）
    #[arg(short, long, global = true, env = "TDX_IMPORT_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite 数据库路径，覆盖配置文件
    #[arg(long, global = true)]
    db: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 导入通达信导出文件
    Import {
        /// 数据目录，覆盖配置文件
        #[arg(long)]
        folder: Option<String>,
        /// 导入前清空已有历史数据
        #[arg(long)]
        clear: bool,
    },
    /// 按 stock_list 登记表修正历史表中的股票名称
    SyncNames,
    /// 最近若干交易日每天涨幅超过阈值的股票
    Screen {
        /// 交易日数
        #[arg(long, default_value_t = 3)]
        days: usize,
        /// 每日最小涨幅（百分比）
        #[arg(long, default_value_t = 5.0)]
        min_change: f64,
    },
    /// 历史表数据概况
    Stats,
}

/// 应用程序入口
///
/// 单个文件导入失败不影响退出码，只有运行级错误返回非零
fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let (mut config, source) = AppConfig::load(cli.config.as_deref())?;

    // 初始化日志系统，RUST_LOG 优先于配置
    env_logger::init_from_env(Env::default().default_filter_or(config.log.level.as_str()));
    match &source {
        Some(path) => log::info!("从 {} 加载配置成功", path.display()),
        None => log::info!("使用默认配置"),
    }

    if let Some(db) = cli.db {
        config.database.path = db;
    }

    match cli.command {
        Commands::Import { folder, clear } => {
            if let Some(folder) = folder {
                config.import.folder = folder;
            }
            run_import(&config, clear)
        }
        Commands::SyncNames => run_sync_names(&config),
        Commands::Screen { days, min_change } => run_screen(
            &config,
            ScreenCriteria {
                days,
                min_change_pct: min_change,
            },
        ),
        Commands::Stats => run_stats(&config),
    }
}

fn open_store(config: &AppConfig) -> anyhow::Result<HistoryStore> {
    log::info!("数据库: {}", config.database.path);
    let store = HistoryStore::open(&config.database.path)
        .with_context(|| format!("打开数据库 {} 失败", config.database.path))?;
    Ok(store)
}

fn load_registry(store: &HistoryStore) -> StockRegistry {
    StockRegistry::load(store.connection()).unwrap_or_else(|e| {
        log::warn!("加载股票登记表失败，将使用文件头中的名称: {}", e);
        StockRegistry::new()
    })
}

fn run_import(config: &AppConfig, clear: bool) -> anyhow::Result<()> {
    log::info!("开始导入通达信历史数据...");
    log::info!("数据目录: {}", config.import.folder);

    let mut store = open_store(config)?;
    let registry = load_registry(&store);
    let settings = ImportSettings::from(&config.import);

    let report = ImportDriver::new(&mut store, &registry, settings)
        .run(Path::new(&config.import.folder), ImportOptions { clear_existing: clear })?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn run_sync_names(config: &AppConfig) -> anyhow::Result<()> {
    let mut store = open_store(config)?;
    store.ensure_schema()?;
    let registry = load_registry(&store);

    let report = store.sync_display_names(&registry)?;
    log::info!("已更新 {} 只股票名称", report.updated);
    if report.not_found > 0 {
        log::warn!("{} 只股票不在登记表中", report.not_found);
    }

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn run_screen(config: &AppConfig, criteria: ScreenCriteria) -> anyhow::Result<()> {
    let store = open_store(config)?;
    store.ensure_schema()?;

    let hits = rising_stocks(&store, criteria)?;
    log::info!(
        "最近 {} 个交易日涨幅均超过 {}% 的股票: {} 只",
        criteria.days,
        criteria.min_change_pct,
        hits.len()
    );

    println!("{}", serde_json::to_string_pretty(&hits)?);
    Ok(())
}

fn run_stats(config: &AppConfig) -> anyhow::Result<()> {
    let store = open_store(config)?;
    store.ensure_schema()?;

    println!("记录总数: {}", store.count()?);
    println!("股票数量: {}", store.distinct_codes()?.len());

    println!("最近交易日:");
    for date in store.latest_trade_dates(10)? {
        println!("  {}", date);
    }

    let duplicates = store.duplicate_keys()?;
    if duplicates.is_empty() {
        println!("未发现重复记录");
    } else {
        println!("重复记录: {} 组", duplicates.len());
        for (code, date, n) in duplicates.iter().take(10) {
            println!("  {} {} x{}", code, date, n);
        }
    }
    Ok(())
}
