//! 配置模块
//!
//! 支持从 JSON 文件加载系统配置，命令行参数可覆盖其中的值

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::services::import_driver::ImportSettings;

/// 数据库配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite 数据库文件路径
    #[serde(default = "default_db_path")]
    pub path: String,
}

/// 导入配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    /// 通达信导出文件目录
    #[serde(default = "default_folder")]
    pub folder: String,
    /// 数据文件扩展名
    #[serde(default = "default_extension")]
    pub extension: String,
    /// 进度输出间隔（文件数）
    #[serde(default = "default_progress_interval")]
    pub progress_interval: usize,
    /// 详细记录的失败文件数上限
    #[serde(default = "default_max_logged_failures")]
    pub max_logged_failures: usize,
    /// 按文件名排序处理
    #[serde(default = "default_sort_files")]
    pub sort_files: bool,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// 日志级别: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// 应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// 数据库配置
    #[serde(default)]
    pub database: DatabaseConfig,
    /// 导入配置
    #[serde(default)]
    pub import: ImportConfig,
    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

// 默认值函数
fn default_db_path() -> String { "jia-stk.db".to_string() }
fn default_folder() -> String { "tdx".to_string() }
fn default_extension() -> String { "txt".to_string() }
fn default_progress_interval() -> usize { 100 }
fn default_max_logged_failures() -> usize { 10 }
fn default_sort_files() -> bool { true }
fn default_log_level() -> String { "info".to_string() }

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            folder: default_folder(),
            extension: default_extension(),
            progress_interval: default_progress_interval(),
            max_logged_failures: default_max_logged_failures(),
            sort_files: default_sort_files(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl From<&ImportConfig> for ImportSettings {
    fn from(config: &ImportConfig) -> Self {
        Self {
            extension: config.extension.trim_start_matches('.').to_string(),
            progress_interval: config.progress_interval,
            max_logged_failures: config.max_logged_failures,
            sort_files: config.sort_files,
        }
    }
}

/// 默认查找的配置文件位置
const CONFIG_PATHS: [&str; 2] = ["config.json", "config/config.json"];

impl AppConfig {
    /// 从 JSON 文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("读取配置文件 {} 失败", path.display()))?;
        let config: AppConfig = serde_json::from_str(&content)
            .with_context(|| format!("解析配置文件 {} 失败", path.display()))?;
        Ok(config)
    }

    /// 加载配置
    ///
    /// 指定路径时只读该文件；否则依次查找默认位置，都不存在则使用默认值。
    /// 返回配置及其来源文件（使用默认值时为 None）。
    ///
    /// 此时日志尚未初始化，来源由调用方记录。
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<(Self, Option<PathBuf>)> {
        if let Some(path) = explicit {
            return Ok((Self::from_file(path)?, Some(path.to_path_buf())));
        }

        for path in CONFIG_PATHS {
            let path = Path::new(path);
            if path.exists() {
                return Ok((Self::from_file(path)?, Some(path.to_path_buf())));
            }
        }

        Ok((Self::default(), None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"database": {"path": "/data/stk.db"}, "import": {"folder": "/data/tdx"}}"#)
                .unwrap();

        assert_eq!(config.database.path, "/data/stk.db");
        assert_eq!(config.import.folder, "/data/tdx");
        assert_eq!(config.import.extension, "txt");
        assert_eq!(config.import.progress_interval, 100);
        assert!(config.import.sort_files);
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"import": {"extension": ".TXT", "sort_files": false}, "log": {"level": "debug"}}"#)
            .unwrap();

        let (config, source) = AppConfig::load(Some(path.as_path())).unwrap();
        assert_eq!(source.as_deref(), Some(path.as_path()));
        assert_eq!(config.log.level, "debug");

        let settings = ImportSettings::from(&config.import);
        assert_eq!(settings.extension, "TXT");
        assert!(!settings.sort_files);
    }

    #[test]
    fn test_load_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(AppConfig::load(Some(path.as_path())).is_err());
        assert!(AppConfig::load(Some(dir.path().join("missing.json").as_path())).is_err());
    }
}
