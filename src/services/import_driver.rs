//! 批量导入流程
//!
//! 逐个处理数据目录中的导出文件：解析 → 确定身份 → 入库。
//! 单个文件失败只计数并跳过，不影响其余文件；每个文件独立提交，
//! 中途退出后重新运行即可继续（重复导入不会产生重复数据）。

use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{FatalError, FileImportError};
use crate::models::ImportReport;
use crate::services::common::{get_import_time, IMPORT_TIME_FORMAT};
use crate::services::history_store::HistoryStore;
use crate::services::identity::{resolve, NameSource};
use crate::services::registry::NameRegistry;
use crate::services::tdx::parse_file;

/// 导入流程参数
#[derive(Debug, Clone)]
pub struct ImportSettings {
    /// 数据文件扩展名（不含点）
    pub extension: String,
    /// 每处理多少个文件输出一次进度，0 表示不输出
    pub progress_interval: usize,
    /// 详细记录前多少个失败文件
    pub max_logged_failures: usize,
    /// 是否按文件名排序后处理
    pub sort_files: bool,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            extension: "txt".to_string(),
            progress_interval: 100,
            max_logged_failures: 10,
            sort_files: true,
        }
    }
}

/// 单次运行的选项
#[derive(Debug, Clone, Copy, Default)]
pub struct ImportOptions {
    /// 导入前清空历史表
    pub clear_existing: bool,
}

/// 导入驱动
pub struct ImportDriver<'a, R: NameRegistry + ?Sized> {
    store: &'a mut HistoryStore,
    registry: &'a R,
    settings: ImportSettings,
}

impl<'a, R: NameRegistry + ?Sized> ImportDriver<'a, R> {
    pub fn new(store: &'a mut HistoryStore, registry: &'a R, settings: ImportSettings) -> Self {
        Self {
            store,
            registry,
            settings,
        }
    }

    /// 导入目录中的全部数据文件
    ///
    /// 只有运行级错误（目录不存在、无法建表等）返回 Err；
    /// 单个文件的错误计入 `files_failed`。
    pub fn run(
        &mut self,
        source_dir: &Path,
        options: ImportOptions,
    ) -> Result<ImportReport, FatalError> {
        if !source_dir.is_dir() {
            return Err(FatalError::SourceDirectoryMissing(source_dir.to_path_buf()));
        }

        self.store.ensure_schema()?;
        let files = self.collect_files(source_dir)?;

        if options.clear_existing {
            log::info!("正在清空已有历史数据...");
            let deleted = self.store.clear_all()?;
            log::info!("已删除 {} 条历史数据", deleted);
        }

        let mut report = ImportReport {
            files_total: files.len(),
            ..Default::default()
        };
        log::info!("找到 {} 个数据文件待导入", report.files_total);

        for (idx, path) in files.iter().enumerate() {
            let idx = idx + 1;
            if self.settings.progress_interval > 0 && idx % self.settings.progress_interval == 0 {
                log::info!("正在处理 {}/{} 个文件...", idx, report.files_total);
            }

            match self.import_file(path) {
                Ok(records) => {
                    report.files_succeeded += 1;
                    report.records_imported += records;
                }
                Err(e) => {
                    report.files_failed += 1;
                    if report.files_failed <= self.settings.max_logged_failures {
                        log::warn!("导入 {} 失败: {}", path.display(), e);
                    } else {
                        log::debug!("导入 {} 失败: {}", path.display(), e);
                    }
                }
            }
        }

        log::info!("{}", "=".repeat(60));
        log::info!("导入完成");
        log::info!("文件总数: {}", report.files_total);
        log::info!("成功: {}", report.files_succeeded);
        log::info!("失败: {}", report.files_failed);
        log::info!("导入记录数: {}", report.records_imported);
        log::info!("{}", "=".repeat(60));

        Ok(report)
    }

    /// 导入单个文件，返回写入的记录数
    fn import_file(&mut self, path: &Path) -> Result<usize, FileImportError> {
        let parsed = parse_file(path)?;
        if parsed.skipped_lines > 0 {
            log::debug!("{} 跳过 {} 行无效数据", path.display(), parsed.skipped_lines);
        }

        let resolved = resolve(
            &parsed.code,
            &parsed.raw_name,
            parsed.exchange_hint,
            self.registry,
        );
        if resolved.name_source == NameSource::FileHeader {
            log::debug!(
                "{} 不在登记表中，使用文件头名称 {:?}",
                parsed.code,
                resolved.identity.display_name
            );
        }

        let imported_at = get_import_time();
        let records = self
            .store
            .upsert_bars(&resolved.identity, &parsed.bars, &imported_at)?;
        Ok(records)
    }

    fn collect_files(&self, source_dir: &Path) -> Result<Vec<PathBuf>, FatalError> {
        let entries = fs::read_dir(source_dir).map_err(|source| FatalError::ReadDirectory {
            path: source_dir.to_path_buf(),
            source,
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let path = match entry {
                Ok(entry) => entry.path(),
                Err(e) => {
                    log::warn!("读取目录项失败: {}", e);
                    continue;
                }
            };

            let matches_ext = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map_or(false, |ext| ext == self.settings.extension);
            if matches_ext && path.is_file() {
                files.push(path);
            }
        }

        if self.settings.sort_files {
            files.sort();
        }
        Ok(files)
    }
}
