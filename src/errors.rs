//! 错误类型定义
//!
//! 单文件错误（解析、写入）在导入循环内被计数并跳过；
//! 运行级错误（如源目录不存在）直接终止本次运行。

use std::path::PathBuf;

use thiserror::Error;

/// 导出文件解析错误
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("读取文件失败: {0}")]
    Io(#[from] std::io::Error),

    #[error("文件不是有效的 GBK 编码")]
    Encoding,

    #[error("文件行数不足: 共 {lines} 行，至少需要 3 行")]
    Truncated { lines: usize },

    #[error("文件头格式错误: {0:?}")]
    MalformedHeader(String),

    #[error("文件中没有有效数据行")]
    NoData,
}

/// 历史表存储错误
#[derive(Error, Debug)]
pub enum StoreError {
    /// 单个文件的批量写入失败，事务已回滚
    #[error("写入失败（已回滚）: {0}")]
    WriteFailed(#[source] rusqlite::Error),

    #[error("数据库操作失败: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// 单个文件导入失败的原因
#[derive(Error, Debug)]
pub enum FileImportError {
    #[error("解析失败: {0}")]
    Parse(#[from] ParseError),

    #[error("入库失败: {0}")]
    Store(#[from] StoreError),
}

/// 运行级错误，发生时不处理任何文件
#[derive(Error, Debug)]
pub enum FatalError {
    #[error("数据目录不存在: {}", .0.display())]
    SourceDirectoryMissing(PathBuf),

    #[error("无法读取数据目录 {}: {source}", .path.display())]
    ReadDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("数据库初始化失败: {0}")]
    Store(#[from] StoreError),
}
