//! 公共辅助函数

use chrono::Utc;

/// 入库时间格式，与 SQLite CURRENT_TIMESTAMP 一致（UTC）
pub const IMPORT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 获取入库时间字符串（UTC，`YYYY-MM-DD HH:MM:SS`）
pub fn get_import_time() -> String {
    Utc::now().format(IMPORT_TIME_FORMAT).to_string()
}
