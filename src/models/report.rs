//! 运行结果模型
//!
//! 导入、名称同步和选股查询的汇总结构，可直接序列化为 JSON 输出

use serde::Serialize;

/// 一次导入运行的汇总
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    /// 扫描到的文件总数
    pub files_total: usize,
    /// 成功导入的文件数
    pub files_succeeded: usize,
    /// 失败并跳过的文件数
    pub files_failed: usize,
    /// 写入的记录总数
    pub records_imported: usize,
}

/// 历史表名称同步的汇总
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NameSyncReport {
    /// 历史表中的股票数
    pub codes_total: usize,
    /// 已按登记表更新名称的股票数
    pub updated: usize,
    /// 登记表中没有记录的股票数
    pub not_found: usize,
}

/// 选股结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreenHit {
    /// 股票代码
    pub code: String,
    /// 股票名称
    pub display_name: String,
    /// 满足条件的天数
    pub days_matched: usize,
    /// 区间内最小单日涨幅（百分比）
    pub min_change_pct: f64,
    /// 最近收盘价
    pub last_close: f64,
}
