//! 股票数据模型
//!
//! 定义股票身份、日K线以及入库记录的数据结构

use std::fmt;

use chrono::NaiveDate;

/// 交易所标识
///
/// 由导出文件名前缀决定（如 `SH#600000.txt`），不依据代码数字前缀推断
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Exchange {
    /// 上海证券交易所
    Sh,
    /// 深圳证券交易所
    Sz,
    /// 北京证券交易所
    Bj,
    /// 无法识别
    Unknown,
}

impl Exchange {
    /// 入库使用的字符串形式
    pub fn as_str(&self) -> &'static str {
        match self {
            Exchange::Sh => "SH",
            Exchange::Sz => "SZ",
            Exchange::Bj => "BJ",
            Exchange::Unknown => "UNKNOWN",
        }
    }

    /// 由交易所标签解析，区分大小写，未知标签返回 `Unknown`
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "SH" => Exchange::Sh,
            "SZ" => Exchange::Sz,
            "BJ" => Exchange::Bj,
            _ => Exchange::Unknown,
        }
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 股票身份
///
/// 每个导入文件解析出唯一一个身份，文件内所有K线共用
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockIdentity {
    /// 股票代码（6 位）
    pub code: String,
    /// 交易所
    pub exchange: Exchange,
    /// 显示名称
    pub display_name: String,
}

/// 单日K线
///
/// 不校验 high/low 与 open/close 的大小关系，源数据原样入库
#[derive(Debug, Clone, PartialEq)]
pub struct DailyBar {
    /// 交易日
    pub trade_date: NaiveDate,
    /// 开盘价
    pub open: f64,
    /// 最高价
    pub high: f64,
    /// 最低价
    pub low: f64,
    /// 收盘价
    pub close: f64,
    /// 成交量
    pub volume: i64,
    /// 成交额
    pub amount: f64,
}

impl DailyBar {
    /// 入库主键使用的紧凑日期（YYYYMMDD）
    pub fn trade_date_key(&self) -> String {
        self.trade_date.format("%Y%m%d").to_string()
    }
}

/// 单个导出文件的解析结果
#[derive(Debug, Clone)]
pub struct ParsedFile {
    /// 文件头中的股票代码
    pub code: String,
    /// 文件头中的原始名称（可能带有空格等瑕疵）
    pub raw_name: String,
    /// 文件名前缀推断的交易所
    pub exchange_hint: Exchange,
    /// 有效K线，按文件中的顺序
    pub bars: Vec<DailyBar>,
    /// 被跳过的数据行数量
    pub skipped_lines: usize,
}

/// stock_history 表中的一行
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRecord {
    pub code: String,
    pub display_name: String,
    pub exchange: String,
    /// YYYYMMDD
    pub trade_date: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
    pub amount: f64,
    pub imported_at: String,
}
