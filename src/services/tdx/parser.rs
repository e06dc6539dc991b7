//! 通达信导出文件解析
//!
//! 文件为 GBK 编码，格式如下：
//!
//! ```text
//! 600000 浦发银行 日线 不复权
//!       日期	    开盘	    最高	    最低	    收盘	    成交量	    成交额
//! 2024/03/05	10.00	10.20	9.90	10.10	1234567	12345678.00
//! ...
//! 数据来源:通达信
//! ```
//!
//! 第一行为文件头（代码 + 名称），第二行为列名，之后每行一个交易日。
//! 无法解析的数据行（如末尾的数据来源说明、节假日标记）直接跳过。

use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::errors::ParseError;
use crate::models::{DailyBar, Exchange, ParsedFile};

/// 日期格式 YYYY/MM/DD（月、日允许一位数字）
static DATE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})/(\d{1,2})/(\d{1,2})$").expect("日期正则无效"));

/// 文件名前缀，如 `SH#600000.txt` 中的 `SH`
static FILE_PREFIX_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z]{2,3})#").expect("文件名正则无效"));

/// 数据行最少字段数：日期、开、高、低、收、量、额
const MIN_FIELDS: usize = 7;

/// 读取并解析单个导出文件
pub fn parse_file(path: &Path) -> Result<ParsedFile, ParseError> {
    let bytes = fs::read(path)?;
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default();
    parse_bytes(file_name, &bytes)
}

/// 解析导出文件内容
///
/// # 参数
/// - file_name: 文件名，用于推断交易所
/// - bytes: 原始 GBK 字节
pub fn parse_bytes(file_name: &str, bytes: &[u8]) -> Result<ParsedFile, ParseError> {
    let text = decode_gbk(bytes)?;
    let lines: Vec<&str> = text.lines().collect();

    if lines.len() < 3 {
        return Err(ParseError::Truncated { lines: lines.len() });
    }

    let mut header = lines[0].split_whitespace();
    let (code, raw_name) = match (header.next(), header.next()) {
        (Some(code), Some(name)) => (code.to_string(), name.to_string()),
        _ => return Err(ParseError::MalformedHeader(lines[0].trim().to_string())),
    };

    let mut bars = Vec::with_capacity(lines.len() - 2);
    let mut skipped_lines = 0;

    for (idx, line) in lines.iter().enumerate().skip(2) {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match parse_bar_line(line) {
            Some(bar) => bars.push(bar),
            None => {
                skipped_lines += 1;
                let preview: String = line.chars().take(50).collect();
                log::debug!("{} 第 {} 行无法解析，已跳过: {}", file_name, idx + 1, preview);
            }
        }
    }

    if bars.is_empty() {
        return Err(ParseError::NoData);
    }

    Ok(ParsedFile {
        code,
        raw_name,
        exchange_hint: exchange_from_file_name(file_name),
        bars,
        skipped_lines,
    })
}

/// 从文件名前缀推断交易所，与文件头中的代码无关
pub fn exchange_from_file_name(file_name: &str) -> Exchange {
    FILE_PREFIX_PATTERN
        .captures(file_name)
        .and_then(|c| c.get(1))
        .map(|m| Exchange::from_tag(m.as_str()))
        .unwrap_or(Exchange::Unknown)
}

/// 严格 GBK 解码，遇到非法字节序列即失败
fn decode_gbk(bytes: &[u8]) -> Result<String, ParseError> {
    encoding_rs::GBK
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(|text| text.into_owned())
        .ok_or(ParseError::Encoding)
}

fn parse_bar_line(line: &str) -> Option<DailyBar> {
    let fields: Vec<&str> = line.split('\t').map(str::trim).collect();
    if fields.len() < MIN_FIELDS {
        return None;
    }

    Some(DailyBar {
        trade_date: parse_trade_date(fields[0])?,
        open: parse_price(fields[1])?,
        high: parse_price(fields[2])?,
        low: parse_price(fields[3])?,
        close: parse_price(fields[4])?,
        volume: parse_volume(fields[5])?,
        amount: parse_price(fields[6])?,
    })
}

fn parse_trade_date(s: &str) -> Option<NaiveDate> {
    let caps = DATE_PATTERN.captures(s)?;
    let year = caps[1].parse().ok()?;
    let month = caps[2].parse().ok()?;
    let day = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn parse_price(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// 成交量可能带小数，截断为整数；超出 i64 范围视为无法解析
fn parse_volume(s: &str) -> Option<i64> {
    parse_price(s)
        .map(f64::trunc)
        .filter(|v| *v >= i64::MIN as f64 && *v < i64::MAX as f64)
        .map(|v| v as i64)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Duration;

    pub(crate) const COLUMN_LINE: &str =
        "      日期\t    开盘\t    最高\t    最低\t    收盘\t    成交量\t    成交额";

    /// 按 GBK 编码构造测试文件内容
    pub(crate) fn gbk(text: &str) -> Vec<u8> {
        encoding_rs::GBK.encode(text).0.into_owned()
    }

    /// 生成 n 行连续日期的有效数据
    pub(crate) fn sample_lines(start: NaiveDate, n: usize) -> Vec<String> {
        (0..n)
            .map(|i| {
                let date = start + Duration::days(i as i64);
                let base = 10.0 + i as f64 * 0.01;
                format!(
                    "{}\t{:.2}\t{:.2}\t{:.2}\t{:.2}\t{}\t{:.2}",
                    date.format("%Y/%m/%d"),
                    base,
                    base + 0.2,
                    base - 0.1,
                    base + 0.1,
                    100_000 + i,
                    1_000_000.0 + i as f64
                )
            })
            .collect()
    }

    pub(crate) fn sample_file(header: &str, lines: &[String]) -> Vec<u8> {
        let mut text = format!("{}\r\n{}\r\n", header, COLUMN_LINE);
        for line in lines {
            text.push_str(line);
            text.push_str("\r\n");
        }
        text.push_str("数据来源:通达信\r\n");
        gbk(&text)
    }

    #[test]
    fn test_parse_basic_file() {
        let lines = vec!["2024/03/05\t10.00\t10.20\t9.90\t10.10\t1234567\t12345678.00".to_string()];
        let bytes = sample_file("600000 浦发银行 日线 不复权", &lines);

        let parsed = parse_bytes("SH#600000.txt", &bytes).unwrap();
        println!("  {} {} {} 共 {} 条", parsed.code, parsed.raw_name, parsed.exchange_hint, parsed.bars.len());

        assert_eq!(parsed.code, "600000");
        assert_eq!(parsed.raw_name, "浦发银行");
        assert_eq!(parsed.exchange_hint, Exchange::Sh);
        assert_eq!(parsed.bars.len(), 1);
        // 末尾的“数据来源”行被跳过
        assert_eq!(parsed.skipped_lines, 1);

        let bar = &parsed.bars[0];
        assert_eq!(bar.trade_date_key(), "20240305");
        assert_eq!(bar.open, 10.00);
        assert_eq!(bar.high, 10.20);
        assert_eq!(bar.low, 9.90);
        assert_eq!(bar.close, 10.10);
        assert_eq!(bar.volume, 1_234_567);
        assert_eq!(bar.amount, 12_345_678.00);
    }

    #[test]
    fn test_skips_short_lines() {
        let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let mut lines = sample_lines(start, 250);
        lines.insert(10, "2023/06/01\t1.0\t2.0\t3.0".to_string());
        lines.insert(100, "2023/06/02\t1.0\t2.0\t3.0".to_string());
        lines.push("2023/06/03\t1.0\t2.0\t3.0".to_string());
        let bytes = sample_file("000001 平安银行", &lines);

        let parsed = parse_bytes("SZ#000001.txt", &bytes).unwrap();
        assert_eq!(parsed.bars.len(), 250);
        assert_eq!(parsed.skipped_lines, 4);
        assert_eq!(parsed.exchange_hint, Exchange::Sz);
    }

    #[test]
    fn test_skips_bad_dates_and_numbers() {
        let lines = vec![
            "2024/02/30\t1\t1\t1\t1\t1\t1".to_string(),
            "2024-03-01\t1\t1\t1\t1\t1\t1".to_string(),
            "2024/03/04\tN/A\t1\t1\t1\t1\t1".to_string(),
            "2024/03/04\t1\t1\t1\t1\tinf\t1".to_string(),
            "2024/3/6\t1\t2\t0.5\t1.5\t99.9\t100".to_string(),
        ];
        let bytes = sample_file("600000 浦发银行", &lines);

        let parsed = parse_bytes("SH#600000.txt", &bytes).unwrap();
        assert_eq!(parsed.bars.len(), 1);
        assert_eq!(parsed.bars[0].trade_date_key(), "20240306");
        // 成交量截断小数部分
        assert_eq!(parsed.bars[0].volume, 99);
    }

    #[test]
    fn test_skips_out_of_range_volume() {
        let lines = vec![
            "2024/03/04\t1\t1\t1\t1\t1e20\t1".to_string(),
            "2024/03/05\t1\t1\t1\t1\t-1e19\t1".to_string(),
            "2024/03/06\t1\t1\t1\t1\t5000\t1".to_string(),
        ];
        let bytes = sample_file("600000 浦发银行", &lines);

        let parsed = parse_bytes("SH#600000.txt", &bytes).unwrap();
        assert_eq!(parsed.bars.len(), 1);
        assert_eq!(parsed.bars[0].trade_date_key(), "20240306");
        assert_eq!(parsed.bars[0].volume, 5000);

        // 唯一的数据行溢出时整个文件没有有效数据
        let only = vec!["2024/03/05\t1\t1\t1\t1\t1e20\t1".to_string()];
        let err = parse_bytes("SH#600000.txt", &sample_file("600000 浦发银行", &only)).unwrap_err();
        assert!(matches!(err, ParseError::NoData));
    }

    #[test]
    fn test_price_order_not_validated() {
        // high 低于 open/close 时原样保留
        let lines = vec!["2024/03/05\t10\t5\t20\t12\t-3\t0".to_string()];
        let bytes = sample_file("600000 浦发银行", &lines);

        let bar = &parse_bytes("SH#600000.txt", &bytes).unwrap().bars[0];
        assert_eq!(bar.high, 5.0);
        assert_eq!(bar.low, 20.0);
        assert_eq!(bar.volume, -3);
    }

    #[test]
    fn test_truncated_file() {
        let err = parse_bytes("SH#600000.txt", b"").unwrap_err();
        assert!(matches!(err, ParseError::Truncated { lines: 0 }));

        let bytes = gbk("600000 浦发银行\n日期\t开盘\n");
        let err = parse_bytes("SH#600000.txt", &bytes).unwrap_err();
        assert!(matches!(err, ParseError::Truncated { lines: 2 }));
    }

    #[test]
    fn test_malformed_header() {
        let lines = sample_lines(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(), 3);
        let bytes = sample_file("600000", &lines);

        let err = parse_bytes("SH#600000.txt", &bytes).unwrap_err();
        assert!(matches!(err, ParseError::MalformedHeader(ref h) if h == "600000"));
    }

    #[test]
    fn test_no_data() {
        let lines = vec!["2024/03/05\t1\t2".to_string()];
        let bytes = sample_file("600000 浦发银行", &lines);

        let err = parse_bytes("SH#600000.txt", &bytes).unwrap_err();
        assert!(matches!(err, ParseError::NoData));
    }

    #[test]
    fn test_invalid_encoding() {
        let mut bytes = b"600000 \xFF\xFF\n".to_vec();
        bytes.extend_from_slice(b"date\topen\n2024/03/05\t1\t1\t1\t1\t1\t1\n");

        let err = parse_bytes("SH#600000.txt", &bytes).unwrap_err();
        assert!(matches!(err, ParseError::Encoding));
    }

    #[test]
    fn test_exchange_from_file_name() {
        let cases = vec![
            ("SH#600000.txt", Exchange::Sh),
            ("SZ#000001.txt", Exchange::Sz),
            ("BJ#830799.txt", Exchange::Bj),
            ("sh#600000.txt", Exchange::Unknown),
            ("Sz#000001.txt", Exchange::Unknown),
            ("HK#00700.txt", Exchange::Unknown),
            ("600000.txt", Exchange::Unknown),
            ("SHSE600000.txt", Exchange::Unknown),
        ];

        for (name, expected) in &cases {
            assert_eq!(exchange_from_file_name(name), *expected, "{}", name);
        }
    }

    #[test]
    fn test_parse_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("BJ#830799.txt");
        let lines = sample_lines(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(), 5);
        fs::write(&path, sample_file("830799 艾融软件", &lines)).unwrap();

        let parsed = parse_file(&path).unwrap();
        assert_eq!(parsed.exchange_hint, Exchange::Bj);
        assert_eq!(parsed.raw_name, "艾融软件");
        assert_eq!(parsed.bars.len(), 5);

        let err = parse_file(&dir.path().join("SH#missing.txt")).unwrap_err();
        assert!(matches!(err, ParseError::Io(_)));
    }
}
