//! 基于历史表的选股查询
//!
//! 例如“最近 3 个交易日每天涨幅都超过 5% 的股票”。涨幅按相邻两条记录的收盘价计算。

use rusqlite::params;

use crate::errors::StoreError;
use crate::models::ScreenHit;
use crate::services::history_store::HistoryStore;

/// 选股条件
#[derive(Debug, Clone, Copy)]
pub struct ScreenCriteria {
    /// 最近多少个交易日
    pub days: usize,
    /// 每日最小涨幅（百分比，不含）
    pub min_change_pct: f64,
}

const RISING_SQL: &str = r#"
WITH ranked AS (
    SELECT stock_code, stock_name, trade_date, close,
           LAG(close) OVER (PARTITION BY stock_code ORDER BY trade_date) AS prev_close
    FROM stock_history
),
recent AS (
    SELECT DISTINCT trade_date FROM stock_history ORDER BY trade_date DESC LIMIT ?1
)
SELECT r.stock_code,
       MAX(r.stock_name),
       COUNT(*),
       MIN((r.close - r.prev_close) * 100.0 / r.prev_close),
       MAX(r.trade_date)
FROM ranked r
JOIN recent d ON r.trade_date = d.trade_date
WHERE r.prev_close > 0
  AND (r.close - r.prev_close) * 100.0 / r.prev_close > ?2
GROUP BY r.stock_code
HAVING COUNT(*) = (SELECT COUNT(*) FROM recent)
ORDER BY r.stock_code
"#;

/// 最近 `days` 个交易日每天涨幅都超过 `min_change_pct` 的股票
///
/// 交易日取历史表中出现过的最近日期；期间停牌（缺少记录）的股票不会入选。
pub fn rising_stocks(
    store: &HistoryStore,
    criteria: ScreenCriteria,
) -> Result<Vec<ScreenHit>, StoreError> {
    if criteria.days == 0 {
        return Ok(Vec::new());
    }

    let conn = store.connection();
    let mut stmt = conn.prepare(RISING_SQL)?;
    let rows = stmt
        .query_map(
            params![criteria.days as i64, criteria.min_change_pct],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                    row.get::<_, i64>(2)? as usize,
                    row.get::<_, f64>(3)?,
                    row.get::<_, String>(4)?,
                ))
            },
        )?
        .collect::<Result<Vec<_>, _>>()?;

    let mut hits = Vec::with_capacity(rows.len());
    for (code, display_name, days_matched, min_change_pct, last_date) in rows {
        let last_close = store
            .find_record(&code, &last_date)?
            .map(|r| r.close)
            .unwrap_or_default();
        hits.push(ScreenHit {
            code,
            display_name,
            days_matched,
            min_change_pct,
            last_close,
        });
    }

    Ok(hits)
}
