//! 历史行情存储
//!
//! 基于 SQLite 的 stock_history 表，以 (stock_code, trade_date) 唯一。
//! 同一键重复写入时整行替换；每个文件的写入在一个事务内完成。

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::errors::StoreError;
use crate::models::{DailyBar, HistoryRecord, NameSyncReport, StockIdentity};
use crate::services::registry::NameRegistry;

/// 建表及索引，可重复执行
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS stock_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    stock_code TEXT NOT NULL,
    stock_name TEXT,
    exchange TEXT,
    trade_date TEXT NOT NULL,
    open REAL,
    high REAL,
    low REAL,
    close REAL,
    volume INTEGER,
    amount REAL,
    import_time TIMESTAMP DEFAULT CURRENT_TIMESTAMP,  -- UTC YYYY-MM-DD HH:MM:SS
    UNIQUE(stock_code, trade_date)
);
CREATE INDEX IF NOT EXISTS idx_stock_code ON stock_history(stock_code);
CREATE INDEX IF NOT EXISTS idx_trade_date ON stock_history(trade_date);
CREATE UNIQUE INDEX IF NOT EXISTS idx_stock_date ON stock_history(stock_code, trade_date);
"#;

const UPSERT_SQL: &str = r#"
INSERT OR REPLACE INTO stock_history
    (stock_code, stock_name, exchange, trade_date, open, high, low, close, volume, amount, import_time)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
"#;

const RECORD_COLUMNS: &str =
    "stock_code, stock_name, exchange, trade_date, open, high, low, close, volume, amount, import_time";

/// stock_history 表的唯一写入者
#[derive(Debug)]
pub struct HistoryStore {
    conn: Connection,
}

impl HistoryStore {
    /// 打开（或创建）数据库文件
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    /// 内存数据库，用于测试
    #[allow(dead_code)]
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// 创建 stock_history 表及三个索引，每次启动都可调用
    pub fn ensure_schema(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(SCHEMA_SQL)?;
        log::debug!("stock_history 表已就绪");
        Ok(())
    }

    /// 写入一个文件的全部K线
    ///
    /// 整批在一个事务内提交；任一行写入失败则整批回滚，返回 `StoreError::WriteFailed`。
    ///
    /// # 参数
    /// - identity: 该文件确定后的股票身份
    /// - bars: 日K线
    /// - imported_at: 导入时间，UTC `YYYY-MM-DD HH:MM:SS`，与列默认值格式一致
    pub fn upsert_bars(
        &mut self,
        identity: &StockIdentity,
        bars: &[DailyBar],
        imported_at: &str,
    ) -> Result<usize, StoreError> {
        let tx = self.conn.transaction().map_err(StoreError::WriteFailed)?;
        {
            let mut stmt = tx.prepare_cached(UPSERT_SQL).map_err(StoreError::WriteFailed)?;
            for bar in bars {
                stmt.execute(params![
                    identity.code,
                    identity.display_name,
                    identity.exchange.as_str(),
                    bar.trade_date_key(),
                    bar.open,
                    bar.high,
                    bar.low,
                    bar.close,
                    bar.volume,
                    bar.amount,
                    imported_at,
                ])
                .map_err(StoreError::WriteFailed)?;
            }
        }
        // 提前返回时 tx 被 drop，自动回滚
        tx.commit().map_err(StoreError::WriteFailed)?;
        Ok(bars.len())
    }

    /// 删除全部历史数据，仅用于显式的全量重新导入
    pub fn clear_all(&self) -> Result<usize, StoreError> {
        let deleted = self.conn.execute("DELETE FROM stock_history", [])?;
        Ok(deleted)
    }

    /// 按登记表修正历史表中的股票名称
    ///
    /// 只更新登记表中有记录的代码，全部更新在一个事务内完成
    pub fn sync_display_names<R: NameRegistry + ?Sized>(
        &mut self,
        registry: &R,
    ) -> Result<NameSyncReport, StoreError> {
        let codes = self.distinct_codes()?;
        let mut report = NameSyncReport {
            codes_total: codes.len(),
            ..Default::default()
        };

        let tx = self.conn.transaction().map_err(StoreError::WriteFailed)?;
        {
            let mut stmt = tx
                .prepare("UPDATE stock_history SET stock_name = ?1 WHERE stock_code = ?2")
                .map_err(StoreError::WriteFailed)?;

            for code in &codes {
                match registry.lookup(code) {
                    Some(name) => {
                        stmt.execute(params![name, code]).map_err(StoreError::WriteFailed)?;
                        report.updated += 1;
                        if report.updated % 500 == 0 {
                            log::info!("已更新 {} 只股票名称...", report.updated);
                        }
                    }
                    None => {
                        report.not_found += 1;
                        if report.not_found <= 10 {
                            log::warn!("股票 {} 不在登记表中", code);
                        }
                    }
                }
            }
        }
        tx.commit().map_err(StoreError::WriteFailed)?;

        Ok(report)
    }

    /// 历史表总行数
    pub fn count(&self) -> Result<usize, StoreError> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM stock_history", [], |row| row.get(0))?;
        Ok(n as usize)
    }

    /// 某只股票的行数
    #[allow(dead_code)]
    pub fn count_for(&self, code: &str) -> Result<usize, StoreError> {
        let n: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM stock_history WHERE stock_code = ?1",
            [code],
            |row| row.get(0),
        )?;
        Ok(n as usize)
    }

    /// 按 (代码, 交易日) 查询单行
    pub fn find_record(
        &self,
        code: &str,
        trade_date: &str,
    ) -> Result<Option<HistoryRecord>, StoreError> {
        let sql = format!(
            "SELECT {} FROM stock_history WHERE stock_code = ?1 AND trade_date = ?2",
            RECORD_COLUMNS
        );
        let record = self
            .conn
            .query_row(&sql, params![code, trade_date], record_from_row)
            .optional()?;
        Ok(record)
    }

    /// 某只股票的全部记录，按交易日升序
    #[allow(dead_code)]
    pub fn records_for(&self, code: &str) -> Result<Vec<HistoryRecord>, StoreError> {
        let sql = format!(
            "SELECT {} FROM stock_history WHERE stock_code = ?1 ORDER BY trade_date",
            RECORD_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let records = stmt
            .query_map([code], record_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// 历史表中出现过的全部股票代码
    pub fn distinct_codes(&self) -> Result<Vec<String>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT stock_code FROM stock_history ORDER BY stock_code")?;
        let codes = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(codes)
    }

    /// 最近的若干个交易日（降序）
    pub fn latest_trade_dates(&self, limit: usize) -> Result<Vec<String>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT trade_date FROM stock_history ORDER BY trade_date DESC LIMIT ?1",
        )?;
        let dates = stmt
            .query_map([limit as i64], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(dates)
    }

    /// 违反唯一性的 (代码, 交易日, 行数)，正常情况下应为空
    pub fn duplicate_keys(&self) -> Result<Vec<(String, String, usize)>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT stock_code, trade_date, COUNT(*) FROM stock_history \
             GROUP BY stock_code, trade_date HAVING COUNT(*) > 1",
        )?;
        let keys = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)? as usize,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(keys)
    }
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<HistoryRecord> {
    Ok(HistoryRecord {
        code: row.get(0)?,
        display_name: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        exchange: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        trade_date: row.get(3)?,
        open: row.get(4)?,
        high: row.get(5)?,
        low: row.get(6)?,
        close: row.get(7)?,
        volume: row.get(8)?,
        amount: row.get(9)?,
        imported_at: row.get::<_, Option<String>>(10)?.unwrap_or_default(),
    })
}
