//! 股票名称登记表
//!
//! 登记表（stock_list 表）由单独的行情同步流程维护，是股票显示名称的权威来源。
//! 导入时整表读入内存，按代码查询。

use std::collections::HashMap;

use rusqlite::Connection;

use crate::errors::StoreError;

/// 登记表所在的表名
pub const REGISTRY_TABLE: &str = "stock_list";

/// 按股票代码查询权威名称
pub trait NameRegistry {
    fn lookup(&self, code: &str) -> Option<String>;
}

/// 内存中的名称登记表
#[derive(Debug, Clone, Default)]
pub struct StockRegistry {
    names: HashMap<String, String>,
}

impl StockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记一个名称，已存在的代码保持原值
    pub fn insert(&mut self, code: impl Into<String>, name: impl Into<String>) {
        self.names.entry(code.into()).or_insert_with(|| name.into());
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// 从数据库的 stock_list 表加载
    ///
    /// 表不存在时返回空登记表，此时所有名称都取自文件头
    pub fn load(conn: &Connection) -> Result<Self, StoreError> {
        let exists: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [REGISTRY_TABLE],
            |row| row.get(0),
        )?;

        let mut registry = Self::new();
        if exists == 0 {
            log::warn!("数据库中没有 {} 表，股票名称将使用文件头中的名称", REGISTRY_TABLE);
            return Ok(registry);
        }

        let mut stmt = conn.prepare(
            "SELECT symbol, name FROM stock_list WHERE symbol IS NOT NULL AND name IS NOT NULL",
        )?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;

        for row in rows {
            let (code, name) = row?;
            let name = name.trim();
            if !name.is_empty() {
                registry.insert(code.trim(), name);
            }
        }

        log::info!("从 {} 加载 {} 个股票名称", REGISTRY_TABLE, registry.len());
        Ok(registry)
    }
}

impl NameRegistry for StockRegistry {
    fn lookup(&self, code: &str) -> Option<String> {
        self.names.get(code).cloned()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for StockRegistry {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut registry = Self::new();
        for (code, name) in iter {
            registry.insert(code, name);
        }
        registry
    }
}
