//! 股票身份确定
//!
//! 同一只股票的身份信息有三个来源：文件头（代码、原始名称）、文件名前缀（交易所）
//! 以及名称登记表。交易所只取文件名前缀；名称按 [`NAME_PRECEDENCE`] 的顺序取第一个
//! 非空值。

use crate::models::{Exchange, StockIdentity};
use crate::services::registry::NameRegistry;

/// 显示名称的来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameSource {
    /// 名称登记表
    Registry,
    /// 导出文件头
    FileHeader,
}

/// 名称来源优先级，靠前者优先
pub const NAME_PRECEDENCE: [NameSource; 2] = [NameSource::Registry, NameSource::FileHeader];

/// 各来源提供的候选名称
#[derive(Debug, Clone, Default)]
pub struct NameCandidates {
    pub registry: Option<String>,
    pub file_header: Option<String>,
}

impl NameCandidates {
    fn get(&self, source: NameSource) -> Option<&str> {
        match source {
            NameSource::Registry => self.registry.as_deref(),
            NameSource::FileHeader => self.file_header.as_deref(),
        }
    }
}

/// 确定后的身份以及名称来源
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIdentity {
    pub identity: StockIdentity,
    pub name_source: NameSource,
}

/// 按优先级选出名称，所有来源都为空时返回 None
pub fn pick_name(candidates: &NameCandidates) -> Option<(NameSource, &str)> {
    NAME_PRECEDENCE.iter().find_map(|&source| {
        candidates
            .get(source)
            .filter(|name| !name.trim().is_empty())
            .map(|name| (source, name))
    })
}

/// 确定单个文件的股票身份
///
/// 登记表有记录时使用登记表名称，否则原样使用文件头名称（不做任何修正）。
pub fn resolve<R: NameRegistry + ?Sized>(
    code: &str,
    raw_name: &str,
    exchange_hint: Exchange,
    registry: &R,
) -> ResolvedIdentity {
    let candidates = NameCandidates {
        registry: registry.lookup(code),
        file_header: Some(raw_name.to_string()),
    };

    let (name_source, display_name) = match pick_name(&candidates) {
        Some((source, name)) => (source, name.to_string()),
        None => (NameSource::FileHeader, raw_name.to_string()),
    };

    ResolvedIdentity {
        identity: StockIdentity {
            code: code.to_string(),
            exchange: exchange_hint,
            display_name,
        },
        name_source,
    }
}
