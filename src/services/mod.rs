//! 业务逻辑服务模块
//!
//! 导入流程：tdx 解析 → identity 确定身份 → history_store 入库，由 import_driver 串联

pub mod common;          // 公共辅助函数
pub mod history_store;   // 历史行情存储
pub mod identity;        // 股票身份确定
pub mod import_driver;   // 批量导入流程
pub mod registry;        // 股票名称登记表
pub mod screen;          // 选股查询
pub mod tdx;             // 通达信导出文件解析
