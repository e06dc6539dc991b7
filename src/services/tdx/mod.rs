//! 通达信数据模块
//!
//! 解析通达信“盘后数据导出”生成的日线文本文件

pub mod parser;

pub use parser::parse_file;
