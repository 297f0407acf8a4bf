//! # 批量处理模块
//!
//! 解析器用 `FileCollector` 在工作目录下定位输出与数据文件；
//! `collect` 命令用它识别计算目录，再交给 `BatchRunner` 并行提取。
//!
//! ## 依赖关系
//! - 被 `parsers/` 与 `commands/collect.rs` 使用
//! - 使用 `walkdir` 遍历目录，`rayon` 并行，`indicatif` 显示进度

pub mod collector;
pub mod runner;

pub use collector::{glob_match, FileCollector, DEFAULT_SEARCH_DEPTH};
pub use runner::{BatchResult, BatchRunner, ProcessResult};
