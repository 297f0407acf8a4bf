//! # collect 子命令 CLI 定义
//!
//! 批量扫描计算目录并汇总能量
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/collect.rs`

use crate::parsers::Application;
use clap::Args;
use std::path::PathBuf;

/// collect 子命令参数
#[derive(Args, Debug)]
pub struct CollectArgs {
    /// Root directory containing calculation folders
    pub root: PathBuf,

    /// Application that produced the outputs
    #[arg(long, value_enum)]
    pub app: Application,

    /// Standard output file name inside each calculation folder
    #[arg(long)]
    pub stdout_name: Option<String>,

    /// Declared program version (Quantum ESPRESSO only)
    #[arg(long, env = "SIMEXTRACT_ESPRESSO_VERSION")]
    pub version: Option<String>,

    /// Filename for the ranked CSV output
    #[arg(long, default_value = "summary.csv")]
    pub output: PathBuf,

    /// Number of top calculations to print
    #[arg(long, default_value_t = 10)]
    pub top_n: usize,

    /// Number of parallel jobs (0 = all logical cores)
    #[arg(short, long, default_value_t = 0)]
    pub jobs: usize,
}
