//! # CLI 模块
//!
//! 使用 `clap` 定义命令行参数和子命令。
//!
//! ## 命令结构
//! - `extract`: 从单个计算目录提取物理量，输出 JSON
//! - `collect`: 批量扫描计算目录，输出能量排序的 CSV
//!
//! ## 依赖关系
//! - 被 `main.rs` 使用
//! - 子模块: extract, collect

pub mod collect;
pub mod extract;

use clap::{Parser, Subcommand};

/// simextract - 模拟程序输出的物理量提取工具
#[derive(Parser)]
#[command(name = "simextract")]
#[command(version)]
#[command(about = "Extract physical quantities from DFT and quantum-chemistry outputs", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// 可用的子命令
#[derive(Subcommand)]
pub enum Commands {
    /// Extract properties from one calculation and print them as JSON
    Extract(extract::ExtractArgs),

    /// Summarize many calculations into a ranked CSV table
    Collect(collect::CollectArgs),
}
