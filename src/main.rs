//! # simextract 命令行入口
//!
//! ## 子命令
//! - `extract` - 从单个计算目录提取物理量（JSON）
//! - `collect` - 批量汇总计算目录（表格 + CSV）
//!
//! 日志级别由 `SIMEXTRACT_LOG` 控制，默认只显示警告。

use clap::Parser;
use simextract::cli::Cli;
use simextract::{commands, utils};

fn main() {
    env_logger::init_from_env(env_logger::Env::new().filter_or("SIMEXTRACT_LOG", "warn"));

    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let cli = Cli::parse();

    if let Err(e) = commands::run(cli.command) {
        utils::output::print_error(&e.to_string());
        std::process::exit(1);
    }
}
