//! # extract 子命令 CLI 定义
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/extract.rs`

use crate::models::PropertyKind;
use crate::parsers::{Application, ParserConfig};
use clap::Args;
use std::path::PathBuf;

/// extract 子命令参数
#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// Application that produced the outputs
    #[arg(long, value_enum)]
    pub app: Application,

    /// Calculation working directory
    #[arg(long, env = "SIMEXTRACT_WORK_DIR", default_value = ".")]
    pub work_dir: PathBuf,

    /// Standard output file (relative to the working directory or absolute)
    #[arg(long)]
    pub stdout: Option<PathBuf>,

    /// Declared program version (Quantum ESPRESSO only)
    #[arg(long, env = "SIMEXTRACT_ESPRESSO_VERSION")]
    pub version: Option<String>,

    /// Properties to extract; all of them when omitted
    #[arg(short, long = "property", value_enum, value_delimiter = ',')]
    pub properties: Vec<PropertyKind>,

    /// Pretty-print the JSON output
    #[arg(long, default_value_t = false)]
    pub pretty: bool,
}

impl ExtractArgs {
    pub fn parser_config(&self) -> ParserConfig {
        let mut config = ParserConfig::new(&self.work_dir);
        if let Some(stdout) = &self.stdout {
            config = config.with_stdout(stdout);
        }
        if let Some(version) = &self.version {
            config = config.with_version(version);
        }
        config
    }
}
