//! # simextract - 模拟程序输出的物理量提取库
//!
//! 从平面波 DFT 程序（Quantum ESPRESSO、VASP）与量子化学程序（NWChem）的
//! 文本/XML 输出中提取能量、受力、应力、能带、晶格、态密度与收敛轨迹，
//! 统一换算为 eV / Å / kbar，交给下游序列化层。
//!
//! ## 依赖关系
//! ```text
//! lib.rs
//!   ├── parsers/   (各应用解析门面 + 能力契约)
//!   │     ├── extract/   (正则模式、分块、数据表)
//!   │     ├── xml/       (XML 导航与类型转换)
//!   │     ├── models/    (数据模型)
//!   │     └── units      (单位与坐标换算)
//!   ├── batch/     (文件查找与并行批处理)
//!   ├── cli/       (命令行参数定义)
//!   ├── commands/  (命令执行逻辑)
//!   ├── utils/     (终端输出、进度条)
//!   └── error.rs   (错误处理)
//! ```

pub mod batch;
pub mod cli;
pub mod commands;
pub mod error;
pub mod extract;
pub mod models;
pub mod parsers;
pub mod units;
pub mod utils;
pub mod xml;

pub use error::{ExtractError, Result};
pub use models::{Property, PropertyKind};
pub use parsers::{Application, CalculationParser, ParserConfig};
