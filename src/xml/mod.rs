//! # XML 导航基础模块
//!
//! 自有元素树与共享的数值转换表；版本相关的标签路径在各应用的导航器中。
//!
//! ## 依赖关系
//! - 被 `parsers/espresso/xml`, `parsers/vasp` 使用
//! - 子模块: tree, cast

pub mod cast;
pub mod tree;

pub use cast::{cast, cast_tagged, LogicalTokens, XmlType, XmlValue, ESPRESSO_LOGICAL, VASP_LOGICAL};
pub use tree::{XmlNode, XmlTree};
