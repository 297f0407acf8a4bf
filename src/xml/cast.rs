//! # XML 数值转换表
//!
//! 旧版模式用 `type`/`size`/`columns` 属性描述原始值，这里统一解码：
//!
//! | type      | 结果                                 |
//! |-----------|--------------------------------------|
//! | character | 原文                                 |
//! | integer   | 按 `size / columns` 行重排的整数矩阵 |
//! | real      | 按 `size / columns` 行重排的浮点矩阵 |
//! | logical   | 按应用的真/假记号转换的布尔矩阵      |
//!
//! 1×1 的整数/浮点结果展开为标量；1×1 的逻辑/字符结果仍保持矩阵形式。
//!
//! ## 依赖关系
//! - 被 `parsers/espresso/xml/legacy.rs`, `parsers/vasp/vasprun.rs` 使用

use super::tree::XmlNode;
use crate::extract::parse_f64;
use log::debug;

/// 声明的原始值类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XmlType {
    Character,
    Integer,
    Real,
    Logical,
}

impl XmlType {
    pub fn from_attr(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "character" | "string" => Some(XmlType::Character),
            "integer" | "int" => Some(XmlType::Integer),
            "real" | "float" => Some(XmlType::Real),
            "logical" => Some(XmlType::Logical),
            _ => None,
        }
    }
}

/// 应用特定的逻辑值记号（大小写不敏感）
#[derive(Debug, Clone, Copy)]
pub struct LogicalTokens {
    pub truthy: &'static [&'static str],
    pub falsy: &'static [&'static str],
}

pub const ESPRESSO_LOGICAL: LogicalTokens = LogicalTokens {
    truthy: &["t", ".true.", "true"],
    falsy: &["f", ".false.", "false"],
};

pub const VASP_LOGICAL: LogicalTokens = LogicalTokens {
    truthy: &["t"],
    falsy: &["f"],
};

impl LogicalTokens {
    pub fn parse(&self, token: &str) -> Option<bool> {
        let token = token.trim().to_lowercase();
        if self.truthy.contains(&token.as_str()) {
            Some(true)
        } else if self.falsy.contains(&token.as_str()) {
            Some(false)
        } else {
            None
        }
    }
}

/// 解码结果
#[derive(Debug, Clone, PartialEq)]
pub enum XmlValue {
    Character(Vec<Vec<String>>),
    Integer(i64),
    Real(f64),
    IntegerMatrix(Vec<Vec<i64>>),
    RealMatrix(Vec<Vec<f64>>),
    Logical(Vec<Vec<bool>>),
}

impl XmlValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            XmlValue::Real(v) => Some(*v),
            XmlValue::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            XmlValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// 1×1 逻辑矩阵的唯一元素
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            XmlValue::Logical(m) => m.first()?.first().copied(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            XmlValue::Character(m) => m.first()?.first().map(String::as_str),
            _ => None,
        }
    }

    /// 数值展平为一维（标量视为一个元素）
    pub fn to_f64_vec(&self) -> Vec<f64> {
        match self {
            XmlValue::Real(v) => vec![*v],
            XmlValue::Integer(v) => vec![*v as f64],
            XmlValue::RealMatrix(m) => m.iter().flatten().copied().collect(),
            XmlValue::IntegerMatrix(m) => m.iter().flatten().map(|v| *v as f64).collect(),
            _ => vec![],
        }
    }
}

fn reshape<T>(values: Vec<T>, size: usize, columns: usize) -> Vec<Vec<T>> {
    let columns = columns.max(1);
    let rows = (size / columns).max(1);

    let mut out = Vec::with_capacity(rows);
    let mut iter = values.into_iter();
    for _ in 0..rows {
        let row: Vec<T> = iter.by_ref().take(columns).collect();
        if row.is_empty() {
            break;
        }
        out.push(row);
    }
    out
}

/// 按声明的类型与形状解码文本
///
/// `size` 缺省为实际记号数，`columns` 缺省为 1。任一记号无法转换时返回 `None`。
pub fn cast(
    text: &str,
    xml_type: XmlType,
    size: Option<usize>,
    columns: Option<usize>,
    tokens: &LogicalTokens,
) -> Option<XmlValue> {
    let words: Vec<&str> = text.split_whitespace().collect();

    if xml_type == XmlType::Character && size.unwrap_or(1) <= 1 {
        return Some(XmlValue::Character(vec![vec![text.trim().to_string()]]));
    }

    let size = size.unwrap_or(words.len());
    let columns = columns.unwrap_or(1);
    let scalar = size == 1 && columns <= 1;

    match xml_type {
        XmlType::Character => {
            let values = words.iter().map(|w| w.to_string()).collect();
            Some(XmlValue::Character(reshape(values, size, columns)))
        }
        XmlType::Integer => {
            let values: Vec<i64> = words
                .iter()
                .map(|w| w.parse().ok())
                .collect::<Option<_>>()?;
            match values.as_slice() {
                [v] if scalar => Some(XmlValue::Integer(*v)),
                _ => Some(XmlValue::IntegerMatrix(reshape(values, size, columns))),
            }
        }
        XmlType::Real => {
            let values: Vec<f64> = words.iter().map(|w| parse_f64(w)).collect::<Option<_>>()?;
            match values.as_slice() {
                [v] if scalar => Some(XmlValue::Real(*v)),
                _ => Some(XmlValue::RealMatrix(reshape(values, size, columns))),
            }
        }
        XmlType::Logical => {
            let values: Vec<bool> = words
                .iter()
                .map(|w| tokens.parse(w))
                .collect::<Option<_>>()?;
            Some(XmlValue::Logical(reshape(values, size, columns)))
        }
    }
}

/// 读取元素自身的 `type`/`size`/`columns` 属性后解码
pub fn cast_tagged(node: &XmlNode, tokens: &LogicalTokens) -> Option<XmlValue> {
    let xml_type = match node.attr("type").and_then(XmlType::from_attr) {
        Some(t) => t,
        None => {
            debug!("<{}> carries no usable type attribute", node.name);
            return None;
        }
    };

    let size = node.attr("size").and_then(|s| s.trim().parse().ok());
    let columns = node.attr("columns").and_then(|s| s.trim().parse().ok());

    cast(&node.text, xml_type, size, columns, tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::tree::XmlTree;

    #[test]
    fn test_one_by_one_real_unwraps_to_scalar() {
        let v = cast(" 2.5E-01 ", XmlType::Real, Some(1), None, &ESPRESSO_LOGICAL).unwrap();
        assert_eq!(v, XmlValue::Real(0.25));
        assert_eq!(v.as_f64(), Some(0.25));
    }

    #[test]
    fn test_one_by_one_logical_stays_matrix() {
        let v = cast("T", XmlType::Logical, Some(1), None, &ESPRESSO_LOGICAL).unwrap();
        assert_eq!(v, XmlValue::Logical(vec![vec![true]]));
        assert_eq!(v.as_bool(), Some(true));
    }

    #[test]
    fn test_one_by_one_character_stays_matrix() {
        let v = cast(" Hartree ", XmlType::Character, Some(1), None, &ESPRESSO_LOGICAL).unwrap();
        assert_eq!(v, XmlValue::Character(vec![vec!["Hartree".to_string()]]));
    }

    #[test]
    fn test_reshape_by_columns() {
        let v = cast("1 2 3 4 5 6", XmlType::Integer, Some(6), Some(3), &ESPRESSO_LOGICAL).unwrap();
        assert_eq!(v, XmlValue::IntegerMatrix(vec![vec![1, 2, 3], vec![4, 5, 6]]));

        let r = cast("1.0 2.0 3.0", XmlType::Real, Some(3), None, &ESPRESSO_LOGICAL).unwrap();
        assert_eq!(r, XmlValue::RealMatrix(vec![vec![1.0], vec![2.0], vec![3.0]]));
        assert_eq!(r.to_f64_vec(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_logical_token_sets() {
        assert_eq!(ESPRESSO_LOGICAL.parse(".TRUE."), Some(true));
        assert_eq!(ESPRESSO_LOGICAL.parse("false"), Some(false));
        assert_eq!(VASP_LOGICAL.parse("F"), Some(false));
        assert_eq!(VASP_LOGICAL.parse(".true."), None);
    }

    #[test]
    fn test_cast_tagged() {
        let tree = XmlTree::parse(
            r#"<SPIN><LSDA type="logical" size="1">F</LSDA><NBND type="integer" size="1">8</NBND></SPIN>"#,
        )
        .unwrap();
        let lsda = cast_tagged(tree.find("LSDA").unwrap(), &ESPRESSO_LOGICAL).unwrap();
        assert_eq!(lsda.as_bool(), Some(false));

        let nbnd = cast_tagged(tree.find("NBND").unwrap(), &ESPRESSO_LOGICAL).unwrap();
        assert_eq!(nbnd, XmlValue::Integer(8));
    }

    #[test]
    fn test_bad_token_is_none() {
        assert!(cast("1 x", XmlType::Integer, Some(2), None, &ESPRESSO_LOGICAL).is_none());
    }
}
