//! # 通用文本提取器
//!
//! 给定文本与一个已编译的模式：
//! 1. 若有起始标记，从该字面子串**最后一次**出现处开始截取；
//! 2. 查找全部不重叠匹配；
//! 3. 按出现次数策略选取；
//! 4. 对每个匹配按 `match_groups` 组成元组，或直接转换整个匹配
//!    （正则恰有一个捕获组时取该组）。
//!
//! 选取结果恰为一个值且未请求多组时返回标量，否则返回列表。
//! 没有匹配不是错误：标量模式返回 `Extracted::None`，列表模式返回空列表。
//!
//! ## 依赖关系
//! - 被 `extract/source.rs` 与各应用解析器使用
//! - 使用 `extract/pattern.rs`

use super::parse_f64;
use super::pattern::{OutputType, Pattern};
use log::debug;
use regex::Captures;

/// 单个转换后的值
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Float(f64),
    Int(i64),
    Str(String),
}

impl Value {
    fn cast(raw: &str, output_type: OutputType) -> Option<Value> {
        let raw = raw.trim();
        match output_type {
            OutputType::Float => parse_f64(raw).map(Value::Float),
            OutputType::Int => raw.parse::<i64>().ok().map(Value::Int),
            OutputType::Str => Some(Value::Str(raw.to_string())),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            Value::Str(s) => parse_f64(s),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Float(_) => None,
            Value::Str(s) => s.parse().ok(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

/// 提取结果
#[derive(Debug, Clone, PartialEq)]
pub enum Extracted {
    /// 标量模式下无匹配
    None,
    Scalar(Value),
    List(Vec<Value>),
    /// 多捕获组请求：每个匹配一个元组
    Rows(Vec<Vec<Value>>),
}

impl Extracted {
    pub fn is_empty(&self) -> bool {
        match self {
            Extracted::None => true,
            Extracted::Scalar(_) => false,
            Extracted::List(v) => v.is_empty(),
            Extracted::Rows(v) => v.is_empty(),
        }
    }

    /// 匹配个数
    pub fn len(&self) -> usize {
        match self {
            Extracted::None => 0,
            Extracted::Scalar(_) => 1,
            Extracted::List(v) => v.len(),
            Extracted::Rows(v) => v.len(),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Extracted::Scalar(v) => v.as_f64(),
            Extracted::List(v) if v.len() == 1 => v[0].as_f64(),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Extracted::Scalar(v) => v.as_i64(),
            Extracted::List(v) if v.len() == 1 => v[0].as_i64(),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<String> {
        match self {
            Extracted::Scalar(v) => v.as_str().map(str::to_string),
            Extracted::List(v) if v.len() == 1 => v[0].as_str().map(str::to_string),
            _ => None,
        }
    }

    /// 展平为浮点列表（标量视为一个元素）
    pub fn as_f64_vec(&self) -> Vec<f64> {
        match self {
            Extracted::None => vec![],
            Extracted::Scalar(v) => v.as_f64().into_iter().collect(),
            Extracted::List(v) => v.iter().filter_map(Value::as_f64).collect(),
            Extracted::Rows(rows) => rows.iter().flatten().filter_map(Value::as_f64).collect(),
        }
    }

    /// 字符串列表
    pub fn as_string_vec(&self) -> Vec<String> {
        match self {
            Extracted::None => vec![],
            Extracted::Scalar(v) => v.as_str().map(str::to_string).into_iter().collect(),
            Extracted::List(v) => v
                .iter()
                .filter_map(|x| x.as_str().map(str::to_string))
                .collect(),
            Extracted::Rows(rows) => rows
                .iter()
                .flatten()
                .filter_map(|x| x.as_str().map(str::to_string))
                .collect(),
        }
    }

    /// 原始元组行
    pub fn as_rows(&self) -> &[Vec<Value>] {
        match self {
            Extracted::Rows(rows) => rows,
            _ => &[],
        }
    }

    /// 元组行转为浮点行
    pub fn as_f64_rows(&self) -> Vec<Vec<f64>> {
        match self {
            Extracted::Rows(rows) => rows
                .iter()
                .map(|r| r.iter().filter_map(Value::as_f64).collect())
                .collect(),
            other => other.as_f64_vec().into_iter().map(|v| vec![v]).collect(),
        }
    }

    /// 每行取前三个分量
    pub fn as_vec3_rows(&self) -> Vec<[f64; 3]> {
        self.as_f64_rows()
            .into_iter()
            .filter(|r| r.len() >= 3)
            .map(|r| [r[0], r[1], r[2]])
            .collect()
    }
}

/// 截取起始标记最后一次出现处之后（含标记）的文本
///
/// 标记不存在时返回 `None`：数据所在的区段不存在。
pub fn from_last_flag<'t>(text: &'t str, flag: &str) -> Option<&'t str> {
    text.rfind(flag).map(|pos| &text[pos..])
}

/// 按出现次数策略选取
pub fn select<T>(mut items: Vec<T>, occurrences: i32) -> Vec<T> {
    let n = occurrences.unsigned_abs() as usize;
    if occurrences > 0 {
        items.truncate(n);
        items
    } else if occurrences < 0 {
        let skip = items.len().saturating_sub(n);
        items.split_off(skip)
    } else {
        items
    }
}

/// 对文本应用模式
pub fn extract(text: &str, pattern: &Pattern) -> Extracted {
    let multi_group = pattern.match_groups.len() > 1;
    let scalar_mode = !multi_group && pattern.occurrences.abs() == 1;

    let region = match &pattern.start_flag {
        Some(flag) => from_last_flag(text, flag),
        None => Some(text),
    };

    let region = match region {
        Some(r) => r,
        None => {
            debug!("{}: start flag not found", pattern.name);
            return empty_result(scalar_mode, multi_group);
        }
    };

    let matches: Vec<Captures> = pattern.regex.captures_iter(region).collect();
    let selected = select(matches, pattern.occurrences);

    if multi_group {
        let rows: Vec<Vec<Value>> = selected
            .iter()
            .filter_map(|caps| cast_groups(caps, pattern))
            .collect();
        return Extracted::Rows(rows);
    }

    let mut values: Vec<Value> = selected
        .iter()
        .filter_map(|caps| cast_single(caps, pattern))
        .collect();

    match values.len() {
        0 => empty_result(scalar_mode, multi_group),
        1 => Extracted::Scalar(values.remove(0)),
        _ => Extracted::List(values),
    }
}

fn empty_result(scalar_mode: bool, multi_group: bool) -> Extracted {
    if multi_group {
        Extracted::Rows(vec![])
    } else if scalar_mode {
        Extracted::None
    } else {
        Extracted::List(vec![])
    }
}

/// 按 1-based 组序号构造元组；任何一组转换失败则丢弃该匹配
///
/// 未参与匹配的可选组在字符串类型下记为空串。
fn cast_groups(caps: &Captures, pattern: &Pattern) -> Option<Vec<Value>> {
    pattern
        .match_groups
        .iter()
        .map(|&g| {
            let raw = match caps.get(g) {
                Some(m) => m.as_str(),
                None if pattern.output_type == OutputType::Str => "",
                None => return None,
            };
            let v = Value::cast(raw, pattern.output_type);
            if v.is_none() {
                debug!("{}: cannot cast '{}'", pattern.name, raw);
            }
            v
        })
        .collect()
}

fn cast_single(caps: &Captures, pattern: &Pattern) -> Option<Value> {
    let group = match pattern.match_groups.first() {
        Some(&g) => g,
        None if pattern.group_count() == 1 => 1,
        None => 0,
    };
    let raw = caps.get(group)?.as_str();
    let v = Value::cast(raw, pattern.output_type);
    if v.is_none() {
        debug!("{}: cannot cast '{}'", pattern.name, raw);
    }
    v
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::pattern::PatternSpec;
    use approx::assert_relative_eq;

    fn pattern(regex: &'static str, occurrences: i32, start_flag: Option<&'static str>) -> Pattern {
        Pattern::compile(&PatternSpec {
            name: "test",
            regex,
            output_type: OutputType::Float,
            start_flag,
            occurrences,
            match_groups: &[],
        })
        .unwrap()
    }

    const ENERGY: &str = r"total energy\s+=\s+([-+]?\d+\.\d+)\s+Ry";

    fn six_energies() -> String {
        let mut text = String::new();
        for i in 1..=6 {
            text.push_str(&format!("     total energy              =     -15.{}000000 Ry\n", i));
            text.push_str("     estimated scf accuracy    <       0.00000010 Ry\n");
            text.push_str(&format!("!    total energy              =     -19.{}000000 Ry\n\n", i));
        }
        text
    }

    #[test]
    fn test_single_match_is_scalar() {
        let p = pattern(ENERGY, 0, None);
        let result = extract("total energy = -19.00890332 Ry", &p);
        assert_eq!(result, Extracted::Scalar(Value::Float(-19.00890332)));
    }

    #[test]
    fn test_all_occurrences_in_document_order() {
        let p = pattern(ENERGY, 0, None);
        let values = extract(&six_energies(), &p).as_f64_vec();
        assert_eq!(values.len(), 12);
        assert_relative_eq!(values[0], -15.1);
        assert_relative_eq!(values[1], -19.1);
        assert_relative_eq!(values[11], -19.6);
    }

    #[test]
    fn test_last_occurrence() {
        let p = pattern(ENERGY, -1, None);
        assert_eq!(extract(&six_energies(), &p).as_f64(), Some(-19.6));
    }

    #[test]
    fn test_first_two_occurrences() {
        let p = pattern(ENERGY, 2, None);
        let result = extract(&six_energies(), &p);
        assert_eq!(
            result,
            Extracted::List(vec![Value::Float(-15.1), Value::Float(-19.1)])
        );
    }

    #[test]
    fn test_last_n_occurrences_keep_order() {
        let p = pattern(ENERGY, -3, None);
        assert_eq!(extract(&six_energies(), &p).as_f64_vec(), vec![-19.5, -15.6, -19.6]);
    }

    #[test]
    fn test_only_values_after_last_flag() {
        let p = pattern(ENERGY, -1, Some("!"));
        let mut text = six_energies();
        // 最后一个 "!" 之前的所有非标记行都应被忽略
        text.push_str("     The total energy is F=E-TS. E is the sum of the following terms:\n");
        assert_eq!(extract(&text, &p).as_f64(), Some(-19.6));
    }

    #[test]
    fn test_missing_flag_is_absence() {
        let p = pattern(ENERGY, -1, Some("Forces acting"));
        assert_eq!(extract(&six_energies(), &p), Extracted::None);
    }

    #[test]
    fn test_no_match_scalar_vs_list_mode() {
        let scalar = pattern(ENERGY, 1, None);
        assert_eq!(extract("nothing here", &scalar), Extracted::None);

        let list = pattern(ENERGY, 0, None);
        assert_eq!(extract("nothing here", &list), Extracted::List(vec![]));
    }

    #[test]
    fn test_match_groups_build_tuples() {
        let p = Pattern::compile(&PatternSpec {
            name: "stress",
            regex: r"^[ \t]*([-+]?\d+\.\d+)[ \t]+([-+]?\d+\.\d+)[ \t]+([-+]?\d+\.\d+)[ \t]+([-+]?\d+\.\d+)[ \t]+([-+]?\d+\.\d+)[ \t]+([-+]?\d+\.\d+)[ \t]*$",
            output_type: OutputType::Float,
            start_flag: Some("total   stress"),
            occurrences: 3,
            match_groups: &[4, 5, 6],
        })
        .unwrap();

        let text = "\
     total   stress  (Ry/bohr**3)                   (kbar)     P=       -4.20
  -0.00002857   0.00000000   0.00000000           -4.20        0.00        0.00
   0.00000000  -0.00002857   0.00000000            0.00       -4.20        0.00
   0.00000000   0.00000000  -0.00002857            0.00        0.00       -4.20
";
        let rows = extract(text, &p).as_f64_rows();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], vec![-4.20, 0.0, 0.0]);
        assert_eq!(rows[2], vec![0.0, 0.0, -4.20]);
    }

    #[test]
    fn test_whole_match_when_multiple_groups_unrequested() {
        let p = Pattern::compile(&PatternSpec::simple(
            "pair",
            r"(\d)-(\d)",
            OutputType::Str,
        ))
        .unwrap();
        assert_eq!(extract("a 1-2 b", &p).as_string(), Some("1-2".to_string()));
    }

    #[test]
    fn test_fortran_exponent_cast() {
        let p = pattern(r"E=\s*(\S+)", 0, None);
        assert_eq!(extract("E=-1.913801D+01", &p).as_f64(), Some(-19.13801));
    }
}
