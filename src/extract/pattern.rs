//! # 模式注册表
//!
//! 每个应用程序一张静态表：物理量名 → 正则、输出类型、可选起始标记、
//! 出现次数选择策略、捕获组列表。表在构造时编译并校验一次，之后不可变。
//!
//! ## 出现次数约定
//! - `0`  : 全部匹配
//! - `N>0`: 前 N 个
//! - `N<0`: 最后 |N| 个
//!
//! ## 依赖关系
//! - 被 `extract/text.rs`, `extract/source.rs` 和各应用的 `patterns.rs` 使用

use crate::error::{ExtractError, Result};
use regex::{Regex, RegexBuilder};
use std::collections::HashMap;

/// 输出类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputType {
    Float,
    Int,
    Str,
}

/// 静态模式定义（编译期常量）
#[derive(Debug, Clone, Copy)]
pub struct PatternSpec {
    pub name: &'static str,
    pub regex: &'static str,
    pub output_type: OutputType,
    pub start_flag: Option<&'static str>,
    pub occurrences: i32,
    /// 1-based 捕获组序号
    pub match_groups: &'static [usize],
}

impl PatternSpec {
    /// 只含正则与输出类型的最简定义
    pub const fn simple(name: &'static str, regex: &'static str, output_type: OutputType) -> Self {
        PatternSpec {
            name,
            regex,
            output_type,
            start_flag: None,
            occurrences: 0,
            match_groups: &[],
        }
    }
}

/// 编译后的模式
#[derive(Debug, Clone)]
pub struct Pattern {
    pub name: String,
    pub regex: Regex,
    pub output_type: OutputType,
    pub start_flag: Option<String>,
    pub occurrences: i32,
    pub match_groups: Vec<usize>,
}

impl Pattern {
    /// 编译并校验：忽略大小写 + 多行模式；捕获组序号必须落在正则的组数内
    pub fn compile(spec: &PatternSpec) -> Result<Self> {
        let regex = RegexBuilder::new(spec.regex)
            .case_insensitive(true)
            .multi_line(true)
            .build()
            .map_err(|e| ExtractError::InvalidPattern {
                name: spec.name.to_string(),
                reason: e.to_string(),
            })?;

        let group_count = regex.captures_len() - 1;
        if let Some(bad) = spec
            .match_groups
            .iter()
            .find(|&&g| g == 0 || g > group_count)
        {
            return Err(ExtractError::InvalidPattern {
                name: spec.name.to_string(),
                reason: format!(
                    "match group {} out of range (regex has {} capture groups)",
                    bad, group_count
                ),
            });
        }

        Ok(Pattern {
            name: spec.name.to_string(),
            regex,
            output_type: spec.output_type,
            start_flag: spec.start_flag.map(str::to_string),
            occurrences: spec.occurrences,
            match_groups: spec.match_groups.to_vec(),
        })
    }

    /// 运行期覆盖出现次数（例如按原子数截取力的行数）
    pub fn with_occurrences(&self, occurrences: i32) -> Pattern {
        Pattern {
            occurrences,
            ..self.clone()
        }
    }

    /// 正则的捕获组数
    pub fn group_count(&self) -> usize {
        self.regex.captures_len() - 1
    }
}

/// 模式注册表
#[derive(Debug, Clone, Default)]
pub struct PatternRegistry {
    patterns: HashMap<&'static str, Pattern>,
}

impl PatternRegistry {
    /// 编译整张表，任何一项不合法或重名都立即失败
    pub fn new(specs: &[PatternSpec]) -> Result<Self> {
        let mut patterns = HashMap::with_capacity(specs.len());

        for spec in specs {
            let pattern = Pattern::compile(spec)?;
            if patterns.insert(spec.name, pattern).is_some() {
                return Err(ExtractError::InvalidPattern {
                    name: spec.name.to_string(),
                    reason: "duplicate pattern name".to_string(),
                });
            }
        }

        Ok(PatternRegistry { patterns })
    }

    pub fn get(&self, name: &str) -> Result<&Pattern> {
        self.patterns
            .get(name)
            .ok_or_else(|| ExtractError::UnknownPattern(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOOD: PatternSpec = PatternSpec {
        name: "forces",
        regex: r"force\s+=\s+(\S+)\s+(\S+)\s+(\S+)",
        output_type: OutputType::Float,
        start_flag: Some("Forces acting"),
        occurrences: 0,
        match_groups: &[1, 2, 3],
    };

    #[test]
    fn test_compile_valid_pattern() {
        let p = Pattern::compile(&GOOD).unwrap();
        assert_eq!(p.group_count(), 3);
        assert_eq!(p.match_groups, vec![1, 2, 3]);
        assert!(p.regex.is_match("FORCE = 1 2 3"));
    }

    #[test]
    fn test_match_group_out_of_range_rejected() {
        let bad = PatternSpec {
            match_groups: &[1, 4],
            ..GOOD
        };
        let err = Pattern::compile(&bad).unwrap_err();
        assert!(matches!(err, ExtractError::InvalidPattern { .. }));
    }

    #[test]
    fn test_match_group_zero_rejected() {
        let bad = PatternSpec {
            match_groups: &[0],
            ..GOOD
        };
        assert!(Pattern::compile(&bad).is_err());
    }

    #[test]
    fn test_registry_rejects_duplicates_and_unknown() {
        assert!(PatternRegistry::new(&[GOOD, GOOD]).is_err());

        let registry = PatternRegistry::new(&[GOOD]).unwrap();
        assert!(registry.get("forces").is_ok());
        assert!(matches!(
            registry.get("stress"),
            Err(ExtractError::UnknownPattern(_))
        ));
    }
}
