//! # ESPRESSO 版本与模式纪元
//!
//! 版本号按数值逐段比较（`6.10 > 6.4`），缺少的段视为 0（`6.4 == 6.4.0`）。
//! 单一阈值划分两个互不兼容的 XML 模式纪元。

use crate::error::{ExtractError, Result};
use std::cmp::Ordering;
use std::fmt;

/// 未声明版本时使用的默认值
pub const DEFAULT_VERSION: &str = "5.4.0";

/// 不低于此版本时使用新模式 (`data-file-schema.xml`)
pub const MODERN_SCHEMA_THRESHOLD: &str = "6.4";

/// 支持区间 `[MIN_SUPPORTED, MAX_EXCLUSIVE)`
pub const MIN_SUPPORTED: &str = "5.0";
pub const MAX_EXCLUSIVE: &str = "8.0";

/// 点分数值版本号
#[derive(Debug, Clone)]
pub struct Version {
    parts: Vec<u64>,
    raw: String,
}

impl Version {
    /// 接受 `6.4.1`、`v.6.4.1`、`6.4MaX` 等写法
    pub fn parse(s: &str) -> Result<Version> {
        let unsupported = || ExtractError::UnsupportedVersion {
            application: "espresso".to_string(),
            version: s.to_string(),
        };

        let trimmed = s.trim().trim_start_matches(['v', 'V']).trim_start_matches('.');
        let numeric: String = trimmed
            .chars()
            .take_while(|c| c.is_ascii_digit() || *c == '.')
            .collect();

        let parts = numeric
            .split('.')
            .filter(|p| !p.is_empty())
            .map(|p| p.parse::<u64>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|_| unsupported())?;

        if parts.is_empty() {
            return Err(unsupported());
        }

        Ok(Version {
            parts,
            raw: s.trim().to_string(),
        })
    }

    fn part(&self, i: usize) -> u64 {
        self.parts.get(i).copied().unwrap_or(0)
    }

    pub fn major(&self) -> u64 {
        self.part(0)
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let n = self.parts.len().max(other.parts.len());
        (0..n)
            .map(|i| self.part(i).cmp(&other.part(i)))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// XML 模式纪元
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaEpoch {
    /// `data-file.xml`，值带 `type`/`size`/`columns` 属性
    Legacy,
    /// `data-file-schema.xml`，固定标签结构
    Modern,
}

impl SchemaEpoch {
    /// 按版本选择纪元；支持区间以外的版本是错误
    pub fn for_version(version: &Version) -> Result<SchemaEpoch> {
        let min = Version::parse(MIN_SUPPORTED)?;
        let max = Version::parse(MAX_EXCLUSIVE)?;
        let threshold = Version::parse(MODERN_SCHEMA_THRESHOLD)?;

        if *version < min || *version >= max {
            return Err(ExtractError::UnsupportedVersion {
                application: "espresso".to_string(),
                version: version.to_string(),
            });
        }

        if *version >= threshold {
            Ok(SchemaEpoch::Modern)
        } else {
            Ok(SchemaEpoch::Legacy)
        }
    }

    /// 该纪元的 XML 文件名
    pub fn file_name(self) -> &'static str {
        match self {
            SchemaEpoch::Legacy => "data-file.xml",
            SchemaEpoch::Modern => "data-file-schema.xml",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn test_semantic_not_lexical_ordering() {
        assert!(v("6.10") > v("6.4"));
        assert!(v("6.4.1") > v("6.4"));
        assert_eq!(v("6.4"), v("6.4.0"));
        assert!(v("5.4.0") < v("6.4"));
    }

    #[test]
    fn test_parse_variants() {
        assert_eq!(v("v.6.4.1"), v("6.4.1"));
        assert_eq!(v("6.4MaX"), v("6.4"));
        assert!(Version::parse("latest").is_err());
        assert!(Version::parse("").is_err());
    }

    #[test]
    fn test_modern_selected_above_threshold() {
        assert_eq!(SchemaEpoch::for_version(&v("6.5")).unwrap(), SchemaEpoch::Modern);
        assert_eq!(SchemaEpoch::for_version(&v("6.4")).unwrap(), SchemaEpoch::Modern);
        assert_eq!(SchemaEpoch::for_version(&v("7.2")).unwrap(), SchemaEpoch::Modern);
    }

    #[test]
    fn test_legacy_below_threshold() {
        assert_eq!(SchemaEpoch::for_version(&v(DEFAULT_VERSION)).unwrap(), SchemaEpoch::Legacy);
        assert_eq!(SchemaEpoch::for_version(&v("6.3")).unwrap(), SchemaEpoch::Legacy);
    }

    #[test]
    fn test_out_of_range_is_unsupported() {
        for bad in ["4.3", "8.0", "12.1"] {
            assert!(matches!(
                SchemaEpoch::for_version(&v(bad)),
                Err(ExtractError::UnsupportedVersion { .. })
            ));
        }
    }
}
