//! # 提取原语模块
//!
//! 与应用无关的文本提取层：模式注册表、正则提取器、分块提取器、数值表读取，
//! 以及持有标准输出文本的组合式 `TextSource`。
//!
//! ## 依赖关系
//! - 被 `parsers/` 使用
//! - 子模块: pattern, text, blocks, table, source

pub mod blocks;
pub mod pattern;
pub mod source;
pub mod table;
pub mod text;

pub use blocks::{align_lagged, block_regex, extract_blocks, split_blocks};
pub use pattern::{OutputType, Pattern, PatternRegistry, PatternSpec};
pub use source::TextSource;
pub use table::{columns, parse_numeric_table, read_numeric_table};
pub use text::{extract, from_last_flag, select, Extracted, Value};

use crate::error::{ExtractError, Result};
use std::path::Path;

/// 读取文本文件；非 UTF-8 字节（Latin-1 编码、截断的多字节字符）替换为 U+FFFD
pub fn read_text_lossy(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).map_err(|e| ExtractError::read(path, e))?;
    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(e) => {
            log::warn!("{} is not valid UTF-8, decoding lossily", path.display());
            Ok(String::from_utf8_lossy(e.as_bytes()).into_owned())
        }
    }
}

/// 解析浮点数，接受 Fortran 风格的 `D` 指数
pub fn parse_f64(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.contains(['d', 'D']) {
        s.replace(['d', 'D'], "E").parse().ok()
    } else {
        s.parse().ok()
    }
}

/// 解析一行中的全部浮点字段，任一字段失败则整体失败
pub fn parse_floats(line: &str) -> Option<Vec<f64>> {
    line.split_whitespace().map(parse_f64).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempdir::TempDir;

    #[test]
    fn test_parse_f64() {
        assert_eq!(parse_f64(" -1.5 "), Some(-1.5));
        assert_eq!(parse_f64("1.0D-02"), Some(0.01));
        assert_eq!(parse_f64("2.5d+1"), Some(25.0));
        assert_eq!(parse_f64("abc"), None);
        assert_eq!(parse_f64("***"), None);
    }

    #[test]
    fn test_parse_floats() {
        assert_eq!(parse_floats("1 2.0 -3e1"), Some(vec![1.0, 2.0, -30.0]));
        assert_eq!(parse_floats("1 x"), None);
    }

    #[test]
    fn test_read_text_lossy_latin1_and_truncated() {
        let dir = TempDir::new("lossy").unwrap();

        let latin1 = dir.path().join("latin1.out");
        fs::write(&latin1, b"site Fe\xe9\nenergy = -1.0\n").unwrap();
        let text = read_text_lossy(&latin1).unwrap();
        assert!(text.contains("energy = -1.0"));
        assert!(text.contains('\u{FFFD}'));

        // 作业被杀时截断在多字节字符中间
        let truncated = dir.path().join("truncated.out");
        fs::write(&truncated, b"total energy = -2.0\n\xc3").unwrap();
        assert!(read_text_lossy(&truncated).unwrap().starts_with("total energy = -2.0"));

        assert!(matches!(
            read_text_lossy(&dir.path().join("missing.out")),
            Err(ExtractError::FileReadError { .. })
        ));
    }
}
