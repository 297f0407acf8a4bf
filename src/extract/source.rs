//! # 文本数据源
//!
//! 各应用解析器组合持有的共享对象：标准输出全文 + 该应用的模式注册表，
//! 按物理量名执行提取。
//!
//! ## 依赖关系
//! - 被 `parsers/espresso`, `parsers/vasp`, `parsers/nwchem` 使用
//! - 使用 `extract/pattern.rs`, `extract/text.rs`

use super::pattern::{PatternRegistry, PatternSpec};
use super::text::{extract, Extracted};
use crate::error::Result;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct TextSource {
    path: Option<PathBuf>,
    text: String,
    registry: PatternRegistry,
}

impl TextSource {
    /// 从文件加载；文件缺失时以空文本构造（所有物理量随之缺失）
    pub fn load(path: &Path, specs: &[PatternSpec]) -> Result<Self> {
        let registry = PatternRegistry::new(specs)?;

        let text = if path.is_file() {
            super::read_text_lossy(path)?
        } else {
            log::debug!("Output file not found: {}", path.display());
            String::new()
        };

        Ok(TextSource {
            path: Some(path.to_path_buf()),
            text,
            registry,
        })
    }

    pub fn from_text(text: impl Into<String>, specs: &[PatternSpec]) -> Result<Self> {
        Ok(TextSource {
            path: None,
            text: text.into(),
            registry: PatternRegistry::new(specs)?,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// 按注册表中的默认出现次数提取
    pub fn extract(&self, name: &str) -> Result<Extracted> {
        let pattern = self.registry.get(name)?;
        Ok(extract(&self.text, pattern))
    }

    /// 运行期覆盖出现次数
    pub fn extract_n(&self, name: &str, occurrences: i32) -> Result<Extracted> {
        let pattern = self.registry.get(name)?.with_occurrences(occurrences);
        Ok(extract(&self.text, &pattern))
    }

    /// 对任意子文本应用注册表中的模式（例如分块后的单个块）
    pub fn extract_in(&self, text: &str, name: &str) -> Result<Extracted> {
        let pattern = self.registry.get(name)?;
        Ok(extract(text, pattern))
    }

    pub fn extract_in_n(&self, text: &str, name: &str, occurrences: i32) -> Result<Extracted> {
        let pattern = self.registry.get(name)?.with_occurrences(occurrences);
        Ok(extract(text, &pattern))
    }

    pub fn float(&self, name: &str) -> Result<Option<f64>> {
        Ok(self.extract(name)?.as_f64())
    }

    pub fn int(&self, name: &str) -> Result<Option<i64>> {
        Ok(self.extract(name)?.as_i64())
    }

    pub fn floats(&self, name: &str) -> Result<Vec<f64>> {
        Ok(self.extract(name)?.as_f64_vec())
    }

    pub fn vec3_rows(&self, name: &str, occurrences: i32) -> Result<Vec<[f64; 3]>> {
        Ok(self.extract_n(name, occurrences)?.as_vec3_rows())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExtractError;
    use crate::extract::pattern::OutputType;
    use tempdir::TempDir;

    const SPECS: &[PatternSpec] = &[
        PatternSpec {
            name: "energy",
            regex: r"energy\s*=\s*(\S+)",
            output_type: OutputType::Float,
            start_flag: None,
            occurrences: -1,
            match_groups: &[],
        },
        PatternSpec {
            name: "force",
            regex: r"force\s*=\s*(\S+)\s+(\S+)\s+(\S+)",
            output_type: OutputType::Float,
            start_flag: Some("Forces"),
            occurrences: 0,
            match_groups: &[1, 2, 3],
        },
    ];

    const TEXT: &str = "\
energy = -1.0
energy = -2.0
Forces
force = 1 2 3
force = 4 5 6
force = 7 8 9
";

    #[test]
    fn test_extract_by_name() {
        let src = TextSource::from_text(TEXT, SPECS).unwrap();
        assert_eq!(src.float("energy").unwrap(), Some(-2.0));
        assert_eq!(src.vec3_rows("force", 2).unwrap(), vec![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
        assert!(matches!(
            src.float("stress"),
            Err(ExtractError::UnknownPattern(_))
        ));
    }

    #[test]
    fn test_missing_file_is_empty_source() {
        let dir = TempDir::new("source").unwrap();
        let src = TextSource::load(&dir.path().join("pw.out"), SPECS).unwrap();
        assert!(src.is_empty());
        assert_eq!(src.float("energy").unwrap(), None);
    }

    #[test]
    fn test_non_utf8_output_still_extracts() {
        let dir = TempDir::new("source").unwrap();
        let path = dir.path().join("pw.out");
        let mut bytes = b"title Fe\xe9\n".to_vec();
        bytes.extend_from_slice(TEXT.as_bytes());
        bytes.push(0xc3);
        std::fs::write(&path, bytes).unwrap();

        let src = TextSource::load(&path, SPECS).unwrap();
        assert_eq!(src.float("energy").unwrap(), Some(-2.0));
    }
}
