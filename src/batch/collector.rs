//! # 文件收集器
//!
//! 在计算目录下按文件名通配模式查找输出文件与数据文件。
//!
//! ## 功能
//! - 单文件与目录输入
//! - 逗号分隔的多个通配模式（`*` 与 `?`）
//! - 可限制递归深度
//! - 结果按路径排序，保证多次运行顺序一致
//! - 按标记文件识别计算目录
//!
//! ## 依赖关系
//! - 被 `parsers/` 与 `commands/collect.rs` 调用
//! - 使用 `walkdir` 遍历目录

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// 解析器查找数据文件时的默认递归深度
pub const DEFAULT_SEARCH_DEPTH: usize = 4;

/// 文件收集器
#[derive(Debug, Clone)]
pub struct FileCollector {
    input: PathBuf,
    patterns: Vec<String>,
    max_depth: usize,
}

impl FileCollector {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            patterns: vec!["*".to_string()],
            max_depth: 1,
        }
    }

    /// 设置匹配模式（逗号分隔的多模式）
    pub fn with_pattern(mut self, pattern: &str) -> Self {
        self.patterns = pattern
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if self.patterns.is_empty() {
            self.patterns = vec!["*".to_string()];
        }
        self
    }

    /// 是否递归搜索（递归时深度不限）
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.max_depth = if recursive { usize::MAX } else { 1 };
        self
    }

    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth.max(1);
        self
    }

    /// 收集所有匹配的文件，按路径排序
    pub fn collect(&self) -> Vec<PathBuf> {
        if self.input.is_file() {
            return vec![self.input.clone()];
        }

        if !self.input.is_dir() {
            return vec![];
        }

        let mut files: Vec<PathBuf> = WalkDir::new(&self.input)
            .max_depth(self.max_depth)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|entry| self.matches_patterns(entry.path()))
            .map(|e| e.path().to_path_buf())
            .collect();

        files.sort();
        files
    }

    /// 第一个匹配的文件（浅层优先）
    pub fn first(&self) -> Option<PathBuf> {
        let mut files = self.collect();
        files.sort_by_key(|p| p.components().count());
        files.into_iter().next()
    }

    /// 含有匹配文件的目录集合，即计算目录
    pub fn parent_dirs(&self) -> Vec<PathBuf> {
        let dirs: BTreeSet<PathBuf> = self
            .collect()
            .into_iter()
            .filter_map(|f| f.parent().map(Path::to_path_buf))
            .collect();
        dirs.into_iter().collect()
    }

    fn matches_patterns(&self, path: &Path) -> bool {
        let filename = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name,
            None => return false,
        };

        self.patterns.iter().any(|p| glob_match(p, filename))
    }
}

/// 简单 glob 匹配（支持 * 和 ? 通配符）
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern = pattern.as_bytes();
    let text = text.as_bytes();

    let mut p = 0;
    let mut t = 0;
    let mut star_p = None;
    let mut star_t = 0;

    while t < text.len() {
        if p < pattern.len() && (pattern[p] == b'?' || pattern[p] == text[t]) {
            p += 1;
            t += 1;
        } else if p < pattern.len() && pattern[p] == b'*' {
            star_p = Some(p);
            star_t = t;
            p += 1;
        } else if let Some(sp) = star_p {
            p = sp + 1;
            star_t += 1;
            t = star_t;
        } else {
            return false;
        }
    }

    while p < pattern.len() && pattern[p] == b'*' {
        p += 1;
    }

    p == pattern.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempdir::TempDir;

    #[test]
    fn test_glob_match() {
        assert!(glob_match("*.dos", "si.dos"));
        assert!(glob_match("*.Hubbard_parameters.dat", "NiO.Hubbard_parameters.dat"));
        assert!(!glob_match("*.dos", "si.pdos_tot"));
        assert!(glob_match("*pdos_atm#*", "si.pdos_atm#1(Si)_wfc#1(s)"));
        assert!(glob_match("data-file?.xml", "data-file1.xml"));
        assert!(!glob_match("data-file?.xml", "data-file-schema.xml"));
    }

    #[test]
    fn test_collect_sorted_and_depth_limited() {
        let dir = TempDir::new("collector").unwrap();
        let nested = dir.path().join("out").join("si.save");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join("b.out"), "").unwrap();
        fs::write(dir.path().join("a.out"), "").unwrap();
        fs::write(nested.join("data-file-schema.xml"), "").unwrap();

        let outs = FileCollector::new(dir.path()).with_pattern("*.out").collect();
        assert_eq!(outs.len(), 2);
        assert!(outs[0].ends_with("a.out"));

        let shallow = FileCollector::new(dir.path())
            .with_pattern("data-file-schema.xml")
            .collect();
        assert!(shallow.is_empty());

        let deep = FileCollector::new(dir.path())
            .with_pattern("data-file-schema.xml")
            .max_depth(DEFAULT_SEARCH_DEPTH)
            .first();
        assert!(deep.unwrap().ends_with("si.save/data-file-schema.xml"));
    }

    #[test]
    fn test_parent_dirs() {
        let dir = TempDir::new("collector").unwrap();
        for name in ["calc1", "calc2"] {
            let d = dir.path().join(name);
            fs::create_dir_all(&d).unwrap();
            fs::write(d.join("OUTCAR"), "").unwrap();
        }

        let dirs = FileCollector::new(dir.path())
            .with_pattern("OUTCAR")
            .recursive(true)
            .parent_dirs();
        assert_eq!(dirs.len(), 2);
        assert!(dirs[1].ends_with("calc2"));
    }
}
