//! # 定宽数值表读取
//!
//! `.dat`/`.dos`/`.gp` 等小型数据文件：只保留以（带符号或不带符号的）
//! 十进制数开头的行，丢弃表头、`#` 注释与星号标记的页脚噪声。
//!
//! ## 依赖关系
//! - 被 `parsers/espresso/files.rs` 使用

use super::{parse_f64, read_text_lossy};
use crate::error::Result;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

fn numeric_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*[-+]?(?:\d+\.?\d*|\.\d+)(?:[eEdD][-+]?\d+)?(?:\s|$)")
            .expect("numeric line regex")
    })
}

/// 解析数值表文本，行内任一字段无法解析的行被丢弃
pub fn parse_numeric_table(text: &str) -> Vec<Vec<f64>> {
    text.lines()
        .filter(|line| numeric_line().is_match(line))
        .filter_map(|line| {
            line.split_whitespace()
                .map(parse_f64)
                .collect::<Option<Vec<f64>>>()
        })
        .collect()
}

/// 读取数值表文件，文件不存在时返回 `None`
pub fn read_numeric_table(path: &Path) -> Result<Option<Vec<Vec<f64>>>> {
    if !path.is_file() {
        return Ok(None);
    }

    let content = read_text_lossy(path)?;
    Ok(Some(parse_numeric_table(&content)))
}

/// 行表转列表，列数以首行为准，列数不同的行被跳过
pub fn columns(table: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let ncol = match table.first() {
        Some(row) => row.len(),
        None => return vec![],
    };

    let mut cols = vec![Vec::with_capacity(table.len()); ncol];
    for row in table.iter().filter(|r| r.len() == ncol) {
        for (col, v) in cols.iter_mut().zip(row) {
            col.push(*v);
        }
    }
    cols
}
