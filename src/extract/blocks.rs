//! # 分块提取器
//!
//! 处理跨越多行、重复出现的数据块（离子弛豫步、声子 q 点、Hubbard 参数表）：
//! 先用分隔正则把文本切成互不重叠的块，再对每块独立运行提取函数，
//! 按文档顺序返回结果。没有块时返回空列表。
//!
//! ## 依赖关系
//! - 被各应用解析器使用

use crate::error::{ExtractError, Result};
use log::warn;
use regex::Regex;

/// 编译分块用的正则（不经模式注册表，保留调用方给出的标志）
pub fn block_regex(name: &str, source: &str) -> Result<Regex> {
    Regex::new(source).map_err(|e| ExtractError::InvalidPattern {
        name: name.to_string(),
        reason: e.to_string(),
    })
}

/// 每个分隔正则的匹配即为一个块
pub fn extract_blocks<'t, T, F>(text: &'t str, delimiter: &Regex, per_block: F) -> Vec<T>
where
    F: FnMut(&'t str) -> T,
{
    delimiter
        .find_iter(text)
        .map(|m| m.as_str())
        .map(per_block)
        .collect()
}

/// 以起始正则切块：每块从一次匹配开始，到下一次匹配（或文本末尾）为止
pub fn split_blocks<'t>(text: &'t str, start: &Regex) -> Vec<&'t str> {
    let starts: Vec<usize> = start.find_iter(text).map(|m| m.start()).collect();

    starts
        .iter()
        .enumerate()
        .map(|(i, &s)| {
            let end = starts.get(i + 1).copied().unwrap_or(text.len());
            &text[s..end]
        })
        .collect()
}

/// 将几何块与按能量计数的离子步对齐
///
/// 第一步使用初始结构；之后第 i 步使用第 i-1 个几何块，即上一步弛豫产生的结构。
/// 多余的尾部几何块（没有对应能量）被丢弃；几何块不足时报错，而不是错位对齐。
pub fn align_lagged<T: Clone>(steps: usize, initial: &T, blocks: Vec<T>) -> Result<Vec<T>> {
    if steps == 0 {
        return Ok(vec![]);
    }

    let needed = steps - 1;
    if blocks.len() < needed {
        return Err(ExtractError::TrajectoryMisaligned {
            steps,
            blocks: blocks.len(),
        });
    }
    if blocks.len() > needed {
        warn!(
            "Dropping {} trailing geometry block(s) without a matching energy",
            blocks.len() - needed
        );
    }

    let mut aligned = Vec::with_capacity(steps);
    aligned.push(initial.clone());
    aligned.extend(blocks.into_iter().take(needed));
    Ok(aligned)
}
