//! # 输出文件嗅探
//!
//! 只读取文件开头若干行判断文件来源（例如 SternheimerGW 输出），
//! 不把整个文件读入内存。
//!
//! ## 依赖关系
//! - 被 `parsers/mod.rs`, `parsers/espresso` 使用

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// 开头 `max_lines` 行内是否出现任一标记；文件不存在或不可读时返回 false
pub fn head_contains_any(path: &Path, markers: &[&str], max_lines: usize) -> bool {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(_) => return false,
    };

    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();

    for _ in 0..max_lines {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) | Err(_) => return false,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                if markers.iter().any(|m| line.contains(m)) {
                    return true;
                }
            }
        }
    }

    false
}

pub fn head_contains(path: &Path, marker: &str, max_lines: usize) -> bool {
    head_contains_any(path, &[marker], max_lines)
}
