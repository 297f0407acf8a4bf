//! # 美化输出工具
//!
//! `collect` 等面向用户的命令使用的终端输出样式；
//! 提取结果本身（JSON）不经过这里。错误与警告写到 stderr。
//!
//! ## 依赖关系
//! - 被 `commands/collect.rs` 与 `main.rs` 使用
//! - 使用 `colored` crate

use colored::{ColoredString, Colorize};

/// 消息类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Error,
    Warning,
    Info,
    Skip,
    Done,
}

impl Status {
    fn label(self) -> &'static str {
        match self {
            Status::Error => "[ERR]",
            Status::Warning => "[WARN]",
            Status::Info => "[*]",
            Status::Skip => "[SKIP]",
            Status::Done => "[DONE]",
        }
    }

    fn tag(self) -> ColoredString {
        let label = self.label();
        match self {
            Status::Error => label.red().bold(),
            Status::Warning => label.yellow().bold(),
            Status::Info => label.blue().bold(),
            Status::Skip => label.dimmed(),
            Status::Done => label.green().bold(),
        }
    }

    fn to_stderr(self) -> bool {
        matches!(self, Status::Error | Status::Warning)
    }
}

/// 带类别前缀的一行消息
pub fn status_line(status: Status, msg: &str) -> String {
    format!("{} {}", status.tag(), msg)
}

pub fn print_status(status: Status, msg: &str) {
    let line = status_line(status, msg);
    if status.to_stderr() {
        eprintln!("{}", line);
    } else {
        println!("{}", line);
    }
}

pub fn print_error(msg: &str) {
    print_status(Status::Error, msg);
}

pub fn print_warning(msg: &str) {
    print_status(Status::Warning, msg);
}

pub fn print_info(msg: &str) {
    print_status(Status::Info, msg);
}

pub fn print_skip(msg: &str) {
    print_status(Status::Skip, msg);
}

pub fn print_done(msg: &str) {
    print_status(Status::Done, msg);
}

/// 打印标题栏
pub fn print_header(title: &str) {
    let rule = "─".repeat(60);
    println!("\n{}\n  {}\n{}\n", rule.dimmed(), title.bold(), rule.dimmed());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_line_prefix() {
        colored::control::set_override(false);
        assert_eq!(status_line(Status::Warning, "no OUTCAR"), "[WARN] no OUTCAR");
        assert_eq!(status_line(Status::Done, "ok"), "[DONE] ok");
        assert!(Status::Error.to_stderr());
        assert!(!Status::Info.to_stderr());
        colored::control::unset_override();
    }
}
