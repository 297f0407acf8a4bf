//! # 统一错误处理模块
//!
//! 定义 simextract 的所有错误类型，使用 `thiserror` 派生。
//!
//! 注意：数据缺失（某个物理量在本次计算中不存在）**不是**错误，
//! 解析器以 `Ok(None)` 或空集合表示。这里只收录真正需要中止的情况。
//!
//! ## 依赖关系
//! - 被所有其他模块使用
//! - 无外部模块依赖

use thiserror::Error;

/// simextract 统一错误类型
#[derive(Error, Debug)]
pub enum ExtractError {
    // ─────────────────────────────────────────────────────────────
    // I/O 错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to read file: {path}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}")]
    FileWriteError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: String },

    // ─────────────────────────────────────────────────────────────
    // 契约错误（程序员错误，立即失败）
    // ─────────────────────────────────────────────────────────────
    #[error("Invalid pattern '{name}': {reason}")]
    InvalidPattern { name: String, reason: String },

    #[error("Unknown pattern '{0}' requested from registry")]
    UnknownPattern(String),

    #[error("Unsupported {application} version '{version}'")]
    UnsupportedVersion {
        application: String,
        version: String,
    },

    // ─────────────────────────────────────────────────────────────
    // 数据一致性错误
    // ─────────────────────────────────────────────────────────────
    #[error("Singular matrix: {0}")]
    SingularMatrix(String),

    #[error(
        "Relaxation trajectory misaligned: {steps} ionic steps but only {blocks} geometry blocks"
    )]
    TrajectoryMisaligned { steps: usize, blocks: usize },

    // ─────────────────────────────────────────────────────────────
    // 参数错误
    // ─────────────────────────────────────────────────────────────
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // ─────────────────────────────────────────────────────────────
    // 序列化错误
    // ─────────────────────────────────────────────────────────────
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    // ─────────────────────────────────────────────────────────────
    // 其他
    // ─────────────────────────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

/// Result 类型别名
pub type Result<T> = std::result::Result<T, ExtractError>;

impl ExtractError {
    /// 构造文件读取错误
    pub fn read(path: &std::path::Path, source: std::io::Error) -> Self {
        ExtractError::FileReadError {
            path: path.display().to_string(),
            source,
        }
    }

    /// 数据一致性错误只影响对应的物理量，提取其他量时可以跳过
    pub fn is_inconsistent_data(&self) -> bool {
        matches!(
            self,
            ExtractError::SingularMatrix(_) | ExtractError::TrajectoryMisaligned { .. }
        )
    }
}
