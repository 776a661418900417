//! 错误类型
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// 本库统一的返回类型
pub type Result<T> = std::result::Result<T, ScanError>;

/// 触发 I/O 错误的外部操作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoOp {
    Open,
    Read,
    Close,
    Size,
}

impl fmt::Display for IoOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IoOp::Open => "open",
            IoOp::Read => "read",
            IoOp::Close => "close",
            IoOp::Size => "size",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum ScanError {
    /// 选项不合法（空分隔符、块大小为 0 等），在任何 I/O 之前返回
    #[error("invalid scan options: {0}")]
    InvalidOptions(String),

    /// 外部存储操作失败；底层 `io::Error` 原样保留
    #[error("{op} failed for {}: {source}", .path.display())]
    Io {
        op: IoOp,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read config {}: {source}", .path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config {}: {source}", .path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// 分隔符转义序列无法解析
    #[error("invalid separator escape in {input:?}: {reason}")]
    InvalidEscape { input: String, reason: String },
}

impl ScanError {
    pub(crate) fn io(op: IoOp, path: &Path, source: io::Error) -> Self {
        ScanError::Io { op, path: path.to_path_buf(), source }
    }

    /// 若为 I/O 错误，返回对应的操作
    pub fn io_op(&self) -> Option<IoOp> {
        match self {
            ScanError::Io { op, .. } => Some(*op),
            _ => None,
        }
    }
}
