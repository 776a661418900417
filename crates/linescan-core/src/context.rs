//! 扫描上下文与回调返回值
use std::path::{Path, PathBuf};

/// 单次扫描调用的上下文
///
/// 仅由扫描循环写入；回调拿到的是 `&ScanContext`，只能读取。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanContext {
    /// 被扫描的文件
    pub source: PathBuf,
    pub separator_len: usize,
    /// 本次调用解析后的起始偏移（正向）或排他上界（反向）
    pub boundary: u64,
    /// 已回调的行数（含当前行）
    pub line_count: u64,
    /// 当前行在文件中的起始偏移
    pub line_offset: u64,
    /// 仅在本次扫描的最后一行为 true（正向为文件末尾，反向为文件开头）
    pub is_final: bool,
}

impl ScanContext {
    pub(crate) fn new(source: &Path, separator_len: usize, boundary: u64) -> Self {
        Self {
            source: source.to_path_buf(),
            separator_len,
            boundary,
            line_count: 0,
            line_offset: boundary,
            is_final: false,
        }
    }
}

/// 回调的控制结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanFlow {
    #[default]
    Continue,
    Stop,
}

/// 显式返回 `false` 才停止
impl From<bool> for ScanFlow {
    fn from(keep_going: bool) -> Self {
        if keep_going { ScanFlow::Continue } else { ScanFlow::Stop }
    }
}

impl From<()> for ScanFlow {
    fn from(_: ()) -> Self {
        ScanFlow::Continue
    }
}
