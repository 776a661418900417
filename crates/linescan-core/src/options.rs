//! 扫描选项（每次调用只读）

use crate::error::{Result, ScanError};

/// 默认块大小：一次读取 1 MiB
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;
/// 默认分隔符：单个换行
pub const DEFAULT_SEPARATOR: &[u8] = b"\n";

/// 扫描选项
///
/// `position` 的含义随方向不同：
/// - 正向：开始读取的绝对偏移（默认 0）；
/// - 反向：排他上界，偏移 >= `position` 的字节不会被读取（默认文件大小）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    /// 每次读取的字节数，最小为 1
    pub chunk_size: usize,
    /// 行分隔符，不可为空
    pub separator: Vec<u8>,
    pub position: Option<u64>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            separator: DEFAULT_SEPARATOR.to_vec(),
            position: None,
        }
    }
}

impl ScanOptions {
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_separator(mut self, separator: impl Into<Vec<u8>>) -> Self {
        self.separator = separator.into();
        self
    }

    pub fn with_position(mut self, position: u64) -> Self {
        self.position = Some(position);
        self
    }

    /// 校验选项。块大小小于分隔符长度是允许的：跨块的分隔符会在残余字节中重新查找。
    pub(crate) fn validate(&self) -> Result<()> {
        if self.separator.is_empty() {
            return Err(ScanError::InvalidOptions("separator must not be empty".into()));
        }
        if self.chunk_size == 0 {
            return Err(ScanError::InvalidOptions("chunk_size must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let opts = ScanOptions::default();
        assert_eq!(opts.chunk_size, 1_048_576);
        assert_eq!(opts.separator, b"\n");
        assert_eq!(opts.position, None);
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn rejects_empty_separator_and_zero_chunk() {
        let err = ScanOptions::default().with_separator(Vec::new()).validate().unwrap_err();
        assert!(matches!(err, ScanError::InvalidOptions(_)));

        let err = ScanOptions::default().with_chunk_size(0).validate().unwrap_err();
        assert!(matches!(err, ScanError::InvalidOptions(_)));
    }

    #[test]
    fn chunk_smaller_than_separator_is_accepted() {
        let opts = ScanOptions::default().with_separator(b"\r\n\r\n".to_vec()).with_chunk_size(1);
        assert!(opts.validate().is_ok());
    }
}
