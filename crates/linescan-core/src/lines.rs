//! 基于两个方向扫描的便捷操作：取前 N 行、取后 N 行、计数
use std::path::Path;

use crate::backward::backward_scan_with;
use crate::context::{ScanContext, ScanFlow};
use crate::error::Result;
use crate::forward::forward_scan_with;
use crate::options::ScanOptions;
use crate::storage::Storage;

/// `tail_lines` 的额外选项
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TailOptions {
    /// 文件以分隔符结尾时，跳过末尾的空行（与 `tail -n` 一致）
    pub skip_trailing_empty: bool,
}

impl Default for TailOptions {
    fn default() -> Self {
        Self { skip_trailing_empty: true }
    }
}

/// 读取前 `n` 行，读够即停止
pub fn head_lines<S: Storage>(storage: &S, path: &Path, n: usize, opts: &ScanOptions) -> Result<Vec<Vec<u8>>> {
    let mut out = Vec::with_capacity(n.min(1024));
    if n == 0 {
        return Ok(out);
    }
    forward_scan_with(
        storage,
        path,
        |line: &[u8], _: &ScanContext| {
            out.push(line.to_vec());
            out.len() < n
        },
        opts,
    )?;
    Ok(out)
}

/// 读取最后 `n` 行，按文件顺序返回
pub fn tail_lines<S: Storage>(
    storage: &S,
    path: &Path,
    n: usize,
    opts: &ScanOptions,
    tail: TailOptions,
) -> Result<Vec<Vec<u8>>> {
    let mut out: Vec<Vec<u8>> = Vec::with_capacity(n.min(1024));
    if n == 0 {
        return Ok(out);
    }
    backward_scan_with(
        storage,
        path,
        |line: &[u8], ctx: &ScanContext| {
            // 反向扫描的第一行为空且不是唯一一行，说明文件以分隔符结尾
            if tail.skip_trailing_empty && ctx.line_count == 1 && line.is_empty() && !ctx.is_final {
                return ScanFlow::Continue;
            }
            out.push(line.to_vec());
            if out.len() < n { ScanFlow::Continue } else { ScanFlow::Stop }
        },
        opts,
    )?;
    out.reverse();
    Ok(out)
}

/// 统计正向扫描回调的行数；以分隔符结尾的文件会多计一个末尾空行
pub fn count_lines<S: Storage>(storage: &S, path: &Path, opts: &ScanOptions) -> Result<u64> {
    let mut count = 0;
    forward_scan_with(storage, path, |_: &[u8], ctx: &ScanContext| count = ctx.line_count, opts)?;
    Ok(count)
}
