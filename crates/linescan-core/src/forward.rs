//! 正向扫描：从起始偏移按块读到文件末尾，按文件顺序回调每一行
use std::path::Path;

use tracing::{debug, trace};

use crate::context::{ScanContext, ScanFlow};
use crate::error::Result;
use crate::finder::SeparatorFinder;
use crate::options::ScanOptions;
use crate::storage::{FsStorage, OpenSource, Storage};

/// 在本地文件上正向扫描，返回读取的总字节数
pub fn forward_scan<F, R>(path: impl AsRef<Path>, on_line: F, opts: &ScanOptions) -> Result<u64>
where
    F: FnMut(&[u8], &ScanContext) -> R,
    R: Into<ScanFlow>,
{
    forward_scan_with(&FsStorage, path.as_ref(), on_line, opts)
}

/// 在任意 `Storage` 上正向扫描
///
/// 每轮把上一轮的残余字节（carry）留在缓冲区头部，再向其后读入至多 `chunk_size` 字节，
/// 从左到右切分。读不满一块即视为到达文件末尾；末尾残余（可能为空）作为最后一行回调，
/// 此时 `is_final` 为 true。回调要求停止时立即返回，不再读取。
pub fn forward_scan_with<S, F, R>(storage: &S, path: &Path, mut on_line: F, opts: &ScanOptions) -> Result<u64>
where
    S: Storage,
    F: FnMut(&[u8], &ScanContext) -> R,
    R: Into<ScanFlow>,
{
    opts.validate()?;
    let finder = SeparatorFinder::new(&opts.separator)?;
    let sep_len = opts.separator.len();
    let chunk_size = opts.chunk_size;
    let start = opts.position.unwrap_or(0);

    let mut source = OpenSource::open(storage, path)?;
    let mut ctx = ScanContext::new(path, sep_len, start);
    debug!(path = %path.display(), start, chunk_size, "forward scan started");

    let mut position = start;
    let mut buf: Vec<u8> = Vec::new();
    let mut empty = false;
    let mut stopped = false;

    loop {
        // buf 中现有内容即 carry
        let carry_len = buf.len();
        buf.resize(carry_len + chunk_size, 0);
        let n = source.read_at(&mut buf[carry_len..], position)?;
        buf.truncate(carry_len + n);
        position += n as u64;
        trace!(position, bytes_read = n, carry_len, "chunk read");

        if n == 0 {
            if position == start {
                empty = true;
            }
            break;
        }

        // carry 内部不可能有完整分隔符，只需从可能跨界的位置开始找
        let mut split = 0;
        let mut from = carry_len.saturating_sub(sep_len - 1);
        while let Some(i) = finder.find(&buf, from) {
            ctx.line_count += 1;
            let flow: ScanFlow = on_line(&buf[split..i], &ctx).into();
            if flow == ScanFlow::Stop {
                stopped = true;
                break;
            }
            ctx.line_offset += (i - split + sep_len) as u64;
            split = i + sep_len;
            from = split;
        }
        if stopped {
            break;
        }
        buf.drain(..split);

        if n < chunk_size {
            break;
        }
    }

    if !empty && !stopped {
        ctx.line_count += 1;
        ctx.is_final = true;
        // 最后一行的返回值无需处理
        let _ = on_line(&buf, &ctx);
    }

    source.close()?;
    let consumed = position - start;
    debug!(path = %path.display(), lines = ctx.line_count, consumed, stopped, "forward scan finished");
    Ok(consumed)
}
