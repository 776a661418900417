//! 反向扫描：从边界偏移向文件开头按块读取，按文件逆序回调每一行
use std::path::Path;

use tracing::{debug, trace};

use crate::context::{ScanContext, ScanFlow};
use crate::error::{IoOp, Result, ScanError};
use crate::finder::SeparatorFinder;
use crate::options::ScanOptions;
use crate::storage::{FsStorage, OpenSource, Storage};

/// 在本地文件上反向扫描，返回读取的总字节数
pub fn backward_scan<F, R>(path: impl AsRef<Path>, on_line: F, opts: &ScanOptions) -> Result<u64>
where
    F: FnMut(&[u8], &ScanContext) -> R,
    R: Into<ScanFlow>,
{
    backward_scan_with(&FsStorage, path.as_ref(), on_line, opts)
}

/// 在任意 `Storage` 上反向扫描
///
/// `opts.position` 为排他上界（默认文件大小，超过文件大小时截断为文件大小）。
/// 每轮读取游标之前的一块，块内容在前、上一轮残余（离边界更近）在后，从尾部向头部
/// 查找分隔符；匹配之后到上一个切分点之间的字节即为一行。游标到达 0 时，剩余残余
/// 就是文件的第一行，以 `line_offset = 0`、`is_final = true` 回调。
pub fn backward_scan_with<S, F, R>(storage: &S, path: &Path, mut on_line: F, opts: &ScanOptions) -> Result<u64>
where
    S: Storage,
    F: FnMut(&[u8], &ScanContext) -> R,
    R: Into<ScanFlow>,
{
    opts.validate()?;
    let finder = SeparatorFinder::new(&opts.separator)?;
    let sep_len = opts.separator.len();
    let chunk_size = opts.chunk_size as u64;

    let size = storage.size(path).map_err(|e| ScanError::io(IoOp::Size, path, e))?;
    let boundary = opts.position.map_or(size, |p| p.min(size));

    let mut source = OpenSource::open(storage, path)?;
    let mut ctx = ScanContext::new(path, sep_len, boundary);
    debug!(path = %path.display(), boundary, chunk_size, "backward scan started");

    let mut cursor = boundary;
    let mut carry: Vec<u8> = Vec::new();
    let mut stopped = false;

    while cursor > 0 {
        let want = chunk_size.min(cursor) as usize;
        cursor -= want as u64;

        let mut buf = vec![0u8; want + carry.len()];
        source.read_exact_at(&mut buf[..want], cursor)?;
        buf[want..].copy_from_slice(&carry);
        trace!(cursor, bytes_read = want, carry_len = carry.len(), "chunk read");

        // end：上一个切分点；carry 内部没有完整分隔符，首轮只需查到可能跨界的位置
        let mut end = buf.len();
        let mut limit = (want + sep_len - 1).min(end);
        while let Some(i) = finder.rfind(&buf[..limit]) {
            ctx.line_count += 1;
            ctx.line_offset = cursor + (i + sep_len) as u64;
            let flow: ScanFlow = on_line(&buf[i + sep_len..end], &ctx).into();
            if flow == ScanFlow::Stop {
                stopped = true;
                break;
            }
            end = i;
            limit = i;
        }
        if stopped {
            break;
        }
        buf.truncate(end);
        carry = buf;
    }

    if boundary > 0 && !stopped {
        ctx.line_count += 1;
        ctx.line_offset = 0;
        ctx.is_final = true;
        let _ = on_line(&carry, &ctx);
    }

    source.close()?;
    let consumed = boundary - cursor;
    debug!(path = %path.display(), lines = ctx.line_count, consumed, stopped, "backward scan finished");
    Ok(consumed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forward::forward_scan_with;
    use crate::storage::MemStorage;

    fn collect(content: &[u8], opts: &ScanOptions) -> (Vec<Vec<u8>>, Vec<ScanContext>, u64) {
        let storage = MemStorage::new().with_file("f", content.to_vec());
        let mut lines = Vec::new();
        let mut ctxs = Vec::new();
        let consumed = backward_scan_with(
            &storage,
            Path::new("f"),
            |line: &[u8], ctx: &ScanContext| {
                lines.push(line.to_vec());
                ctxs.push(ctx.clone());
            },
            opts,
        )
        .unwrap();
        assert_eq!(storage.open_handles(), 0);
        (lines, ctxs, consumed)
    }

    fn forward_lines(content: &[u8], opts: &ScanOptions) -> Vec<Vec<u8>> {
        let storage = MemStorage::new().with_file("f", content.to_vec());
        let mut lines = Vec::new();
        forward_scan_with(&storage, Path::new("f"), |line: &[u8], _: &ScanContext| lines.push(line.to_vec()), opts)
            .unwrap();
        lines
    }

    #[test]
    fn emits_lines_in_reverse_order() {
        let (lines, ctxs, consumed) = collect(b"a\nb\nc", &ScanOptions::default());
        assert_eq!(lines, vec![b"c".to_vec(), b"b".to_vec(), b"a".to_vec()]);
        assert_eq!(consumed, 5);
        assert_eq!(ctxs.iter().map(|c| c.line_offset).collect::<Vec<_>>(), vec![4, 2, 0]);
        let last = ctxs.last().unwrap();
        assert!(last.is_final);
        assert_eq!(last.line_count, 3);
        assert!(ctxs[..2].iter().all(|c| !c.is_final));
    }

    #[test]
    fn empty_source_emits_nothing() {
        let (lines, _, consumed) = collect(b"", &ScanOptions::default());
        assert!(lines.is_empty());
        assert_eq!(consumed, 0);

        let (lines, _, consumed) = collect(b"abc", &ScanOptions::default().with_position(0));
        assert!(lines.is_empty());
        assert_eq!(consumed, 0);
    }

    #[test]
    fn leading_separator_yields_empty_first_line() {
        let (lines, ctxs, _) = collect(b"\nx", &ScanOptions::default().with_chunk_size(1));
        assert_eq!(lines, vec![b"x".to_vec(), vec![]]);
        assert_eq!(ctxs[0].line_offset, 1);
        assert_eq!(ctxs[1].line_offset, 0);
        assert!(ctxs[1].is_final);
    }

    #[test]
    fn boundary_excludes_later_bytes() {
        let content = b"one\ntwo\nthree\nfour";
        for k in 0..=content.len() as u64 {
            let (lines, ctxs, consumed) = collect(content, &ScanOptions::default().with_position(k).with_chunk_size(3));
            assert_eq!(consumed, k);
            let mut expected = forward_lines(&content[..k as usize], &ScanOptions::default());
            expected.reverse();
            assert_eq!(lines, expected, "k={k}");
            for (line, ctx) in lines.iter().zip(&ctxs) {
                assert!(ctx.line_offset + line.len() as u64 <= k);
                assert_eq!(ctx.boundary, k);
            }
        }
    }

    #[test]
    fn boundary_past_end_is_clamped() {
        let (lines, _, consumed) = collect(b"a\nb", &ScanOptions::default().with_position(100));
        assert_eq!(lines, vec![b"b".to_vec(), b"a".to_vec()]);
        assert_eq!(consumed, 3);
    }

    #[test]
    fn mirrors_forward_for_any_chunk_size() {
        let content = b"alpha\r\n\r\nbeta\r\ngamma delta\r\n\r\n\r\nz\r\n";
        let base = ScanOptions::default().with_separator(b"\r\n".to_vec());
        let expected = forward_lines(content, &base);
        for chunk in 1..=content.len() + 2 {
            let opts = base.clone().with_chunk_size(chunk);
            let (mut lines, ctxs, _) = collect(content, &opts);
            lines.reverse();
            assert_eq!(lines, expected, "chunk={chunk}");
            // 偏移处的字节与行内容一致
            for (i, ctx) in ctxs.iter().enumerate() {
                let line = &lines[lines.len() - 1 - i];
                let at = ctx.line_offset as usize;
                assert_eq!(&content[at..at + line.len()], &line[..]);
            }
        }
    }

    #[test]
    fn stop_halts_reads_and_callbacks() {
        let storage = MemStorage::new().with_file("f", b"aa\nbb\ncc\ndd\nee".to_vec());
        let mut calls = 0;
        let consumed = backward_scan_with(
            &storage,
            Path::new("f"),
            |_: &[u8], ctx: &ScanContext| {
                calls += 1;
                if ctx.line_count == 2 { ScanFlow::Stop } else { ScanFlow::Continue }
            },
            &ScanOptions::default().with_chunk_size(4),
        )
        .unwrap();
        assert_eq!(calls, 2);
        assert_eq!(storage.reads(), 2);
        assert_eq!(consumed, 8);
        assert_eq!(storage.open_handles(), 0);
    }

    #[test]
    fn size_failure_is_reported() {
        let storage = MemStorage::new();
        let err = backward_scan_with(&storage, Path::new("missing"), |_: &[u8], _: &ScanContext| {}, &ScanOptions::default())
            .unwrap_err();
        assert_eq!(err.io_op(), Some(IoOp::Size));
    }

    #[test]
    fn read_failure_releases_handle() {
        let storage = MemStorage::new()
            .with_file("f", b"aa\nbb\ncc\ndd".to_vec())
            .fail_reads_after(1)
            .fail_on_close();
        let err = backward_scan_with(
            &storage,
            Path::new("f"),
            |_: &[u8], _: &ScanContext| {},
            &ScanOptions::default().with_chunk_size(4),
        )
        .unwrap_err();
        assert_eq!(err.io_op(), Some(IoOp::Read));
        assert_eq!(storage.open_handles(), 0);
    }
}
