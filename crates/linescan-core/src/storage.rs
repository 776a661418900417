//! 外部存储协作方：open / read_at / close / size
//!
//! 扫描核心只依赖这四个能力；任何提供它们的存储介质都可以被扫描。
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::warn;

use crate::error::{IoOp, Result, ScanError};

/// 存储抽象
///
/// `read_at` 返回少于 `buf.len()` 的字节数时，调用方视为已到达文件末尾。
pub trait Storage {
    type Handle;

    fn open(&self, path: &Path) -> io::Result<Self::Handle>;
    fn read_at(&self, handle: &mut Self::Handle, buf: &mut [u8], pos: u64) -> io::Result<usize>;
    fn close(&self, handle: Self::Handle) -> io::Result<()>;
    fn size(&self, path: &Path) -> io::Result<u64>;
}

/// 本地文件系统
#[derive(Debug, Default, Clone, Copy)]
pub struct FsStorage;

impl Storage for FsStorage {
    type Handle = File;

    fn open(&self, path: &Path) -> io::Result<File> {
        File::open(path)
    }

    fn read_at(&self, file: &mut File, buf: &mut [u8], pos: u64) -> io::Result<usize> {
        file.seek(SeekFrom::Start(pos))?;
        // 循环读满，只有到达 EOF 才会返回短读
        let mut filled = 0;
        while filled < buf.len() {
            match file.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(filled)
    }

    fn close(&self, file: File) -> io::Result<()> {
        drop(file);
        Ok(())
    }

    fn size(&self, path: &Path) -> io::Result<u64> {
        Ok(std::fs::metadata(path)?.len())
    }
}

/// 内存存储：路径 -> 字节内容
///
/// 记录读取次数与未关闭的句柄数，并支持注入读取/关闭失败，便于验证扫描的资源释放行为。
#[derive(Debug, Default)]
pub struct MemStorage {
    files: HashMap<PathBuf, Arc<[u8]>>,
    reads: AtomicUsize,
    open_handles: AtomicUsize,
    fail_reads_after: Option<usize>,
    fail_close: bool,
}

/// `MemStorage` 的句柄
#[derive(Debug, Clone)]
pub struct MemHandle {
    data: Arc<[u8]>,
}

impl MemStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, data: impl Into<Vec<u8>>) -> &mut Self {
        self.files.insert(path.into(), Arc::from(data.into()));
        self
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>, data: impl Into<Vec<u8>>) -> Self {
        self.insert(path, data);
        self
    }

    /// 前 `n` 次读取正常，之后的读取全部失败
    pub fn fail_reads_after(mut self, n: usize) -> Self {
        self.fail_reads_after = Some(n);
        self
    }

    pub fn fail_on_close(mut self) -> Self {
        self.fail_close = true;
        self
    }

    /// 累计读取次数（含失败的读取）
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn open_handles(&self) -> usize {
        self.open_handles.load(Ordering::SeqCst)
    }
}

impl Storage for MemStorage {
    type Handle = MemHandle;

    fn open(&self, path: &Path) -> io::Result<MemHandle> {
        let data = self.files.get(path).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("no such file: {}", path.display()))
        })?;
        self.open_handles.fetch_add(1, Ordering::SeqCst);
        Ok(MemHandle { data })
    }

    fn read_at(&self, handle: &mut MemHandle, buf: &mut [u8], pos: u64) -> io::Result<usize> {
        let count = self.reads.fetch_add(1, Ordering::SeqCst) + 1;
        if matches!(self.fail_reads_after, Some(limit) if count > limit) {
            return Err(io::Error::other("injected read failure"));
        }
        let len = handle.data.len() as u64;
        if pos >= len {
            return Ok(0);
        }
        let start = pos as usize;
        let n = buf.len().min(handle.data.len() - start);
        buf[..n].copy_from_slice(&handle.data[start..start + n]);
        Ok(n)
    }

    fn close(&self, _handle: MemHandle) -> io::Result<()> {
        self.open_handles.fetch_sub(1, Ordering::SeqCst);
        if self.fail_close {
            return Err(io::Error::other("injected close failure"));
        }
        Ok(())
    }

    fn size(&self, path: &Path) -> io::Result<u64> {
        self.files
            .get(path)
            .map(|d| d.len() as u64)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("no such file: {}", path.display())))
    }
}

/// 单次扫描独占的已打开句柄
///
/// 正常路径通过 `close` 释放并返回关闭错误；提前返回（读取失败等）时由 `Drop` 兜底释放，
/// 此时关闭失败只记日志，不覆盖原始错误。
pub(crate) struct OpenSource<'a, S: Storage> {
    storage: &'a S,
    path: &'a Path,
    handle: Option<S::Handle>,
}

impl<'a, S: Storage> OpenSource<'a, S> {
    pub(crate) fn open(storage: &'a S, path: &'a Path) -> Result<Self> {
        let handle = storage.open(path).map_err(|e| ScanError::io(IoOp::Open, path, e))?;
        Ok(Self { storage, path, handle: Some(handle) })
    }

    pub(crate) fn read_at(&mut self, buf: &mut [u8], pos: u64) -> Result<usize> {
        let path = self.path;
        let handle = self
            .handle
            .as_mut()
            .ok_or_else(|| ScanError::io(IoOp::Read, path, io::Error::other("handle already released")))?;
        self.storage
            .read_at(handle, buf, pos)
            .map_err(|e| ScanError::io(IoOp::Read, path, e))
    }

    /// 读满 `buf`；中途遇到 EOF 说明文件在扫描期间被截断
    pub(crate) fn read_exact_at(&mut self, buf: &mut [u8], pos: u64) -> Result<()> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.read_at(&mut buf[filled..], pos + filled as u64)?;
            if n == 0 {
                return Err(ScanError::io(
                    IoOp::Read,
                    self.path,
                    io::Error::new(io::ErrorKind::UnexpectedEof, "source shrank during scan"),
                ));
            }
            filled += n;
        }
        Ok(())
    }

    pub(crate) fn close(mut self) -> Result<()> {
        match self.handle.take() {
            Some(handle) => self
                .storage
                .close(handle)
                .map_err(|e| ScanError::io(IoOp::Close, self.path, e)),
            None => Ok(()),
        }
    }
}

impl<S: Storage> Drop for OpenSource<'_, S> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            if let Err(e) = self.storage.close(handle) {
                warn!(path = %self.path.display(), error = %e, "failed to release handle after aborted scan");
            }
        }
    }
}
