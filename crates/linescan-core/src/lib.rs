//! 按行分块扫描文件（有界内存）
//!
//! 设计要点：
//! - 正向扫描从给定偏移读到文件末尾，反向扫描从边界偏移（默认文件大小）读回偏移 0。
//! - 每次只读取固定大小的块，未成行的残余字节（carry）跨块携带，保证不重不漏。
//! - 回调通过只读的 `ScanContext` 获知行号、行起始偏移以及是否为最后一行。
//! - 回调返回 `false` / `ScanFlow::Stop` 即刻停止，不再读取、不再回调。
//! - 不做任何编码处理，行内容均为原始字节。

mod backward;
mod config;
mod context;
mod error;
mod finder;
mod forward;
mod lines;
mod options;
mod storage;

pub use backward::{backward_scan, backward_scan_with};
pub use config::{load_config, parse_separator, ConfigFile, ScanSection};
pub use context::{ScanContext, ScanFlow};
pub use error::{IoOp, Result, ScanError};
pub use forward::{forward_scan, forward_scan_with};
pub use lines::{count_lines, head_lines, tail_lines, TailOptions};
pub use options::{ScanOptions, DEFAULT_CHUNK_SIZE, DEFAULT_SEPARATOR};
pub use storage::{FsStorage, MemHandle, MemStorage, Storage};
