//! 配置文件加载（TOML）
use serde::Deserialize;
use std::path::Path;

use crate::error::{Result, ScanError};
use crate::options::ScanOptions;

/// 顶层配置结构
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub scan: ScanSection,
}

/// `[scan]` 段；未给出的字段保持默认值
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScanSection {
    #[serde(default)]
    pub chunk_size: Option<usize>,
    /// 支持转义写法，如 `"\\r\\n"`
    #[serde(default)]
    pub separator: Option<String>,
}

impl ScanSection {
    /// 将配置覆盖到已有选项上
    pub fn apply(&self, opts: &mut ScanOptions) -> Result<()> {
        if let Some(size) = self.chunk_size {
            opts.chunk_size = size;
        }
        if let Some(sep) = &self.separator {
            opts.separator = parse_separator(sep)?;
        }
        Ok(())
    }
}

/// 从 TOML 文件加载配置
pub fn load_config(path: &Path) -> Result<ConfigFile> {
    let txt = std::fs::read_to_string(path)
        .map_err(|source| ScanError::ConfigRead { path: path.to_path_buf(), source })?;
    toml::from_str(&txt).map_err(|source| ScanError::ConfigParse { path: path.to_path_buf(), source })
}

/// 解析分隔符转义：`\n` `\r` `\t` `\0` `\\` `\xHH`，其余字符按 UTF-8 字节原样保留
pub fn parse_separator(input: &str) -> Result<Vec<u8>> {
    let invalid = |reason: &str| ScanError::InvalidEscape { input: input.to_string(), reason: reason.to_string() };

    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'\\' {
            out.push(bytes[i]);
            i += 1;
            continue;
        }
        let Some(&kind) = bytes.get(i + 1) else {
            return Err(invalid("dangling backslash"));
        };
        match kind {
            b'n' => out.push(b'\n'),
            b'r' => out.push(b'\r'),
            b't' => out.push(b'\t'),
            b'0' => out.push(0),
            b'\\' => out.push(b'\\'),
            b'x' => {
                let hex = bytes
                    .get(i + 2..i + 4)
                    .filter(|h| h.iter().all(u8::is_ascii_hexdigit))
                    .and_then(|h| std::str::from_utf8(h).ok())
                    .ok_or_else(|| invalid("\\x needs two hex digits"))?;
                let b = u8::from_str_radix(hex, 16).map_err(|_| invalid("\\x needs two hex digits"))?;
                out.push(b);
                i += 2;
            }
            _ => return Err(invalid("unknown escape")),
        }
        i += 2;
    }
    if out.is_empty() {
        return Err(invalid("separator must not be empty"));
    }
    Ok(out)
}
