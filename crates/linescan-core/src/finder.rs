//! 分隔符查找：正向取最左匹配，反向取最右匹配
use aho_corasick::{AhoCorasick, AhoCorasickBuilder, Input, MatchKind};
use memchr::memmem::FinderRev;

use crate::error::{Result, ScanError};

pub(crate) struct SeparatorFinder {
    ac: AhoCorasick,
    rev: FinderRev<'static>,
}

impl SeparatorFinder {
    pub(crate) fn new(separator: &[u8]) -> Result<Self> {
        let ac = AhoCorasickBuilder::new()
            .match_kind(MatchKind::LeftmostFirst)
            .build([separator])
            .map_err(|e| ScanError::InvalidOptions(format!("separator: {e}")))?;
        let rev = FinderRev::new(separator).into_owned();
        Ok(Self { ac, rev })
    }

    /// 在 `hay[from..]` 中查找最左匹配，返回其在 `hay` 中的起始下标
    pub(crate) fn find(&self, hay: &[u8], from: usize) -> Option<usize> {
        if from > hay.len() {
            return None;
        }
        self.ac.find(Input::new(hay).span(from..hay.len())).map(|m| m.start())
    }

    /// 查找完全落在 `hay` 内的最右匹配
    pub(crate) fn rfind(&self, hay: &[u8]) -> Option<usize> {
        self.rev.rfind(hay)
    }
}
