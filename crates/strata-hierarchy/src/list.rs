//! Internal token-list bookkeeping.
//!
//! Every list covers one contiguous span of the buffer for one language
//! path. Before its first traversal it is a placeholder; afterwards it
//! holds a published run — an immutable, shared array of entries that
//! cursors read without any lock. Re-lexing publishes a replacement run;
//! snapshots held by existing cursors stay internally consistent and are
//! rejected by their version stamp instead of being mutated.

use std::sync::Arc;

use strata_language::{LanguagePath, TokenKind};
use text_size::{TextRange, TextSize};

use crate::arena::TokenId;

/// Identifier of one token list; never reused within a hierarchy.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub(crate) struct ListId(pub(crate) u32);

pub(crate) const ROOT_LIST: ListId = ListId(0);

/// One token of a published run. `range` is relative to the list's span
/// start; cursors translate into top-level coordinates via their base.
#[derive(Clone, Copy, Debug)]
pub(crate) struct RunEntry {
    pub(crate) id: TokenId,
    pub(crate) kind: TokenKind,
    pub(crate) range: TextRange,
}

/// Published, immutable token array of one built list.
#[derive(Debug, Default)]
pub(crate) struct TokenRun {
    pub(crate) entries: Vec<RunEntry>,
}

impl TokenRun {
    /// Index of the entry containing `offset` (list-relative), if any.
    /// Entries tile the span, so this is a boundary-exclusive lookup:
    /// an offset equal to an entry's end belongs to the next entry.
    pub(crate) fn entry_at(&self, offset: TextSize) -> Option<usize> {
        let index = self.entries.partition_point(|entry| entry.range.end() <= offset);
        (index < self.entries.len() && self.entries[index].range.start() <= offset)
            .then_some(index)
    }
}

/// Edge from a parent token down to its embedded list.
#[derive(Clone, Debug)]
pub(crate) struct EmbeddingEdge {
    pub(crate) parent_list: ListId,
    pub(crate) parent_token: TokenId,
    pub(crate) skip_start: TextSize,
    pub(crate) skip_end: TextSize,
}

pub(crate) struct ListData {
    pub(crate) path: LanguagePath,
    pub(crate) parent: Option<EmbeddingEdge>,
    pub(crate) run: Option<Arc<TokenRun>>,
    pub(crate) building: bool,
}

impl ListData {
    pub(crate) fn new(path: LanguagePath, parent: Option<EmbeddingEdge>) -> Self {
        Self { path, parent, run: None, building: false }
    }
}

#[cfg(test)]
mod tests {
    use strata_language::TokenKind;
    use text_size::TextRange;

    use super::*;
    use crate::arena::TokenArena;

    #[test]
    fn entry_lookup_is_boundary_exclusive() {
        let mut arena = TokenArena::new();
        let entries = [3u32, 1, 4]
            .iter()
            .scan(0u32, |offset, &len| {
                let start = *offset;
                *offset += len;
                Some(RunEntry {
                    id: arena.alloc(),
                    kind: TokenKind::new(0),
                    range: TextRange::at(start.into(), len.into()),
                })
            })
            .collect();
        let run = TokenRun { entries };

        assert_eq!(run.entry_at(TextSize::new(0)), Some(0));
        assert_eq!(run.entry_at(TextSize::new(2)), Some(0));
        assert_eq!(run.entry_at(TextSize::new(3)), Some(1));
        assert_eq!(run.entry_at(TextSize::new(4)), Some(2));
        assert_eq!(run.entry_at(TextSize::new(7)), Some(2));
        assert_eq!(run.entry_at(TextSize::new(8)), None);
    }
}
