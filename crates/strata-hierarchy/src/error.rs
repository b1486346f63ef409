use text_size::TextSize;

/// Errors surfaced by hierarchy queries and rebuilds.
///
/// Lookup misses are not errors: absent embeddings and attribute misses are
/// `None`. The variants here are either broken language plugins
/// (configuration) or stale cursors (detected concurrent modification).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The classifier returned a zero-length token or stopped before its
    /// span was exhausted. Fatal for the affected token list; sibling lists
    /// stay usable.
    #[error("classifier for `{language}` made no progress at offset {offset:?}")]
    ClassifierStalled { language: String, offset: TextSize },

    /// An embedding was declared with skips longer than the token itself.
    #[error("embedding skips {skip_start:?}+{skip_end:?} exceed token length {token_len:?}")]
    InvalidEmbedding { skip_start: TextSize, skip_end: TextSize, token_len: TextSize },

    /// The cursor outlived its snapshot: the hierarchy was modified after
    /// the sequence was obtained. Re-acquire a fresh sequence.
    #[error("token sequence expired: hierarchy version moved from {expected} to {actual}")]
    Expired { expected: u64, actual: u64 },

    /// `token()` / `offset()` with the cursor before the first or after the
    /// last token.
    #[error("cursor is not positioned on a token")]
    CursorUnpositioned,
}
